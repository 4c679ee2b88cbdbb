use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{ArgGroup, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use url_saver::config::AppConfig;
use url_saver::db::models::Embed;
use url_saver::engine::export::{self, ExportFormat};
use url_saver::engine::listing;
use url_saver::engine::url as urls;
use url_saver::engine::webhook::WebhookOutcome;
use url_saver::LinkSaver;

#[derive(Parser)]
#[command(name = "url-saver", version, about = "Save urls with their page metadata")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, env = "URL_SAVER_CONFIG", default_value = "url-saver.toml")]
    config: PathBuf,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch a url's metadata and save it (updates it if already saved).
    Save { url: String },

    /// List saved urls, optionally filtered.
    List {
        #[arg(short, long)]
        search: Option<String>,
        #[arg(short, long, default_value_t = 1)]
        page: usize,
        /// Items per page (defaults to the configured page size).
        #[arg(long)]
        per_page: Option<usize>,
    },

    /// Show one saved url as JSON.
    #[command(group(ArgGroup::new("target").required(true).args(["id", "url"])))]
    Show {
        id: Option<i64>,
        #[arg(long)]
        url: Option<String>,
    },

    /// Delete a saved url by id.
    Delete { id: i64 },

    /// Delete every saved url.
    Clear {
        /// Confirm deleting everything.
        #[arg(long)]
        yes: bool,
    },

    /// Export saved urls as txt, csv or json.
    Export {
        #[arg(short, long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,
        #[arg(short, long)]
        search: Option<String>,
        /// File or directory to write to. Prints to stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show how a url parses and normalizes.
    Url { url: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::load(&cli.config)?;
    let saver = LinkSaver::from_config(&config, None).context("failed to build HTTP client")?;

    match cli.command {
        Command::Save { url } => save(&saver, &url).await,
        Command::List {
            search,
            page,
            per_page,
        } => {
            let per_page = per_page.unwrap_or(config.list.page_size);
            list(&saver, search.as_deref(), page, per_page).await
        }
        Command::Show { id, url } => show(&saver, id, url.as_deref()).await,
        Command::Delete { id } => {
            saver.store().delete_by_id(id).await?;
            println!("Deleted {id}");
            Ok(())
        }
        Command::Clear { yes } => {
            if !yes {
                bail!("refusing to delete every saved url without --yes");
            }
            saver.store().clear_all().await?;
            println!("All saved urls deleted");
            Ok(())
        }
        Command::Export {
            format,
            search,
            output,
        } => export_embeds(&saver, format, search.as_deref(), output.as_deref()).await,
        Command::Url { url } => {
            print_url_info(&url);
            Ok(())
        }
    }
}

async fn save(saver: &LinkSaver, url: &str) -> Result<()> {
    if !urls::is_valid_url(url) {
        eprintln!("warning: {url} is not an absolute url, saving it anyway");
    }

    let report = saver.save_url(url).await.context("failed to save url")?;

    match &report.webhook {
        Ok(WebhookOutcome::Delivered { status }) => info!(%status, "forwarded to webhook"),
        Ok(WebhookOutcome::Skipped) => {}
        Err(e) => eprintln!("warning: {e}"),
    }

    println!("Saved [{}] {}", report.id, report.embed.url);
    if let Some(title) = &report.embed.title {
        println!("    {title}");
    }
    Ok(())
}

async fn load_filtered(saver: &LinkSaver, search: Option<&str>) -> Result<Vec<Embed>> {
    let all = saver.store().get_all().await?;
    Ok(listing::filter(all, search.unwrap_or_default()))
}

async fn list(saver: &LinkSaver, search: Option<&str>, page: usize, per_page: usize) -> Result<()> {
    let embeds = load_filtered(saver, search).await?;
    if embeds.is_empty() {
        match search {
            Some(term) if !term.trim().is_empty() => println!("No results for \"{term}\""),
            _ => println!("No saved urls yet."),
        }
        return Ok(());
    }

    let view = listing::paginate(&embeds, page, per_page);
    for embed in &view.items {
        print_embed(embed);
    }
    println!(
        "Page {}/{} ({} urls)",
        view.page, view.total_pages, view.total_items
    );
    Ok(())
}

fn print_embed(embed: &Embed) {
    match &embed.title {
        Some(title) => println!("[{}] {}", embed.id, title),
        None => println!("[{}]", embed.id),
    }
    println!("    {}", embed.url);
    if let Some(description) = &embed.description {
        println!("    {description}");
    }
    if let Some(image_url) = &embed.image_url {
        println!("    image: {image_url}");
    }
    println!("    saved: {}", embed.date);
}

async fn show(saver: &LinkSaver, id: Option<i64>, url: Option<&str>) -> Result<()> {
    let found = match (id, url) {
        (Some(id), _) => saver.store().get_by_id(id).await?,
        (None, Some(url)) => saver.store().get_by_url(url).await?,
        (None, None) => None,
    };

    match found {
        Some(embed) => {
            println!("{}", serde_json::to_string_pretty(&embed)?);
            Ok(())
        }
        None => bail!("no saved url matches"),
    }
}

async fn export_embeds(
    saver: &LinkSaver,
    format: ExportFormat,
    search: Option<&str>,
    output: Option<&Path>,
) -> Result<()> {
    let embeds = load_filtered(saver, search).await?;
    let rendered = export::render(&embeds, format)?;

    let Some(output) = output else {
        if rendered.ends_with('\n') {
            print!("{rendered}");
        } else {
            println!("{rendered}");
        }
        return Ok(());
    };

    let path = if output.is_dir() {
        let filtered = search.is_some_and(|s| !s.trim().is_empty());
        output.join(export::default_file_name(format, filtered))
    } else {
        output.to_path_buf()
    };
    tokio::fs::write(&path, rendered)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("Exported {} urls to {}", embeds.len(), path.display());
    Ok(())
}

fn print_url_info(input: &str) {
    let parsed = urls::parse(input);
    println!("valid:      {}", parsed.is_valid);
    println!("protocol:   {}", parsed.protocol);
    println!("domain:     {}", parsed.domain);
    println!("path:       {}", parsed.path);
    println!("query:      {}", parsed.query);
    println!("fragment:   {}", parsed.fragment);
    println!("base url:   {}", urls::base_url(input));
    println!("normalized: {}", urls::normalize(input));
}
