use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

/// Top-level configuration, loaded from url-saver.toml.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseSection,
    pub fetch: FetchSection,
    pub webhook: WebhookConfig,
    pub list: ListSection,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub url: String,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: "sqlite:url-saver.db?mode=rwc".into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FetchSection {
    /// Base url of the cross-origin retrieval proxy.
    pub proxy_url: String,
    pub user_agent: String,
    /// Request timeout. Unset means requests wait as long as the transport does.
    pub timeout_secs: Option<u64>,
    /// Markup beyond this size is dropped before parsing. 0 disables the limit.
    pub max_body_kb: usize,
    /// chrono format string for the saved `date` field.
    pub date_format: String,
}

impl Default for FetchSection {
    fn default() -> Self {
        Self {
            proxy_url: "https://api.allorigins.win".into(),
            user_agent: concat!("url-saver/", env!("CARGO_PKG_VERSION")).into(),
            timeout_secs: None,
            max_body_kb: 1024,
            date_format: "%-m/%-d/%Y".into(),
        }
    }
}

impl FetchSection {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn max_body_bytes(&self) -> Option<usize> {
        (self.max_body_kb > 0).then(|| self.max_body_kb * 1024)
    }
}

/// Where saved embeds are forwarded, if anywhere.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    pub enabled: bool,
    pub url: Option<String>,
    /// Sent as `Authorization: Bearer <token>` when non-empty.
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ListSection {
    pub page_size: usize,
}

impl Default for ListSection {
    fn default() -> Self {
        Self { page_size: 3 }
    }
}

impl AppConfig {
    /// Load config from a TOML file, falling back to defaults if the file
    /// doesn't exist. Environment variables override TOML values.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            Self::from_toml(&contents)
                .with_context(|| format!("failed to parse config file {}", path.display()))?
        } else {
            info!("No config file found at {}, using defaults", path.display());
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = std::env::var("PROXY_URL") {
            self.fetch.proxy_url = v;
        }
        if let Ok(v) = std::env::var("WEBHOOK_ENABLED")
            && let Ok(enabled) = v.trim().parse()
        {
            self.webhook.enabled = enabled;
        }
        if let Ok(v) = std::env::var("WEBHOOK_URL") {
            self.webhook.url = Some(v);
        }
        if let Ok(v) = std::env::var("WEBHOOK_TOKEN") {
            self.webhook.token = Some(v);
        }
        if let Ok(v) = std::env::var("PAGE_SIZE")
            && let Ok(size) = v.parse()
        {
            self.list.page_size = size;
        }
    }

    /// HTTP client shared by the proxy fetcher and the webhook.
    pub fn http_client(&self) -> reqwest::Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder().user_agent(self.fetch.user_agent.as_str());
        if let Some(timeout) = self.fetch.timeout() {
            builder = builder.timeout(timeout);
        }
        builder.build()
    }
}
