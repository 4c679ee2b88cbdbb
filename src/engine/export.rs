//! Text renderings of saved embeds for export.

use csv::{QuoteStyle, Terminator, WriterBuilder};

use crate::db::models::Embed;
use crate::error::ExportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    /// One url per line.
    Txt,
    /// Every field, spreadsheet friendly.
    Csv,
    /// Every field, pretty-printed.
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Txt => "txt",
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

const CSV_HEADER: [&str; 6] = ["id", "url", "title", "description", "imageUrl", "date"];

pub fn render(embeds: &[Embed], format: ExportFormat) -> Result<String, ExportError> {
    Ok(match format {
        ExportFormat::Txt => to_txt(embeds),
        ExportFormat::Csv => to_csv(embeds)?,
        ExportFormat::Json => to_json(embeds)?,
    })
}

pub fn to_txt(embeds: &[Embed]) -> String {
    embeds
        .iter()
        .map(|embed| embed.url.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Header plus one row per embed. Fields are quoted only when they hold a
/// comma, quote or line break; absent metadata is an empty field.
pub fn to_csv(embeds: &[Embed]) -> Result<String, ExportError> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(vec![]);

    writer.write_record(CSV_HEADER)?;
    for embed in embeds {
        writer.write_record([
            embed.id.to_string().as_str(),
            embed.url.as_str(),
            embed.title.as_deref().unwrap_or_default(),
            embed.description.as_deref().unwrap_or_default(),
            embed.image_url.as_deref().unwrap_or_default(),
            embed.date.as_str(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8(bytes)?)
}

pub fn to_json(embeds: &[Embed]) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(embeds)?)
}

/// `saved_urls.<ext>`, or `saved_urls_filtered.<ext>` for a searched subset.
pub fn default_file_name(format: ExportFormat, filtered: bool) -> String {
    let stem = if filtered {
        "saved_urls_filtered"
    } else {
        "saved_urls"
    };
    format!("{stem}.{}", format.extension())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Embed> {
        vec![
            Embed {
                id: 1,
                url: "https://a.example".into(),
                title: Some("Plain".into()),
                description: None,
                image_url: None,
                date: "1/1/2026".into(),
            },
            Embed {
                id: 2,
                url: "https://b.example/?q=1,2".into(),
                title: Some("Say \"hi\"".into()),
                description: Some("line one\nline two".into()),
                image_url: Some("https://b.example/i.png".into()),
                date: "1/2/2026".into(),
            },
        ]
    }

    #[test]
    fn test_txt_lists_urls() {
        assert_eq!(to_txt(&sample()), "https://a.example\nhttps://b.example/?q=1,2");
        assert_eq!(to_txt(&[]), "");
    }

    #[test]
    fn test_csv_escapes_fields() {
        let csv = to_csv(&sample()).unwrap();
        let expected = "id,url,title,description,imageUrl,date\n\
                        1,https://a.example,Plain,,,1/1/2026\n\
                        2,\"https://b.example/?q=1,2\",\"Say \"\"hi\"\"\",\"line one\nline two\",https://b.example/i.png,1/2/2026\n";
        assert_eq!(csv, expected);
    }

    #[test]
    fn test_csv_parses_back_into_the_same_fields() {
        let csv = render(&sample(), ExportFormat::Csv).unwrap();
        let mut reader = csv::Reader::from_reader(csv.as_bytes());

        let header: Vec<&str> = reader.headers().unwrap().iter().collect();
        assert_eq!(header, CSV_HEADER);
        let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[1][2], "Say \"hi\"");
        assert_eq!(&rows[1][3], "line one\nline two");
        assert_eq!(&rows[0][4], "");
    }

    #[test]
    fn test_csv_empty_has_header_only() {
        assert_eq!(
            to_csv(&[]).unwrap(),
            "id,url,title,description,imageUrl,date\n"
        );
    }

    #[test]
    fn test_json_round_trips_with_camel_case() {
        let json = render(&sample(), ExportFormat::Json).unwrap();
        assert!(json.contains("\"imageUrl\": \"https://b.example/i.png\""));

        let parsed: Vec<Embed> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, sample());
    }

    #[test]
    fn test_default_file_name() {
        assert_eq!(default_file_name(ExportFormat::Csv, false), "saved_urls.csv");
        assert_eq!(
            default_file_name(ExportFormat::Json, true),
            "saved_urls_filtered.json"
        );
    }
}
