use serde::{Deserialize, Serialize};

/// A saved link as stored in the `embeds` table.
///
/// JSON keys are camelCase (`imageUrl`) and absent metadata is omitted, so
/// exports and webhook payloads carry the same shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Embed {
    pub id: i64,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub date: String,
}

/// Input to a save: a captured link that may or may not exist in the store yet.
///
/// `id` is only set by callers updating a record they already know about.
/// When `metadata_captured` is set the page was read successfully, so its
/// title, description and image replace the stored ones even when absent.
/// Otherwise `None` means "not supplied" and the stored values are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub date: String,
    #[serde(skip)]
    pub metadata_captured: bool,
}

impl EmbedDraft {
    /// A draft carrying only the URL and capture date.
    pub fn minimal(url: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            date: date.into(),
            ..Default::default()
        }
    }

    /// Whether any optional metadata was extracted.
    pub fn has_metadata(&self) -> bool {
        self.title.is_some() || self.description.is_some() || self.image_url.is_some()
    }
}
