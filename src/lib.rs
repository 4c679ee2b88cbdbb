//! Save urls with best-effort page metadata to a local SQLite store, and
//! optionally forward each save to a webhook.

pub mod config;
pub mod db;
pub mod engine;
pub mod error;

pub use db::models::{Embed, EmbedDraft};
pub use db::store::EmbedStore;
pub use engine::saver::{LinkSaver, SaveReport};
pub use error::{ExportError, FetchError, StoreError, WebhookError};
