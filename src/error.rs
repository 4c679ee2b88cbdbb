//! Error types for the capture pipeline.
//!
//! Each stage has its own enum so callers can apply the right policy:
//! fetch failures degrade to a minimal record, store failures fail the save,
//! webhook failures are surfaced as warnings.

use reqwest::StatusCode;
use thiserror::Error;

/// Failure to obtain page markup.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The host tab capability failed (enumeration or in-page retrieval).
    #[error("tab host error: {0}")]
    Host(String),

    /// No open page matched the requested URL.
    #[error("no open page matches {url}")]
    NoMatchingPage { url: String },

    /// The proxy could not be reached or the body could not be read.
    #[error("proxy request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The proxy answered with a non-success status.
    #[error("proxy returned HTTP {status} for {url}")]
    Status { url: String, status: StatusCode },
}

/// Failure of a local store operation.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Opening the database or applying migrations failed.
    #[error("failed to open the embed store: {0}")]
    Init(#[source] sqlx::Error),

    /// A single operation failed; nothing was written.
    #[error("failed to {operation}: {source}")]
    Query {
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },

    /// A save was attempted without a URL.
    #[error("an embed needs a url to be saved")]
    MissingUrl,
}

impl StoreError {
    pub(crate) fn query(operation: &'static str) -> impl FnOnce(sqlx::Error) -> Self {
        move |source| StoreError::Query { operation, source }
    }

    /// Whether the failure was a url uniqueness violation.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            StoreError::Query { source, .. } => source
                .as_database_error()
                .is_some_and(|e| e.is_unique_violation()),
            _ => false,
        }
    }
}

/// Failure delivering a saved embed to the configured webhook.
#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("webhook request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("webhook returned HTTP {status}")]
    Status { status: StatusCode },
}

/// Failure rendering saved embeds for export.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("failed to write csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to write json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("export is not valid utf-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}
