use reqwest::StatusCode;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::WebhookConfig;
use crate::error::WebhookError;

/// What happened to a webhook notification that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Disabled, or enabled without a target url.
    Skipped,
    Delivered { status: StatusCode },
}

/// Forwards saved embeds to a user-configured HTTP endpoint.
pub struct WebhookNotifier {
    client: reqwest::Client,
    config: WebhookConfig,
}

impl WebhookNotifier {
    pub fn new(client: reqwest::Client, config: WebhookConfig) -> Self {
        Self { client, config }
    }

    /// Target url when the webhook is enabled and configured.
    fn target(&self) -> Option<&str> {
        if !self.config.enabled {
            return None;
        }
        self.config.url.as_deref().filter(|url| !url.is_empty())
    }

    pub fn is_active(&self) -> bool {
        self.target().is_some()
    }

    /// POST `payload` as JSON to the configured url, with a bearer token
    /// when one is set.
    pub async fn notify<T>(&self, payload: &T) -> Result<WebhookOutcome, WebhookError>
    where
        T: Serialize + ?Sized,
    {
        let Some(url) = self.target() else {
            debug!("webhook disabled, skipping");
            return Ok(WebhookOutcome::Skipped);
        };

        let mut request = self.client.post(url).json(payload);
        if let Some(token) = self.config.token.as_deref().filter(|t| !t.is_empty()) {
            request = request.bearer_auth(token);
        }

        let resp = request.send().await.inspect_err(|e| {
            warn!(error = %e, "webhook request failed");
        })?;

        let status = resp.status();
        if !status.is_success() {
            warn!(%status, "webhook rejected the payload");
            return Err(WebhookError::Status { status });
        }

        info!(%status, "webhook delivered");
        Ok(WebhookOutcome::Delivered { status })
    }
}
