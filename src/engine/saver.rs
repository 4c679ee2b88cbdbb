use std::fmt::Write as _;
use std::sync::Arc;

use chrono::Local;
use tracing::{info, warn};

use super::embeds::extract_metadata;
use super::page_source::{PageSource, ProxyFetchSource, TabHost, select_page_source};
use super::webhook::{WebhookNotifier, WebhookOutcome};
use crate::config::AppConfig;
use crate::db::models::EmbedDraft;
use crate::db::store::EmbedStore;
use crate::error::{StoreError, WebhookError};

/// en-US short date, e.g. `10/19/2026`.
pub const DEFAULT_DATE_FORMAT: &str = "%-m/%-d/%Y";

/// Result of a successful save.
#[derive(Debug)]
pub struct SaveReport {
    /// Id of the stored record (existing id when the url was already saved).
    pub id: i64,
    /// The captured record that was persisted and forwarded.
    pub embed: EmbedDraft,
    /// Webhook result. Failures here never undo the local save.
    pub webhook: Result<WebhookOutcome, WebhookError>,
}

/// Turns urls into stored embeds: fetch, extract, persist, notify.
pub struct LinkSaver {
    store: EmbedStore,
    source: Box<dyn PageSource>,
    notifier: WebhookNotifier,
    date_format: String,
}

impl LinkSaver {
    pub fn new(store: EmbedStore, source: Box<dyn PageSource>, notifier: WebhookNotifier) -> Self {
        Self {
            store,
            source,
            notifier,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }

    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = format.into();
        self
    }

    /// Wire everything up from configuration. `host` is the privileged tab
    /// capability when running inside one.
    pub fn from_config(
        config: &AppConfig,
        host: Option<Arc<dyn TabHost>>,
    ) -> Result<Self, reqwest::Error> {
        let client = config.http_client()?;
        let proxy = ProxyFetchSource::new(client.clone(), config.fetch.proxy_url.clone())
            .with_max_body_bytes(config.fetch.max_body_bytes());

        Ok(Self::new(
            EmbedStore::new(config.database.url.clone()),
            select_page_source(host, proxy),
            WebhookNotifier::new(client, config.webhook.clone()),
        )
        .with_date_format(config.fetch.date_format.clone()))
    }

    pub fn store(&self) -> &EmbedStore {
        &self.store
    }

    /// Current local date in the configured format.
    pub fn capture_date(&self) -> String {
        let now = Local::now();
        let mut out = String::new();
        if write!(out, "{}", now.format(&self.date_format)).is_err() {
            warn!(format = %self.date_format, "invalid date format, using default");
            return now.format(DEFAULT_DATE_FORMAT).to_string();
        }
        out
    }

    /// Build a record for `url` from its page. Never fails: if the page
    /// cannot be fetched the record carries only the url and date, and a
    /// resave from it keeps whatever metadata was stored before.
    pub async fn capture(&self, url: &str) -> EmbedDraft {
        let date = self.capture_date();

        let markup = match self.source.fetch_markup(url).await {
            Ok(markup) => markup,
            Err(e) => {
                warn!(%url, error = %e, "could not fetch page, saving url only");
                return EmbedDraft::minimal(url, date);
            }
        };

        let meta = extract_metadata(&markup, url);
        info!(
            %url,
            title = meta.title.is_some(),
            description = meta.description.is_some(),
            image = meta.image_url.is_some(),
            "metadata extracted"
        );

        EmbedDraft {
            id: None,
            url: url.to_string(),
            title: meta.title,
            description: meta.description,
            image_url: meta.image_url,
            date,
            metadata_captured: true,
        }
    }

    /// Capture `url`, then persist it and notify the webhook concurrently.
    ///
    /// Only a store failure fails the save. Two saves of the same url racing
    /// each other are not ordered; whichever write lands last wins.
    pub async fn save_url(&self, url: &str) -> Result<SaveReport, StoreError> {
        let embed = self.capture(url).await;

        let (saved, webhook) = tokio::join!(self.store.save(&embed), self.notifier.notify(&embed));

        if let Err(e) = &webhook {
            warn!(%url, error = %e, "webhook delivery failed");
        }
        let id = saved?;

        info!(id, %url, "url saved");
        Ok(SaveReport { id, embed, webhook })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WebhookConfig;
    use crate::engine::page_source::{OpenPage, PageFilter, PrivilegedTabSource};
    use crate::error::FetchError;
    use async_trait::async_trait;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ARTICLE: &str = r#"<html><head>
        <meta property="og:title" content="Saved Article">
        <meta name="description" content="A page worth keeping">
        </head><body><main><img src="/hero.jpg"></main></body></html>"#;

    async fn proxy_returning(status: u16, body: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&server)
            .await;
        server
    }

    fn saver(dir: &TempDir, proxy: &MockServer, webhook: WebhookConfig) -> LinkSaver {
        let client = reqwest::Client::new();
        let store = EmbedStore::new(format!(
            "sqlite:{}",
            dir.path().join("embeds.db").display()
        ));
        LinkSaver::new(
            store,
            Box::new(ProxyFetchSource::new(client.clone(), proxy.uri())),
            WebhookNotifier::new(client, webhook),
        )
    }

    #[tokio::test]
    async fn test_save_url_extracts_and_persists() {
        let dir = tempfile::tempdir().expect("tempdir");
        let proxy = proxy_returning(200, ARTICLE).await;
        let saver = saver(&dir, &proxy, WebhookConfig::default());

        let report = saver.save_url("https://site.com/post").await.unwrap();
        assert_eq!(report.webhook.unwrap(), WebhookOutcome::Skipped);

        let stored = saver.store().get_by_id(report.id).await.unwrap().unwrap();
        assert_eq!(stored.url, "https://site.com/post");
        assert_eq!(stored.title.as_deref(), Some("Saved Article"));
        assert_eq!(stored.description.as_deref(), Some("A page worth keeping"));
        assert_eq!(stored.image_url.as_deref(), Some("https://site.com/hero.jpg"));
        assert!(!stored.date.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure_saves_minimal_record() {
        let dir = tempfile::tempdir().expect("tempdir");
        let proxy = proxy_returning(500, "upstream down").await;
        let saver = saver(&dir, &proxy, WebhookConfig::default());

        let report = saver.save_url("https://site.com/down").await.unwrap();
        assert!(!report.embed.has_metadata());
        assert_eq!(report.embed.url, "https://site.com/down");
        assert!(!report.embed.date.is_empty());

        let stored = saver.store().get_by_url("https://site.com/down").await.unwrap().unwrap();
        assert_eq!(stored.id, report.id);
        assert_eq!(stored.title, None);
    }

    #[tokio::test]
    async fn test_resaving_keeps_id() {
        let dir = tempfile::tempdir().expect("tempdir");
        let proxy = proxy_returning(200, ARTICLE).await;
        let saver = saver(&dir, &proxy, WebhookConfig::default());

        let first = saver.save_url("https://site.com/post").await.unwrap();
        let second = saver.save_url("https://site.com/post").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(saver.store().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_webhook_receives_captured_embed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let proxy = proxy_returning(200, ARTICLE).await;

        let hook = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(wiremock::matchers::body_partial_json(serde_json::json!({
                "url": "https://site.com/post",
                "title": "Saved Article",
                "imageUrl": "https://site.com/hero.jpg"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&hook)
            .await;

        let webhook = WebhookConfig {
            enabled: true,
            url: Some(format!("{}/hook", hook.uri())),
            token: None,
        };
        let saver = saver(&dir, &proxy, webhook);

        let report = saver.save_url("https://site.com/post").await.unwrap();
        assert!(matches!(
            report.webhook,
            Ok(WebhookOutcome::Delivered { .. })
        ));
    }

    #[tokio::test]
    async fn test_webhook_failure_does_not_fail_save() {
        let dir = tempfile::tempdir().expect("tempdir");
        let proxy = proxy_returning(200, ARTICLE).await;

        let hook = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&hook)
            .await;

        let webhook = WebhookConfig {
            enabled: true,
            url: Some(hook.uri()),
            token: None,
        };
        let saver = saver(&dir, &proxy, webhook);

        let report = saver.save_url("https://site.com/post").await.unwrap();
        assert!(report.webhook.is_err());
        assert!(saver.store().get_by_id(report.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unreachable_webhook_does_not_fail_save() {
        let dir = tempfile::tempdir().expect("tempdir");
        let proxy = proxy_returning(200, ARTICLE).await;
        let webhook = WebhookConfig {
            enabled: true,
            url: Some("http://127.0.0.1:9/hook".into()),
            token: None,
        };
        let saver = saver(&dir, &proxy, webhook);

        let report = saver.save_url("https://site.com/post").await.unwrap();
        assert!(matches!(report.webhook, Err(WebhookError::Request(_))));
        assert!(saver.store().get_by_id(report.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_recapture_drops_fields_the_page_no_longer_has() {
        let dir = tempfile::tempdir().expect("tempdir");
        let proxy = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get"))
            .respond_with(ResponseTemplate::new(200).set_body_string(ARTICLE))
            .up_to_n_times(1)
            .mount(&proxy)
            .await;
        Mock::given(method("GET"))
            .and(path("/get"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"<meta property="og:title" content="Renamed">"#),
            )
            .mount(&proxy)
            .await;
        let saver = saver(&dir, &proxy, WebhookConfig::default());

        let first = saver.save_url("https://site.com/post").await.unwrap();
        let second = saver.save_url("https://site.com/post").await.unwrap();
        assert_eq!(first.id, second.id);

        let stored = saver.store().get_by_id(first.id).await.unwrap().unwrap();
        assert_eq!(stored.title.as_deref(), Some("Renamed"));
        assert_eq!(stored.description, None);
        assert_eq!(stored.image_url, None);
    }

    #[tokio::test]
    async fn test_failed_recapture_keeps_stored_fields() {
        let dir = tempfile::tempdir().expect("tempdir");
        let proxy = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get"))
            .respond_with(ResponseTemplate::new(200).set_body_string(ARTICLE))
            .up_to_n_times(1)
            .mount(&proxy)
            .await;
        Mock::given(method("GET"))
            .and(path("/get"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&proxy)
            .await;
        let saver = saver(&dir, &proxy, WebhookConfig::default());

        let first = saver.save_url("https://site.com/post").await.unwrap();
        let second = saver.save_url("https://site.com/post").await.unwrap();
        assert!(!second.embed.has_metadata());

        let stored = saver.store().get_by_id(first.id).await.unwrap().unwrap();
        assert_eq!(stored.title.as_deref(), Some("Saved Article"));
        assert_eq!(stored.description.as_deref(), Some("A page worth keeping"));
    }

    #[tokio::test]
    async fn test_store_failure_fails_save() {
        let dir = tempfile::tempdir().expect("tempdir");
        let proxy = proxy_returning(200, ARTICLE).await;
        let client = reqwest::Client::new();
        let store = EmbedStore::new(format!(
            "sqlite:{}?mode=ro",
            dir.path().join("missing").join("embeds.db").display()
        ));
        let saver = LinkSaver::new(
            store,
            Box::new(ProxyFetchSource::new(client.clone(), proxy.uri())),
            WebhookNotifier::new(client, WebhookConfig::default()),
        );

        assert!(saver.save_url("https://site.com/post").await.is_err());
    }

    struct SingleTabHost;

    #[async_trait]
    impl TabHost for SingleTabHost {
        async fn query_pages(&self, _filter: PageFilter) -> Result<Vec<OpenPage>, FetchError> {
            Ok(vec![OpenPage {
                id: 1,
                url: "https://www.site.com/app/".into(),
            }])
        }

        async fn get_markup(&self, _page_id: i64) -> Result<String, FetchError> {
            Ok("<title>Rendered client side</title>".into())
        }
    }

    #[tokio::test]
    async fn test_capture_prefers_open_page() {
        let dir = tempfile::tempdir().expect("tempdir");
        let proxy = proxy_returning(200, ARTICLE).await;
        let client = reqwest::Client::new();
        let source = PrivilegedTabSource::new(
            Arc::new(SingleTabHost),
            ProxyFetchSource::new(client.clone(), proxy.uri()),
        );
        let saver = LinkSaver::new(
            EmbedStore::new(format!(
                "sqlite:{}",
                dir.path().join("embeds.db").display()
            )),
            Box::new(source),
            WebhookNotifier::new(client, WebhookConfig::default()),
        );

        let embed = saver.capture("https://site.com/app").await;
        assert_eq!(embed.title.as_deref(), Some("Rendered client side"));
        assert_eq!(embed.url, "https://site.com/app");
    }

    #[test]
    fn test_capture_date_formats() {
        let dir = tempfile::tempdir().expect("tempdir");
        let client = reqwest::Client::new();
        let saver = LinkSaver::new(
            EmbedStore::new(format!("sqlite:{}", dir.path().join("x.db").display())),
            Box::new(ProxyFetchSource::new(client.clone(), "http://127.0.0.1:9")),
            WebhookNotifier::new(client, WebhookConfig::default()),
        )
        .with_date_format("%Y");

        assert_eq!(saver.capture_date(), Local::now().format("%Y").to_string());

        let saver = saver.with_date_format("%Q-bogus");
        assert_eq!(
            saver.capture_date(),
            Local::now().format(DEFAULT_DATE_FORMAT).to_string()
        );
    }
}
