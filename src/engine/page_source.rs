use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::url::same_page;
use crate::error::FetchError;

/// An open page reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenPage {
    pub id: i64,
    pub url: String,
}

/// Criteria for [`TabHost::query_pages`]. The default matches every page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageFilter {
    pub active: bool,
    pub current_window: bool,
}

impl PageFilter {
    pub const ALL: PageFilter = PageFilter {
        active: false,
        current_window: false,
    };

    /// The focused page of the focused window.
    pub const ACTIVE: PageFilter = PageFilter {
        active: true,
        current_window: true,
    };
}

/// Privileged access to the pages a host (e.g. a browser) has open.
#[async_trait]
pub trait TabHost: Send + Sync {
    async fn query_pages(&self, filter: PageFilter) -> Result<Vec<OpenPage>, FetchError>;

    /// Snapshot of the live document markup of an open page.
    async fn get_markup(&self, page_id: i64) -> Result<String, FetchError>;
}

/// Anything that can produce raw markup for a url.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_markup(&self, url: &str) -> Result<String, FetchError>;
}

/// Fetches pages through a cross-origin retrieval proxy:
/// `GET {proxy}/get?url={encoded target}`.
pub struct ProxyFetchSource {
    client: reqwest::Client,
    proxy_url: String,
    max_body_bytes: Option<usize>,
}

impl ProxyFetchSource {
    pub fn new(client: reqwest::Client, proxy_url: impl Into<String>) -> Self {
        Self {
            client,
            proxy_url: proxy_url.into(),
            max_body_bytes: None,
        }
    }

    /// Truncate response bodies beyond this many bytes.
    pub fn with_max_body_bytes(mut self, max: Option<usize>) -> Self {
        self.max_body_bytes = max;
        self
    }

    fn request_url(&self, target: &str) -> String {
        format!(
            "{}/get?url={}",
            self.proxy_url.trim_end_matches('/'),
            urlencoding::encode(target)
        )
    }
}

#[async_trait]
impl PageSource for ProxyFetchSource {
    async fn fetch_markup(&self, url: &str) -> Result<String, FetchError> {
        let resp = self.client.get(self.request_url(url)).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let body = resp.text().await?;
        debug!(%url, bytes = body.len(), "fetched markup through proxy");
        Ok(match self.max_body_bytes {
            Some(max) => truncate_on_char_boundary(body, max),
            None => body,
        })
    }
}

/// Reads markup straight from an already open page when one matches the
/// url, falling back to the proxy on any failure or when nothing matches.
pub struct PrivilegedTabSource {
    host: Arc<dyn TabHost>,
    fallback: ProxyFetchSource,
}

impl PrivilegedTabSource {
    pub fn new(host: Arc<dyn TabHost>, fallback: ProxyFetchSource) -> Self {
        Self { host, fallback }
    }

    async fn fetch_from_open_page(&self, url: &str) -> Result<String, FetchError> {
        let pages = self.host.query_pages(PageFilter::ALL).await?;
        let page = pages
            .into_iter()
            .find(|page| !page.url.is_empty() && same_page(&page.url, url))
            .ok_or_else(|| FetchError::NoMatchingPage {
                url: url.to_string(),
            })?;

        info!(%url, page_id = page.id, "open page found, reading markup directly");
        self.host.get_markup(page.id).await
    }
}

#[async_trait]
impl PageSource for PrivilegedTabSource {
    async fn fetch_markup(&self, url: &str) -> Result<String, FetchError> {
        match self.fetch_from_open_page(url).await {
            Ok(markup) => Ok(markup),
            Err(FetchError::NoMatchingPage { .. }) => {
                info!(%url, "url is not open in the host, using proxy");
                self.fallback.fetch_markup(url).await
            }
            Err(e) => {
                warn!(%url, error = %e, "host page access failed, using proxy");
                self.fallback.fetch_markup(url).await
            }
        }
    }
}

/// Pick the page source for the current environment: direct page access
/// when a host is available, the proxy otherwise.
pub fn select_page_source(
    host: Option<Arc<dyn TabHost>>,
    proxy: ProxyFetchSource,
) -> Box<dyn PageSource> {
    match host {
        Some(host) => {
            info!("tab host available, reading open pages directly");
            Box::new(PrivilegedTabSource::new(host, proxy))
        }
        None => {
            debug!("no tab host, fetching through proxy");
            Box::new(proxy)
        }
    }
}

/// Url of the focused page, used to pre-fill what to save.
pub async fn current_page_url(host: &dyn TabHost) -> Option<String> {
    match host.query_pages(PageFilter::ACTIVE).await {
        Ok(pages) => pages
            .into_iter()
            .map(|page| page.url)
            .find(|url| !url.is_empty()),
        Err(e) => {
            warn!(error = %e, "failed to query the active page");
            None
        }
    }
}

fn truncate_on_char_boundary(mut body: String, max: usize) -> String {
    if body.len() > max {
        let mut end = max;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
    }
    body
}
