//! Content fetcher
//!
//! Retrieves one URL per call and reduces the body to readable text.
//! Bodies are read under a byte cap and the whole request under a timeout,
//! so a single fetch always uses bounded time and memory.

use crate::client::{build_http_client, read_body_capped, run_cancellable, DEFAULT_TIMEOUT};
use crate::convert::{char_window, clean_whitespace, html_to_text, is_binary_content_type, is_html};
use crate::error::SearchKitError;
use crate::notify::{default_notifier, Notifier};
use crate::types::{FetchRequest, FetchedContent, DEFAULT_MAX_LENGTH};
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

/// Default cap on the number of body bytes read per fetch
pub const DEFAULT_MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

/// Builder for [`ContentFetcher`]
#[derive(Clone, Default)]
pub struct ContentFetcherBuilder {
    user_agent: Option<String>,
    timeout: Option<Duration>,
    max_body_bytes: Option<usize>,
    max_length: Option<usize>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl ContentFetcherBuilder {
    /// Create a builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set custom User-Agent
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the cap on body bytes read per fetch
    pub fn max_body_bytes(mut self, bytes: usize) -> Self {
        self.max_body_bytes = Some(bytes);
        self
    }

    /// Set the default text window length in characters
    pub fn max_length(mut self, chars: usize) -> Self {
        self.max_length = Some(chars);
        self
    }

    /// Set the notice sink
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Build the fetcher
    pub fn build(self) -> Result<ContentFetcher, SearchKitError> {
        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        if timeout.is_zero() {
            return Err(SearchKitError::invalid("timeout must be non-zero"));
        }
        let max_body_bytes = self.max_body_bytes.unwrap_or(DEFAULT_MAX_BODY_BYTES);
        if max_body_bytes == 0 {
            return Err(SearchKitError::invalid("max_body_bytes must be at least 1"));
        }
        let max_length = self.max_length.unwrap_or(DEFAULT_MAX_LENGTH);
        if max_length == 0 {
            return Err(SearchKitError::invalid("max_length must be at least 1"));
        }

        let http = build_http_client(
            self.user_agent.as_deref(),
            timeout,
            "text/html,application/xhtml+xml,text/plain;q=0.9,*/*;q=0.8",
        )?;

        Ok(ContentFetcher {
            http,
            max_body_bytes,
            max_length,
            notifier: self.notifier.unwrap_or_else(default_notifier),
        })
    }
}

/// Fetches a URL and extracts readable text
#[derive(Clone)]
pub struct ContentFetcher {
    http: reqwest::Client,
    max_body_bytes: usize,
    max_length: usize,
    notifier: Arc<dyn Notifier>,
}

/// Raw response before text extraction
struct Page {
    status_code: u16,
    content_type: Option<String>,
    body: Bytes,
    truncated: bool,
}

impl ContentFetcher {
    /// Create a new fetcher builder
    pub fn builder() -> ContentFetcherBuilder {
        ContentFetcherBuilder::new()
    }

    /// Fetch `url` and return the first window of its readable text
    pub async fn fetch_and_parse(&self, url: &str) -> Result<FetchedContent, SearchKitError> {
        self.fetch_with_cancel(url, &CancellationToken::new()).await
    }

    /// Like [`fetch_and_parse`](Self::fetch_and_parse), aborting when
    /// `cancel` fires
    pub async fn fetch_with_cancel(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<FetchedContent, SearchKitError> {
        self.fetch_request(&FetchRequest::new(url), cancel).await
    }

    /// Fetch described by a [`FetchRequest`], honoring its text window
    pub async fn fetch_request(
        &self,
        request: &FetchRequest,
        cancel: &CancellationToken,
    ) -> Result<FetchedContent, SearchKitError> {
        let url = validate_url(&request.url)?;
        let start_index = request.start_index.unwrap_or(0);
        let max_length = request.max_length.unwrap_or(self.max_length);
        if max_length == 0 {
            return Err(SearchKitError::invalid("max_length must be at least 1"));
        }

        self.notifier
            .notify_info(&format!("Fetching content from: {}", url));

        let outcome = run_cancellable(cancel, self.download(url))
            .await
            .and_then(|page| extract(&request.url, page, start_index, max_length));

        match outcome {
            Ok(content) => {
                self.notifier.notify_info(&format!(
                    "Successfully fetched and parsed content ({} characters)",
                    content.total_length
                ));
                Ok(content)
            }
            Err(SearchKitError::Cancelled) => {
                self.notifier.notify_info("Fetch cancelled");
                Err(SearchKitError::Cancelled)
            }
            Err(e) => {
                self.notifier
                    .notify_error(&format!("Error fetching {}: {}", request.url, e));
                Err(e)
            }
        }
    }

    async fn download(&self, url: Url) -> Result<Page, SearchKitError> {
        debug!(url = %url, "Sending fetch request");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(SearchKitError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchKitError::BackendRejected {
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        if let Some(ct) = content_type.as_deref() {
            if is_binary_content_type(ct) {
                return Err(SearchKitError::ParseFailure(format!(
                    "binary content ({}) is not supported",
                    ct
                )));
            }
        }

        let (body, truncated) = read_body_capped(response, self.max_body_bytes).await?;

        Ok(Page {
            status_code: status.as_u16(),
            content_type,
            body,
            truncated,
        })
    }
}

/// Accept only absolute http(s) URLs with a host
fn validate_url(raw: &str) -> Result<Url, SearchKitError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(SearchKitError::invalid("url must not be empty"));
    }
    let url = Url::parse(raw).map_err(|e| SearchKitError::invalid(format!("invalid url: {}", e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(SearchKitError::invalid(
            "url must start with http:// or https://",
        ));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(SearchKitError::invalid("url must have a host"));
    }
    Ok(url)
}

/// Reduce a page to readable text and cut the requested window
fn extract(
    url: &str,
    page: Page,
    start_index: usize,
    max_length: usize,
) -> Result<FetchedContent, SearchKitError> {
    if page.body.contains(&0) {
        return Err(SearchKitError::ParseFailure(
            "response body is binary".to_string(),
        ));
    }

    let raw = String::from_utf8_lossy(&page.body);
    let text = if is_html(page.content_type.as_deref(), &raw) {
        html_to_text(&raw)
    } else {
        clean_whitespace(&raw)
    };

    if text.is_empty() {
        return Err(SearchKitError::ParseFailure(
            "no readable text in response".to_string(),
        ));
    }

    let total_length = text.chars().count();
    if start_index >= total_length {
        return Err(SearchKitError::invalid(format!(
            "start_index {} is beyond the end of the content ({} characters)",
            start_index, total_length
        )));
    }

    let content = char_window(&text, start_index, max_length).to_string();
    let window_end = start_index + content.chars().count();

    Ok(FetchedContent {
        url: url.to_string(),
        status_code: page.status_code,
        content_type: page.content_type,
        content,
        start_index,
        total_length,
        truncated: page.truncated || window_end < total_length,
    })
}
