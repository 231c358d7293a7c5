//! Search client for the DuckDuckGo HTML endpoint
//!
//! One call sends one form POST, parses `.result` blocks out of the
//! returned markup and hands back ranked [`SearchResult`]s. Redirect links
//! (`//duckduckgo.com/l/?uddg=...`) are unwrapped to their destination and
//! sponsored entries are dropped.

use crate::client::{build_http_client, read_body_capped, run_cancellable, DEFAULT_TIMEOUT};
use crate::convert::is_html;
use crate::error::SearchKitError;
use crate::notify::{default_notifier, Notifier};
use crate::types::{SearchRequest, SearchResult, MAX_SEARCH_RESULTS};
use reqwest::header::CONTENT_TYPE;
use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

/// Default search backend endpoint
pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://html.duckduckgo.com/html";

/// Rendered in place of an empty result list
pub const NO_RESULTS_MESSAGE: &str = "No results were found for your search query. This could be due to DuckDuckGo's bot detection or the query returned no matches. Please try rephrasing your search or try again in a few minutes.";

/// Search result pages are small; anything past this is not a result page
const MAX_SEARCH_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Builder for [`SearchClient`]
#[derive(Clone, Default)]
pub struct SearchClientBuilder {
    user_agent: Option<String>,
    timeout: Option<Duration>,
    endpoint: Option<String>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl SearchClientBuilder {
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

    /// Point the client at another backend endpoint
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the notice sink
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<SearchClient, SearchKitError> {
        let endpoint = self
            .endpoint
            .as_deref()
            .unwrap_or(DEFAULT_SEARCH_ENDPOINT);
        let endpoint = Url::parse(endpoint)
            .map_err(|e| SearchKitError::invalid(format!("invalid search endpoint: {}", e)))?;

        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        if timeout.is_zero() {
            return Err(SearchKitError::invalid("timeout must be non-zero"));
        }

        let http = build_http_client(
            self.user_agent.as_deref(),
            timeout,
            "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8",
        )?;

        Ok(SearchClient {
            http,
            endpoint,
            notifier: self.notifier.unwrap_or_else(default_notifier),
        })
    }
}

/// Client for the search backend
///
/// Holds no per-call state; share it freely between tasks.
#[derive(Clone)]
pub struct SearchClient {
    http: reqwest::Client,
    endpoint: Url,
    notifier: Arc<dyn Notifier>,
}

impl SearchClient {
    /// Create a new client builder
    pub fn builder() -> SearchClientBuilder {
        SearchClientBuilder::new()
    }

    /// Backend endpoint this client posts to
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Search for `query`, returning at most `max_results` results
    pub async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, SearchKitError> {
        self.search_with_cancel(query, max_results, &CancellationToken::new())
            .await
    }

    /// Like [`search`](Self::search), aborting when `cancel` fires
    pub async fn search_with_cancel(
        &self,
        query: &str,
        max_results: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<SearchResult>, SearchKitError> {
        let request = SearchRequest::new(query).max_results(max_results);
        self.search_request(&request, cancel).await
    }

    /// Run a search described by a [`SearchRequest`]
    ///
    /// `max_results` above [`MAX_SEARCH_RESULTS`] is clamped. An empty
    /// result list is a success and is reported through the notifier.
    pub async fn search_request(
        &self,
        request: &SearchRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<SearchResult>, SearchKitError> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(SearchKitError::invalid("query must not be empty"));
        }
        let requested = request.effective_max_results();
        if requested == 0 {
            return Err(SearchKitError::invalid("max_results must be at least 1"));
        }
        let max_results = requested.min(MAX_SEARCH_RESULTS);
        if max_results < requested {
            warn!(requested, max_results, "Clamping max_results");
        }

        self.notifier
            .notify_info(&format!("Searching DuckDuckGo for: {}", query));

        let outcome = run_cancellable(cancel, self.post_query(query, request.region.as_deref()))
            .await
            .and_then(|(content_type, body)| {
                parse_search_page(content_type.as_deref(), &body, max_results)
            });

        match outcome {
            Ok(results) if results.is_empty() => {
                self.notifier
                    .notify_info(&format!("No results found for: {}", query));
                Ok(results)
            }
            Ok(results) => {
                self.notifier.notify_info(&format!(
                    "Successfully found {} results",
                    results.len()
                ));
                Ok(results)
            }
            Err(SearchKitError::Cancelled) => {
                self.notifier.notify_info("Search cancelled");
                Err(SearchKitError::Cancelled)
            }
            Err(e) => {
                self.notifier.notify_error(&format!("Search failed: {}", e));
                Err(e)
            }
        }
    }

    /// Send the form POST and return the content type and body text
    async fn post_query(
        &self,
        query: &str,
        region: Option<&str>,
    ) -> Result<(Option<String>, String), SearchKitError> {
        let form = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("q", query)
            .append_pair("b", "")
            .append_pair("kl", region.unwrap_or(""))
            .finish();

        debug!(endpoint = %self.endpoint, query, "Sending search request");

        let response = self
            .http
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(form)
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

        let (body, truncated) = read_body_capped(response, MAX_SEARCH_BODY_BYTES).await?;
        if truncated {
            warn!(limit = MAX_SEARCH_BODY_BYTES, "Search response exceeded size cap");
            self.notifier.notify_info(&format!(
                "Search response exceeded {} bytes; results may be incomplete",
                MAX_SEARCH_BODY_BYTES
            ));
        }

        Ok((content_type, String::from_utf8_lossy(&body).into_owned()))
    }
}

/// Validate and parse a search response body
fn parse_search_page(
    content_type: Option<&str>,
    body: &str,
    max_results: usize,
) -> Result<Vec<SearchResult>, SearchKitError> {
    if body.trim().is_empty() {
        return Err(SearchKitError::ParseFailure(
            "empty search response".to_string(),
        ));
    }
    if !is_html(content_type, body) && !body.contains('<') {
        return Err(SearchKitError::ParseFailure(format!(
            "expected HTML search results, got {}",
            content_type.unwrap_or("unknown content type")
        )));
    }
    parse_results(body, max_results)
}

fn selector(css: &'static str) -> Result<Selector, SearchKitError> {
    Selector::parse(css)
        .map_err(|e| SearchKitError::ParseFailure(format!("invalid selector {}: {}", css, e)))
}

/// Extract up to `max_results` results from a DuckDuckGo HTML page
///
/// Positions are assigned after filtering, so they always run `1..=len`.
pub(crate) fn parse_results(
    html: &str,
    max_results: usize,
) -> Result<Vec<SearchResult>, SearchKitError> {
    let result_sel = selector(".result")?;
    let link_sel = selector(".result__title a, a.result__a")?;
    let snippet_sel = selector(".result__snippet")?;

    // `Html` is !Send; keep it inside this synchronous scope
    let doc = Html::parse_document(html);
    let mut results = Vec::new();

    for block in doc.select(&result_sel) {
        if results.len() >= max_results {
            break;
        }

        if block
            .value()
            .classes()
            .any(|class| class == "result--ad")
        {
            continue;
        }

        let Some(anchor) = block.select(&link_sel).next() else {
            continue;
        };
        let href = anchor.value().attr("href").unwrap_or("");
        if href.contains("y.js") {
            debug!(href, "Skipping sponsored result");
            continue;
        }

        let title = element_text(&anchor);
        if title.is_empty() {
            continue;
        }

        let Some(link) = resolve_link(href) else {
            debug!(href, "Skipping result with unusable link");
            continue;
        };

        let snippet = block
            .select(&snippet_sel)
            .next()
            .map(|el| element_text(&el))
            .unwrap_or_default();

        results.push(SearchResult {
            position: results.len() + 1,
            title,
            link,
            snippet,
        });
    }

    Ok(results)
}

/// Text content of an element with whitespace collapsed
fn element_text(el: &ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Turn a result href into an absolute http(s) URL
///
/// Unwraps DuckDuckGo redirect links to the `uddg` destination.
fn resolve_link(href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let absolute = if let Some(rest) = href.strip_prefix("//") {
        format!("https://{}", rest)
    } else if href.starts_with('/') {
        format!("https://duckduckgo.com{}", href)
    } else {
        href.to_string()
    };

    let parsed = Url::parse(&absolute).ok()?;
    let is_redirect = parsed
        .host_str()
        .is_some_and(|host| host == "duckduckgo.com" || host.ends_with(".duckduckgo.com"))
        && parsed.path().starts_with("/l/");

    let (candidate, target) = if is_redirect {
        let destination = parsed
            .query_pairs()
            .find(|(key, _)| key == "uddg")
            .map(|(_, value)| value.into_owned())?;
        let target = Url::parse(&destination).ok()?;
        (destination, target)
    } else {
        (absolute, parsed)
    };

    matches!(target.scheme(), "http" | "https").then_some(candidate)
}

/// Render results as a prompt-ready block of text
///
/// Deterministic and infallible; an empty slice renders
/// [`NO_RESULTS_MESSAGE`].
pub fn format_results_for_llm(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return NO_RESULTS_MESSAGE.to_string();
    }

    let mut output = format!("Found {} search results:\n\n", results.len());
    for result in results {
        let title = if result.title.trim().is_empty() {
            "(untitled)"
        } else {
            result.title.as_str()
        };
        output.push_str(&format!("{}. {}\n", result.position, title));
        output.push_str(&format!("   URL: {}\n", result.link));
        output.push_str(&format!("   Summary: {}\n\n", result.snippet));
    }

    output.truncate(output.trim_end().len());
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_block(href: &str, title: &str, snippet: &str) -> String {
        format!(
            r#"<div class="result results_links web-result">
  <div class="links_main result__body">
    <h2 class="result__title"><a rel="nofollow" class="result__a" href="{href}">{title}</a></h2>
    <a class="result__snippet" href="{href}">{snippet}</a>
  </div>
</div>"#
        )
    }

    fn page(blocks: &[String]) -> String {
        format!(
            "<!DOCTYPE html><html><body><div id=\"links\">{}</div></body></html>",
            blocks.concat()
        )
    }

    #[test]
    fn test_parse_results_basic() {
        let html = page(&[
            result_block("https://www.python.org/", "Welcome to Python.org", "The official home"),
            result_block("https://docs.python.org/3/", "Python docs", "Documentation"),
        ]);

        let results = parse_results(&html, 10).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].position, 1);
        assert_eq!(results[0].title, "Welcome to Python.org");
        assert_eq!(results[0].link, "https://www.python.org/");
        assert_eq!(results[0].snippet, "The official home");
        assert_eq!(results[1].position, 2);
    }

    #[test]
    fn test_parse_results_truncates() {
        let blocks: Vec<String> = (1..=5)
            .map(|i| result_block(&format!("https://example.com/{i}"), &format!("Item {i}"), ""))
            .collect();

        let results = parse_results(&page(&blocks), 3).unwrap();
        let titles: Vec<&str> = results.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Item 1", "Item 2", "Item 3"]);
        let positions: Vec<usize> = results.iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![1, 2, 3]);
    }

    #[test]
    fn test_parse_results_unwraps_redirects() {
        let href = "//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.rust-lang.org%2Flearn&amp;rut=abc123";
        let html = page(&[result_block(href, "Learn Rust", "Get started")]);

        let results = parse_results(&html, 5).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].link, "https://www.rust-lang.org/learn");
    }

    #[test]
    fn test_parse_results_skips_ads_and_renumbers() {
        let html = page(&[
            result_block(
                "https://duckduckgo.com/y.js?ad_provider=bing&u3=x",
                "Sponsored",
                "Buy now",
            ),
            result_block("https://example.com/a", "Organic A", "first"),
            result_block("", "No link", "skipped"),
            result_block("https://example.com/b", "Organic B", "second"),
        ]);

        let results = parse_results(&html, 10).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Organic A");
        assert_eq!(results[0].position, 1);
        assert_eq!(results[1].title, "Organic B");
        assert_eq!(results[1].position, 2);
    }

    #[test]
    fn test_parse_results_collapses_whitespace() {
        let html = page(&[result_block(
            "https://example.com",
            "  Rust  <b>Programming</b>\n Language ",
            "A language   empowering\n everyone",
        )]);

        let results = parse_results(&html, 1).unwrap();
        assert_eq!(results[0].title, "Rust Programming Language");
        assert_eq!(results[0].snippet, "A language empowering everyone");
    }

    #[test]
    fn test_parse_results_missing_snippet() {
        let html = page(&[r#"<div class="result"><h2 class="result__title"><a href="https://example.com">Bare</a></h2></div>"#.to_string()]);
        let results = parse_results(&html, 5).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].snippet, "");
    }

    #[test]
    fn test_parse_results_no_matches() {
        let html = "<html><body><div class=\"no-results\">No results.</div></body></html>";
        assert!(parse_results(html, 5).unwrap().is_empty());
    }

    #[test]
    fn test_parse_search_page_rejects_non_html() {
        assert!(matches!(
            parse_search_page(Some("application/json"), "{\"ok\": true}", 5),
            Err(SearchKitError::ParseFailure(_))
        ));
        assert!(matches!(
            parse_search_page(Some("text/html"), "   ", 5),
            Err(SearchKitError::ParseFailure(_))
        ));
    }

    #[test]
    fn test_resolve_link() {
        assert_eq!(
            resolve_link("https://example.com/page"),
            Some("https://example.com/page".to_string())
        );
        assert_eq!(
            resolve_link("//example.com/page"),
            Some("https://example.com/page".to_string())
        );
        assert_eq!(
            resolve_link("https://duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.org%2F%3Fa%3D1&rut=x"),
            Some("https://example.org/?a=1".to_string())
        );
        assert_eq!(resolve_link("javascript:void(0)"), None);
        assert_eq!(resolve_link("//duckduckgo.com/l/?rut=x"), None);
        assert_eq!(resolve_link(""), None);
    }

    #[test]
    fn test_format_results_empty() {
        assert_eq!(format_results_for_llm(&[]), NO_RESULTS_MESSAGE);
    }

    #[test]
    fn test_format_results_layout() {
        let results = vec![
            SearchResult {
                position: 1,
                title: "Rust".to_string(),
                link: "https://www.rust-lang.org".to_string(),
                snippet: "A language empowering everyone".to_string(),
            },
            SearchResult {
                position: 2,
                title: String::new(),
                link: "https://crates.io".to_string(),
                snippet: String::new(),
            },
        ];

        let output = format_results_for_llm(&results);
        assert_eq!(
            output,
            "Found 2 search results:\n\n\
             1. Rust\n   URL: https://www.rust-lang.org\n   Summary: A language empowering everyone\n\n\
             2. (untitled)\n   URL: https://crates.io\n   Summary:"
        );
        // Same input, same output
        assert_eq!(output, format_results_for_llm(&results));
    }

    #[test]
    fn test_builder_rejects_bad_endpoint() {
        let result = SearchClient::builder().endpoint("not a url").build();
        assert!(matches!(result, Err(SearchKitError::InvalidArgument(_))));
    }

    #[test]
    fn test_builder_rejects_zero_timeout() {
        let result = SearchClient::builder().timeout(Duration::ZERO).build();
        assert!(matches!(result, Err(SearchKitError::InvalidArgument(_))));
    }
}
