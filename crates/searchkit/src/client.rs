//! HTTP plumbing shared by the search and fetch clients
//!
//! This module also provides one-shot entry points, [`search`] and
//! [`fetch`], that construct a default client per call. Long-lived callers
//! should build a [`SearchClient`] or [`ContentFetcher`] once and reuse it.

use crate::error::SearchKitError;
use crate::fetch::ContentFetcher;
use crate::search::SearchClient;
use crate::types::{FetchRequest, FetchedContent, SearchRequest, SearchResult};
use crate::DEFAULT_USER_AGENT;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Default request timeout (connect + full body)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on the connect phase
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Search with a freshly built default [`SearchClient`]
pub async fn search(req: SearchRequest) -> Result<Vec<SearchResult>, SearchKitError> {
    let client = SearchClient::builder().build()?;
    client
        .search_request(&req, &CancellationToken::new())
        .await
}

/// Fetch with a freshly built default [`ContentFetcher`]
pub async fn fetch(req: FetchRequest) -> Result<FetchedContent, SearchKitError> {
    let fetcher = ContentFetcher::builder().build()?;
    fetcher.fetch_request(&req, &CancellationToken::new()).await
}

/// Build a reqwest client with identification headers and a finite timeout
pub(crate) fn build_http_client(
    user_agent: Option<&str>,
    timeout: Duration,
    accept: &'static str,
) -> Result<reqwest::Client, SearchKitError> {
    let mut headers = HeaderMap::new();
    let user_agent = user_agent.unwrap_or(DEFAULT_USER_AGENT);
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(user_agent)
            .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_USER_AGENT)),
    );
    headers.insert(ACCEPT, HeaderValue::from_static(accept));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

    reqwest::Client::builder()
        .default_headers(headers)
        .connect_timeout(timeout.min(CONNECT_TIMEOUT))
        .timeout(timeout)
        .build()
        .map_err(SearchKitError::ClientBuild)
}

/// Drive `fut` to completion unless `cancel` fires first
///
/// An already-cancelled token wins without polling `fut`, so no request is
/// sent. Cancelling mid-flight drops the request future, aborting it.
pub(crate) async fn run_cancellable<T, F>(
    cancel: &CancellationToken,
    fut: F,
) -> Result<T, SearchKitError>
where
    F: Future<Output = Result<T, SearchKitError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SearchKitError::Cancelled),
        result = fut => result,
    }
}

/// Read a response body, stopping at `limit` bytes
///
/// Returns the body and whether it was cut short.
pub(crate) async fn read_body_capped(
    response: reqwest::Response,
    limit: usize,
) -> Result<(Bytes, bool), SearchKitError> {
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(SearchKitError::from_reqwest)?;
        if body.len() + chunk.len() > limit {
            let take = limit - body.len();
            body.extend_from_slice(&chunk[..take]);
            warn!(limit, "Response body exceeds size cap, truncating");
            return Ok((Bytes::from(body), true));
        }
        body.extend_from_slice(&chunk);
    }

    Ok((Bytes::from(body), false))
}
