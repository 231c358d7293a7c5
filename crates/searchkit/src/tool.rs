//! Tool builder and contract for SearchKit
//!
//! [`Toolkit`] pairs a [`SearchClient`] with a [`ContentFetcher`] and renders
//! their output as LLM-ready text, the way the CLI and MCP server expose
//! them as the `search` and `fetch_content` tools.

use crate::error::SearchKitError;
use crate::fetch::ContentFetcher;
use crate::notify::Notifier;
use crate::search::{format_results_for_llm, SearchClient};
use crate::types::{FetchRequest, FetchedContent, SearchRequest};
use crate::{FETCH_TOOL_DESCRIPTION, SEARCH_TOOL_DESCRIPTION, TOOL_LLMTXT};
use schemars::schema_for;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Builder for configuring a [`Toolkit`]
#[derive(Clone, Default)]
pub struct ToolkitBuilder {
    /// Custom User-Agent
    user_agent: Option<String>,
    /// Request timeout for both tools
    timeout: Option<Duration>,
    /// Search backend endpoint override
    search_endpoint: Option<String>,
    /// Cap on body bytes per fetch
    max_body_bytes: Option<usize>,
    /// Notice sink shared by both clients
    notifier: Option<Arc<dyn Notifier>>,
}

impl ToolkitBuilder {
    /// Create a new toolkit builder
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

    /// Point searches at another backend endpoint
    pub fn search_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.search_endpoint = Some(endpoint.into());
        self
    }

    /// Set the cap on body bytes per fetch
    pub fn max_body_bytes(mut self, bytes: usize) -> Self {
        self.max_body_bytes = Some(bytes);
        self
    }

    /// Set the notice sink
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Build the toolkit
    pub fn build(self) -> Result<Toolkit, SearchKitError> {
        let mut search = SearchClient::builder();
        let mut fetch = ContentFetcher::builder();

        if let Some(ua) = self.user_agent {
            search = search.user_agent(ua.clone());
            fetch = fetch.user_agent(ua);
        }
        if let Some(timeout) = self.timeout {
            search = search.timeout(timeout);
            fetch = fetch.timeout(timeout);
        }
        if let Some(endpoint) = self.search_endpoint {
            search = search.endpoint(endpoint);
        }
        if let Some(bytes) = self.max_body_bytes {
            fetch = fetch.max_body_bytes(bytes);
        }
        if let Some(notifier) = self.notifier {
            search = search.notifier(Arc::clone(&notifier));
            fetch = fetch.notifier(notifier);
        }

        Ok(Toolkit {
            search: search.build()?,
            fetcher: fetch.build()?,
        })
    }
}

/// Configured search and fetch tools
#[derive(Clone)]
pub struct Toolkit {
    search: SearchClient,
    fetcher: ContentFetcher,
}

impl Toolkit {
    /// Create a new toolkit builder
    pub fn builder() -> ToolkitBuilder {
        ToolkitBuilder::new()
    }

    /// Underlying search client
    pub fn search_client(&self) -> &SearchClient {
        &self.search
    }

    /// Underlying content fetcher
    pub fn fetcher(&self) -> &ContentFetcher {
        &self.fetcher
    }

    /// Get search tool description
    pub fn search_description(&self) -> &'static str {
        SEARCH_TOOL_DESCRIPTION
    }

    /// Get fetch tool description
    pub fn fetch_description(&self) -> &'static str {
        FETCH_TOOL_DESCRIPTION
    }

    /// Get full documentation (llmtxt)
    pub fn llmtxt(&self) -> &'static str {
        TOOL_LLMTXT
    }

    /// Get search input schema as JSON
    pub fn search_input_schema(&self) -> serde_json::Value {
        serde_json::to_value(schema_for!(SearchRequest)).unwrap_or_default()
    }

    /// Get fetch input schema as JSON
    pub fn fetch_input_schema(&self) -> serde_json::Value {
        serde_json::to_value(schema_for!(FetchRequest)).unwrap_or_default()
    }

    /// Run a search and render the results for an LLM
    pub async fn execute_search(
        &self,
        req: SearchRequest,
        cancel: &CancellationToken,
    ) -> Result<String, SearchKitError> {
        let results = self.search.search_request(&req, cancel).await?;
        Ok(format_results_for_llm(&results))
    }

    /// Fetch a page and render its text window for an LLM
    pub async fn execute_fetch(
        &self,
        req: FetchRequest,
        cancel: &CancellationToken,
    ) -> Result<String, SearchKitError> {
        let content = self.fetcher.fetch_request(&req, cancel).await?;
        Ok(format_content_for_llm(&content))
    }
}

/// Render fetched text, with a continuation hint when more text remains
pub fn format_content_for_llm(content: &FetchedContent) -> String {
    let mut output = content.content.clone();
    if let Some(next) = content.next_start_index() {
        output.push_str(&format!(
            "\n\n[Content truncated: showing characters {}-{} of {}. Use start_index={} to read more.]",
            content.start_index, next, content.total_length, next
        ));
    } else if content.truncated {
        output.push_str("\n\n[Content truncated: page exceeded the download size limit.]");
    }
    output
}
