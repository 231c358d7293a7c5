//! Core types for SearchKit

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default number of results returned by a search
pub const DEFAULT_MAX_RESULTS: usize = 10;

/// Upper bound applied to `max_results`; larger values are clamped
pub const MAX_SEARCH_RESULTS: usize = 50;

/// Default length of the text window returned by a fetch, in characters
pub const DEFAULT_MAX_LENGTH: usize = 8000;

/// One parsed search hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SearchResult {
    /// 1-based rank in order of appearance
    pub position: usize,
    /// Result title
    pub title: String,
    /// Absolute destination URL
    pub link: String,
    /// Text excerpt (may be empty)
    pub snippet: String,
}

/// Search tool input
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SearchRequest {
    /// The search query (required, non-empty)
    pub query: String,

    /// Maximum number of results to return (optional, default 10, at most 50)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<usize>,

    /// Region code such as "us-en" or "de-de" (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl SearchRequest {
    /// Create a new request with the given query
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    /// Set the maximum number of results
    pub fn max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }

    /// Set the region code
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Requested result count, defaulting when unset
    pub fn effective_max_results(&self) -> usize {
        self.max_results.unwrap_or(DEFAULT_MAX_RESULTS)
    }
}

/// Fetch tool input
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct FetchRequest {
    /// The URL to fetch (required, must be http:// or https://)
    pub url: String,

    /// Character offset into the extracted text (optional, default 0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_index: Option<usize>,

    /// Maximum number of characters to return (optional, default 8000)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

impl FetchRequest {
    /// Create a new request with the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the start offset
    pub fn start_index(mut self, start_index: usize) -> Self {
        self.start_index = Some(start_index);
        self
    }

    /// Set the window length
    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }
}

/// Readable text extracted from a fetched page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FetchedContent {
    /// The fetched URL
    pub url: String,

    /// HTTP status code
    pub status_code: u16,

    /// Content-Type header value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// Extracted text window
    pub content: String,

    /// Character offset of `content` within the full extracted text
    pub start_index: usize,

    /// Character length of the full extracted text
    pub total_length: usize,

    /// True if text follows this window or the body exceeded the size cap
    pub truncated: bool,
}

impl FetchedContent {
    /// Offset to request for the next window, if any text remains
    pub fn next_start_index(&self) -> Option<usize> {
        let end = self.start_index + self.content.chars().count();
        (end < self.total_length).then_some(end)
    }
}
