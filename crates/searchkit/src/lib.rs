//! SearchKit - AI-friendly web search and content fetching library
//!
//! This crate provides two independent clients:
//!
//! - [`SearchClient`] queries the DuckDuckGo HTML endpoint and parses ranked
//!   [`SearchResult`]s, which [`format_results_for_llm`] renders for prompts.
//! - [`ContentFetcher`] retrieves a URL and extracts bounded, readable text.
//!
//! Both are built explicitly, report progress through an injected
//! [`Notifier`], honor a caller-supplied cancellation token and return a
//! [`SearchKitError`] instead of error strings. Neither retries.

pub mod client;
mod convert;
mod error;
mod fetch;
mod notify;
mod search;
mod tool;
mod types;

pub use client::{fetch, search};
pub use convert::html_to_text;
pub use error::{ErrorKind, SearchKitError};
pub use fetch::{ContentFetcher, ContentFetcherBuilder};
pub use notify::{NoopNotifier, Notifier, TracingNotifier};
pub use search::{format_results_for_llm, SearchClient, SearchClientBuilder, NO_RESULTS_MESSAGE};
pub use tokio_util::sync::CancellationToken;
pub use tool::{format_content_for_llm, Toolkit, ToolkitBuilder};
pub use types::{
    FetchRequest, FetchedContent, SearchRequest, SearchResult, DEFAULT_MAX_LENGTH,
    DEFAULT_MAX_RESULTS, MAX_SEARCH_RESULTS,
};

/// Default User-Agent string
///
/// The search backend serves an error page to obvious bots, so this mimics
/// a desktop browser.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Search tool description for LLM consumption
pub const SEARCH_TOOL_DESCRIPTION: &str = r#"Searches the web with DuckDuckGo and returns ranked results.

- Each result has a position, title, URL and summary
- Returns at most max_results results (default 10, max 50)
- An empty result list means no matches or the engine blocked the request"#;

/// Fetch tool description for LLM consumption
pub const FETCH_TOOL_DESCRIPTION: &str = r#"Fetches a web page and returns its readable text.

- Strips scripts, styles, navigation, headers and footers
- Returns at most max_length characters (default 8000)
- Use start_index to page through long documents"#;

/// Extended documentation for LLM consumption (llmtxt)
pub const TOOL_LLMTXT: &str = r#"# SearchKit Tools

Web search and readable page fetching for language models.

## search

Searches DuckDuckGo and returns formatted results.

### Input Parameters
- `query` (required): The search query
- `max_results` (optional): Number of results, 1-50 (default: 10)
- `region` (optional): Region code such as "us-en" or "de-de"

### Output
```
Found 2 search results:

1. Title of first result
   URL: https://example.com/
   Summary: Snippet text

2. ...
```

## fetch_content

Fetches a URL and returns its readable text.

### Input Parameters
- `url` (required): The URL to fetch (must be http:// or https://)
- `start_index` (optional): Character offset to start from (default: 0)
- `max_length` (optional): Maximum characters to return (default: 8000)

### Output
Plain text. When more text remains, a trailing note gives the
`start_index` to request next.

## Examples

### Search
```json
{"query": "rust async runtime", "max_results": 5}
```

### Fetch a page
```json
{"url": "https://example.com"}
```

### Read the next part of a long page
```json
{"url": "https://example.com/long", "start_index": 8000}
```

## Error Handling
- Empty queries and invalid URLs are rejected before any request
- Non-success HTTP status, timeouts and unreadable bodies return an error
- Binary content (images, PDFs, archives) is not supported
"#;
