//! SearchKit CLI - Command-line interface for web search and content fetching

mod mcp;

use clap::{Parser, Subcommand, ValueEnum};
use searchkit::{
    format_content_for_llm, format_results_for_llm, CancellationToken, FetchRequest,
    FetchedContent, SearchKitError, SearchRequest, Toolkit, TOOL_LLMTXT,
};
use std::io::{self, Write};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Output format for search and fetch subcommands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum OutputFormat {
    /// LLM-ready text (markdown frontmatter for fetch)
    #[default]
    Md,
    /// JSON format
    Json,
}

/// SearchKit - AI-friendly web search and fetching tool
#[derive(Parser, Debug)]
#[command(name = "searchkit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Print full help with examples (llmtxt)
    #[arg(long)]
    llmtxt: bool,

    /// Custom User-Agent
    #[arg(long, global = true)]
    user_agent: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true, default_value_t = 30)]
    timeout_secs: u64,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run as MCP (Model Context Protocol) server over stdio
    Mcp,
    /// Search the web and print ranked results
    Search {
        /// Search query
        query: String,

        /// Maximum number of results (1-50)
        #[arg(long, default_value_t = searchkit::DEFAULT_MAX_RESULTS)]
        max_results: usize,

        /// Region code, e.g. us-en
        #[arg(long)]
        region: Option<String>,

        /// Output format
        #[arg(long, short, default_value = "md")]
        output: OutputFormat,
    },
    /// Fetch URL and output its readable text with metadata frontmatter
    Fetch {
        /// URL to fetch
        url: String,

        /// Character offset to start from
        #[arg(long, default_value_t = 0)]
        start_index: usize,

        /// Maximum characters to return
        #[arg(long, default_value_t = searchkit::DEFAULT_MAX_LENGTH)]
        max_length: usize,

        /// Output format
        #[arg(long, short, default_value = "md")]
        output: OutputFormat,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    // Handle --llmtxt flag
    if cli.llmtxt {
        writeln_safe(TOOL_LLMTXT);
        std::process::exit(0);
    }

    let toolkit = match build_toolkit(cli.user_agent, cli.timeout_secs) {
        Ok(toolkit) => toolkit,
        Err(e) => exit_with_error(&e),
    };

    match cli.command {
        Some(Commands::Mcp) => {
            mcp::run_server(toolkit).await;
        }
        Some(Commands::Search {
            query,
            max_results,
            region,
            output,
        }) => {
            let mut request = SearchRequest::new(query).max_results(max_results);
            if let Some(region) = region {
                request = request.region(region);
            }
            run_search(&toolkit, request, output).await;
        }
        Some(Commands::Fetch {
            url,
            start_index,
            max_length,
            output,
        }) => {
            let request = FetchRequest::new(url)
                .start_index(start_index)
                .max_length(max_length);
            run_fetch(&toolkit, request, output).await;
        }
        None => {
            eprintln!("Usage: searchkit search <QUERY>");
            eprintln!("   or: searchkit fetch <URL>");
            eprintln!("   or: searchkit mcp");
            eprintln!("   or: searchkit --help");
            std::process::exit(1);
        }
    }
}

fn build_toolkit(
    user_agent: Option<String>,
    timeout_secs: u64,
) -> Result<Toolkit, SearchKitError> {
    let mut builder = Toolkit::builder().timeout(Duration::from_secs(timeout_secs));
    if let Some(ua) = user_agent {
        builder = builder.user_agent(ua);
    }
    builder.build()
}

async fn run_search(toolkit: &Toolkit, request: SearchRequest, output: OutputFormat) {
    let results = match toolkit
        .search_client()
        .search_request(&request, &CancellationToken::new())
        .await
    {
        Ok(results) => results,
        Err(e) => exit_with_error(&e),
    };

    match output {
        OutputFormat::Md => writeln_safe(&format_results_for_llm(&results)),
        OutputFormat::Json => writeln_safe(&to_json(&results)),
    }
}

async fn run_fetch(toolkit: &Toolkit, request: FetchRequest, output: OutputFormat) {
    let content = match toolkit
        .fetcher()
        .fetch_request(&request, &CancellationToken::new())
        .await
    {
        Ok(content) => content,
        Err(e) => exit_with_error(&e),
    };

    match output {
        OutputFormat::Md => writeln_safe(&format_md_with_frontmatter(&content)),
        OutputFormat::Json => writeln_safe(&to_json(&content)),
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        eprintln!("Error serializing response: {}", e);
        std::process::exit(1);
    })
}

/// Format fetched content as markdown with YAML frontmatter
fn format_md_with_frontmatter(content: &FetchedContent) -> String {
    let mut output = String::new();

    output.push_str("---\n");
    output.push_str(&format!("url: {}\n", content.url));
    output.push_str(&format!("status_code: {}\n", content.status_code));
    if let Some(ref ct) = content.content_type {
        output.push_str(&format!("source_content_type: {}\n", ct));
    }
    output.push_str(&format!("total_length: {}\n", content.total_length));
    if content.start_index > 0 {
        output.push_str(&format!("start_index: {}\n", content.start_index));
    }
    if content.truncated {
        output.push_str("truncated: true\n");
    }
    output.push_str("---\n");
    output.push_str(&format_content_for_llm(content));

    output
}

fn exit_with_error(err: &SearchKitError) -> ! {
    eprintln!("Error: {}", err);
    std::process::exit(1);
}

/// Write to stdout, exit silently on broken pipe
fn writeln_safe(s: &str) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", s) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        eprintln!("Error writing to stdout: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_search() {
        let cli = Cli::try_parse_from([
            "searchkit",
            "search",
            "rust async",
            "--max-results",
            "3",
            "--region",
            "us-en",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Search {
                query,
                max_results,
                region,
                ..
            }) => {
                assert_eq!(query, "rust async");
                assert_eq!(max_results, 3);
                assert_eq!(region.as_deref(), Some("us-en"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_parses_fetch_defaults() {
        let cli = Cli::try_parse_from(["searchkit", "fetch", "https://example.com"]).unwrap();
        assert_eq!(cli.timeout_secs, 30);

        match cli.command {
            Some(Commands::Fetch {
                url,
                start_index,
                max_length,
                ..
            }) => {
                assert_eq!(url, "https://example.com");
                assert_eq!(start_index, 0);
                assert_eq!(max_length, searchkit::DEFAULT_MAX_LENGTH);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_format_md_basic() {
        let content = FetchedContent {
            url: "https://example.com".to_string(),
            status_code: 200,
            content_type: Some("text/html".to_string()),
            content: "Hello World".to_string(),
            total_length: 11,
            ..Default::default()
        };

        let output = format_md_with_frontmatter(&content);

        assert!(output.starts_with("---\n"));
        assert!(output.contains("url: https://example.com\n"));
        assert!(output.contains("status_code: 200\n"));
        assert!(output.contains("source_content_type: text/html\n"));
        assert!(output.contains("total_length: 11\n"));
        assert!(output.ends_with("---\nHello World"));
    }

    #[test]
    fn test_format_md_truncated_window() {
        let content = FetchedContent {
            url: "https://example.com/long".to_string(),
            status_code: 200,
            content: "abc".to_string(),
            start_index: 3,
            total_length: 9,
            truncated: true,
            ..Default::default()
        };

        let output = format_md_with_frontmatter(&content);

        assert!(output.contains("start_index: 3\n"));
        assert!(output.contains("truncated: true\n"));
        assert!(output.contains("start_index=6"));
    }

    #[test]
    fn test_format_md_untruncated_omits_flags() {
        let content = FetchedContent {
            url: "https://example.com".to_string(),
            status_code: 200,
            content: "Content".to_string(),
            total_length: 7,
            ..Default::default()
        };

        let output = format_md_with_frontmatter(&content);

        assert!(!output.contains("truncated"));
        assert!(!output.contains("start_index"));
    }
}
