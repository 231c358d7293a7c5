//! MCP (Model Context Protocol) server implementation

use searchkit::{CancellationToken, FetchRequest, SearchRequest, Toolkit};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::time::Instant;
use tracing::{debug, warn};

/// Search calls allowed per minute
const SEARCH_REQUESTS_PER_MINUTE: usize = 30;

/// Fetch calls allowed per minute
const FETCH_REQUESTS_PER_MINUTE: usize = 20;

const SEARCH_TOOL: &str = "search";
const FETCH_TOOL: &str = "fetch_content";

/// JSON-RPC 2.0 request
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct JsonRpcRequest {
    jsonrpc: String,
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

/// JSON-RPC 2.0 response
#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error
#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl JsonRpcResponse {
    fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

/// Sliding-window limiter over the last `window` of calls
struct RateLimiter {
    max_requests: usize,
    window: Duration,
    calls: VecDeque<Instant>,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            calls: VecDeque::with_capacity(max_requests),
        }
    }

    fn per_minute(max_requests: usize) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }

    /// Wait until a call is allowed, then record it
    async fn acquire(&mut self) {
        loop {
            let now = Instant::now();
            while self
                .calls
                .front()
                .is_some_and(|&t| now.duration_since(t) >= self.window)
            {
                self.calls.pop_front();
            }

            if self.calls.len() < self.max_requests {
                self.calls.push_back(now);
                return;
            }

            if let Some(&oldest) = self.calls.front() {
                let wait = self.window - now.duration_since(oldest);
                debug!(wait_ms = wait.as_millis() as u64, "Rate limit reached, waiting");
                tokio::time::sleep(wait).await;
            }
        }
    }
}

/// Tool call outcome rendered as MCP content
fn tool_result(outcome: Result<String, searchkit::SearchKitError>) -> Value {
    match outcome {
        Ok(text) => json!({
            "content": [{
                "type": "text",
                "text": text
            }]
        }),
        Err(e) => json!({
            "content": [{
                "type": "text",
                "text": format!("Error: {}", e)
            }],
            "isError": true
        }),
    }
}

/// MCP Server implementation
struct McpServer {
    toolkit: Toolkit,
    search_limiter: RateLimiter,
    fetch_limiter: RateLimiter,
}

impl McpServer {
    fn new(toolkit: Toolkit) -> Self {
        Self {
            toolkit,
            search_limiter: RateLimiter::per_minute(SEARCH_REQUESTS_PER_MINUTE),
            fetch_limiter: RateLimiter::per_minute(FETCH_REQUESTS_PER_MINUTE),
        }
    }

    async fn handle_request(&mut self, request: JsonRpcRequest) -> JsonRpcResponse {
        match request.method.as_str() {
            "initialize" => self.handle_initialize(request.id),
            "tools/list" => self.handle_tools_list(request.id),
            "tools/call" => self.handle_tools_call(request.id, request.params).await,
            "ping" => JsonRpcResponse::success(request.id, json!({})),
            "notifications/initialized" => {
                // This is a notification, no response needed
                JsonRpcResponse::success(request.id, json!(null))
            }
            _ => JsonRpcResponse::error(
                request.id,
                -32601,
                format!("Method not found: {}", request.method),
            ),
        }
    }

    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {
                    "tools": {}
                },
                "serverInfo": {
                    "name": "searchkit",
                    "version": env!("CARGO_PKG_VERSION")
                }
            }),
        )
    }

    fn handle_tools_list(&self, id: Option<Value>) -> JsonRpcResponse {
        JsonRpcResponse::success(
            id,
            json!({
                "tools": [
                    {
                        "name": SEARCH_TOOL,
                        "description": self.toolkit.search_description(),
                        "inputSchema": self.toolkit.search_input_schema()
                    },
                    {
                        "name": FETCH_TOOL,
                        "description": self.toolkit.fetch_description(),
                        "inputSchema": self.toolkit.fetch_input_schema()
                    }
                ]
            }),
        )
    }

    async fn handle_tools_call(&mut self, id: Option<Value>, params: Value) -> JsonRpcResponse {
        let tool_name = params
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let arguments = params.get("arguments").cloned().unwrap_or(json!({}));
        let cancel = CancellationToken::new();

        let outcome = match tool_name.as_str() {
            SEARCH_TOOL => {
                let request: SearchRequest = match serde_json::from_value(arguments) {
                    Ok(req) => req,
                    Err(e) => {
                        return JsonRpcResponse::error(id, -32602, format!("Invalid arguments: {}", e));
                    }
                };
                self.search_limiter.acquire().await;
                self.toolkit.execute_search(request, &cancel).await
            }
            FETCH_TOOL => {
                let request: FetchRequest = match serde_json::from_value(arguments) {
                    Ok(req) => req,
                    Err(e) => {
                        return JsonRpcResponse::error(id, -32602, format!("Invalid arguments: {}", e));
                    }
                };
                self.fetch_limiter.acquire().await;
                self.toolkit.execute_fetch(request, &cancel).await
            }
            _ => {
                return JsonRpcResponse::error(id, -32602, format!("Unknown tool: {}", tool_name));
            }
        };

        JsonRpcResponse::success(id, tool_result(outcome))
    }
}

/// Run the MCP server over stdio
pub async fn run_server(toolkit: Toolkit) {
    serve(
        toolkit,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await;
}

/// Answer newline-delimited JSON-RPC requests until `input` closes
async fn serve<R, W>(toolkit: Toolkit, input: R, mut output: W)
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut server = McpServer::new(toolkit);
    let mut lines = input.lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(l)) => l,
            Ok(None) => break,
            Err(e) => {
                warn!("Error reading stdin: {}", e);
                break;
            }
        };

        if line.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<JsonRpcRequest>(&line) {
            Ok(request) => {
                // Skip notifications (no id)
                if request.id.is_none() && request.method.starts_with("notifications/") {
                    continue;
                }
                server.handle_request(request).await
            }
            Err(e) => JsonRpcResponse::error(None, -32700, format!("Parse error: {}", e)),
        };

        let mut json = serde_json::to_string(&response).unwrap_or_default();
        json.push('\n');
        if let Err(e) = write_line(&mut output, &json).await {
            warn!("Error writing stdout: {}", e);
            break;
        }
    }
}

async fn write_line<W: AsyncWrite + Unpin>(output: &mut W, line: &str) -> io::Result<()> {
    output.write_all(line.as_bytes()).await?;
    output.flush().await
}
