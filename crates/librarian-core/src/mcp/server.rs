//! MCP server over newline-delimited JSON-RPC on stdio
//!
//! One request is processed at a time in the order read from stdin; this is
//! the serialization the session engine relies on. Tool failures are
//! reported inside a successful JSON-RPC response with `isError: true` so
//! they reach the calling agent as readable text; JSON-RPC errors are
//! reserved for transport-level problems (malformed JSON, unknown methods).

use crate::errors::LibrarianError;
use crate::mcp::protocol::{
    JsonRpcRequest, JsonRpcResponse, INTERNAL_ERROR, INVALID_PARAMS, JSONRPC_VERSION,
    MCP_PROTOCOL_VERSION, METHOD_NOT_FOUND, PARSE_ERROR,
};
use crate::tools::ToolRegistry;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

pub struct McpServer {
    registry: ToolRegistry,
}

impl McpServer {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    /// Handle one request. Notifications return `None`.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.jsonrpc != JSONRPC_VERSION {
            let id = request.id.unwrap_or(Value::Null);
            return Some(JsonRpcResponse::error(
                id,
                crate::mcp::protocol::INVALID_REQUEST,
                format!("Unsupported JSON-RPC version: {}", request.jsonrpc),
            ));
        }

        if request.is_notification() {
            log::debug!("Notification received: {}", request.method);
            return None;
        }
        let id = request.id.clone().unwrap_or(Value::Null);

        let response = match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(
                id,
                json!({
                    "protocolVersion": MCP_PROTOCOL_VERSION,
                    "capabilities": { "tools": {} },
                    "serverInfo": {
                        "name": "Librarian",
                        "version": env!("CARGO_PKG_VERSION"),
                        "description": "A server for structuring, listing, searching, and retrieving markdown knowledge bases"
                    }
                }),
            ),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => {
                let tools: Vec<Value> = self
                    .registry
                    .list_tools()
                    .into_iter()
                    .map(|metadata| {
                        json!({
                            "name": metadata.name,
                            "description": metadata.description,
                            "inputSchema": metadata.input_schema,
                        })
                    })
                    .collect();
                JsonRpcResponse::success(id, json!({ "tools": tools }))
            }
            "tools/call" => self.handle_tool_call(id, request.params).await,
            other => JsonRpcResponse::error(
                id,
                METHOD_NOT_FOUND,
                format!("Method not found: {}", other),
            ),
        };

        Some(response)
    }

    async fn handle_tool_call(&self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let params = params.unwrap_or(Value::Null);
        let Some(name) = params.get("name").and_then(|v| v.as_str()) else {
            return JsonRpcResponse::error(id, INVALID_PARAMS, "Missing tool name");
        };
        let arguments = params
            .get("arguments")
            .cloned()
            .unwrap_or_else(|| json!({}));

        let Some(tool) = self.registry.get_tool(name) else {
            return JsonRpcResponse::error(id, INVALID_PARAMS, format!("Unknown tool: {}", name));
        };

        if let Err(err) = self.registry.validate_input(name, &arguments) {
            return tool_text_response(id, err.to_string(), true);
        }

        log::debug!("Dispatching tool call: {}", name);
        match tool.execute(arguments).await {
            Ok(text) => tool_text_response(id, text, false),
            Err(err) => tool_text_response(id, err.to_string(), true),
        }
    }

    /// Serve requests from stdin until it closes.
    pub async fn run_stdio(&self) -> Result<(), LibrarianError> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<JsonRpcRequest>(line) {
                Ok(request) => self.handle_request(request).await,
                Err(err) => Some(JsonRpcResponse::error(
                    Value::Null,
                    PARSE_ERROR,
                    format!("Parse error: {}", err),
                )),
            };

            if let Some(response) = response {
                let serialized = match serde_json::to_string(&response) {
                    Ok(json) => json,
                    Err(err) => {
                        // Respond with a transport error instead of tearing
                        // down the server over one bad payload.
                        log::error!("Response serialization failed: {}", err);
                        let fallback = JsonRpcResponse::error(
                            response.id.clone(),
                            INTERNAL_ERROR,
                            "Internal error: failed to serialize response",
                        );
                        serde_json::to_string(&fallback)
                            .map_err(|e| LibrarianError::ProtocolError(e.to_string()))?
                    }
                };
                stdout.write_all(serialized.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
            }
        }

        log::info!("stdin closed, shutting down");
        Ok(())
    }
}

fn tool_text_response(id: Value, text: String, is_error: bool) -> JsonRpcResponse {
    JsonRpcResponse::success(
        id,
        json!({
            "content": [{ "type": "text", "text": text }],
            "isError": is_error,
        }),
    )
}
