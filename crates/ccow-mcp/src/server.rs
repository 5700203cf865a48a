//! MCP server implementation.
//!
//! The server answers JSON-RPC requests over stdio or HTTP. Either way a
//! single task handles requests in arrival order, so tool calls never
//! overlap within a session.

use crate::error::McpError;
use crate::executor::ToolExecutor;
use crate::http_transport::{HttpServer, PendingRequest};
use crate::prompts::{self, GetPromptParams, all_prompts};
use crate::protocol::*;
use crate::tools::ToolRegistry;
use ccow_backend::BackendClient;
use ccow_core::{CcowConfig, McpConfig, Transport};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// The MCP server.
#[derive(Debug, Clone)]
pub struct McpServer {
    config: McpConfig,
    tools: ToolRegistry,
    executor: Arc<ToolExecutor>,
}

impl McpServer {
    /// Create a server that runs tools against the given backend.
    pub fn new(config: &CcowConfig, backend: Arc<dyn BackendClient>) -> Result<Self, McpError> {
        let executor = ToolExecutor::new(backend, config)?;
        Ok(Self::with_executor(config.mcp.clone(), executor))
    }

    pub fn with_executor(config: McpConfig, executor: ToolExecutor) -> Self {
        let tools = ToolRegistry::from_tools(executor.tools().iter().cloned());
        Self {
            config,
            tools,
            executor: Arc::new(executor),
        }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn executor(&self) -> &ToolExecutor {
        &self.executor
    }

    /// Start the MCP server.
    pub async fn run(&self) -> Result<(), McpError> {
        match self.config.transport {
            Transport::Stdio => self.run_stdio().await,
            Transport::Http => self.run_http().await,
        }
    }

    /// Run the server with stdio transport, one JSON-RPC message per line.
    async fn run_stdio(&self) -> Result<(), McpError> {
        info!(tools = self.tools.len(), "Starting MCP server with stdio transport");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<JsonRpcRequest>(line) {
                Ok(request) if request.is_notification() => {
                    self.handle_notification(&request);
                    continue;
                }
                Ok(request) => self.handle_request(request).await,
                Err(e) => {
                    JsonRpcResponse::error(None, codes::PARSE_ERROR, format!("Parse error: {}", e))
                }
            };

            let mut encoded = serde_json::to_vec(&response)?;
            encoded.push(b'\n');
            stdout.write_all(&encoded).await?;
            stdout.flush().await?;
        }

        info!("stdin closed, MCP server stopping");
        Ok(())
    }

    /// Run the server with HTTP transport.
    pub async fn run_http(&self) -> Result<(), McpError> {
        info!(
            address = %self.config.bind_address(),
            tools = self.tools.len(),
            "Starting MCP server with HTTP transport"
        );

        let (request_tx, mut request_rx) = mpsc::channel::<PendingRequest>(100);

        let server = self.clone();
        tokio::spawn(async move {
            while let Some(PendingRequest { request, reply }) = request_rx.recv().await {
                let response = if request.is_notification() {
                    server.handle_notification(&request);
                    None
                } else {
                    Some(server.handle_request(request).await)
                };
                let _ = reply.send(response);
            }
        });

        let http_server = HttpServer::new(self.config.bind_address(), request_tx);
        http_server.run().await
    }

    fn handle_notification(&self, request: &JsonRpcRequest) {
        debug!(method = %request.method, "Received notification");
    }

    /// Handle a JSON-RPC request.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();

        match request.method.as_str() {
            "initialize" => self.handle_initialize(id),
            "initialized" | "notifications/initialized" => JsonRpcResponse::success(id, json!({})),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => self.handle_list_tools(id),
            "tools/call" => self.handle_call_tool(id, request.params).await,
            "resources/list" => self.handle_list_resources(id),
            "resources/read" => self.handle_read_resource(id, request.params).await,
            "prompts/list" => JsonRpcResponse::success(id, json!({ "prompts": all_prompts() })),
            "prompts/get" => self.handle_get_prompt(id, request.params),
            "shutdown" => self.handle_shutdown(id),
            _ => JsonRpcResponse::error(
                id,
                codes::METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
            ),
        }
    }

    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        let result = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "serverInfo": {
                "name": "ccow-mcp",
                "version": env!("CARGO_PKG_VERSION")
            },
            "capabilities": {
                "tools": { "listChanged": false },
                "resources": { "listChanged": false },
                "prompts": { "listChanged": false }
            }
        });
        JsonRpcResponse::success(id, result)
    }

    fn handle_list_tools(&self, id: Option<Value>) -> JsonRpcResponse {
        JsonRpcResponse::success(id, json!({ "tools": self.tools.list() }))
    }

    async fn handle_call_tool(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params: CallToolParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    return JsonRpcResponse::error(
                        id,
                        codes::INVALID_PARAMS,
                        format!("Invalid params: {}", e),
                    );
                }
            },
            None => return JsonRpcResponse::error(id, codes::INVALID_PARAMS, "Missing params"),
        };

        if !self.tools.contains(&params.name) {
            return JsonRpcResponse::error(
                id,
                codes::INVALID_PARAMS,
                McpError::ToolNotFound { name: params.name }.to_string(),
            );
        }

        info!(
            tool = %params.name,
            read_only = self.tools.is_read_only(&params.name),
            "Calling tool"
        );
        let result = self.executor.execute(&params.name, &params.arguments).await;
        let response = CallToolResponse::from(result);
        match serde_json::to_value(response) {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => JsonRpcResponse::error(id, codes::INTERNAL_ERROR, e.to_string()),
        }
    }

    fn handle_list_resources(&self, id: Option<Value>) -> JsonRpcResponse {
        JsonRpcResponse::success(id, json!({ "resources": self.executor.resources() }))
    }

    async fn handle_read_resource(
        &self,
        id: Option<Value>,
        params: Option<Value>,
    ) -> JsonRpcResponse {
        let params: ReadResourceParams = match params.map(serde_json::from_value) {
            Some(Ok(params)) => params,
            Some(Err(e)) => {
                return JsonRpcResponse::error(
                    id,
                    codes::INVALID_PARAMS,
                    format!("Invalid params: {}", e),
                );
            }
            None => return JsonRpcResponse::error(id, codes::INVALID_PARAMS, "Missing params"),
        };

        match self.executor.read_resource(&params.uri).await {
            Some(Ok(value)) => JsonRpcResponse::success(
                id,
                json!({
                    "contents": [{
                        "uri": params.uri,
                        "mimeType": "application/json",
                        "text": value.to_string()
                    }]
                }),
            ),
            Some(Err(e)) => JsonRpcResponse::error(id, codes::INTERNAL_ERROR, e.to_string()),
            None => JsonRpcResponse::error(
                id,
                codes::INVALID_PARAMS,
                format!("Resource not found: {}", params.uri),
            ),
        }
    }

    fn handle_get_prompt(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params: GetPromptParams = match params.map(serde_json::from_value) {
            Some(Ok(params)) => params,
            Some(Err(e)) => {
                return JsonRpcResponse::error(
                    id,
                    codes::INVALID_PARAMS,
                    format!("Invalid params: {}", e),
                );
            }
            None => return JsonRpcResponse::error(id, codes::INVALID_PARAMS, "Missing params"),
        };

        debug!(prompt = %params.name, "Rendering prompt");
        match prompts::render(&params.name, &params.arguments) {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(e) => JsonRpcResponse::error(id, codes::INVALID_PARAMS, e.to_string()),
        }
    }

    fn handle_shutdown(&self, id: Option<Value>) -> JsonRpcResponse {
        info!("MCP server shutdown requested");
        JsonRpcResponse::success(id, json!(null))
    }
}
