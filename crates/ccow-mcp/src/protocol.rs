//! Wire types for MCP over JSON-RPC 2.0.
//!
//! Field names follow the MCP schema (`inputSchema`, `isError`,
//! `readOnlyHint`); everything else is plain JSON-RPC.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol revision reported during `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC error codes.
pub mod codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// An incoming message. Requests carry an id, notifications do not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: impl Into<Value>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(id.into()),
            method: method.into(),
            params,
        }
    }

    /// Notifications carry no id and expect no response.
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// Exactly one of `result` and `error` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
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

/// One entry of `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub input_schema: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<ToolAnnotations>,
}

/// Behaviour hints shown to the client. Only the read-only flag is
/// consulted by the server itself.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ToolAnnotations {
    #[serde(rename = "readOnlyHint", skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(rename = "destructiveHint", skip_serializing_if = "Option::is_none")]
    pub destructive: Option<bool>,
    #[serde(rename = "idempotentHint", skip_serializing_if = "Option::is_none")]
    pub idempotent: Option<bool>,
}

impl ToolAnnotations {
    pub fn read_only() -> Self {
        Self {
            read_only: Some(true),
            destructive: Some(false),
            idempotent: Some(true),
        }
    }

    pub fn side_effecting() -> Self {
        Self {
            read_only: Some(false),
            destructive: Some(true),
            idempotent: Some(false),
        }
    }
}

/// `tools/call` params. Missing arguments deserialize as `null`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResponse {
    pub content: Vec<ToolContent>,
    pub is_error: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    Text { text: String },
    Json { json: Value },
}

/// A static document served through `resources/read`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDefinition {
    pub uri: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub mime_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadResourceParams {
    pub uri: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_notification_has_no_id() {
        let req: JsonRpcRequest =
            serde_json::from_value(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
                .unwrap();
        assert!(req.is_notification());
    }

    #[test]
    fn test_tool_content_tagging() {
        let content = ToolContent::Text {
            text: "hi".to_string(),
        };
        assert_eq!(
            serde_json::to_value(content).unwrap(),
            json!({"type": "text", "text": "hi"})
        );
    }

    #[test]
    fn test_error_response_omits_result() {
        let resp = JsonRpcResponse::error(Some(json!(1)), codes::METHOD_NOT_FOUND, "nope");
        let value = serde_json::to_value(resp).unwrap();
        assert!(value.get("result").is_none());
        assert_eq!(value["error"]["code"], -32601);
    }

    #[test]
    fn test_tool_definition_uses_mcp_field_names() {
        let tool = ToolDefinition {
            name: "fetch_checks".to_string(),
            description: None,
            input_schema: json!({"type": "object"}),
            annotations: Some(ToolAnnotations::read_only()),
        };
        let value = serde_json::to_value(tool).unwrap();
        assert_eq!(value["inputSchema"]["type"], "object");
        assert_eq!(value["annotations"]["readOnlyHint"], true);
        assert!(value.get("description").is_none());
    }
}
