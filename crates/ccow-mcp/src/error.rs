//! Error types for the MCP crate.

use ccow_backend::BackendError;
use serde_json::{Value, json};
use thiserror::Error;

/// Errors that can occur in the MCP server itself.
#[derive(Debug, Error)]
pub enum McpError {
    /// Failed to start the server.
    #[error("failed to start MCP server: {0}")]
    StartupFailed(String),

    /// Tool not found.
    #[error("tool not found: {name}")]
    ToolNotFound { name: String },

    #[error("prompt not found: {name}")]
    PromptNotFound { name: String },

    #[error("prompt {name} is missing required arguments: {missing}")]
    InvalidPromptArguments { name: String, missing: String },

    /// Configuration the server cannot run with.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A tool's input schema does not compile.
    #[error("invalid input schema for tool {tool}: {reason}")]
    InvalidSchema { tool: String, reason: String },

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Failure of a single tool call.
///
/// Every variant is returned to the agent as a structured result that
/// names its kind. Validation and conflict failures never reach the backend.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ToolError {
    /// Missing or malformed argument.
    #[error("{0}")]
    Validation(String),

    /// Every page size on the ladder timed out.
    #[error("{message}")]
    Timeout {
        message: String,
        attempted_page_sizes: Vec<u64>,
    },

    /// Backend-reported failure, passed through unmodified.
    #[error("{message}")]
    Upstream { status: Option<u16>, message: String },

    /// Another action is already running for the same scope.
    #[error("{0}")]
    Conflict(String),
}

impl ToolError {
    pub fn validation(message: impl Into<String>) -> Self {
        ToolError::Validation(message.into())
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        ToolError::Upstream {
            status: None,
            message: message.into(),
        }
    }

    /// Ladder exhausted after trying every listed size.
    pub fn ladder_exhausted(attempted_page_sizes: Vec<u64>) -> Self {
        ToolError::Timeout {
            message: format!(
                "request timed out at every page size tried ({})",
                attempted_page_sizes
                    .iter()
                    .map(u64::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            attempted_page_sizes,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::Validation(_) => "validation",
            ToolError::Timeout { .. } => "timeout",
            ToolError::Upstream { .. } => "upstream",
            ToolError::Conflict(_) => "conflict",
        }
    }

    /// Structured form returned to the agent.
    pub fn to_json(&self) -> Value {
        let mut error = json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        match self {
            ToolError::Timeout {
                attempted_page_sizes,
                ..
            } if !attempted_page_sizes.is_empty() => {
                error["attemptedPageSizes"] = json!(attempted_page_sizes);
            }
            ToolError::Upstream {
                status: Some(status),
                ..
            } => {
                error["status"] = json!(status);
            }
            _ => {}
        }
        json!({ "error": error })
    }
}

impl From<BackendError> for ToolError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Timeout { .. } => ToolError::Timeout {
                message: err.to_string(),
                attempted_page_sizes: Vec::new(),
            },
            BackendError::Status { status, message } => ToolError::Upstream {
                status: Some(status),
                message,
            },
            other => ToolError::upstream(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_status_passes_message_through() {
        let err: ToolError = BackendError::Status {
            status: 404,
            message: "plan not found".to_string(),
        }
        .into();
        assert_eq!(err.kind(), "upstream");
        assert_eq!(err.to_string(), "plan not found");
        assert_eq!(err.to_json()["error"]["status"], 404);
    }

    #[test]
    fn test_ladder_exhausted_lists_sizes() {
        let err = ToolError::ladder_exhausted(vec![5, 10]);
        assert_eq!(err.kind(), "timeout");
        assert!(err.to_string().contains("5, 10"));
        assert_eq!(err.to_json()["error"]["attemptedPageSizes"], json!([5, 10]));
    }

    #[test]
    fn test_conflict_json_shape() {
        let err = ToolError::Conflict("busy".to_string());
        assert_eq!(
            err.to_json(),
            json!({"error": {"kind": "conflict", "message": "busy"}})
        );
    }
}
