//! # ccow-mcp
//!
//! MCP (Model Context Protocol) tool server for the ComplianceCow compliance
//! backend.
//!
//! The server exposes assessments, runs, controls, evidence, assets and the
//! compliance dashboard as typed, read-only tools, plus one side-effecting
//! tool that triggers a remediation action. It adds a small amount of logic
//! on top of the backend:
//!
//! - **Paginated fetching**: each listing walks a fixed page-size ladder,
//!   stepping up to a larger page when the backend times out.
//! - **Summary aggregation**: oversized listings are answered with compliance
//!   counts instead of raw items.
//! - **Graph queries**: schema discovery and read-only query execution are
//!   separate tools.
//! - **Action dispatch**: only bindings discovered in this session can be
//!   executed, one at a time per scope.
//!
//! Three prompt templates (graph query writing, control tables and the
//! dashboard chart) are served alongside the tools.
//!
//! ## Architecture
//!
//! ```text
//! AI Agent
//!       │
//!       │ MCP protocol (stdio or HTTP)
//!       ▼
//! ┌──────────────────────┐
//! │  McpServer           │
//! │  1. Validate args    │  ← JSON schema per tool
//! │  2. Dispatch         │  ← handlers/*
//! │  3. Page / summarize │  ← PaginatedFetcher, SummaryAggregator
//! │  4. Guard actions    │  ← ActionDispatcher
//! │  5. Return JSON      │
//! └──────────┬───────────┘
//!            │ BackendClient
//!            ▼
//!   ComplianceCow backend
//! ```
//!
//! ## Example Usage
//!
//! ```ignore
//! use ccow_backend::HttpBackendClient;
//! use ccow_core::CcowConfig;
//! use ccow_mcp::McpServer;
//! use std::sync::Arc;
//!
//! let config = CcowConfig::from_file("ccow.yaml")?;
//! let backend = Arc::new(HttpBackendClient::from_config(&config.backend)?);
//! let server = McpServer::new(&config, backend)?;
//! server.run().await?;
//! ```

pub mod actions;
pub mod catalog;
pub mod error;
pub mod executor;
pub mod graph;
mod handlers;
pub mod http_transport;
pub mod pagination;
pub mod prompts;
pub mod protocol;
pub mod server;
pub mod summary;
pub mod tools;
pub mod validator;

#[cfg(test)]
mod test_support;

pub use actions::{ActionDispatcher, ActionIds, ActionResult, BindingRegistry, DiscoveryScope};
pub use error::{McpError, ToolError};
pub use executor::{ExecutionResult, ToolExecutor};
pub use graph::{GraphQueryTranslator, QueryOutput, SchemaContext};
pub use pagination::{ListingQuery, Page, PaginatedFetcher};
pub use prompts::PromptDefinition;
pub use protocol::{
    CallToolParams, CallToolResponse, JsonRpcRequest, JsonRpcResponse, ToolAnnotations,
    ToolContent, ToolDefinition,
};
pub use server::McpServer;
pub use summary::{ComplianceSummary, SummaryAggregator, SummaryScope};
pub use tools::ToolRegistry;
