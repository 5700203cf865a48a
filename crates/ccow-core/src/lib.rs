//! Shared types for the ComplianceCow MCP server.
//!
//! - [`config`]: backend connection, transport, pagination and action settings
//!   loaded from `ccow.yaml` and the `CCOW_*` environment variables.
//! - [`model`]: read-only snapshots of the entities the compliance backend
//!   owns (assessments, runs, controls, evidence, resources, checks).

pub mod config;
pub mod model;

pub use config::{
    ActionsConfig, BackendConfig, CcowConfig, ConfigError, Credentials, ListingKind,
    LadderConfig, McpConfig, PaginationConfig, Transport,
};
pub use model::{ComplianceStatus, ReviewPeriod, ScopeKind};
