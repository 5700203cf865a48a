//! Configuration types for the ComplianceCow MCP server.
//!
//! Configuration is read from an optional YAML file (`ccow.yaml`) and then
//! overlaid with the `CCOW_*` environment variables. Every section has
//! defaults, so an empty file (or no file) is a valid configuration.
//!
//! ```yaml
//! backend:
//!   host: https://partner.compliancecow.live
//!   timeout_seconds: 60
//! mcp:
//!   transport: http
//!   port: 8000
//! pagination:
//!   resources:
//!     default_page_size: 5
//!     ladder: [5, 10]
//!     summary_threshold: 100
//! actions:
//!   binding_ttl_minutes: 30
//! ```

pub mod backend;
pub mod mcp;
pub mod pagination;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub use backend::{BackendConfig, Credentials};
pub use mcp::{McpConfig, Transport};
pub use pagination::{LadderConfig, ListingKind, PaginationConfig};

/// Complete server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CcowConfig {
    /// Compliance backend connection.
    #[serde(default)]
    pub backend: BackendConfig,

    /// MCP transport settings.
    #[serde(default)]
    pub mcp: McpConfig,

    /// Page-size ladders per listing kind.
    #[serde(default)]
    pub pagination: PaginationConfig,

    /// Action dispatch settings.
    #[serde(default)]
    pub actions: ActionsConfig,
}

/// Action dispatch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionsConfig {
    /// How long a discovered action binding stays executable.
    #[serde(default = "default_binding_ttl_minutes")]
    pub binding_ttl_minutes: i64,
}

impl Default for ActionsConfig {
    fn default() -> Self {
        Self {
            binding_ttl_minutes: default_binding_ttl_minutes(),
        }
    }
}

/// One week.
pub const MAX_BINDING_TTL_MINUTES: i64 = 7 * 24 * 60;

fn default_binding_ttl_minutes() -> i64 {
    30
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CcowConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    /// Overlay settings that come from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|name| std::env::var(name).ok());
    }

    /// Overlay environment settings using the given variable lookup.
    ///
    /// Backend host and credentials are resolved lazily by [`BackendConfig`];
    /// only the transport selection is folded in here.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let port = lookup(mcp::SERVER_PORT_ENV);
        self.mcp.apply_port_override(port.as_deref());
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.timeout_seconds == 0 {
            return Err(ConfigError::Config(
                "backend.timeout_seconds must be positive".to_string(),
            ));
        }
        if !(1..=MAX_BINDING_TTL_MINUTES).contains(&self.actions.binding_ttl_minutes) {
            return Err(ConfigError::Config(format!(
                "actions.binding_ttl_minutes must be between 1 and {}",
                MAX_BINDING_TTL_MINUTES
            )));
        }
        self.pagination.validate().map_err(ConfigError::Config)
    }
}
