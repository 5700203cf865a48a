//! CLI command implementations for the ComplianceCow MCP server.

pub mod check;
pub mod serve;
pub mod tools;

use anyhow::{Context, Result};
use ccow_core::CcowConfig;
use std::path::Path;

/// Configuration file read when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "ccow.yaml";

/// Load configuration and overlay the environment.
///
/// An explicit path must exist. Without one, `./ccow.yaml` is read when
/// present and defaults are used otherwise.
pub fn load_config(path: Option<&Path>) -> Result<CcowConfig> {
    let mut config = match path {
        Some(path) => CcowConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {:?}", path))?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            CcowConfig::from_file(DEFAULT_CONFIG_FILE)
                .with_context(|| format!("Failed to load {}", DEFAULT_CONFIG_FILE))?
        }
        None => CcowConfig::default(),
    };
    config.apply_env();
    Ok(config)
}
