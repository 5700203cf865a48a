//! `ccow check` - validate configuration without starting the server.

use super::load_config;
use anyhow::{Context, Result};
use ccow_core::{CcowConfig, ListingKind};
use std::path::Path;

/// Validate the configuration and print the effective settings.
pub fn run(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    config.validate().context("Invalid configuration")?;
    print!("{}", render(&config));
    Ok(())
}

fn render(config: &CcowConfig) -> String {
    let mut out = String::new();
    out.push_str("Configuration OK\n\n");
    out.push_str(&format!("Backend:    {}\n", config.backend.resolve_host()));
    out.push_str(&format!(
        "Auth:       {}\n",
        match config.backend.credentials() {
            Some(ccow_core::Credentials::ClientCredentials { .. }) => "client credentials",
            Some(ccow_core::Credentials::Token(_)) => "token",
            None => "none",
        }
    ));
    out.push_str(&format!("Timeout:    {}s\n", config.backend.timeout_seconds));
    out.push_str(&format!(
        "Transport:  {}\n",
        if config.mcp.is_http() {
            format!("http on {}", config.mcp.bind_address())
        } else {
            "stdio".to_string()
        }
    ));
    out.push_str(&format!(
        "Bindings:   expire after {} minutes\n\nPage-size ladders:\n",
        config.actions.binding_ttl_minutes
    ));
    for kind in ListingKind::ALL {
        let ladder = config.pagination.ladder(kind);
        out.push_str(&format!(
            "  {:<20} default {:<4} ladder {:?}\n",
            kind.as_str(),
            ladder.default_page_size,
            ladder.ladder
        ));
    }
    out
}
