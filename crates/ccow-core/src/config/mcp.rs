//! MCP server configuration.
//!
//! The server speaks stdio by default. Setting `CCOW_MCP_SERVER_PORT` to a
//! valid port switches it to the HTTP transport on that port.

use serde::{Deserialize, Serialize};

/// Environment variable that selects the HTTP transport port.
pub const SERVER_PORT_ENV: &str = "CCOW_MCP_SERVER_PORT";

/// How the server talks to its client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpConfig {
    #[serde(default)]
    pub transport: Transport,

    /// Ignored on stdio.
    #[serde(default = "default_http_host")]
    pub host: String,

    #[serde(default = "default_http_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// Newline-delimited JSON-RPC on stdin and stdout.
    #[default]
    Stdio,
    Http,
}

impl std::str::FromStr for Transport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stdio" => Ok(Transport::Stdio),
            "http" => Ok(Transport::Http),
            other => Err(format!("unknown transport '{}', use 'stdio' or 'http'", other)),
        }
    }
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            transport: Transport::default(),
            host: default_http_host(),
            port: default_http_port(),
        }
    }
}

impl McpConfig {
    pub fn is_http(&self) -> bool {
        self.transport == Transport::Http
    }

    /// Apply the value of `CCOW_MCP_SERVER_PORT`.
    ///
    /// A positive integer port selects HTTP on that port. Anything else
    /// (unset, empty, zero, not a number) leaves the configuration untouched.
    pub fn apply_port_override(&mut self, value: Option<&str>) -> bool {
        match value.map(str::trim).and_then(|v| v.parse::<u16>().ok()) {
            Some(port) if port > 0 => {
                self.transport = Transport::Http;
                self.port = port;
                true
            }
            _ => false,
        }
    }

    /// Socket address string for the HTTP listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_http_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8000
}
