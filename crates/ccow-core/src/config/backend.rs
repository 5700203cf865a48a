//! Compliance backend connection configuration.
//!
//! Credentials are never stored in the config file. The file names the
//! environment variables to read, with the `CCOW_*` names as defaults:
//! 1. `client_id_env` + `client_secret_env` - client credentials (HTTP Basic)
//! 2. `token_env` - a pre-issued token sent verbatim as `Authorization`

use serde::{Deserialize, Serialize};

/// Configuration for the compliance backend connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the backend. Overridden by `host_env` when set.
    #[serde(default = "default_host")]
    pub host: String,

    /// Environment variable containing the backend base URL.
    #[serde(default = "default_host_env")]
    pub host_env: String,

    /// Environment variable containing the client id.
    #[serde(default = "default_client_id_env")]
    pub client_id_env: String,

    /// Environment variable containing the client secret.
    #[serde(default = "default_client_secret_env")]
    pub client_secret_env: String,

    /// Environment variable containing a pre-issued token.
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            host_env: default_host_env(),
            client_id_env: default_client_id_env(),
            client_secret_env: default_client_secret_env(),
            token_env: default_token_env(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

/// Resolved backend credentials.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Client id and secret, sent as HTTP Basic.
    ClientCredentials {
        client_id: String,
        client_secret: String,
    },
    /// Token used verbatim as the `Authorization` header value.
    Token(String),
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::ClientCredentials { client_id, .. } => f
                .debug_struct("ClientCredentials")
                .field("client_id", client_id)
                .field("client_secret", &"***")
                .finish(),
            Credentials::Token(_) => f.debug_tuple("Token").field(&"***").finish(),
        }
    }
}

impl BackendConfig {
    /// Resolve the base URL from the process environment.
    pub fn resolve_host(&self) -> String {
        self.resolve_host_with(|name| std::env::var(name).ok())
    }

    /// Resolve the base URL using the given variable lookup.
    ///
    /// The trailing slash is stripped so endpoint paths can be appended.
    pub fn resolve_host_with(&self, lookup: impl Fn(&str) -> Option<String>) -> String {
        let host = lookup(&self.host_env)
            .filter(|h| !h.trim().is_empty())
            .unwrap_or_else(|| self.host.clone());
        host.trim().trim_end_matches('/').to_string()
    }

    /// Resolve credentials from the process environment.
    pub fn credentials(&self) -> Option<Credentials> {
        self.credentials_with(|name| std::env::var(name).ok())
    }

    /// Resolve credentials using the given variable lookup.
    ///
    /// Client credentials win when both id and secret are present.
    pub fn credentials_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Option<Credentials> {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let (Some(client_id), Some(client_secret)) = (
            non_empty(&self.client_id_env),
            non_empty(&self.client_secret_env),
        ) {
            return Some(Credentials::ClientCredentials {
                client_id,
                client_secret,
            });
        }

        non_empty(&self.token_env).map(Credentials::Token)
    }
}

fn default_host() -> String {
    "http://cowapiservice:80".to_string()
}

fn default_host_env() -> String {
    "CCOW_HOST".to_string()
}

fn default_client_id_env() -> String {
    "CCOW_CLIENT_ID".to_string()
}

fn default_client_secret_env() -> String {
    "CCOW_CLIENT_SECRET".to_string()
}

fn default_token_env() -> String {
    "CCOW_TOKEN".to_string()
}

fn default_timeout_seconds() -> u64 {
    60
}
