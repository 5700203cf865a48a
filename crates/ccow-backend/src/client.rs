//! The backend client contract and its HTTP implementation.

use crate::error::BackendError;
use crate::http::{check_response, decode_body};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ccow_core::config::{BackendConfig, Credentials};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde_json::Value;
use std::time::Duration;

/// Authenticated access to the compliance backend.
///
/// Implementations return the decoded JSON body of a successful response,
/// or a [`BackendError`] that distinguishes timeouts from backend-reported
/// failures.
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Issue a GET request. `path` may carry a query string.
    async fn get(&self, path: &str) -> Result<Value, BackendError>;

    /// Issue a POST request with a JSON body.
    async fn post(&self, path: &str, body: &Value) -> Result<Value, BackendError>;
}

/// [`BackendClient`] over HTTP using `reqwest`.
#[derive(Clone)]
pub struct HttpBackendClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackendClient {
    /// Create a client for `base_url` with a per-request timeout.
    pub fn new(
        base_url: impl Into<String>,
        credentials: Option<&Credentials>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let mut headers = HeaderMap::new();
        if let Some(value) = credentials.map(authorization_value) {
            let mut value = HeaderValue::from_str(&value)
                .map_err(|e| BackendError::Config(format!("invalid authorization header: {}", e)))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        } else {
            tracing::warn!("No backend credentials configured; requests will be unauthenticated");
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Create a client from configuration, resolving host and credentials
    /// from the environment.
    pub fn from_config(config: &BackendConfig) -> Result<Self, BackendError> {
        let credentials = config.credentials();
        Self::new(
            config.resolve_host(),
            credentials.as_ref(),
            Duration::from_secs(config.timeout_seconds),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn finish(
        &self,
        path: &str,
        sent: Result<reqwest::Response, reqwest::Error>,
    ) -> Result<Value, BackendError> {
        let resp = sent.map_err(|e| classify(path, e))?;
        let resp = check_response(resp).await?;
        let body = resp.text().await.map_err(|e| classify(path, e))?;
        decode_body(&body)
    }
}

#[async_trait]
impl BackendClient for HttpBackendClient {
    async fn get(&self, path: &str) -> Result<Value, BackendError> {
        tracing::debug!(path = %path, "GET backend");
        let sent = self.client.get(self.url(path)).send().await;
        self.finish(path, sent).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, BackendError> {
        tracing::debug!(path = %path, body = %body, "POST backend");
        let sent = self.client.post(self.url(path)).json(body).send().await;
        self.finish(path, sent).await
    }
}

/// `Authorization` header value for the given credentials.
pub fn authorization_value(credentials: &Credentials) -> String {
    match credentials {
        Credentials::ClientCredentials {
            client_id,
            client_secret,
        } => format!(
            "Basic {}",
            STANDARD.encode(format!("{}:{}", client_id, client_secret))
        ),
        Credentials::Token(token) => token.clone(),
    }
}

fn classify(path: &str, err: reqwest::Error) -> BackendError {
    if err.is_timeout() {
        BackendError::Timeout {
            path: path.to_string(),
        }
    } else {
        BackendError::Http(err)
    }
}
