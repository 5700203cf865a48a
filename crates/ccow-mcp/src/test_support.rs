//! Scripted backend used by unit tests.

use crate::executor::{ExecutionResult, ToolExecutor};
use crate::protocol::ToolContent;
use async_trait::async_trait;
use ccow_backend::{BackendClient, BackendError};
use ccow_core::CcowConfig;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// An executor with default configuration over `backend`.
pub fn executor(backend: &Arc<ScriptedBackend>) -> ToolExecutor {
    ToolExecutor::new(backend.clone(), &CcowConfig::default()).unwrap()
}

/// The JSON content of a tool result.
pub fn json_content(result: &ExecutionResult) -> &Value {
    result
        .content
        .iter()
        .find_map(|c| match c {
            ToolContent::Json { json } => Some(json),
            ToolContent::Text { .. } => None,
        })
        .expect("result has JSON content")
}

/// Answers each path from a queue of canned responses and records every
/// request body (GETs record `null`).
#[derive(Default)]
pub struct ScriptedBackend {
    responses: Mutex<HashMap<String, VecDeque<Result<Value, BackendError>>>>,
    calls: Mutex<Vec<(String, Value)>>,
    delay: Option<Duration>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long before answering any request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a response for `path`.
    pub fn respond(&self, path: &str, response: Result<Value, BackendError>) {
        self.responses
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(response);
    }

    /// Bodies of the requests made to `path`, oldest first.
    pub fn calls(&self, path: &str) -> Vec<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, body)| body.clone())
            .collect()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn timeout() -> BackendError {
        BackendError::Timeout {
            path: "scripted".to_string(),
        }
    }

    async fn answer(&self, path: &str, body: Value) -> Result<Value, BackendError> {
        self.calls.lock().unwrap().push((path.to_string(), body));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self
            .responses
            .lock()
            .unwrap()
            .get_mut(path)
            .and_then(VecDeque::pop_front);
        next.unwrap_or_else(|| {
            Err(BackendError::Status {
                status: 404,
                message: format!("no scripted response for {}", path),
            })
        })
    }
}

#[async_trait]
impl BackendClient for ScriptedBackend {
    async fn get(&self, path: &str) -> Result<Value, BackendError> {
        self.answer(path, Value::Null).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, BackendError> {
        self.answer(path, body.clone()).await
    }
}
