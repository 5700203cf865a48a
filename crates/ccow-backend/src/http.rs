//! Shared HTTP response helpers.
//!
//! Centralizes status-code checks so the client stays focused on request
//! construction.

use crate::error::BackendError;
use serde_json::Value;

/// Check an HTTP response for a non-success status.
///
/// Returns the response unchanged on success, otherwise
/// [`BackendError::Status`] carrying the backend's description.
pub async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, BackendError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    Err(BackendError::Status {
        status,
        message: error_message(&body),
    })
}

/// Extract a human-readable message from an error body.
///
/// The backend reports errors as `{"Description": ...}` or
/// `{"description": ...}`; other bodies are passed through as-is.
pub fn error_message(body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        for key in ["Description", "description", "message", "error"] {
            if let Some(Value::String(message)) = map.get(key)
                && !message.is_empty()
            {
                return message.clone();
            }
        }
    }
    body.trim().to_string()
}

/// Decode a response body as JSON. An empty body decodes to `null`.
pub fn decode_body(body: &str) -> Result<Value, BackendError> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body).map_err(|e| BackendError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_response(status: u16, body: &'static str) -> reqwest::Response {
        reqwest::Response::from(::http::Response::builder().status(status).body(body).unwrap())
    }

    #[tokio::test]
    async fn check_response_passes_success() {
        let resp = check_response(mock_response(200, "{}")).await.unwrap();
        assert_eq!(resp.status().as_u16(), 200);
    }

    #[tokio::test]
    async fn check_response_maps_description() {
        let err = check_response(mock_response(
            400,
            r#"{"Description": "No recent run for ccf plans"}"#,
        ))
        .await
        .unwrap_err();
        match err {
            BackendError::Status { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "No recent run for ccf plans");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn error_message_falls_back_to_body() {
        assert_eq!(error_message("upstream exploded\n"), "upstream exploded");
        assert_eq!(error_message(r#"{"description": "unknown plan"}"#), "unknown plan");
    }

    #[test]
    fn decode_empty_body_is_null() {
        assert_eq!(decode_body("").unwrap(), Value::Null);
        assert!(matches!(decode_body("<html>"), Err(BackendError::Decode(_))));
    }
}
