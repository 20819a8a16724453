//! HTTP error mapping utilities

use crate::error::RelayError;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

/// Map a non-success status and its body to a `RelayError`
pub fn map_http_error(status: StatusCode, body: Option<String>, request_id: Uuid) -> RelayError {
    let error_message = body
        .as_deref()
        .and_then(|b| serde_json::from_str::<Value>(b).ok())
        .and_then(|v| extract_error_message(&v))
        .or_else(|| body.filter(|b| !b.trim().is_empty()))
        .unwrap_or_else(|| format!("HTTP error {}", status.as_u16()));

    RelayError::UpstreamStatus {
        status: status.as_u16(),
        message: format!("{} [request_id: {}]", error_message, request_id),
    }
}

/// Map a transport-level reqwest failure
pub fn map_transport_error(err: reqwest::Error, timeout: Duration, request_id: Uuid) -> RelayError {
    if err.is_timeout() {
        RelayError::Timeout {
            seconds: timeout.as_secs(),
        }
    } else if err.is_connect() {
        RelayError::Network {
            message: format!("Connection failed: {} [request_id: {}]", err, request_id),
        }
    } else {
        RelayError::Network {
            message: format!("{} [request_id: {}]", err, request_id),
        }
    }
}

/// Extract a human readable message from a provider error body
fn extract_error_message(json: &Value) -> Option<String> {
    // OpenAI format: { "error": { "message": "...", "type": "...", "code": "..." } }
    if let Some(message) = json
        .get("error")
        .and_then(|error| error.get("message"))
        .and_then(|v| v.as_str())
    {
        return Some(message.to_string());
    }

    // Generic format: { "message": "..." } or { "error": "..." }
    if let Some(message) = json.get("message").and_then(|v| v.as_str()) {
        return Some(message.to_string());
    }

    json.get("error")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_error_body() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
        let err = map_http_error(StatusCode::UNAUTHORIZED, Some(body.to_string()), Uuid::nil());
        match err {
            RelayError::UpstreamStatus { status, message } => {
                assert_eq!(status, 401);
                assert!(message.starts_with("Incorrect API key provided"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_plain_text_body() {
        let err = map_http_error(
            StatusCode::BAD_GATEWAY,
            Some("upstream overloaded".to_string()),
            Uuid::nil(),
        );
        assert!(err.to_string().contains("upstream overloaded"));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_empty_body_falls_back_to_status() {
        let err = map_http_error(StatusCode::NOT_FOUND, Some(String::new()), Uuid::nil());
        assert!(err.to_string().contains("HTTP error 404"));
    }
}
