// src/error.rs

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Client-side error taxonomy.
/// Every backend failure is converted into exactly one of these kinds at the call site.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    // Timeout, unreachable host, 5xx, unreadable body. Recoverable.
    #[error("network error: {0}")]
    Network(String),

    // 401 or expired/missing credential. Forces re-login.
    #[error("authentication required: {0}")]
    Auth(String),

    // 409 on start: the user already has a completed attempt.
    #[error("final exam already taken: {0}")]
    AlreadyTaken(String),

    // 400/403/422 or a payload rejected locally.
    #[error("invalid request: {0}")]
    Validation(String),

    // 404
    #[error("not found: {0}")]
    NotFound(String),
}

impl ClientError {
    /// Maps a non-success HTTP status and its body to an error kind.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = extract_message(body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string()
        });

        match status {
            StatusCode::UNAUTHORIZED => ClientError::Auth(message),
            StatusCode::NOT_FOUND => ClientError::NotFound(message),
            StatusCode::CONFLICT => ClientError::AlreadyTaken(message),
            StatusCode::BAD_REQUEST | StatusCode::FORBIDDEN | StatusCode::UNPROCESSABLE_ENTITY => {
                ClientError::Validation(message)
            }
            _ => {
                tracing::error!("Unexpected server response {}: {}", status, message);
                ClientError::Network(format!("server responded {}: {}", status.as_u16(), message))
            }
        }
    }

    /// Only transport-level failures are worth retrying as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Network(_))
    }

    pub fn requires_login(&self) -> bool {
        matches!(self, ClientError::Auth(_))
    }
}

/// Error body shapes returned by the backend: `{"detail": "..."}` or `{"error": "..."}`.
/// Validation failures may carry `detail` as a list of objects with a `msg` field.
#[derive(Deserialize)]
struct ErrorBody {
    detail: Option<serde_json::Value>,
    error: Option<String>,
}

fn extract_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;

    if let Some(error) = parsed.error {
        return Some(error);
    }

    match parsed.detail? {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Array(items) => {
            let joined = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                .collect::<Vec<_>>()
                .join("; ");
            (!joined.is_empty()).then_some(joined)
        }
        other => Some(other.to_string()),
    }
}

/// Converts `reqwest::Error` into `ClientError::Network`.
/// Timeouts take the same path as any other transport failure.
impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Network("request timed out".to_string())
        } else if err.is_decode() {
            ClientError::Network(format!("unreadable response: {}", err))
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Network(format!("unreadable response: {}", err))
    }
}
