//! Client error types

use autobid_core::{CoreError, ValidationError};
use std::sync::Arc;
use thiserror::Error;

/// Client error types
///
/// Cloneable so a single refresh outcome can be handed to every request that
/// was waiting on it.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// Network or transport failure before a response arrived
    #[error("Request failed: {0}")]
    Request(Arc<reqwest::Error>),

    /// Login or registration rejected by the backend
    #[error("Authentication failed: {0}")]
    AuthFailure(String),

    /// The backend omitted the user id from an authentication response
    #[error("{0}")]
    IdentityMissing(String),

    /// A refresh was attempted with no refresh token persisted
    #[error("No refresh token available")]
    NoRefreshToken,

    /// The backend answered 401
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The operation needs a logged-in session and there is none
    #[error("Not authenticated: log in first")]
    NotAuthenticated,

    /// Forbidden
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Payload rejected, either locally or by the backend
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Server returned an error status
    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    /// Response body did not match the expected shape
    #[error("Invalid response body: {0}")]
    Decode(Arc<serde_json::Error>),

    /// Session persistence failed
    #[error("Session storage error: {0}")]
    Storage(#[from] CoreError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl ClientError {
    /// Create error from HTTP status code
    pub fn from_status(status: reqwest::StatusCode, message: String) -> Self {
        match status.as_u16() {
            400 | 422 => Self::Validation(message),
            401 => Self::Unauthorized(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            _ => Self::ServerError {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// Whether this error is a 401 from the backend
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    /// Whether the backend produced a response carrying this error
    pub const fn is_backend_rejection(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized(_)
                | Self::Forbidden(_)
                | Self::NotFound(_)
                | Self::Validation(_)
                | Self::ServerError { .. }
        )
    }

    /// Transport failures and non-auth error statuses
    pub const fn is_network_or_server(&self) -> bool {
        matches!(
            self,
            Self::Request(_)
                | Self::Forbidden(_)
                | Self::NotFound(_)
                | Self::ServerError { .. }
                | Self::Decode(_)
        )
    }

    /// The backend-provided message, if this error came from a response
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            Self::Unauthorized(m)
            | Self::Forbidden(m)
            | Self::NotFound(m)
            | Self::Validation(m)
            | Self::ServerError { message: m, .. } => Some(m),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Request(Arc::new(err))
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(Arc::new(err))
    }
}

impl From<ValidationError> for ClientError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Pick the human-readable message out of an error response body
///
/// The backend reports errors as `{ "message": "..." }`; anything else is
/// passed through as text, and an empty body falls back to the status reason.
pub fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    let backend_message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("message")?.as_str().map(str::to_string))
        .filter(|message| !message.is_empty());
    if let Some(message) = backend_message {
        return message;
    }

    let body = body.trim();
    if body.is_empty() {
        status
            .canonical_reason()
            .map_or_else(|| status.to_string(), str::to_string)
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_mapping() {
        assert!(matches!(
            ClientError::from_status(StatusCode::BAD_REQUEST, "bad".into()),
            ClientError::Validation(_)
        ));
        assert!(matches!(
            ClientError::from_status(StatusCode::UNPROCESSABLE_ENTITY, "bad".into()),
            ClientError::Validation(_)
        ));
        assert!(ClientError::from_status(StatusCode::UNAUTHORIZED, "no".into()).is_unauthorized());
        assert!(matches!(
            ClientError::from_status(StatusCode::SERVICE_UNAVAILABLE, "down".into()),
            ClientError::ServerError { status: 503, .. }
        ));
    }

    #[test]
    fn test_error_message_prefers_backend_message() {
        let status = StatusCode::BAD_REQUEST;
        assert_eq!(
            error_message(status, r#"{"message":"Bid too low"}"#),
            "Bid too low"
        );
        assert_eq!(error_message(status, "plain text"), "plain text");
        assert_eq!(error_message(status, ""), "Bad Request");
        assert_eq!(
            error_message(status, r#"{"errors":{"amount":["required"]}}"#),
            r#"{"errors":{"amount":["required"]}}"#
        );
    }

    #[test]
    fn test_classification() {
        assert!(ClientError::NotFound("x".into()).is_network_or_server());
        assert!(!ClientError::Unauthorized("x".into()).is_network_or_server());
        assert!(!ClientError::NoRefreshToken.is_backend_rejection());
        assert_eq!(
            ClientError::Validation("Bid too low".into()).backend_message(),
            Some("Bid too low")
        );
    }
}
