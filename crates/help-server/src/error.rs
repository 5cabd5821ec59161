//! Error types for the help server.

use std::net::SocketAddr;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use help_notify::NotifyError;
use serde::Serialize;
use thiserror::Error;

/// Result type alias for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the help server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The shared secret did not match.
    #[error("Invalid Application Token!")]
    Unauthorized,

    /// A request body was malformed or incomplete.
    #[error("invalid request: {0}")]
    Validation(String),

    /// An admin command other than `acknowledge`.
    #[error("Invalid command.")]
    InvalidCommand,

    /// Resource not found or not configured.
    #[error("{0} not found")]
    NotFound(String),

    /// Startup configuration is unusable.
    #[error("configuration error: {0}")]
    Config(String),

    /// Failed to bind to the specified address.
    #[error("failed to bind to {0}: {1}")]
    BindFailed(SocketAddr, std::io::Error),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: &'static str,
    message: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Validation(_) | Self::InvalidCommand => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Config(_) | Self::BindFailed(_, _) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = ErrorResponse {
            status: "error",
            message: self.to_string(),
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<NotifyError> for ServerError {
    fn from(err: NotifyError) -> Self {
        match err {
            NotifyError::InvalidSubscription { .. } => Self::Validation(err.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use test_case::test_case;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn unauthorized_response() {
        let response = ServerError::Unauthorized.into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["status"], "error");
        assert_eq!(json["message"], "Invalid Application Token!");
    }

    #[test_case(ServerError::Validation("x".into()), StatusCode::BAD_REQUEST ; "validation")]
    #[test_case(ServerError::InvalidCommand, StatusCode::BAD_REQUEST ; "invalid command")]
    #[test_case(ServerError::NotFound("push key".into()), StatusCode::NOT_FOUND ; "not found")]
    #[test_case(ServerError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR ; "internal")]
    fn status_mapping(err: ServerError, expected: StatusCode) {
        assert_eq!(err.into_response().status(), expected);
    }

    #[test]
    fn subscription_errors_are_validation() {
        let err: ServerError = NotifyError::InvalidSubscription { field: "keys" }.into();
        assert!(matches!(err, ServerError::Validation(_)));

        let err: ServerError = NotifyError::NotConfigured("x".into()).into();
        assert!(matches!(err, ServerError::Internal(_)));
    }

    #[test]
    fn error_display() {
        assert_eq!(ServerError::InvalidCommand.to_string(), "Invalid command.");
        assert_eq!(
            ServerError::NotFound("push public key".into()).to_string(),
            "push public key not found"
        );
    }
}
