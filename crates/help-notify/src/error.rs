//! Error types for the help-notify crate.

use thiserror::Error;

/// Errors raised by notification channels and the subscription store.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// HTTP client construction or a request failed.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A channel is missing required configuration.
    #[error("channel not configured: {0}")]
    NotConfigured(String),

    /// Building a VAPID token failed.
    #[error("vapid signing failed: {0}")]
    Signing(String),

    /// A push endpoint is not a usable URL.
    #[error("invalid push endpoint '{endpoint}': {reason}")]
    InvalidEndpoint {
        /// The endpoint as given.
        endpoint: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A subscription is missing a required field.
    #[error("invalid subscription: missing {field}")]
    InvalidSubscription {
        /// The missing field.
        field: &'static str,
    },

    /// The subscription file could not be written.
    #[error("persistence error: {0}")]
    Persist(#[from] help_persist::PersistError),
}

impl From<jsonwebtoken::errors::Error> for NotifyError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Signing(err.to_string())
    }
}

/// Result type for notification operations.
pub type Result<T> = std::result::Result<T, NotifyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_invalid_subscription() {
        let err = NotifyError::InvalidSubscription { field: "endpoint" };
        assert_eq!(err.to_string(), "invalid subscription: missing endpoint");
    }

    #[test]
    fn error_display_not_configured() {
        let err = NotifyError::NotConfigured("no targets".to_string());
        assert_eq!(err.to_string(), "channel not configured: no targets");
    }

    #[test]
    fn error_display_invalid_endpoint() {
        let err = NotifyError::InvalidEndpoint {
            endpoint: "nope".to_string(),
            reason: "relative URL without a base".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid push endpoint 'nope': relative URL without a base"
        );
    }

    #[test]
    fn error_from_jsonwebtoken() {
        let jwt_err = jsonwebtoken::EncodingKey::from_ec_pem(b"not a pem")
            .err()
            .expect("garbage pem should be rejected");
        let err: NotifyError = jwt_err.into();
        assert!(matches!(err, NotifyError::Signing(_)));
    }
}
