//! Error taxonomy for the relay endpoints
//!
//! Client-caused failures (bad input, rejected history) map to 400 and are
//! not logged as server faults. Upstream failures map to 500, are logged
//! with full detail, and surface only the upstream's message text to the
//! caller.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::upstream::UpstreamError;

/// JSON error payload returned on every non-2xx response
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Failures a request handler can produce
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Request shape violation, caught before any upstream call
    #[error("{0}")]
    Validation(String),

    /// Malformed conversation history, caught before any upstream call
    #[error("invalid chat history: {0}")]
    InvalidHistory(String),

    /// The upstream rejected the translated history as malformed.
    /// Caller-supplied state caused this, so it is a client error.
    #[error("the model rejected the conversation history; reset the chat and try again ({message})")]
    HistoryRejected { message: String },

    /// Any other upstream failure during call initiation
    #[error("the model request failed: {0}")]
    Upstream(UpstreamError),
}

impl RelayError {
    /// Classify an initiation failure from the backend.
    pub fn from_upstream(err: UpstreamError) -> Self {
        if err.is_history_rejection() {
            let message = match err {
                UpstreamError::Api { message, .. } => message,
                other => other.to_string(),
            };
            RelayError::HistoryRejected { message }
        } else {
            RelayError::Upstream(err)
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            RelayError::Validation(_) | RelayError::InvalidHistory(_) => StatusCode::BAD_REQUEST,
            RelayError::HistoryRejected { .. } => StatusCode::BAD_REQUEST,
            RelayError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        match &self {
            RelayError::Validation(_) | RelayError::InvalidHistory(_) => {
                tracing::debug!(error = %self, "Rejected request");
            }
            RelayError::HistoryRejected { message } => {
                tracing::warn!(upstream_message = %message, "Upstream rejected chat history");
            }
            RelayError::Upstream(err) => {
                tracing::error!(error = %err, "Upstream call failed");
            }
        }

        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_rejection_classifies_as_client_error() {
        let err = RelayError::from_upstream(UpstreamError::Api {
            status: 400,
            message: "First content should be with role 'user', got model".to_string(),
        });
        assert!(matches!(err, RelayError::HistoryRejected { .. }));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_transient_upstream_is_server_error() {
        let err = RelayError::from_upstream(UpstreamError::Api {
            status: 429,
            message: "Resource has been exhausted".to_string(),
        });
        assert!(matches!(err, RelayError::Upstream(_)));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_validation_is_client_error() {
        let err = RelayError::Validation("article context is required".to_string());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "article context is required");
    }
}
