//! Distance Matrix error types

use thiserror::Error;

use crate::models::{ClientResponse, DistanceMatrixResponse};

/// Errors that can occur while building, submitting or completing a request
///
/// `InvalidQuery` and `Configuration` are returned synchronously, before any
/// transport attempt. Every other variant is delivered through the
/// completion channel of a [`PendingRequest`](crate::PendingRequest).
#[derive(Debug, Clone, Error)]
pub enum DistanceMatrixError {
    /// The query violates a request invariant
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Client configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Connection to the service failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The service answered with a transient server error (500, 503, 504)
    #[error("Service unavailable: HTTP {status}")]
    ServiceUnavailable {
        /// HTTP status returned by the service
        status: u16,
    },

    /// HTTP request failed for a non-transient reason
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Failed to parse the response body
    #[error("Parse error: {0}")]
    ParseError(String),

    /// No response arrived within the configured window
    #[error("Request timed out after {timeout_ms} ms")]
    Timeout {
        /// The timeout in milliseconds, measured from submission
        timeout_ms: u64,
    },

    /// Transport succeeded but the payload carries a non-`OK` status
    #[error("{}", status_message(.0))]
    Status(Box<ClientResponse<DistanceMatrixResponse>>),
}

/// Coarse outcome classification for callers that branch on kind first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    /// Payload status `OK`
    Success,
    /// Payload status other than `OK`
    Status,
    /// No response within the configured window
    Timeout,
    /// Connection, HTTP or decoding failure
    Transport,
    /// Rejected before submission
    Validation,
}

fn status_message(response: &ClientResponse<DistanceMatrixResponse>) -> String {
    response.json.error_message.as_deref().map_or_else(
        || format!("Service returned status {}", response.json.status),
        |msg| format!("Service returned status {}: {msg}", response.json.status),
    )
}

impl DistanceMatrixError {
    /// Returns true if a single automatic retry is allowed for this error
    ///
    /// Timeouts and domain statuses are never retried.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed(_) | Self::ServiceUnavailable { .. }
        )
    }

    /// Classify this error into an outcome kind
    #[must_use]
    pub const fn kind(&self) -> OutcomeKind {
        match self {
            Self::InvalidQuery(_) | Self::Configuration(_) => OutcomeKind::Validation,
            Self::Timeout { .. } => OutcomeKind::Timeout,
            Self::Status(_) => OutcomeKind::Status,
            Self::ConnectionFailed(_)
            | Self::ServiceUnavailable { .. }
            | Self::RequestFailed(_)
            | Self::ParseError(_) => OutcomeKind::Transport,
        }
    }

    /// The response envelope, if this is a domain status error
    #[must_use]
    pub fn response(&self) -> Option<&ClientResponse<DistanceMatrixResponse>> {
        match self {
            Self::Status(response) => Some(response.as_ref()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::models::TopLevelStatus;

    fn status_error(status: TopLevelStatus, message: Option<&str>) -> DistanceMatrixError {
        DistanceMatrixError::Status(Box::new(ClientResponse {
            status: 200,
            headers: HashMap::new(),
            json: DistanceMatrixResponse {
                status,
                error_message: message.map(str::to_string),
                ..DistanceMatrixResponse::default()
            },
        }))
    }

    #[test]
    fn test_transient_errors() {
        assert!(DistanceMatrixError::ConnectionFailed("reset".to_string()).is_transient());
        assert!(DistanceMatrixError::ServiceUnavailable { status: 503 }.is_transient());
    }

    #[test]
    fn test_non_transient_errors() {
        assert!(!DistanceMatrixError::Timeout { timeout_ms: 100 }.is_transient());
        assert!(!DistanceMatrixError::InvalidQuery("x".to_string()).is_transient());
        assert!(!DistanceMatrixError::ParseError("x".to_string()).is_transient());
        assert!(!DistanceMatrixError::RequestFailed("HTTP 404".to_string()).is_transient());
        assert!(!status_error(TopLevelStatus::OverQueryLimit, None).is_transient());
        assert!(!status_error(TopLevelStatus::UnknownError, None).is_transient());
    }

    #[test]
    fn test_kind() {
        assert_eq!(
            DistanceMatrixError::Timeout { timeout_ms: 1 }.kind(),
            OutcomeKind::Timeout
        );
        assert_eq!(
            DistanceMatrixError::ServiceUnavailable { status: 500 }.kind(),
            OutcomeKind::Transport
        );
        assert_eq!(
            DistanceMatrixError::InvalidQuery("x".to_string()).kind(),
            OutcomeKind::Validation
        );
        assert_eq!(
            status_error(TopLevelStatus::RequestDenied, None).kind(),
            OutcomeKind::Status
        );
    }

    #[test]
    fn test_error_display() {
        let err = DistanceMatrixError::Timeout { timeout_ms: 2500 };
        assert!(err.to_string().contains("2500"));

        let err = status_error(TopLevelStatus::RequestDenied, Some("The provided API key is invalid."));
        let msg = err.to_string();
        assert!(msg.contains("REQUEST_DENIED"));
        assert!(msg.contains("API key is invalid"));

        let err = status_error(TopLevelStatus::OverDailyLimit, None);
        assert!(err.to_string().contains("OVER_DAILY_LIMIT"));
    }

    #[test]
    fn test_response_accessor() {
        let err = status_error(TopLevelStatus::MaxElementsExceeded, None);
        let response = err.response().unwrap();
        assert_eq!(response.json.status, TopLevelStatus::MaxElementsExceeded);

        assert!(DistanceMatrixError::Timeout { timeout_ms: 1 }.response().is_none());
    }
}
