//! Request executor error types

use std::time::Duration;
use thiserror::Error;

/// Network-layer failure category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Timeout,
    ConnectionReset,
    ConnectionRefused,
    ConnectionAborted,
    NetworkLost,
    Dns,
    NotConnected,
    Tls,
    Other,
}

impl TransportErrorKind {
    /// The fixed set of transport failures worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout
                | Self::ConnectionReset
                | Self::ConnectionRefused
                | Self::ConnectionAborted
                | Self::NetworkLost
                | Self::Dns
                | Self::NotConnected
        )
    }
}

/// Failure below the HTTP layer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind:?}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

/// Errors surfaced by the request executor
///
/// Retryable variants are only returned after the retry budget is spent.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Invalid request: {0}")]
    InvalidInput(String),

    #[error("Transport failure: {0}")]
    TransportFailure(TransportError),

    #[error("Upstream error {status}: {body}")]
    UpstreamError { status: u16, body: String },

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Request cancelled")]
    Cancelled,
}

impl RequestError {
    /// Check if this error class is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            RequestError::UpstreamError { status, .. } => is_retryable_status(*status),
            RequestError::TransportFailure(e) => e.is_retryable(),
            RequestError::Timeout(_) => true,
            RequestError::InvalidEndpoint(_)
            | RequestError::InvalidInput(_)
            | RequestError::MalformedResponse(_)
            | RequestError::Cancelled => false,
        }
    }

    /// HTTP status if the upstream answered
    pub fn status(&self) -> Option<u16> {
        match self {
            RequestError::UpstreamError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Map a transport failure into the surfaced error
    pub(crate) fn from_transport(err: TransportError, timeout: Duration) -> Self {
        if err.kind == TransportErrorKind::Timeout {
            RequestError::Timeout(timeout)
        } else {
            RequestError::TransportFailure(err)
        }
    }
}

/// 429 and 5xx are retried; every other non-2xx is final
pub fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..=599).contains(&status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_status() {
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(500));
        assert!(is_retryable_status(503));
        assert!(is_retryable_status(599));
        assert!(!is_retryable_status(400));
        assert!(!is_retryable_status(401));
        assert!(!is_retryable_status(404));
        assert!(!is_retryable_status(408));
    }

    #[test]
    fn test_is_retryable() {
        assert!(
            RequestError::UpstreamError {
                status: 502,
                body: "Bad gateway".to_string()
            }
            .is_retryable()
        );
        assert!(
            !RequestError::UpstreamError {
                status: 400,
                body: "Bad request".to_string()
            }
            .is_retryable()
        );
        assert!(RequestError::Timeout(Duration::from_secs(30)).is_retryable());
        assert!(
            RequestError::TransportFailure(TransportError::new(TransportErrorKind::Dns, "lookup failed"))
                .is_retryable()
        );
        assert!(
            !RequestError::TransportFailure(TransportError::new(TransportErrorKind::Tls, "bad cert")).is_retryable()
        );
        assert!(!RequestError::MalformedResponse("Bad JSON".to_string()).is_retryable());
        assert!(!RequestError::InvalidInput("empty prompt".to_string()).is_retryable());
        assert!(!RequestError::Cancelled.is_retryable());
    }

    #[test]
    fn test_from_transport_maps_timeout() {
        let timeout = Duration::from_secs(5);
        let err = RequestError::from_transport(TransportError::new(TransportErrorKind::Timeout, "slow"), timeout);
        assert!(matches!(err, RequestError::Timeout(d) if d == timeout));

        let err = RequestError::from_transport(
            TransportError::new(TransportErrorKind::ConnectionReset, "reset"),
            timeout,
        );
        assert!(matches!(err, RequestError::TransportFailure(_)));
    }

    #[test]
    fn test_status() {
        let err = RequestError::UpstreamError {
            status: 429,
            body: String::new(),
        };
        assert_eq!(err.status(), Some(429));
        assert_eq!(RequestError::Cancelled.status(), None);
    }
}
