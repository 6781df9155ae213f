//! Scheduler error types

use std::fmt;

use thiserror::Error;

use crate::request::Response;

/// Classification of a failed HTTP execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Peer reset the connection; always treated as transient
    ConnectionReset,
    Timeout,
    Connect,
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionReset => write!(f, "connection reset"),
            Self::Timeout => write!(f, "timeout"),
            Self::Connect => write!(f, "connect"),
            Self::Other => write!(f, "transport"),
        }
    }
}

/// Failure reported by an executor instead of a response
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} error: {message}")]
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

    pub fn connection_reset(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::ConnectionReset, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Other, message)
    }

    /// Check if this error is retried regardless of the task's predicate
    pub fn is_connection_reset(&self) -> bool {
        self.kind == TransportErrorKind::ConnectionReset
    }
}

/// Terminal outcome of a submitted request that did not succeed
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Request failed after {attempts} attempt(s): {source}")]
    Transport {
        attempts: u32,
        #[source]
        source: TransportError,
    },

    #[error("Unsatisfactory response {status} from {url} after {attempts} attempt(s)")]
    Response {
        attempts: u32,
        status: u16,
        url: String,
        response: Box<Response>,
    },

    #[error("Scheduler closed")]
    Closed,
}

impl SchedulerError {
    /// Number of dispatches made before giving up
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::Transport { attempts, .. } | Self::Response { attempts, .. } => Some(*attempts),
            Self::Closed => None,
        }
    }

    /// HTTP status of the last unsatisfactory response
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Response { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The last unsatisfactory response, if the failure was HTTP-level
    pub fn response(&self) -> Option<&Response> {
        match self {
            Self::Response { response, .. } => Some(response),
            _ => None,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_connection_reset() {
        assert!(TransportError::connection_reset("ECONNRESET").is_connection_reset());
        assert!(!TransportError::timeout("30s elapsed").is_connection_reset());
        assert!(!TransportError::new(TransportErrorKind::Connect, "refused").is_connection_reset());
    }

    #[test]
    fn test_transport_display() {
        let err = TransportError::connection_reset("peer hung up");
        assert_eq!(err.to_string(), "connection reset error: peer hung up");
    }

    #[test]
    fn test_scheduler_error_accessors() {
        let err = SchedulerError::Response {
            attempts: 4,
            status: 503,
            url: "https://example.com/".to_string(),
            response: Box::new(Response::new(503, "https://example.com/")),
        };
        assert_eq!(err.attempts(), Some(4));
        assert_eq!(err.status(), Some(503));
        assert_eq!(err.response().map(|r| r.status), Some(503));
        assert!(err.to_string().contains("503"));

        let err = SchedulerError::Transport {
            attempts: 1,
            source: TransportError::timeout("slow"),
        };
        assert_eq!(err.attempts(), Some(1));
        assert_eq!(err.status(), None);
        assert!(std::error::Error::source(&err).is_some());

        assert!(SchedulerError::Closed.is_closed());
        assert_eq!(SchedulerError::Closed.attempts(), None);
    }
}
