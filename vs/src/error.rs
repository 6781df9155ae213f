//! Client error types

use reqsched::SchedulerError;
use thiserror::Error;

/// Errors surfaced by the upstream client
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Login failed: {0}")]
    LoginFailed(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP client setup failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl ClientError {
    /// HTTP status behind this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::Scheduler(err) => err.status(),
            _ => None,
        }
    }

    /// Number of dispatches the scheduler made before giving up
    pub fn attempts(&self) -> Option<u32> {
        match self {
            ClientError::Scheduler(err) => err.attempts(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqsched::{Response, TransportError};

    #[test]
    fn test_status() {
        let err = ClientError::Status {
            status: 404,
            url: "https://example.com/x".to_string(),
        };
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.to_string(), "HTTP 404 from https://example.com/x");

        let err: ClientError = SchedulerError::Response {
            attempts: 4,
            status: 503,
            url: "u".to_string(),
            response: Box::new(Response::new(503, "u")),
        }
        .into();
        assert_eq!(err.status(), Some(503));
        assert_eq!(err.attempts(), Some(4));

        assert_eq!(ClientError::LoginFailed("no cookie".to_string()).status(), None);
    }

    #[test]
    fn test_transparent_scheduler_message() {
        let inner = SchedulerError::Transport {
            attempts: 1,
            source: TransportError::timeout("slow"),
        };
        let expected = inner.to_string();
        let err = ClientError::from(inner);
        assert_eq!(err.to_string(), expected);
        assert_eq!(err.attempts(), Some(1));
    }
}
