//! Errors surfaced by the connection layer.

use std::time::Duration;

use ensemble_client_core::{EnsembleError, SessionError};
use thiserror::Error;

/// Connection error.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Disconnected longer than the connection timeout with no pending
    /// address change.
    #[error(
        "Connection timed out for connection string ({connection_string}) and timeout ({timeout:?}) / elapsed ({elapsed:?})"
    )]
    TimedOut {
        connection_string: String,
        timeout: Duration,
        elapsed: Duration,
    },

    /// A failure captured while rebuilding the session in the background,
    /// replayed to the next `get_session` caller.
    #[error("Background failure: {0}")]
    Background(#[source] Box<ConnectionError>),

    /// Releasing the ensemble provider or the session failed.
    #[error("Close failed (ensemble: {ensemble:?}, session: {session:?})")]
    Close {
        ensemble: Option<EnsembleError>,
        session: Option<SessionError>,
    },

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Ensemble error: {0}")]
    Ensemble(#[from] EnsembleError),

    #[error("Connection is closed")]
    Closed,
}

impl ConnectionError {
    /// Whether this is the connection timeout failure.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }

    /// Whether this failure was captured in the background.
    #[must_use]
    pub const fn is_background(&self) -> bool {
        matches!(self, Self::Background(_))
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_timeout_message() {
        let err = ConnectionError::TimedOut {
            connection_string: "zk1:2181".into(),
            timeout: Duration::from_secs(5),
            elapsed: Duration::from_secs(6),
        };
        assert!(err.is_timeout());
        assert!(err.to_string().contains("zk1:2181"));
    }

    #[test]
    fn test_background_keeps_source() {
        let err = ConnectionError::Background(Box::new(ConnectionError::Session(
            SessionError::Create("refused".into()),
        )));
        assert!(err.is_background());
        assert!(!err.is_timeout());
        let source = err.source().unwrap();
        assert!(source.to_string().contains("refused"));
    }
}
