//! Core traits for the collaborators a connection depends on.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use thiserror::Error;

use crate::WatchedEvent;

/// Address provider error.
#[derive(Debug, Error)]
pub enum EnsembleError {
    #[error("Ensemble provider failed to start: {0}")]
    Start(String),
    #[error("Ensemble provider failed to close: {0}")]
    Close(String),
}

/// Session factory error.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Invalid connection string: {0}")]
    InvalidConnectionString(String),
    #[error("Session creation failed: {0}")]
    Create(String),
    #[error("Session close failed: {0}")]
    Close(String),
}

/// Source of the ensemble's current address.
///
/// Polled on every notification, so `current_address` must stay cheap.
#[async_trait]
pub trait EnsembleProvider: Send + Sync {
    /// Begin resolving the ensemble (discovery, polling, ...).
    async fn start(&self) -> Result<(), EnsembleError>;

    /// The connection string the next session should use.
    fn current_address(&self) -> String;

    /// Release anything `start` acquired.
    async fn close(&self) -> Result<(), EnsembleError>;
}

/// Receiver of raw connectivity notifications.
///
/// Implementations must not block: they run on the transport's event path.
pub trait Watcher: Send + Sync {
    /// Handle one notification.
    fn process(&self, event: &WatchedEvent);
}

impl<F> Watcher for F
where
    F: Fn(&WatchedEvent) + Send + Sync,
{
    fn process(&self, event: &WatchedEvent) {
        self(event);
    }
}

/// Creates and closes protocol sessions.
///
/// `create` only initiates the connection; liveness is reported later
/// through `sink`.
pub trait SessionFactory: Send + Sync + 'static {
    /// Opaque live session.
    type Session: Send + Sync + 'static;

    /// Start a session against `connection_string`.
    ///
    /// # Errors
    /// Returns error if the session cannot be initiated.
    fn create(
        &self,
        connection_string: &str,
        session_timeout: Duration,
        sink: Arc<dyn Watcher>,
    ) -> Result<Self::Session, SessionError>;

    /// Close a session. Callers treat failures as best-effort.
    ///
    /// # Errors
    /// Returns error if the session did not shut down cleanly.
    fn close(&self, session: &Self::Session) -> Result<(), SessionError>;
}
