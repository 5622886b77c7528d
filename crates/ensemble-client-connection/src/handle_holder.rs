//! Owner of the single live session handle.

use std::{
    sync::{
        Arc, PoisonError, RwLock,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use ensemble_client_core::{EnsembleProvider, SessionError, SessionFactory, Watcher};
use tokio::time::Instant;

use crate::ConnectionError;

/// A session plus the address it was built against.
struct Handle<S> {
    session: Arc<S>,
    connection_string: String,
    created_at: Instant,
}

/// Holds at most one session and rebuilds it on demand.
///
/// A new session is fully created before it is published, so a concurrent
/// [`HandleHolder::current`] sees either the old handle or the new one.
pub struct HandleHolder<F: SessionFactory> {
    factory: Arc<F>,
    ensemble: Arc<dyn EnsembleProvider>,
    sink: Arc<dyn Watcher>,
    session_timeout: Duration,
    handle: RwLock<Option<Arc<Handle<F::Session>>>>,
    closed: AtomicBool,
}

impl<F: SessionFactory> HandleHolder<F> {
    /// Create an empty holder. No session exists until `current` is called.
    #[must_use]
    pub fn new(
        factory: Arc<F>,
        ensemble: Arc<dyn EnsembleProvider>,
        sink: Arc<dyn Watcher>,
        session_timeout: Duration,
    ) -> Self {
        Self {
            factory,
            ensemble,
            sink,
            session_timeout,
            handle: RwLock::new(None),
            closed: AtomicBool::new(false),
        }
    }

    /// The current session, creating one against the latest address if
    /// none exists. Creation only initiates the connection.
    ///
    /// # Errors
    /// Returns error if the holder is closed or session creation fails.
    pub fn current(&self) -> Result<Arc<F::Session>, ConnectionError> {
        if let Some(handle) = self.load() {
            return Ok(Arc::clone(&handle.session));
        }
        if self.closed.load(Ordering::SeqCst) {
            return Err(ConnectionError::Closed);
        }

        let connection_string = self.ensemble.current_address();
        tracing::debug!(%connection_string, "Creating session");
        let session = self.factory.create(
            &connection_string,
            self.session_timeout,
            Arc::clone(&self.sink),
        )?;
        let fresh = Arc::new(Handle {
            session: Arc::new(session),
            connection_string,
            created_at: Instant::now(),
        });

        let mut slot = self.handle.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = slot.as_ref() {
            // Lost a creation race; keep the published one.
            let existing = Arc::clone(&existing.session);
            drop(slot);
            self.close_quietly(&fresh);
            return Ok(existing);
        }
        if self.closed.load(Ordering::SeqCst) {
            drop(slot);
            self.close_quietly(&fresh);
            return Err(ConnectionError::Closed);
        }
        *slot = Some(Arc::clone(&fresh));
        Ok(Arc::clone(&fresh.session))
    }

    /// Whether the ensemble now reports a different address than the one
    /// the current session was built against. False when no session exists.
    #[must_use]
    pub fn has_new_connection_string(&self) -> bool {
        self.load()
            .is_some_and(|h| h.connection_string != self.ensemble.current_address())
    }

    /// Address the current session was built against.
    #[must_use]
    pub fn connection_string(&self) -> Option<String> {
        self.load().map(|h| h.connection_string.clone())
    }

    /// When the current session was created.
    #[must_use]
    pub fn session_created_at(&self) -> Option<Instant> {
        self.load().map(|h| h.created_at)
    }

    /// Close the current session, ignoring close failures, and clear it so
    /// the next `current` builds a fresh one.
    pub fn close_and_reset(&self) {
        if let Some(old) = self.take() {
            self.close_quietly(&old);
        }
    }

    /// Close the current session for good. Later `current` calls fail with
    /// [`ConnectionError::Closed`].
    ///
    /// # Errors
    /// Returns the session's close failure.
    pub fn close_and_clear(&self) -> Result<(), SessionError> {
        self.closed.store(true, Ordering::SeqCst);
        match self.take() {
            Some(old) => self.factory.close(&old.session),
            None => Ok(()),
        }
    }

    fn load(&self) -> Option<Arc<Handle<F::Session>>> {
        self.handle
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn take(&self) -> Option<Arc<Handle<F::Session>>> {
        self.handle
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn close_quietly(&self, handle: &Handle<F::Session>) {
        if let Err(e) = self.factory.close(&handle.session) {
            tracing::warn!(
                connection_string = %handle.connection_string,
                error = %e,
                "Failed to close session"
            );
        }
    }
}
