//! Connection state machine.
//!
//! Tracks whether the current session is usable, rebuilds it when the
//! ensemble address drifts or the session expires, and hands sessions to
//! callers with a bounded connection timeout.

use std::{
    sync::{
        Arc, PoisonError, RwLock, Weak,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};

use ensemble_client_core::{
    BoundedFailureQueue, ConnectionConfig, DefaultTracer, EnsembleProvider, KeeperState,
    SessionFactory, Tracer, WatchedEvent, Watcher,
    tracer::{
        BACKGROUND_EXCEPTIONS, CONNECTION_STRING_CHANGED, CONNECTIONS_TIMED_OUT, SESSION_EXPIRED,
    },
};
use tokio::time::Instant;

use crate::{ConnectionError, EventDispatcher, HandleHolder};

/// Routes session notifications back into the state machine without
/// keeping it alive.
struct StateSink<F: SessionFactory> {
    state: Weak<ConnectionState<F>>,
}

impl<F: SessionFactory> Watcher for StateSink<F> {
    fn process(&self, event: &WatchedEvent) {
        if let Some(state) = self.state.upgrade() {
            state.process(event);
        }
    }
}

/// Logical connection to an ensemble.
///
/// The connected flag reflects the last notification seen, not a live
/// probe. Failures raised while rebuilding from the notification path are
/// queued and replayed, one per call, to [`ConnectionState::get_session`].
pub struct ConnectionState<F: SessionFactory> {
    holder: HandleHolder<F>,
    ensemble: Arc<dyn EnsembleProvider>,
    dispatcher: EventDispatcher,
    failures: BoundedFailureQueue<ConnectionError>,
    tracer: RwLock<Arc<dyn Tracer>>,
    config: ConnectionConfig,
    is_connected: AtomicBool,
    closed: AtomicBool,
    /// Milliseconds after `epoch` at which the current disconnected (or
    /// connected) stretch began.
    connection_start_ms: AtomicU64,
    epoch: Instant,
}

impl<F: SessionFactory> ConnectionState<F> {
    /// Create a connection. Nothing is contacted until [`Self::start`].
    #[must_use]
    pub fn new(
        factory: Arc<F>,
        ensemble: Arc<dyn EnsembleProvider>,
        config: ConnectionConfig,
        parent_watcher: Option<Arc<dyn Watcher>>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak| {
            let sink: Arc<dyn Watcher> = Arc::new(StateSink {
                state: Weak::clone(weak),
            });
            let dispatcher = EventDispatcher::new();
            if let Some(watcher) = parent_watcher {
                dispatcher.add_observer(watcher);
            }
            Self {
                holder: HandleHolder::new(
                    factory,
                    Arc::clone(&ensemble),
                    sink,
                    config.session_timeout(),
                ),
                ensemble,
                dispatcher,
                failures: BoundedFailureQueue::new(config.failure_queue_capacity),
                tracer: RwLock::new(Arc::new(DefaultTracer)),
                config,
                is_connected: AtomicBool::new(false),
                closed: AtomicBool::new(false),
                connection_start_ms: AtomicU64::new(0),
                epoch: Instant::now(),
            }
        })
    }

    /// Start the address provider and initiate the first session.
    ///
    /// Returns once the connection is initiated, not once it is live.
    ///
    /// # Errors
    /// Returns error if the provider fails to start or the session cannot
    /// be created.
    pub async fn start(&self) -> Result<(), ConnectionError> {
        tracing::debug!("Starting");
        self.ensemble.start().await?;
        self.reset()
    }

    /// Release the address provider and the session.
    ///
    /// Notifications arriving after this call no longer change the
    /// connection state. The connection is marked disconnected even if
    /// releasing fails.
    ///
    /// # Errors
    /// Returns the combined release failures.
    pub async fn close(&self) -> Result<(), ConnectionError> {
        tracing::debug!("Closing");
        self.closed.store(true, Ordering::SeqCst);

        let ensemble = self.ensemble.close().await.err();
        if let Some(e) = &ensemble {
            tracing::warn!(error = %e, "Failed to close ensemble provider");
        }
        let session = self.holder.close_and_clear().err();
        self.is_connected.store(false, Ordering::SeqCst);

        if ensemble.is_none() && session.is_none() {
            Ok(())
        } else {
            Err(ConnectionError::Close { ensemble, session })
        }
    }

    /// The current session, or the reason it cannot be handed out.
    ///
    /// Does not wait for connectivity: the returned session may still be
    /// connecting. Callers retry on error.
    ///
    /// # Errors
    /// - a queued background failure, one per call
    /// - [`ConnectionError::TimedOut`] when disconnected past the
    ///   connection timeout with no pending address change
    /// - session creation failures
    pub fn get_session(&self) -> Result<Arc<F::Session>, ConnectionError> {
        if let Some(e) = self.failures.pop() {
            tracing::error!(error = %e, "Background exception caught");
            self.tracer().add_count(BACKGROUND_EXCEPTIONS, 1);
            return Err(ConnectionError::Background(Box::new(e)));
        }

        if !self.is_connected() {
            let elapsed = self.elapsed();
            let timeout = self.config.connection_timeout();
            if elapsed >= timeout {
                if self.holder.has_new_connection_string() {
                    self.handle_new_connection_string();
                } else {
                    let connection_string = self.connection_string().unwrap_or_default();
                    tracing::error!(
                        %connection_string,
                        ?timeout,
                        ?elapsed,
                        "Connection timed out"
                    );
                    self.tracer().add_count(CONNECTIONS_TIMED_OUT, 1);
                    return Err(ConnectionError::TimedOut {
                        connection_string,
                        timeout,
                        elapsed,
                    });
                }
            }
        }

        self.holder.current()
    }

    /// Handle one notification from the transport.
    ///
    /// Observers are called first, then the connection state is updated.
    /// Never fails: rebuild errors are queued for `get_session`.
    ///
    /// After [`Self::close`] observers still receive the event, but the
    /// connection state is left untouched and no rebuild is attempted.
    pub fn process(&self, event: &WatchedEvent) {
        if self.config.log_events {
            tracing::debug!(%event, "ConnectionState watcher");
        }

        let tracer = self.tracer();
        self.dispatcher.dispatch(event, &tracer, |event| {
            if !event.is_connection_event() || self.closed.load(Ordering::SeqCst) {
                return;
            }
            if let Some(connected) = self.check_state(event.state) {
                let previous = self.is_connected.swap(connected, Ordering::SeqCst);
                if previous != connected {
                    self.stamp_connection_start();
                }
            }
        });
    }

    /// Last observed liveness.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.is_connected.load(Ordering::SeqCst)
    }

    /// Address the current session was built against.
    #[must_use]
    pub fn connection_string(&self) -> Option<String> {
        self.holder.connection_string()
    }

    /// When the current connected or disconnected stretch began.
    #[must_use]
    pub fn connection_started_at(&self) -> Instant {
        self.epoch + Duration::from_millis(self.connection_start_ms.load(Ordering::SeqCst))
    }

    /// Number of background failures waiting to be replayed.
    #[must_use]
    pub fn pending_failures(&self) -> usize {
        self.failures.len()
    }

    /// Register an observer for every raw notification. Observers are
    /// called in registration order.
    pub fn add_parent_watcher(&self, watcher: Arc<dyn Watcher>) {
        self.dispatcher.add_observer(watcher);
    }

    /// Unregister `watcher`, matched by identity. Returns `false` if it was
    /// not registered. A dispatch already in flight may still reach it.
    pub fn remove_parent_watcher(&self, watcher: &Arc<dyn Watcher>) -> bool {
        self.dispatcher.remove_observer(watcher)
    }

    /// Replace the metrics sink.
    pub fn set_tracer(&self, tracer: Arc<dyn Tracer>) {
        *self.tracer.write().unwrap_or_else(PoisonError::into_inner) = tracer;
    }

    fn tracer(&self) -> Arc<dyn Tracer> {
        self.tracer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// New flag value for `state`, or `None` to leave it alone.
    fn check_state(&self, state: KeeperState) -> Option<bool> {
        let mut connected = match state {
            KeeperState::AuthFailed => {
                tracing::error!("Authentication failed");
                Some(false)
            }
            KeeperState::Expired => {
                self.handle_expired_session();
                return Some(false);
            }
            KeeperState::SaslAuthenticated => None,
            other => Some(other.is_connected()),
        };

        if self.holder.has_new_connection_string() {
            self.handle_new_connection_string();
            // The rebuilt session is not live yet.
            connected = Some(false);
        }
        connected
    }

    fn handle_new_connection_string(&self) {
        tracing::info!("Connection string changed");
        self.tracer().add_count(CONNECTION_STRING_CHANGED, 1);
        if let Err(e) = self.reset() {
            self.queue_background_failure(e);
        }
    }

    fn handle_expired_session(&self) {
        tracing::warn!("Session expired event received");
        self.tracer().add_count(SESSION_EXPIRED, 1);
        if let Err(e) = self.reset() {
            self.queue_background_failure(e);
        }
    }

    fn queue_background_failure(&self, e: ConnectionError) {
        tracing::debug!(error = %e, "Queueing background failure");
        self.failures.push(e);
    }

    /// Discard the session and initiate a new one against the latest
    /// address.
    fn reset(&self) -> Result<(), ConnectionError> {
        self.is_connected.store(false, Ordering::SeqCst);
        self.stamp_connection_start();
        self.holder.close_and_reset();
        self.holder.current().map(drop)
    }

    fn stamp_connection_start(&self) {
        self.connection_start_ms
            .store(millis(self.epoch.elapsed()), Ordering::SeqCst);
    }

    fn elapsed(&self) -> Duration {
        let now = millis(self.epoch.elapsed());
        Duration::from_millis(now.saturating_sub(self.connection_start_ms.load(Ordering::SeqCst)))
    }
}

impl<F: SessionFactory> Watcher for ConnectionState<F> {
    fn process(&self, event: &WatchedEvent) {
        Self::process(self, event);
    }
}

#[allow(clippy::cast_possible_truncation)]
const fn millis(d: Duration) -> u64 {
    d.as_millis() as u64
}
