//! Drives a connection through address changes and session expiry against
//! an in-process simulated ensemble.
//!
//! Run with: cargo run -p flapping-ensemble-demo
//!
//! Set `ENSEMBLE_LOG_EVENTS=true` to log every notification.

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use ensemble_client_connection::{ConnectionError, ConnectionState, MutableEnsembleProvider};
use ensemble_client_core::{
    ConnectionConfig, EnsembleProvider, KeeperState, SessionError, SessionFactory, WatchedEvent,
    Watcher,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// A session that reports itself connected shortly after creation.
struct SimSession {
    id: u64,
    connection_string: String,
}

/// Session factory backed by tokio tasks instead of sockets.
struct SimFactory {
    next_id: AtomicU64,
    connect_delay: Duration,
    live_sink: Mutex<Option<Arc<dyn Watcher>>>,
}

impl SimFactory {
    fn new(connect_delay: Duration) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            connect_delay,
            live_sink: Mutex::new(None),
        }
    }

    /// Deliver a notification as if the server sent it.
    fn emit(&self, state: KeeperState) {
        let sink = self
            .live_sink
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        if let Some(sink) = sink {
            sink.process(&WatchedEvent::connection(state));
        }
    }
}

impl SessionFactory for SimFactory {
    type Session = SimSession;

    fn create(
        &self,
        connection_string: &str,
        _session_timeout: Duration,
        sink: Arc<dyn Watcher>,
    ) -> Result<SimSession, SessionError> {
        if connection_string.is_empty() {
            return Err(SessionError::InvalidConnectionString(
                connection_string.to_string(),
            ));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        *self
            .live_sink
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(Arc::clone(&sink));

        let delay = self.connect_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            sink.process(&WatchedEvent::connection(KeeperState::SyncConnected));
        });

        tracing::info!(id, connection_string, "Session initiated");
        Ok(SimSession {
            id,
            connection_string: connection_string.to_string(),
        })
    }

    fn close(&self, session: &SimSession) -> Result<(), SessionError> {
        tracing::info!(id = session.id, "Session closed");
        Ok(())
    }
}

fn report(state: &ConnectionState<SimFactory>) {
    match state.get_session() {
        Ok(session) => tracing::info!(
            id = session.id,
            connection_string = %session.connection_string,
            connected = state.is_connected(),
            "Got session"
        ),
        Err(ConnectionError::TimedOut { elapsed, .. }) => {
            tracing::warn!(?elapsed, "Timed out waiting for connection");
        }
        Err(e) => tracing::warn!(error = %e, "get_session failed"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let factory = Arc::new(SimFactory::new(Duration::from_millis(200)));
    let ensemble = Arc::new(MutableEnsembleProvider::new("zk1:2181,zk2:2181"));
    let config = ConnectionConfig::from_env().with_connection_timeout(Duration::from_millis(500));

    let observer: Arc<dyn Watcher> = Arc::new(|event: &WatchedEvent| {
        tracing::info!(%event, "Observer notified");
    });
    let state = ConnectionState::new(
        Arc::clone(&factory),
        Arc::clone(&ensemble) as Arc<dyn EnsembleProvider>,
        config,
        Some(observer),
    );
    state.start().await?;

    report(&state);
    tokio::time::sleep(Duration::from_millis(300)).await;
    report(&state);

    tracing::info!("Ensemble membership changes");
    ensemble.set_address("zk3:2181,zk4:2181");
    factory.emit(KeeperState::Disconnected);
    report(&state);
    tokio::time::sleep(Duration::from_millis(300)).await;
    report(&state);

    tracing::info!("Server expires the session");
    factory.emit(KeeperState::Expired);
    tokio::time::sleep(Duration::from_millis(300)).await;
    report(&state);

    tracing::info!("Ensemble goes dark");
    factory.emit(KeeperState::Disconnected);
    tokio::time::sleep(Duration::from_millis(600)).await;
    report(&state);

    state.close().await?;
    tracing::info!(connected = state.is_connected(), "Closed");
    Ok(())
}
