//! Connection configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::failure_queue::DEFAULT_CAPACITY;

/// Environment switch that turns on per-notification debug logging.
pub const LOG_EVENTS_ENV: &str = "ENSEMBLE_LOG_EVENTS";

const DEFAULT_SESSION_TIMEOUT_MS: u64 = 60_000;
const DEFAULT_CONNECTION_TIMEOUT_MS: u64 = 15_000;

/// Settings for one logical ensemble connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Session timeout handed to the session factory.
    pub session_timeout_ms: u64,

    /// How long `get_session` tolerates a disconnected state.
    pub connection_timeout_ms: u64,

    /// Number of background failures retained for replay.
    pub failure_queue_capacity: usize,

    /// Log every incoming notification at debug level.
    pub log_events: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            session_timeout_ms: DEFAULT_SESSION_TIMEOUT_MS,
            connection_timeout_ms: DEFAULT_CONNECTION_TIMEOUT_MS,
            failure_queue_capacity: DEFAULT_CAPACITY,
            log_events: false,
        }
    }
}

impl ConnectionConfig {
    /// Defaults, with `log_events` taken from [`LOG_EVENTS_ENV`].
    #[must_use]
    pub fn from_env() -> Self {
        let log_events = std::env::var(LOG_EVENTS_ENV)
            .map(|v| parse_switch(&v))
            .unwrap_or(false);
        Self {
            log_events,
            ..Self::default()
        }
    }

    /// Set the session timeout.
    #[must_use]
    pub const fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout_ms = duration_ms(timeout);
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub const fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout_ms = duration_ms(timeout);
        self
    }

    /// Set the failure queue capacity. Zero is treated as one.
    #[must_use]
    pub fn with_failure_queue_capacity(mut self, capacity: usize) -> Self {
        self.failure_queue_capacity = capacity.max(1);
        self
    }

    /// Toggle per-notification logging.
    #[must_use]
    pub const fn with_log_events(mut self, log_events: bool) -> Self {
        self.log_events = log_events;
        self
    }

    #[must_use]
    pub const fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }

    #[must_use]
    pub const fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }
}

#[allow(clippy::cast_possible_truncation)]
const fn duration_ms(d: Duration) -> u64 {
    d.as_millis() as u64
}

fn parse_switch(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
