//! Connectivity notifications delivered by the transport layer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of change a notification describes.
///
/// Only [`EventType::None`] carries connection-level state; the rest
/// describe node changes and are forwarded to observers untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Connection or session state changed.
    None,
    /// A watched node was created.
    NodeCreated,
    /// A watched node was deleted.
    NodeDeleted,
    /// A watched node's data changed.
    NodeDataChanged,
    /// A watched node's children changed.
    NodeChildrenChanged,
}

/// Session state carried by a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeeperState {
    /// State the transport could not classify.
    Unknown,
    /// The client lost its link to the ensemble.
    Disconnected,
    /// The client is connected and in sync.
    SyncConnected,
    /// Authentication was rejected by the ensemble.
    AuthFailed,
    /// Connected to a server that only serves reads.
    ConnectedReadOnly,
    /// SASL authentication completed on an existing connection.
    SaslAuthenticated,
    /// The server discarded the session.
    Expired,
}

impl KeeperState {
    /// Whether this state counts as live for the connection flag.
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::SyncConnected | Self::ConnectedReadOnly)
    }
}

/// One raw notification from the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchedEvent {
    /// What changed.
    pub event_type: EventType,
    /// Session state at the time of the change.
    pub state: KeeperState,
    /// Node path for node-level events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl WatchedEvent {
    /// A connection-level notification carrying `state`.
    #[must_use]
    pub const fn connection(state: KeeperState) -> Self {
        Self {
            event_type: EventType::None,
            state,
            path: None,
        }
    }

    /// A node-level notification for `path`.
    #[must_use]
    pub fn node(event_type: EventType, state: KeeperState, path: impl Into<String>) -> Self {
        Self {
            event_type,
            state,
            path: Some(path.into()),
        }
    }

    /// Whether this notification describes connection state.
    #[must_use]
    pub fn is_connection_event(&self) -> bool {
        self.event_type == EventType::None
    }
}

impl fmt::Display for WatchedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WatchedEvent state:{:?} type:{:?}", self.state, self.event_type)?;
        if let Some(path) = &self.path {
            write!(f, " path:{path}")?;
        }
        Ok(())
    }
}
