use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ConnectionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Suspended,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Suspended => "suspended",
        };
        f.write_str(label)
    }
}

/// Why a transition happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum TransitionCause {
    /// Supervisor started.
    Started,
    /// Backoff delay ran out.
    BackoffElapsed,
    /// Authenticate and subscribe both succeeded.
    Established,
    /// A connectivity error: failed attempt, listener error, missed
    /// heartbeat or clock discontinuity.
    Failure(ConnectionError),
    /// The user asked for a fresh connection.
    ManualRefresh,
    /// The stale subscription was torn down.
    TornDown,
    /// Explicit shutdown request.
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub from: ConnectionState,
    pub to: ConnectionState,
    pub cause: TransitionCause,
    pub at: DateTime<Utc>,
}

/// Latest published supervisor state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub last_cause: TransitionCause,
    /// Most recent connectivity error; kept after recovery so it stays
    /// inspectable.
    pub last_error: Option<ConnectionError>,
    /// Consecutive failed attempts since the last successful connection.
    pub failures: u32,
    pub since: DateTime<Utc>,
}

impl ConnectionStatus {
    pub fn initial(at: DateTime<Utc>) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            last_cause: TransitionCause::Started,
            last_error: None,
            failures: 0,
            since: at,
        }
    }
}
