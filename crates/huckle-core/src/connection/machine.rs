//! Transition table of the connection supervisor.
//!
//! ## State Transitions
//!
//! ```text
//! Disconnected --start / backoff elapsed / refresh--> Connecting
//! Connecting   --established-------------------------> Connected
//! Connecting   --attempt failed-----------------------> Disconnected
//! Connecting   --refresh------------------------------> Connecting (attempt abandoned)
//! Connecting   --clock discontinuity------------------> Suspended (attempt abandoned)
//! Connected    --listener error / heartbeat / refresh-> Reconnecting
//! Connected    --clock discontinuity------------------> Suspended
//! Reconnecting --torn down----------------------------> Connecting
//! Suspended    --torn down----------------------------> Connecting
//! any          --shutdown-----------------------------> Disconnected (terminal)
//! ```
//!
//! The machine does no I/O; the supervisor task performs the side effects
//! and feeds the outcome back as a [`Trigger`].

use chrono::{DateTime, Utc};

use super::state::{ConnectionState, ConnectionStatus, Transition, TransitionCause};
use crate::error::ConnectionError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    Start,
    BackoffElapsed,
    Established,
    AttemptFailed(ConnectionError),
    /// A live subscription went bad.
    Lost(ConnectionError),
    ManualRefresh,
    TornDown,
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct ConnectionMachine {
    status: ConnectionStatus,
    shut_down: bool,
}

impl ConnectionMachine {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            status: ConnectionStatus::initial(at),
            shut_down: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.status.state
    }

    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    pub fn failures(&self) -> u32 {
        self.status.failures
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Apply a trigger. Returns the transition, or `None` when the trigger
    /// does not apply in the current state.
    pub fn apply(&mut self, trigger: Trigger, at: DateTime<Utc>) -> Option<Transition> {
        use ConnectionState::*;

        if self.shut_down {
            return None;
        }

        let from = self.status.state;
        let (to, cause) = match (from, trigger) {
            (_, Trigger::Shutdown) => {
                self.shut_down = true;
                (Disconnected, TransitionCause::Shutdown)
            }
            (Disconnected, Trigger::Start) => (Connecting, TransitionCause::Started),
            (Disconnected, Trigger::BackoffElapsed) => (Connecting, TransitionCause::BackoffElapsed),
            (Disconnected, Trigger::ManualRefresh) => (Connecting, TransitionCause::ManualRefresh),
            (Connecting, Trigger::Established) => {
                self.status.failures = 0;
                (Connected, TransitionCause::Established)
            }
            (Connecting, Trigger::AttemptFailed(err)) => {
                self.status.failures = self.status.failures.saturating_add(1);
                self.status.last_error = Some(err.clone());
                (Disconnected, TransitionCause::Failure(err))
            }
            (Connecting, Trigger::ManualRefresh) => (Connecting, TransitionCause::ManualRefresh),
            // Nothing started before a suspension can be trusted after it.
            (Connecting, Trigger::Lost(err @ ConnectionError::ClockDiscontinuity { .. })) => {
                self.status.last_error = Some(err.clone());
                (Suspended, TransitionCause::Failure(err))
            }
            (Connected, Trigger::Lost(err)) => {
                self.status.last_error = Some(err.clone());
                let to = match err {
                    ConnectionError::ClockDiscontinuity { .. } => Suspended,
                    _ => Reconnecting,
                };
                (to, TransitionCause::Failure(err))
            }
            (Connected, Trigger::ManualRefresh) => (Reconnecting, TransitionCause::ManualRefresh),
            (Reconnecting | Suspended, Trigger::TornDown) => (Connecting, TransitionCause::TornDown),
            (state, trigger) => {
                tracing::debug!(?state, ?trigger, "trigger ignored");
                return None;
            }
        };

        self.status.state = to;
        self.status.last_cause = cause.clone();
        self.status.since = at;
        Some(Transition { from, to, cause, at })
    }
}
