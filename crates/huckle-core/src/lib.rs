//! # huckle Core Library
//!
//! Keeps a live view of the time since the last infant feeding and the
//! countdown windows derived from it, fed by a push-based backend that can
//! drop, reconnect with stale state, or be frozen by host sleep.
//!
//! ## Architecture
//!
//! - **Timer Engine**: pure computation of elapsed time and window status
//!   from the current record and a caller-supplied `now`
//! - **Feeding Store**: the single current record, with timestamp-ordered
//!   supersession so out-of-order delivery never regresses it
//! - **Connection Supervisor**: a background task with an explicit state
//!   machine for connect, backoff, heartbeat, sleep detection and refresh
//! - **Log Command**: optimistic local logging reconciled by the backend echo
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: derived timer computation
//! - [`FeedingStore`]: current record holder
//! - [`ConnectionSupervisor`]: subscription lifecycle owner
//! - [`LogCommand`]: local feeding submission
//! - [`FeedBackend`]: trait the vendor backend implements
//! - [`Config`]: application configuration

pub mod backend;
pub mod connection;
pub mod error;
pub mod feeding;
pub mod log_command;
pub mod storage;
pub mod timer;

pub use backend::{Credentials, FeedBackend, ListenerSignal, ListenerSink, SessionSlot};
pub use connection::{
    BackoffPolicy, Clock, ClockSample, ConnectionState, ConnectionStatus, ConnectionSupervisor,
    SupervisorSettings, SystemClock, Transition, TransitionCause,
};
pub use error::{ConfigError, ConnectionError, CoreError, PayloadError, WriteError};
pub use feeding::{
    parse_prefs_update, parse_volume, FeedEntry, FeedingRecord, FeedingStore, RecordSource,
    Volume, VolumeUnit,
};
pub use log_command::LogCommand;
pub use storage::Config;
pub use timer::{
    format_signed_hm, TimerEngine, TimerReading, TimerWindow, WindowConfig, WindowKind,
    WindowReading, WindowSpan, WindowStatus,
};
