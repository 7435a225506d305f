//! Contract with the vendor backend.
//!
//! The authentication handshake and the real-time transport live outside
//! this crate. An implementation only has to authenticate, push events into
//! a [`ListenerSink`] while subscribed, tear the subscription down, and
//! accept new feedings.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::error::{ConnectionError, WriteError};
use crate::feeding::FeedEntry;

/// Login pair handed to [`FeedBackend::authenticate`].
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

pub trait FeedBackend: Send + Sync + 'static {
    type Session: Clone + Send + Sync + 'static;
    type Subscription: Send + 'static;

    fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<Self::Session, ConnectionError>> + Send;

    /// Start pushing events into `sink`. The sink stays valid until
    /// [`unsubscribe`](FeedBackend::unsubscribe); events sent after that are
    /// discarded.
    fn subscribe(
        &self,
        session: &Self::Session,
        sink: ListenerSink,
    ) -> impl Future<Output = Result<Self::Subscription, ConnectionError>> + Send;

    fn unsubscribe(&self, subscription: Self::Subscription) -> impl Future<Output = ()> + Send;

    fn write_feeding(
        &self,
        session: &Self::Session,
        entry: &FeedEntry,
    ) -> impl Future<Output = Result<(), WriteError>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerSignal {
    Entry(FeedEntry),
    Keepalive,
    Error(ConnectionError),
}

/// Callback surface handed to the backend on subscribe.
#[derive(Debug, Clone)]
pub struct ListenerSink {
    tx: mpsc::UnboundedSender<ListenerSignal>,
}

impl ListenerSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ListenerSignal>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// A feeding arrived. Returns `false` once the subscription is gone.
    pub fn entry(&self, entry: FeedEntry) -> bool {
        self.tx.send(ListenerSignal::Entry(entry)).is_ok()
    }

    /// The stream is alive but nothing changed.
    pub fn keepalive(&self) -> bool {
        self.tx.send(ListenerSignal::Keepalive).is_ok()
    }

    pub fn error(&self, error: ConnectionError) -> bool {
        self.tx.send(ListenerSignal::Error(error)).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// The session of the current subscription, shared with writers.
///
/// Set when the supervisor reaches `Connected`, cleared on teardown.
#[derive(Debug)]
pub struct SessionSlot<S> {
    inner: Arc<Mutex<Option<S>>>,
}

impl<S> Clone for SessionSlot<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Clone> SessionSlot<S> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(None)),
        }
    }

    pub fn get(&self) -> Option<S> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub(crate) fn set(&self, session: Option<S>) {
        *self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = session;
    }
}

impl<S: Clone> Default for SessionSlot<S> {
    fn default() -> Self {
        Self::new()
    }
}
