//! Logging a new feeding from the local side.
//!
//! The record is shown immediately as pending; the backend's echo replaces
//! it through the normal store rule once the write lands. A failed write
//! leaves the pending record on screen and reports the error; retrying is up
//! to the user.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::backend::{FeedBackend, SessionSlot};
use crate::error::WriteError;
use crate::feeding::{FeedEntry, FeedingRecord, FeedingStore, Volume};

pub struct LogCommand<B: FeedBackend> {
    backend: Arc<B>,
    store: Arc<FeedingStore>,
    session: SessionSlot<B::Session>,
}

impl<B: FeedBackend> LogCommand<B> {
    pub fn new(backend: Arc<B>, store: Arc<FeedingStore>, session: SessionSlot<B::Session>) -> Self {
        Self {
            backend,
            store,
            session,
        }
    }

    /// Record a feeding locally, then send it to the backend.
    ///
    /// Returns the pending record on success.
    pub async fn submit(&self, volume: Volume, at: DateTime<Utc>) -> Result<FeedingRecord, WriteError> {
        let entry = FeedEntry {
            timestamp: at,
            volume,
        };
        let record = FeedingRecord::local_pending(entry);
        if !self.store.replace(record) {
            tracing::debug!(timestamp = %at, "logged feeding is older than the current record");
        }

        let Some(session) = self.session.get() else {
            tracing::warn!(timestamp = %at, volume = %volume, "feeding kept as pending: not connected");
            return Err(WriteError::NotConnected);
        };

        match self.backend.write_feeding(&session, &entry).await {
            Ok(()) => {
                tracing::info!(timestamp = %at, volume = %volume, "feeding submitted");
                Ok(record)
            }
            Err(err) => {
                tracing::warn!(timestamp = %at, error = %err, "feeding submission failed");
                Err(err)
            }
        }
    }
}
