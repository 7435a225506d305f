//! Holder of the single current feeding record.
//!
//! Writers (the supervisor's listener loop and [`LogCommand`](crate::LogCommand))
//! go through [`FeedingStore::replace`], which compares and swaps under a
//! short lock. Readers get a copy; nobody holds the lock across an await.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use super::record::FeedingRecord;

#[derive(Debug, Default)]
pub struct FeedingStore {
    current: Mutex<Option<FeedingRecord>>,
    revision: AtomicU64,
}

impl FeedingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a candidate record. Returns whether it became current.
    pub fn replace(&self, candidate: FeedingRecord) -> bool {
        let mut current = self.lock();
        let accepted = match current.as_ref() {
            None => true,
            Some(existing) => candidate.supersedes(existing),
        };
        if accepted {
            *current = Some(candidate);
            self.revision.fetch_add(1, Ordering::Release);
            tracing::debug!(
                timestamp = %candidate.timestamp,
                volume = %candidate.volume,
                source = ?candidate.source,
                "feeding record replaced"
            );
        } else {
            tracing::debug!(
                timestamp = %candidate.timestamp,
                source = ?candidate.source,
                "stale feeding record ignored"
            );
        }
        accepted
    }

    /// Copy of the current record, if any feeding was ever observed.
    pub fn snapshot(&self) -> Option<FeedingRecord> {
        *self.lock()
    }

    /// Bumped on every accepted replace.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    fn lock(&self) -> MutexGuard<'_, Option<FeedingRecord>> {
        // The guarded value is a plain Copy record, so a poisoned lock
        // still holds a consistent value.
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
