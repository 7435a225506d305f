//! Shared fixtures: a scripted backend and a hand-driven clock.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use huckle_core::{
    BackoffPolicy, Clock, ClockSample, ConnectionError, Credentials, FeedBackend, FeedEntry,
    ListenerSink, SupervisorSettings, Transition, Volume, WriteError,
};
use tokio::sync::{broadcast, Notify};

// ============================================================================
// Manual clock
// ============================================================================

pub struct ManualClock {
    now: Mutex<ClockSample>,
}

impl ManualClock {
    pub fn new(wall: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(ClockSample {
                monotonic: Duration::from_secs(1_000),
                wall,
            }),
        }
    }

    /// Move both clocks. A wall step much larger than the monotonic step
    /// looks like the host slept.
    pub fn advance(&self, monotonic: Duration, wall: chrono::Duration) {
        let mut now = self.now.lock().unwrap();
        now.monotonic += monotonic;
        now.wall = now.wall + wall;
    }
}

impl Clock for ManualClock {
    fn sample(&self) -> ClockSample {
        *self.now.lock().unwrap()
    }
}

// ============================================================================
// Mock backend
// ============================================================================

/// Decrements the in-flight counter even when the attempt is dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct MockBackend {
    /// Number of upcoming authenticate calls that fail.
    pub auth_failures: AtomicU32,
    /// Simulated authenticate latency in milliseconds.
    pub auth_delay_ms: AtomicU64,
    /// Simulated unsubscribe latency in milliseconds.
    pub unsubscribe_delay_ms: AtomicU64,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub authenticates: AtomicUsize,
    pub subscribes: AtomicUsize,
    pub unsubscribes: AtomicUsize,
    sinks: Mutex<Vec<ListenerSink>>,
    pub writes: Mutex<Vec<FeedEntry>>,
    pub write_error: Mutex<Option<WriteError>>,
    /// When set, writes wait for a notification before completing.
    pub write_gate: Option<Arc<Notify>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            write_gate: Some(gate),
            ..Self::default()
        }
    }

    /// Sink handed to the most recent subscription.
    pub fn latest_sink(&self) -> ListenerSink {
        self.sinks
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no subscription yet")
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

impl FeedBackend for MockBackend {
    type Session = u64;
    type Subscription = usize;

    async fn authenticate(&self, credentials: &Credentials) -> Result<u64, ConnectionError> {
        let n = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(n, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);
        let attempt = self.authenticates.fetch_add(1, Ordering::SeqCst) as u64;

        let delay = self.auth_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let failing = self
            .auth_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing || credentials.password.is_empty() {
            return Err(ConnectionError::Auth("invalid credentials".into()));
        }
        Ok(100 + attempt)
    }

    async fn subscribe(&self, _session: &u64, sink: ListenerSink) -> Result<usize, ConnectionError> {
        let id = self.subscribes.fetch_add(1, Ordering::SeqCst);
        self.sinks.lock().unwrap().push(sink);
        Ok(id)
    }

    async fn unsubscribe(&self, _subscription: usize) {
        self.unsubscribes.fetch_add(1, Ordering::SeqCst);
        let delay = self.unsubscribe_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }

    async fn write_feeding(&self, _session: &u64, entry: &FeedEntry) -> Result<(), WriteError> {
        if let Some(gate) = &self.write_gate {
            gate.notified().await;
        }
        if let Some(err) = self.write_error.lock().unwrap().clone() {
            return Err(err);
        }
        self.writes.lock().unwrap().push(*entry);
        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub fn credentials() -> Credentials {
    Credentials {
        email: "parent@example.com".into(),
        password: "secret".into(),
    }
}

pub fn settings() -> SupervisorSettings {
    SupervisorSettings {
        heartbeat_timeout: Duration::from_secs(60),
        health_check_interval: Duration::from_secs(5),
        sleep_gap_threshold: Duration::from_secs(30),
        connect_timeout: Duration::from_secs(30),
        backoff: BackoffPolicy {
            base: Duration::from_secs(1),
            ceiling: Duration::from_secs(8),
            jitter: 0.0,
        },
        jitter_seed: Some(7),
    }
}

pub fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, h, m, 0).unwrap()
}

pub fn entry(h: u32, m: u32, ml: u32) -> FeedEntry {
    FeedEntry {
        timestamp: at(h, m),
        volume: Volume::ml(ml),
    }
}

/// Next transition, failing instead of hanging if none arrives within an
/// hour of (paused) time.
pub async fn next(rx: &mut broadcast::Receiver<Transition>) -> Transition {
    tokio::time::timeout(Duration::from_secs(3600), rx.recv())
        .await
        .expect("no transition within an hour")
        .expect("transition channel closed")
}
