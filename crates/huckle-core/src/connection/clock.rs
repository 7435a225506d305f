//! Paired monotonic/wall clock readings and host-suspension detection.
//!
//! `std::time::Instant` stops while the host is suspended (CLOCK_MONOTONIC on
//! Linux, mach absolute time on macOS) but the wall clock keeps going. Two
//! health checks that see the wall clock move much further than the
//! monotonic clock bracket a suspension.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::error::ConnectionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockSample {
    /// Time since an arbitrary fixed origin; never goes backwards.
    pub monotonic: Duration,
    pub wall: DateTime<Utc>,
}

pub trait Clock: Send + Sync {
    fn sample(&self) -> ClockSample;
}

#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn sample(&self) -> ClockSample {
        ClockSample {
            monotonic: self.origin.elapsed(),
            wall: Utc::now(),
        }
    }
}

/// Divergence between wall and monotonic time across two samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SleepGap {
    pub wall_delta: chrono::Duration,
    pub monotonic_delta: Duration,
}

impl SleepGap {
    /// Returns a gap when the wall clock advanced more than `threshold`
    /// beyond the monotonic clock between `previous` and `current`.
    pub fn between(previous: ClockSample, current: ClockSample, threshold: Duration) -> Option<Self> {
        let wall_delta = current.wall - previous.wall;
        let monotonic_delta = current.monotonic.saturating_sub(previous.monotonic);
        let monotonic = chrono::Duration::from_std(monotonic_delta).ok()?;
        let threshold = chrono::Duration::from_std(threshold).ok()?;
        if wall_delta - monotonic > threshold {
            Some(Self {
                wall_delta,
                monotonic_delta,
            })
        } else {
            None
        }
    }

    pub fn into_error(self) -> ConnectionError {
        ConnectionError::ClockDiscontinuity {
            wall_secs: self.wall_delta.num_seconds(),
            monotonic_secs: self.monotonic_delta.as_secs(),
        }
    }
}
