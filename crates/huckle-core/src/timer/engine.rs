//! Derived-timer computation.
//!
//! The engine holds only the window configuration. Every reading is computed
//! from the current feeding record and the caller's `now`; nothing survives
//! between calls, so a record change is visible on the very next compute.
//!
//! ## Usage
//!
//! ```ignore
//! let engine = TimerEngine::new(config.window_config());
//! // Once per render tick:
//! let reading = engine.compute(store.snapshot().as_ref(), Utc::now());
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::window::{TimerWindow, WindowConfig, WindowKind, WindowStatus};
use crate::feeding::FeedingRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowReading {
    pub window: TimerWindow,
    pub status: WindowStatus,
}

/// Result of one computation.
///
/// `elapsed` is `None` only when no feeding has been observed; it is negative
/// when `now` precedes the feeding time (clock skew or a future-dated entry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimerReading {
    pub computed_at: DateTime<Utc>,
    #[serde(with = "opt_duration_secs")]
    pub elapsed: Option<Duration>,
    pub windows: Vec<WindowReading>,
}

impl TimerReading {
    pub fn is_no_data(&self) -> bool {
        self.elapsed.is_none()
    }

    pub fn clock_skew(&self) -> bool {
        self.elapsed.is_some_and(|e| e < Duration::zero())
    }

    pub fn window(&self, kind: WindowKind) -> Option<&WindowReading> {
        self.windows.iter().find(|w| w.window.kind == kind)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TimerEngine {
    windows: WindowConfig,
}

impl TimerEngine {
    pub fn new(windows: WindowConfig) -> Self {
        Self { windows }
    }

    pub fn window_config(&self) -> &WindowConfig {
        &self.windows
    }

    pub fn compute(&self, record: Option<&FeedingRecord>, now: DateTime<Utc>) -> TimerReading {
        let Some(record) = record else {
            return TimerReading {
                computed_at: now,
                elapsed: None,
                windows: Vec::new(),
            };
        };

        let windows = WindowKind::ALL
            .iter()
            .map(|&kind| {
                let window = TimerWindow::anchored(kind, record.timestamp, &self.windows);
                WindowReading {
                    status: window.status_at(now),
                    window,
                }
            })
            .collect();

        TimerReading {
            computed_at: now,
            elapsed: Some(now - record.timestamp),
            windows,
        }
    }
}

/// Renders a signed duration as `+hh:mm` / `-hh:mm`, truncating seconds.
pub fn format_signed_hm(duration: Duration) -> String {
    let sign = if duration < Duration::zero() { '-' } else { '+' };
    let total = duration.num_seconds().unsigned_abs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    format!("{sign}{hours:02}:{minutes:02}")
}

mod opt_duration_secs {
    use chrono::Duration;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&d.num_seconds()),
            None => s.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feeding::{RecordSource, Volume};
    use crate::timer::WindowSpan;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, h, m, 0).unwrap()
    }

    fn fed(h: u32, m: u32) -> FeedingRecord {
        FeedingRecord {
            timestamp: at(h, m),
            volume: Volume::ml(120),
            source: RecordSource::Remote,
        }
    }

    #[test]
    fn no_record_is_no_data() {
        let reading = TimerEngine::default().compute(None, at(12, 0));
        assert!(reading.is_no_data());
        assert!(reading.windows.is_empty());
        assert!(!reading.clock_skew());
    }

    #[test]
    fn naptime_window_scenario() {
        let engine = TimerEngine::new(WindowConfig {
            naptime: WindowSpan::minutes(120, 180),
            ..WindowConfig::default()
        });
        let record = fed(14, 0);

        let reading = engine.compute(Some(&record), at(16, 30));
        assert_eq!(reading.elapsed, Some(Duration::minutes(150)));
        assert_eq!(
            reading.window(WindowKind::Naptime).unwrap().status,
            WindowStatus::Open
        );

        let reading = engine.compute(Some(&record), at(17, 5));
        assert_eq!(
            reading.window(WindowKind::Naptime).unwrap().status,
            WindowStatus::Elapsed
        );
    }

    #[test]
    fn windows_are_ordered() {
        let reading = TimerEngine::default().compute(Some(&fed(8, 0)), at(9, 0));
        let kinds: Vec<_> = reading.windows.iter().map(|w| w.window.kind).collect();
        assert_eq!(kinds, WindowKind::ALL.to_vec());
    }

    #[test]
    fn future_record_surfaces_negative_elapsed() {
        let reading = TimerEngine::default().compute(Some(&fed(10, 0)), at(9, 45));
        assert_eq!(reading.elapsed, Some(Duration::minutes(-15)));
        assert!(reading.clock_skew());
        assert_eq!(
            reading.window(WindowKind::Elapsed).unwrap().status,
            WindowStatus::NotYetOpen
        );
    }

    #[test]
    fn signed_hm_formatting() {
        assert_eq!(format_signed_hm(Duration::seconds(0)), "+00:00");
        assert_eq!(format_signed_hm(Duration::seconds(2 * 3600 + 5 * 60 + 59)), "+02:05");
        assert_eq!(format_signed_hm(Duration::seconds(-(7 * 60 + 30))), "-00:07");
        assert_eq!(format_signed_hm(Duration::hours(27)), "+27:00");
    }

    #[test]
    fn reading_serializes_elapsed_as_seconds() {
        let reading = TimerEngine::default().compute(Some(&fed(10, 0)), at(10, 30));
        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(json["elapsed"], 1800);
        assert_eq!(json["windows"][1]["status"], "not_yet_open");
    }

    proptest! {
        #[test]
        fn elapsed_matches_difference_and_grows(a in 0i64..1_000_000, b in 0i64..1_000_000) {
            let record = fed(0, 0);
            let engine = TimerEngine::default();
            let (early, late) = (a.min(b), a.max(b));
            let r1 = engine.compute(Some(&record), record.timestamp + Duration::seconds(early));
            let r2 = engine.compute(Some(&record), record.timestamp + Duration::seconds(late));
            prop_assert_eq!(r1.elapsed, Some(Duration::seconds(early)));
            prop_assert!(r2.elapsed >= r1.elapsed);
        }
    }
}
