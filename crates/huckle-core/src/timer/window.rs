use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    Elapsed,
    Naptime,
    ShortWake,
    LongWake,
}

impl WindowKind {
    /// Display order, also the order of [`TimerReading::windows`](super::TimerReading).
    pub const ALL: [WindowKind; 4] = [
        WindowKind::Elapsed,
        WindowKind::Naptime,
        WindowKind::ShortWake,
        WindowKind::LongWake,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            WindowKind::Elapsed => "elapsed",
            WindowKind::Naptime => "naptime",
            WindowKind::ShortWake => "short wake",
            WindowKind::LongWake => "long wake",
        }
    }
}

/// Offsets of a bounded window relative to the feeding time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSpan {
    pub low: Duration,
    pub high: Duration,
}

impl WindowSpan {
    pub fn minutes(low: i64, high: i64) -> Self {
        Self {
            low: Duration::minutes(low),
            high: Duration::minutes(high),
        }
    }
}

/// Offsets for every bounded window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowConfig {
    pub naptime: WindowSpan,
    pub short_wake: WindowSpan,
    pub long_wake: WindowSpan,
}

impl WindowConfig {
    pub fn span(&self, kind: WindowKind) -> Option<WindowSpan> {
        match kind {
            WindowKind::Elapsed => None,
            WindowKind::Naptime => Some(self.naptime),
            WindowKind::ShortWake => Some(self.short_wake),
            WindowKind::LongWake => Some(self.long_wake),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            naptime: WindowSpan::minutes(60, 75),
            short_wake: WindowSpan::minutes(120, 135),
            long_wake: WindowSpan::minutes(150, 165),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowStatus {
    NotYetOpen,
    Open,
    Elapsed,
}

impl WindowStatus {
    pub fn label(&self) -> &'static str {
        match self {
            WindowStatus::NotYetOpen => "not yet open",
            WindowStatus::Open => "open",
            WindowStatus::Elapsed => "elapsed",
        }
    }
}

/// A named countdown window anchored at a feeding.
///
/// `Elapsed` is open-ended: its lower bound is the feeding time and it has
/// no upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerWindow {
    pub kind: WindowKind,
    pub lower: DateTime<Utc>,
    pub upper: Option<DateTime<Utc>>,
}

impl TimerWindow {
    pub fn anchored(kind: WindowKind, fed_at: DateTime<Utc>, config: &WindowConfig) -> Self {
        match config.span(kind) {
            Some(span) => Self {
                kind,
                lower: fed_at + span.low,
                upper: Some(fed_at + span.high),
            },
            None => Self {
                kind,
                lower: fed_at,
                upper: None,
            },
        }
    }

    pub fn status_at(&self, now: DateTime<Utc>) -> WindowStatus {
        if now < self.lower {
            return WindowStatus::NotYetOpen;
        }
        match self.upper {
            Some(upper) if now > upper => WindowStatus::Elapsed,
            _ => WindowStatus::Open,
        }
    }

    pub fn midpoint(&self) -> Option<DateTime<Utc>> {
        self.upper.map(|upper| self.lower + (upper - self.lower) / 2)
    }

    /// Half the window width, rendered as the `±` tolerance.
    pub fn half_width(&self) -> Option<Duration> {
        self.upper.map(|upper| (upper - self.lower) / 2)
    }

    /// Signed distance of `now` past the midpoint; negative before it.
    pub fn offset_from_midpoint(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.midpoint().map(|mid| now - mid)
    }
}
