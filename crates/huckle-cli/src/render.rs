//! Text rendering of a timer reading.

use std::fmt;

use chrono::TimeZone;
use huckle_core::{
    format_signed_hm, ConnectionState, ConnectionStatus, FeedingRecord, TimerReading, WindowKind,
};

/// Redraw sequence: cursor home, clear screen.
pub const CLEAR: &str = "\x1b[H\x1b[2J";

/// One screenful: last feeding, elapsed time, each window as an offset from
/// its midpoint, and the connection state.
pub fn frame<Tz>(
    reading: &TimerReading,
    record: Option<&FeedingRecord>,
    status: &ConnectionStatus,
    tz: &Tz,
) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let mut lines = Vec::new();

    match (record, reading.elapsed) {
        (Some(record), Some(elapsed)) => {
            let fed_at = record.timestamp.with_timezone(tz).format("%H:%M");
            let pending = if record.is_pending() { "  (pending)" } else { "" };
            lines.push(format!("{fed_at:>10}  {}{pending}", record.volume));

            let skew = if reading.clock_skew() { "  (clock skew)" } else { "" };
            lines.push(format!(
                "{:>10}  {}{skew}",
                format_signed_hm(elapsed),
                WindowKind::Elapsed.label()
            ));

            for w in &reading.windows {
                let (Some(offset), Some(half)) = (
                    w.window.offset_from_midpoint(reading.computed_at),
                    w.window.half_width(),
                ) else {
                    continue;
                };
                let cell = format!("{}±{}", format_signed_hm(offset), half.num_minutes());
                lines.push(format!(
                    "{cell:>10}  {:<11} {}",
                    w.window.kind.label(),
                    w.status.label()
                ));
            }
        }
        _ => lines.push(format!("{:>10}  no feeding recorded yet", "--:--")),
    }

    lines.push(String::new());
    lines.push(status_line(status));
    lines.join("\n")
}

pub fn status_line(status: &ConnectionStatus) -> String {
    let mut line = status.state.to_string();
    if status.state != ConnectionState::Connected {
        if let Some(err) = &status.last_error {
            line.push_str(&format!(": {err}"));
        }
        if status.failures > 0 {
            line.push_str(&format!(" (failures: {})", status.failures));
        }
    }
    line
}
