mod engine;
mod window;

pub use engine::{format_signed_hm, TimerEngine, TimerReading, WindowReading};
pub use window::{TimerWindow, WindowConfig, WindowKind, WindowSpan, WindowStatus};
