pub mod config;
pub mod watch;
pub mod windows;
