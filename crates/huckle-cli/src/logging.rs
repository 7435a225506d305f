use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "HUCKLE_LOG";

/// Route tracing output to a file so it never lands on the rendered screen.
///
/// Filter comes from `HUCKLE_LOG` (defaults to `info`). Without an explicit
/// path the log goes to `huckle.log` in the data directory.
pub fn init(log_file: Option<PathBuf>) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let path = match log_file {
        Some(path) => path,
        None => huckle_core::storage::data_dir()?.join("huckle.log"),
    };
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| e.to_string())?;
    Ok(path)
}
