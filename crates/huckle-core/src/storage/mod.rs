mod config;

pub use config::{
    Config, ConnectionConfig, CredentialsConfig, DisplayConfig, WindowMinutes, WindowsConfig,
    EMAIL_ENV, PASSWORD_ENV,
};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/huckle[-dev]/` based on HUCKLE_ENV.
///
/// Set HUCKLE_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("HUCKLE_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("huckle-dev")
    } else {
        base_dir.join("huckle")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
