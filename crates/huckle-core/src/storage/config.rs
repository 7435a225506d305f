//! TOML-based application configuration.
//!
//! Stores:
//! - Countdown window offsets (minutes after a feeding)
//! - Connection timing: heartbeat, health checks, sleep detection, backoff
//! - Display cadence and default volume unit
//! - Optional credentials (the environment takes precedence)
//!
//! Configuration is stored at `~/.config/huckle/config.toml`. Nothing else is
//! written to disk: the feeding record is always rebuilt from the backend.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::backend::Credentials;
use crate::connection::{BackoffPolicy, SupervisorSettings};
use crate::error::ConfigError;
use crate::feeding::VolumeUnit;
use crate::timer::{WindowConfig, WindowSpan};

pub const EMAIL_ENV: &str = "HUCKLEBERRY_EMAIL";
pub const PASSWORD_ENV: &str = "HUCKLEBERRY_PASSWORD";

/// Minutes after the feeding at which a window opens and closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowMinutes {
    pub low_min: u32,
    pub high_min: u32,
}

impl WindowMinutes {
    fn span(&self) -> WindowSpan {
        WindowSpan::minutes(self.low_min as i64, self.high_min as i64)
    }
}

/// Countdown window configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowsConfig {
    #[serde(default = "default_naptime")]
    pub naptime: WindowMinutes,
    #[serde(default = "default_short_wake")]
    pub short_wake: WindowMinutes,
    #[serde(default = "default_long_wake")]
    pub long_wake: WindowMinutes,
}

/// Connection supervisor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default = "default_heartbeat_timeout")]
    pub heartbeat_timeout_secs: u64,
    #[serde(default = "default_health_check_interval")]
    pub health_check_interval_secs: u64,
    #[serde(default = "default_sleep_gap_threshold")]
    pub sleep_gap_threshold_secs: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_backoff_base")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_backoff_ceiling")]
    pub backoff_ceiling_ms: u64,
    #[serde(default = "default_backoff_jitter")]
    pub backoff_jitter: f64,
}

/// Display configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_render_interval")]
    pub render_interval_ms: u64,
    #[serde(default = "default_unit")]
    pub default_unit: VolumeUnit,
}

/// Credentials stored in the file. Usually left empty in favour of the
/// environment.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/huckle/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub windows: WindowsConfig,
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

// Default functions
fn default_naptime() -> WindowMinutes {
    WindowMinutes {
        low_min: 60,
        high_min: 75,
    }
}
fn default_short_wake() -> WindowMinutes {
    WindowMinutes {
        low_min: 120,
        high_min: 135,
    }
}
fn default_long_wake() -> WindowMinutes {
    WindowMinutes {
        low_min: 150,
        high_min: 165,
    }
}
fn default_heartbeat_timeout() -> u64 {
    90
}
fn default_health_check_interval() -> u64 {
    5
}
fn default_sleep_gap_threshold() -> u64 {
    30
}
fn default_connect_timeout() -> u64 {
    30
}
fn default_backoff_base() -> u64 {
    1_000
}
fn default_backoff_ceiling() -> u64 {
    60_000
}
fn default_backoff_jitter() -> f64 {
    0.2
}
fn default_render_interval() -> u64 {
    1_000
}
fn default_unit() -> VolumeUnit {
    VolumeUnit::Ml
}

impl Default for WindowsConfig {
    fn default() -> Self {
        Self {
            naptime: default_naptime(),
            short_wake: default_short_wake(),
            long_wake: default_long_wake(),
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            heartbeat_timeout_secs: default_heartbeat_timeout(),
            health_check_interval_secs: default_health_check_interval(),
            sleep_gap_threshold_secs: default_sleep_gap_threshold(),
            connect_timeout_secs: default_connect_timeout(),
            backoff_base_ms: default_backoff_base(),
            backoff_ceiling_ms: default_backoff_ceiling(),
            backoff_jitter: default_backoff_jitter(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            render_interval_ms: default_render_interval(),
            default_unit: default_unit(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing the defaults there first if
    /// no file exists yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if path.exists() {
            return Self::load_from(&path);
        }
        let cfg = Self::default();
        cfg.save_to(&path)?;
        Ok(cfg)
    }

    /// Load and validate a specific file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Persist to `path`.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "using default configuration");
            Self::default()
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, window) in [
            ("windows.naptime", &self.windows.naptime),
            ("windows.short_wake", &self.windows.short_wake),
            ("windows.long_wake", &self.windows.long_wake),
        ] {
            if window.low_min > window.high_min {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: format!(
                        "low_min ({}) is after high_min ({})",
                        window.low_min, window.high_min
                    ),
                });
            }
        }
        let jitter = self.connection.backoff_jitter;
        if !(0.0..=1.0).contains(&jitter) {
            return Err(ConfigError::InvalidValue {
                key: "connection.backoff_jitter".into(),
                message: format!("{jitter} is outside [0, 1]"),
            });
        }
        if self.connection.health_check_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "connection.health_check_interval_secs".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.connection.backoff_base_ms > self.connection.backoff_ceiling_ms {
            return Err(ConfigError::InvalidValue {
                key: "connection.backoff_base_ms".into(),
                message: "exceeds backoff_ceiling_ms".into(),
            });
        }
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self.redacted()).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Copy with the stored password masked, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.credentials.password.is_some() {
            copy.credentials.password = Some("<redacted>".into());
        }
        copy
    }

    /// Resolve credentials, environment first.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        self.credentials_with(|name| std::env::var(name).ok())
    }

    fn credentials_with(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Credentials, ConfigError> {
        let pick = |name: &str, stored: &Option<String>| {
            env(name)
                .or_else(|| stored.clone())
                .filter(|v| !v.trim().is_empty())
        };
        let email = pick(EMAIL_ENV, &self.credentials.email);
        let password = pick(PASSWORD_ENV, &self.credentials.password);
        match (email, password) {
            (Some(email), Some(password)) => Ok(Credentials { email, password }),
            _ => Err(ConfigError::MissingCredentials),
        }
    }

    pub fn window_config(&self) -> WindowConfig {
        WindowConfig {
            naptime: self.windows.naptime.span(),
            short_wake: self.windows.short_wake.span(),
            long_wake: self.windows.long_wake.span(),
        }
    }

    pub fn supervisor_settings(&self) -> SupervisorSettings {
        let c = &self.connection;
        SupervisorSettings {
            heartbeat_timeout: Duration::from_secs(c.heartbeat_timeout_secs),
            health_check_interval: Duration::from_secs(c.health_check_interval_secs.max(1)),
            sleep_gap_threshold: Duration::from_secs(c.sleep_gap_threshold_secs),
            connect_timeout: Duration::from_secs(c.connect_timeout_secs),
            backoff: BackoffPolicy {
                base: Duration::from_millis(c.backoff_base_ms),
                ceiling: Duration::from_millis(c.backoff_ceiling_ms),
                jitter: c.backoff_jitter,
            },
            jitter_seed: None,
        }
    }

    pub fn render_interval(&self) -> Duration {
        Duration::from_millis(self.display.render_interval_ms.max(50))
    }
}
