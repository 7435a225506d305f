use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PayloadError;

const ML_PER_OZ: f64 = 29.5735;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeUnit {
    Ml,
    Oz,
}

impl VolumeUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            VolumeUnit::Ml => "ml",
            VolumeUnit::Oz => "oz",
        }
    }
}

impl FromStr for VolumeUnit {
    type Err = PayloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ml" => Ok(VolumeUnit::Ml),
            "oz" => Ok(VolumeUnit::Oz),
            other => Err(PayloadError::UnknownUnit(other.to_string())),
        }
    }
}

/// Bottle volume as the backend reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    pub amount: u32,
    pub unit: VolumeUnit,
}

impl Volume {
    pub fn ml(amount: u32) -> Self {
        Self {
            amount,
            unit: VolumeUnit::Ml,
        }
    }

    pub fn oz(amount: u32) -> Self {
        Self {
            amount,
            unit: VolumeUnit::Oz,
        }
    }

    /// Amount in milliliters, rounded to the nearest whole ml.
    pub fn as_ml(&self) -> u32 {
        match self.unit {
            VolumeUnit::Ml => self.amount,
            VolumeUnit::Oz => (self.amount as f64 * ML_PER_OZ).round() as u32,
        }
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.unit.as_str())
    }
}

/// Parses `"90"`, `"90ml"`, `"4oz"` or `"4 oz"`. A bare number uses `default_unit`.
pub fn parse_volume(input: &str, default_unit: VolumeUnit) -> Result<Volume, PayloadError> {
    let trimmed = input.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, unit) = trimmed.split_at(split);
    let amount = digits
        .parse::<u32>()
        .map_err(|_| PayloadError::InvalidAmount(input.to_string()))?;
    let unit = if unit.trim().is_empty() {
        default_unit
    } else {
        unit.parse()?
    };
    Ok(Volume { amount, unit })
}

/// Where the current record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordSource {
    /// Delivered by the backend listener.
    Remote,
    /// Logged locally, not yet echoed back by the backend.
    LocalPending,
}

/// A raw feeding entry as carried by the backend, without provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEntry {
    /// Event time (when the bottle started), not receipt time.
    pub timestamp: DateTime<Utc>,
    pub volume: Volume,
}

/// The most recent feeding. Replaced as a whole, never edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedingRecord {
    pub timestamp: DateTime<Utc>,
    pub volume: Volume,
    pub source: RecordSource,
}

impl FeedingRecord {
    pub fn remote(entry: FeedEntry) -> Self {
        Self {
            timestamp: entry.timestamp,
            volume: entry.volume,
            source: RecordSource::Remote,
        }
    }

    pub fn local_pending(entry: FeedEntry) -> Self {
        Self {
            timestamp: entry.timestamp,
            volume: entry.volume,
            source: RecordSource::LocalPending,
        }
    }

    pub fn entry(&self) -> FeedEntry {
        FeedEntry {
            timestamp: self.timestamp,
            volume: self.volume,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.source == RecordSource::LocalPending
    }

    /// Whether `self` should replace `current`.
    ///
    /// Later timestamps always win. At equal timestamps a remote record
    /// replaces a pending one, and a remote correction replaces a remote
    /// record only if the volume changed.
    pub fn supersedes(&self, current: &FeedingRecord) -> bool {
        if self.timestamp != current.timestamp {
            return self.timestamp > current.timestamp;
        }
        match (self.source, current.source) {
            (RecordSource::Remote, RecordSource::LocalPending) => true,
            (RecordSource::Remote, RecordSource::Remote) => self.volume != current.volume,
            (RecordSource::LocalPending, _) => false,
        }
    }
}
