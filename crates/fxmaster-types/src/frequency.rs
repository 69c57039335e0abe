//! Bar frequency definitions.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Fixed bar width used by the resampler.
///
/// Buckets are aligned to the Unix epoch, not to the start of a query, so
/// the same tick always falls in the same bar whatever window it was read in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Frequency {
    /// 1-second bars.
    #[serde(rename = "1s")]
    Second1,
    /// 1-minute bars.
    #[default]
    #[serde(rename = "1min")]
    Minute1,
    /// 5-minute bars.
    #[serde(rename = "5min")]
    Minute5,
    /// 15-minute bars.
    #[serde(rename = "15min")]
    Minute15,
    /// 30-minute bars.
    #[serde(rename = "30min")]
    Minute30,
    /// 1-hour bars.
    #[serde(rename = "1h")]
    Hour1,
    /// 4-hour bars.
    #[serde(rename = "4h")]
    Hour4,
    /// Daily bars.
    #[serde(rename = "1d")]
    Day1,
}

impl Frequency {
    /// Returns the bar width in seconds.
    #[must_use]
    pub const fn seconds(&self) -> i64 {
        match self {
            Self::Second1 => 1,
            Self::Minute1 => 60,
            Self::Minute5 => 300,
            Self::Minute15 => 900,
            Self::Minute30 => 1800,
            Self::Hour1 => 3600,
            Self::Hour4 => 14400,
            Self::Day1 => 86400,
        }
    }

    /// Returns the bar width in milliseconds.
    #[must_use]
    pub const fn milliseconds(&self) -> i64 {
        self.seconds() * 1000
    }

    /// Returns the bar width as a time delta.
    #[must_use]
    pub fn duration(&self) -> TimeDelta {
        TimeDelta::milliseconds(self.milliseconds())
    }

    /// Returns the start of the bar containing `timestamp`.
    #[must_use]
    pub fn bucket_start(&self, timestamp: DateTime<Utc>) -> DateTime<Utc> {
        let ms = timestamp.timestamp_millis();
        let aligned = ms - ms.rem_euclid(self.milliseconds());
        DateTime::from_timestamp_millis(aligned).unwrap_or(timestamp)
    }

    /// Returns true if `timestamp` lies exactly on a bar boundary.
    #[must_use]
    pub fn is_aligned(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp.timestamp_millis().rem_euclid(self.milliseconds()) == 0
    }

    /// Returns the frequency as its tag value (e.g., "1min").
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Second1 => "1s",
            Self::Minute1 => "1min",
            Self::Minute5 => "5min",
            Self::Minute15 => "15min",
            Self::Minute30 => "30min",
            Self::Hour1 => "1h",
            Self::Hour4 => "4h",
            Self::Day1 => "1d",
        }
    }

    /// Returns the bar table name for a prefix (e.g., "fx_1min").
    #[must_use]
    pub fn table_name(&self, prefix: &str) -> String {
        format!("{prefix}_{}", self.as_str())
    }

    /// Returns all available frequencies.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Second1,
            Self::Minute1,
            Self::Minute5,
            Self::Minute15,
            Self::Minute30,
            Self::Hour1,
            Self::Hour4,
            Self::Day1,
        ]
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = FrequencyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1s" | "s1" | "1sec" | "second" => Ok(Self::Second1),
            "1min" | "1m" | "m1" | "1t" | "minute" => Ok(Self::Minute1),
            "5min" | "5m" | "m5" | "5t" => Ok(Self::Minute5),
            "15min" | "15m" | "m15" | "15t" => Ok(Self::Minute15),
            "30min" | "30m" | "m30" | "30t" => Ok(Self::Minute30),
            "1h" | "h1" | "60min" | "hour" => Ok(Self::Hour1),
            "4h" | "h4" | "240min" => Ok(Self::Hour4),
            "1d" | "d1" | "day" | "daily" => Ok(Self::Day1),
            _ => Err(FrequencyParseError(s.to_string())),
        }
    }
}

/// Error returned when parsing an invalid frequency string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid frequency '{0}', expected one of: 1s, 1min, 5min, 15min, 30min, 1h, 4h, 1d")]
pub struct FrequencyParseError(String);
