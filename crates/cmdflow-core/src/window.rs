//! Relative time windows such as `7d` or `24h`.

use crate::error::{CmdflowError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
}

impl WindowUnit {
    fn suffix(self) -> char {
        match self {
            WindowUnit::Seconds => 's',
            WindowUnit::Minutes => 'm',
            WindowUnit::Hours => 'h',
            WindowUnit::Days => 'd',
            WindowUnit::Weeks => 'w',
        }
    }

    fn from_suffix(c: char) -> Option<Self> {
        match c {
            's' => Some(WindowUnit::Seconds),
            'm' => Some(WindowUnit::Minutes),
            'h' => Some(WindowUnit::Hours),
            'd' => Some(WindowUnit::Days),
            'w' => Some(WindowUnit::Weeks),
            _ => None,
        }
    }
}

/// A window reaching back from "now" by a fixed amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeWindow {
    amount: u32,
    unit: WindowUnit,
}

impl TimeWindow {
    pub fn new(amount: u32, unit: WindowUnit) -> Self {
        Self { amount, unit }
    }

    pub fn days(amount: u32) -> Self {
        Self::new(amount, WindowUnit::Days)
    }

    pub fn duration(&self) -> Duration {
        let n = i64::from(self.amount);
        match self.unit {
            WindowUnit::Seconds => Duration::seconds(n),
            WindowUnit::Minutes => Duration::minutes(n),
            WindowUnit::Hours => Duration::hours(n),
            WindowUnit::Days => Duration::days(n),
            WindowUnit::Weeks => Duration::weeks(n),
        }
    }

    /// Oldest timestamp still inside the window. Saturates at the earliest
    /// representable instant for absurdly large windows.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.duration())
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    pub fn contains(&self, ts: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        ts >= self.cutoff(now)
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self::days(7)
    }
}

impl FromStr for TimeWindow {
    type Err = CmdflowError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let invalid = || CmdflowError::InvalidWindow(s.to_string());
        let unit_char = trimmed.chars().last().ok_or_else(invalid)?;
        let unit = WindowUnit::from_suffix(unit_char.to_ascii_lowercase()).ok_or_else(invalid)?;
        let digits = &trimmed[..trimmed.len() - unit_char.len_utf8()];
        let amount: u32 = digits.parse().map_err(|_| invalid())?;
        if amount == 0 {
            return Err(invalid());
        }
        Ok(Self { amount, unit })
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.unit.suffix())
    }
}

impl Serialize for TimeWindow {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeWindow {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
