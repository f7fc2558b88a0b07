//! Puzzle dates and the two formats they travel in.
//!
//! Dates cross the local/remote boundary in two shapes:
//! - `MM/DD/YYYY` - the display format kept in local storage
//! - `YYYY-MM-DD` - the storage format used by the remote tables
//!
//! Normalization is idempotent: a value already in the target format passes
//! through unchanged (after zero-padding).

use crate::error::{Error, Result};
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A single puzzle day.
///
/// Parses from either format and serializes in the storage format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PuzzleDate(NaiveDate);

impl PuzzleDate {
    /// Create from calendar components.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or_else(|| Error::InvalidDate(format!("{year:04}-{month:02}-{day:02}")))
    }

    /// Parse a date in either `MM/DD/YYYY` or `YYYY-MM-DD` form.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let invalid = || Error::InvalidDate(input.to_string());

        let (year, month, day) = if trimmed.contains('/') {
            let mut parts = trimmed.split('/');
            let month = parts.next().ok_or_else(invalid)?;
            let day = parts.next().ok_or_else(invalid)?;
            let year = parts.next().ok_or_else(invalid)?;
            if parts.next().is_some() {
                return Err(invalid());
            }
            (year, month, day)
        } else {
            let mut parts = trimmed.split('-');
            let year = parts.next().ok_or_else(invalid)?;
            let month = parts.next().ok_or_else(invalid)?;
            let day = parts.next().ok_or_else(invalid)?;
            if parts.next().is_some() {
                return Err(invalid());
            }
            (year, month, day)
        };

        if year.len() != 4 || month.is_empty() || month.len() > 2 || day.is_empty() || day.len() > 2
        {
            return Err(invalid());
        }

        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        let day: u32 = day.parse().map_err(|_| invalid())?;

        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or_else(invalid)
    }

    /// The puzzle day at `now` for a calendar running at a fixed UTC offset.
    pub fn today_in(offset: FixedOffset, now: DateTime<Utc>) -> Self {
        Self(now.with_timezone(&offset).date_naive())
    }

    /// Storage format, `YYYY-MM-DD`.
    pub fn to_storage(&self) -> String {
        self.0.format("%Y-%m-%d").to_string()
    }

    /// Display format, `MM/DD/YYYY`.
    pub fn to_display(&self) -> String {
        format!("{:02}/{:02}/{:04}", self.0.month(), self.0.day(), self.0.year())
    }

    /// The underlying calendar date.
    pub fn naive(&self) -> NaiveDate {
        self.0
    }
}

impl From<NaiveDate> for PuzzleDate {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl FromStr for PuzzleDate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for PuzzleDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_storage())
    }
}

impl Serialize for PuzzleDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_storage())
    }
}

impl<'de> Deserialize<'de> for PuzzleDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
