//! The device-side view of a player's stats.
//!
//! [`LocalSnapshot`] mirrors [`AggregateStats`] in the shape the UI wants.
//! It is persisted as a handful of string values under fixed keys; this
//! module owns the codec. Decoding never fails: malformed values fall back to
//! an empty default and are reported as issues for the caller to log.

use crate::{
    distribution::{build_solve_list, distribution_of, wins_in},
    error::Error,
    AggregateStats, PuzzleDate, UserId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// Storage keys for the snapshot fields.
pub mod keys {
    pub const PLAYED: &str = "played";
    pub const CURRENT_STREAK: &str = "currentStreak";
    pub const MAX_STREAK: &str = "maxStreak";
    pub const SOLVE_LIST: &str = "solveList";
    pub const COMPLETED_DAYS: &str = "completedDays";

    /// All keys, in the order they are written.
    pub const ALL: [&str; 5] = [PLAYED, CURRENT_STREAK, MAX_STREAK, SOLVE_LIST, COMPLETED_DAYS];
}

/// Locally stored stats for the current device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalSnapshot {
    pub played: u32,
    pub current_streak: u32,
    pub max_streak: u32,
    /// One score per game: `0` for a loss, `4 + mistakes` for a win.
    pub solve_list: Vec<u32>,
    pub completed_days: BTreeSet<PuzzleDate>,
}

/// Raw values as read from storage, one per key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSnapshot {
    pub played: Option<String>,
    pub current_streak: Option<String>,
    pub max_streak: Option<String>,
    pub solve_list: Option<String>,
    pub completed_days: Option<String>,
}

/// Outcome of decoding a [`RawSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub snapshot: LocalSnapshot,
    /// Values that were malformed and replaced or dropped.
    pub issues: Vec<Error>,
}

impl LocalSnapshot {
    /// Decode stored values, recovering from anything malformed.
    pub fn decode(raw: &RawSnapshot) -> Decoded {
        let mut issues = Vec::new();

        let played = decode_counter(keys::PLAYED, raw.played.as_deref(), &mut issues);
        let current_streak =
            decode_counter(keys::CURRENT_STREAK, raw.current_streak.as_deref(), &mut issues);
        let max_streak = decode_counter(keys::MAX_STREAK, raw.max_streak.as_deref(), &mut issues);
        let solve_list = decode_solve_list(raw.solve_list.as_deref(), &mut issues);
        let completed_days = decode_days(raw.completed_days.as_deref(), &mut issues);

        Decoded {
            snapshot: Self {
                played,
                current_streak,
                max_streak,
                solve_list,
                completed_days,
            },
            issues,
        }
    }

    /// Encode into `(key, value)` pairs for storage.
    ///
    /// Completed days are written in the display format.
    pub fn encode(&self) -> Vec<(&'static str, String)> {
        let days: Vec<String> = self.completed_days.iter().map(|d| d.to_display()).collect();
        vec![
            (keys::PLAYED, self.played.to_string()),
            (keys::CURRENT_STREAK, self.current_streak.to_string()),
            (keys::MAX_STREAK, self.max_streak.to_string()),
            (keys::SOLVE_LIST, Value::from(self.solve_list.clone()).to_string()),
            (keys::COMPLETED_DAYS, Value::from(days).to_string()),
        ]
    }

    /// Whether the device has any recorded play.
    pub fn has_progress(&self) -> bool {
        self.played > 0
    }

    /// Most recent completed day, chronologically.
    pub fn last_completed_day(&self) -> Option<PuzzleDate> {
        self.completed_days.iter().next_back().copied()
    }

    /// Build the aggregate row this snapshot represents.
    pub fn to_aggregate(&self, user_id: impl Into<UserId>, now: DateTime<Utc>) -> AggregateStats {
        AggregateStats {
            user_id: user_id.into(),
            games_played: self.played,
            games_won: wins_in(&self.solve_list),
            current_streak: self.current_streak,
            max_streak: self.max_streak,
            win_distribution: distribution_of(&self.solve_list),
            last_played_date: self.last_completed_day(),
            updated_at: now,
        }
        .normalized()
    }

    /// Build a snapshot from a remote aggregate.
    ///
    /// The solve list is reconstructed from the distribution and is an
    /// approximation; see [`crate::distribution`].
    pub fn from_aggregate(stats: &AggregateStats, completed_days: BTreeSet<PuzzleDate>) -> Self {
        Self {
            played: stats.games_played,
            current_streak: stats.current_streak,
            max_streak: stats.max_streak,
            solve_list: build_solve_list(&stats.win_distribution, stats.games_played),
            completed_days,
        }
    }
}

fn invalid(key: &str, reason: impl Into<String>) -> Error {
    Error::InvalidStoredValue {
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// Parse JSON, unwrapping one level of double encoding (`"\"[1,2]\""`).
fn parse_json(key: &str, raw: &str) -> Result<Value, Error> {
    let value: Value = serde_json::from_str(raw).map_err(|e| invalid(key, e.to_string()))?;
    match value {
        Value::String(inner) => {
            serde_json::from_str(&inner).map_err(|e| invalid(key, e.to_string()))
        }
        other => Ok(other),
    }
}

fn decode_counter(key: &str, raw: Option<&str>, issues: &mut Vec<Error>) -> u32 {
    let Some(raw) = raw else { return 0 };
    let trimmed = raw.trim();
    if let Ok(n) = trimmed.parse::<u32>() {
        return n;
    }
    match parse_json(key, trimmed) {
        Ok(Value::Number(n)) if n.as_u64().is_some_and(|v| v <= u32::MAX as u64) => {
            n.as_u64().unwrap_or_default() as u32
        }
        Ok(Value::Null) => 0,
        Ok(other) => {
            issues.push(invalid(key, format!("expected a non-negative integer, got {other}")));
            0
        }
        Err(e) => {
            issues.push(e);
            0
        }
    }
}

fn decode_solve_list(raw: Option<&str>, issues: &mut Vec<Error>) -> Vec<u32> {
    let key = keys::SOLVE_LIST;
    let Some(raw) = raw else { return Vec::new() };
    let items = match parse_json(key, raw) {
        Ok(Value::Array(items)) => items,
        Ok(Value::Null) => return Vec::new(),
        Ok(_) => {
            issues.push(invalid(key, "expected a JSON array"));
            return Vec::new();
        }
        Err(e) => {
            issues.push(e);
            return Vec::new();
        }
    };

    let mut list = Vec::with_capacity(items.len());
    for item in items {
        match item.as_u64().filter(|v| *v <= u32::MAX as u64) {
            Some(score) => list.push(score as u32),
            None => issues.push(invalid(key, format!("dropped entry {item}"))),
        }
    }
    list
}

fn decode_days(raw: Option<&str>, issues: &mut Vec<Error>) -> BTreeSet<PuzzleDate> {
    let key = keys::COMPLETED_DAYS;
    let Some(raw) = raw else {
        return BTreeSet::new();
    };
    let items = match parse_json(key, raw) {
        Ok(Value::Array(items)) => items,
        Ok(Value::Null) => return BTreeSet::new(),
        Ok(_) => {
            issues.push(invalid(key, "expected a JSON array"));
            return BTreeSet::new();
        }
        Err(e) => {
            issues.push(e);
            return BTreeSet::new();
        }
    };

    let mut days = BTreeSet::new();
    for item in items {
        match item.as_str().map(PuzzleDate::parse) {
            Some(Ok(day)) => {
                days.insert(day);
            }
            Some(Err(e)) => issues.push(e),
            None => issues.push(invalid(key, format!("dropped entry {item}"))),
        }
    }
    days
}
