//! Remote-side data model: aggregate counters and per-day history rows.

use crate::{PuzzleDate, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Guesses needed for a perfect game. A winning score is `PERFECT_SCORE + mistakes`.
pub const PERFECT_SCORE: u32 = 4;

/// Outcome of a single puzzle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GameResult {
    Win,
    Loss,
}

impl GameResult {
    /// Wire name, as stored in the history table.
    pub fn as_str(&self) -> &'static str {
        match self {
            GameResult::Win => "WIN",
            GameResult::Loss => "LOSS",
        }
    }

    /// Parse the wire name.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "WIN" => Some(GameResult::Win),
            "LOSS" => Some(GameResult::Loss),
            _ => None,
        }
    }
}

/// Histogram of mistake counts across winning games.
///
/// Serialized as a string-keyed JSON object (`{"0": 2, "1": 1}`), which is
/// how the remote aggregate row stores it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WinDistribution(BTreeMap<u32, u32>);

impl WinDistribution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more win with `mistakes` mistakes.
    pub fn record(&mut self, mistakes: u32) {
        *self.0.entry(mistakes).or_insert(0) += 1;
    }

    /// Occurrences for a bucket.
    pub fn get(&self, mistakes: u32) -> u32 {
        self.0.get(&mistakes).copied().unwrap_or(0)
    }

    /// Sum of all buckets.
    pub fn total(&self) -> u32 {
        self.0.values().copied().fold(0u32, u32::saturating_add)
    }

    /// Buckets in ascending mistake order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl FromIterator<(u32, u32)> for WinDistribution {
    fn from_iter<I: IntoIterator<Item = (u32, u32)>>(iter: I) -> Self {
        let mut map = BTreeMap::new();
        for (mistakes, count) in iter {
            if count > 0 {
                *map.entry(mistakes).or_insert(0) += count;
            }
        }
        Self(map)
    }
}

/// Per-user summary counters, one row per user on the remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStats {
    pub user_id: UserId,
    pub games_played: u32,
    pub games_won: u32,
    pub current_streak: u32,
    pub max_streak: u32,
    pub win_distribution: WinDistribution,
    pub last_played_date: Option<PuzzleDate>,
    pub updated_at: DateTime<Utc>,
}

impl AggregateStats {
    /// A zeroed aggregate for a user with no games.
    pub fn empty(user_id: impl Into<UserId>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            games_played: 0,
            games_won: 0,
            current_streak: 0,
            max_streak: 0,
            win_distribution: WinDistribution::new(),
            last_played_date: None,
            updated_at: now,
        }
    }

    /// `games_won <= games_played` and the distribution never exceeds `games_played`.
    pub fn is_consistent(&self) -> bool {
        self.games_won <= self.games_played && self.win_distribution.total() <= self.games_played
    }

    /// Restore the counter invariants.
    ///
    /// `games_played` is raised to cover `games_won` and the distribution total,
    /// and `max_streak` is raised to cover `current_streak`.
    pub fn normalized(mut self) -> Self {
        self.games_played = self
            .games_played
            .max(self.games_won)
            .max(self.win_distribution.total());
        self.max_streak = self.max_streak.max(self.current_streak);
        self
    }
}

/// Details of one finished puzzle as submitted by the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameData {
    pub puzzle_date: PuzzleDate,
    pub result: GameResult,
    pub guesses_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_taken_seconds: Option<u32>,
}

impl GameData {
    pub fn new(puzzle_date: PuzzleDate, result: GameResult, guesses_count: u32) -> Self {
        Self {
            puzzle_date,
            result,
            guesses_count,
            time_taken_seconds: None,
        }
    }

    /// Set the solve time.
    pub fn with_time(mut self, seconds: u32) -> Self {
        self.time_taken_seconds = Some(seconds);
        self
    }

    /// Distribution bucket for a win; losses have none.
    pub fn mistake_bucket(&self) -> Option<u32> {
        match self.result {
            GameResult::Win => Some(self.guesses_count.saturating_sub(PERFECT_SCORE)),
            GameResult::Loss => None,
        }
    }

    /// The history row this game produces for `user_id`.
    pub fn history_entry(&self, user_id: impl Into<UserId>) -> GameHistoryEntry {
        GameHistoryEntry {
            user_id: user_id.into(),
            puzzle_date: self.puzzle_date,
            result: self.result,
            guesses_count: self.guesses_count,
            time_taken_seconds: self.time_taken_seconds,
        }
    }
}

/// One row per user per puzzle day. `(user_id, puzzle_date)` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameHistoryEntry {
    pub user_id: UserId,
    pub puzzle_date: PuzzleDate,
    pub result: GameResult,
    pub guesses_count: u32,
    pub time_taken_seconds: Option<u32>,
}

impl GameHistoryEntry {
    /// A backfilled row for a day known to be completed but lacking detail.
    ///
    /// The true result is not retained locally, so the row assumes a perfect win.
    pub fn backfill(user_id: impl Into<UserId>, puzzle_date: PuzzleDate) -> Self {
        Self {
            user_id: user_id.into(),
            puzzle_date,
            result: GameResult::Win,
            guesses_count: PERFECT_SCORE,
            time_taken_seconds: None,
        }
    }
}
