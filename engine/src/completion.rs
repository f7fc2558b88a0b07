//! Read-modify-write delta for a finished puzzle.
//!
//! Given the aggregate currently stored remotely, compute the aggregate
//! after one more game. The caller reads, calls [`apply_completion`], and
//! upserts the result; reading first avoids clobbering updates made by
//! another device in between.
//!
//! `last_played_date` is the only ordering guard: a game for the date already
//! recorded is treated as a duplicate. This protects against same-day double
//! counting, not against out-of-order multi-day streams.

use crate::{AggregateStats, GameData, GameResult, LocalSnapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What to do with the remote aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "outcome", content = "stats")]
pub enum CompletionOutcome {
    /// The remote already counts this puzzle date. Nothing to write.
    AlreadyRecorded,
    /// No remote row existed; seeded from the device's snapshot.
    Seeded(AggregateStats),
    /// Delta applied to the existing (or zeroed) aggregate.
    Applied(AggregateStats),
}

impl CompletionOutcome {
    /// The aggregate to upsert, if any.
    pub fn stats(&self) -> Option<&AggregateStats> {
        match self {
            CompletionOutcome::AlreadyRecorded => None,
            CompletionOutcome::Seeded(stats) | CompletionOutcome::Applied(stats) => Some(stats),
        }
    }
}

/// Compute the aggregate after recording `game` for `user_id`.
///
/// With no remote row, `device_stats` (the device's post-game snapshot, which
/// already includes this game) seeds the aggregate. Without either, the delta
/// is applied to a zeroed aggregate.
pub fn apply_completion(
    user_id: &str,
    current: Option<&AggregateStats>,
    device_stats: Option<&LocalSnapshot>,
    game: &GameData,
    now: DateTime<Utc>,
) -> CompletionOutcome {
    match (current, device_stats) {
        (Some(current), _) if current.last_played_date == Some(game.puzzle_date) => {
            CompletionOutcome::AlreadyRecorded
        }
        (Some(current), _) => CompletionOutcome::Applied(apply_delta(current.clone(), game, now)),
        (None, Some(device)) => {
            let mut seeded = device.to_aggregate(user_id, now);
            seeded.last_played_date = Some(game.puzzle_date);
            CompletionOutcome::Seeded(seeded)
        }
        (None, None) => {
            let empty = AggregateStats::empty(user_id, now);
            CompletionOutcome::Applied(apply_delta(empty, game, now))
        }
    }
}

fn apply_delta(mut stats: AggregateStats, game: &GameData, now: DateTime<Utc>) -> AggregateStats {
    stats = stats.normalized();
    stats.games_played = stats.games_played.saturating_add(1);

    match game.result {
        GameResult::Win => {
            stats.games_won = stats.games_won.saturating_add(1);
            stats.current_streak = stats.current_streak.saturating_add(1);
            stats.max_streak = stats.max_streak.max(stats.current_streak);
        }
        GameResult::Loss => stats.current_streak = 0,
    }

    if let Some(bucket) = game.mistake_bucket() {
        stats.win_distribution.record(bucket);
    }

    stats.last_played_date = Some(game.puzzle_date);
    stats.updated_at = now;
    stats
}
