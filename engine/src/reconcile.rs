//! Merge-on-login between the local snapshot and the remote aggregate.
//!
//! # Authority rules
//!
//! 1. Remote aggregate absent, local has play: local is authoritative. The
//!    merge produces an upload (aggregate plus backfilled history rows for
//!    locally completed days the remote does not know about).
//! 2. Remote aggregate present: remote is authoritative for the counters and
//!    the distribution. Local counters may be stale relative to other devices
//!    and are not trusted. The solve list is rebuilt from the distribution.
//! 3. Completed days are always the union of both sides, whichever side is
//!    authoritative for counters.
//!
//! This is a heuristic convergence rule, not a causal merge: the remote only
//! stores aggregates, so there is nothing finer to merge on. It lives here,
//! in one place, so it can be replaced once per-event logs exist.
//!
//! The planner is pure. The caller fetches both sides, applies the returned
//! snapshot locally and performs the upload, if any.

use crate::{AggregateStats, GameHistoryEntry, LocalSnapshot, PuzzleDate, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Which side supplied the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MergeSource {
    /// Remote had no aggregate; local was uploaded.
    Local,
    /// Remote aggregate adopted.
    Remote,
    /// Neither side has any play.
    Empty,
}

/// Data to write to the remote when local is authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Upload {
    pub aggregate: AggregateStats,
    /// Rows to insert, duplicates ignored.
    pub backfill: Vec<GameHistoryEntry>,
}

/// Result of planning a login merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeResult {
    pub source: MergeSource,
    /// The snapshot to persist locally.
    pub snapshot: LocalSnapshot,
    /// Remote writes required, only when [`MergeSource::Local`].
    pub upload: Option<Upload>,
    /// Days present remotely but not locally before the merge.
    pub days_added: usize,
    /// Whether `snapshot` differs from the local input.
    pub local_changed: bool,
}

/// Plan the merge of `local` with the remote state for `user_id`.
pub fn merge_on_login(
    user_id: &str,
    local: &LocalSnapshot,
    remote: Option<&AggregateStats>,
    remote_days: &BTreeSet<PuzzleDate>,
    now: DateTime<Utc>,
) -> MergeResult {
    let completed_days = union_days(&local.completed_days, remote_days);
    let days_added = completed_days.len() - local.completed_days.len();

    let (source, snapshot, upload) = match remote {
        Some(remote) => {
            let remote = remote.clone().normalized();
            let snapshot = LocalSnapshot::from_aggregate(&remote, completed_days);
            (MergeSource::Remote, snapshot, None)
        }
        None if local.has_progress() => {
            let upload = plan_upload(user_id, local, remote_days, now);
            let snapshot = LocalSnapshot {
                completed_days,
                ..local.clone()
            };
            (MergeSource::Local, snapshot, Some(upload))
        }
        None => {
            let snapshot = LocalSnapshot {
                completed_days,
                ..local.clone()
            };
            (MergeSource::Empty, snapshot, None)
        }
    };

    let local_changed = snapshot != *local;
    MergeResult {
        source,
        snapshot,
        upload,
        days_added,
        local_changed,
    }
}

/// Union of two completed-day sets.
pub fn union_days(a: &BTreeSet<PuzzleDate>, b: &BTreeSet<PuzzleDate>) -> BTreeSet<PuzzleDate> {
    a.union(b).copied().collect()
}

fn plan_upload(
    user_id: &str,
    local: &LocalSnapshot,
    remote_days: &BTreeSet<PuzzleDate>,
    now: DateTime<Utc>,
) -> Upload {
    let user_id: UserId = user_id.to_string();
    let backfill = local
        .completed_days
        .difference(remote_days)
        .map(|day| GameHistoryEntry::backfill(user_id.clone(), *day))
        .collect();

    Upload {
        aggregate: local.to_aggregate(user_id, now),
        backfill,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WinDistribution;

    fn days(list: &[&str]) -> BTreeSet<PuzzleDate> {
        list.iter().map(|d| PuzzleDate::parse(d).unwrap()).collect()
    }

    fn remote(played: u32, won: u32, dist: &[(u32, u32)]) -> AggregateStats {
        AggregateStats {
            games_played: played,
            games_won: won,
            current_streak: 2,
            max_streak: 5,
            win_distribution: dist.iter().copied().collect::<WinDistribution>(),
            last_played_date: Some(PuzzleDate::parse("2024-01-03").unwrap()),
            ..AggregateStats::empty("u1", Utc::now())
        }
    }

    #[test]
    fn fresh_login_uploads_local() {
        let local = LocalSnapshot {
            played: 5,
            current_streak: 1,
            max_streak: 3,
            solve_list: vec![4, 5, 0, 6, 4],
            completed_days: days(&["01/01/2024", "01/02/2024"]),
        };

        let result = merge_on_login("u1", &local, None, &BTreeSet::new(), Utc::now());

        assert_eq!(result.source, MergeSource::Local);
        assert!(!result.local_changed);
        assert_eq!(result.snapshot, local);

        let upload = result.upload.unwrap();
        assert_eq!(upload.aggregate.games_played, 5);
        assert_eq!(upload.aggregate.games_won, 4);
        let expected: WinDistribution = [(0, 2), (1, 1), (2, 1)].into_iter().collect();
        assert_eq!(upload.aggregate.win_distribution, expected);
        assert_eq!(
            upload.aggregate.last_played_date,
            Some(PuzzleDate::parse("01/02/2024").unwrap())
        );
        assert_eq!(upload.backfill.len(), 2);
    }

    #[test]
    fn backfill_skips_days_known_remotely() {
        let local = LocalSnapshot {
            played: 2,
            solve_list: vec![4, 4],
            completed_days: days(&["01/01/2024", "01/02/2024"]),
            ..Default::default()
        };
        let remote_days = days(&["2024-01-02"]);

        let result = merge_on_login("u1", &local, None, &remote_days, Utc::now());
        let upload = result.upload.unwrap();
        assert_eq!(upload.backfill.len(), 1);
        assert_eq!(upload.backfill[0].puzzle_date.to_display(), "01/01/2024");
    }

    #[test]
    fn remote_counters_win() {
        let local = LocalSnapshot {
            played: 50,
            current_streak: 9,
            max_streak: 9,
            solve_list: vec![4; 50],
            completed_days: days(&["01/01/2024"]),
        };
        let remote = remote(4, 3, &[(0, 2), (1, 1)]);

        let result = merge_on_login("u1", &local, Some(&remote), &BTreeSet::new(), Utc::now());

        assert_eq!(result.source, MergeSource::Remote);
        assert!(result.upload.is_none());
        assert!(result.local_changed);
        assert_eq!(result.snapshot.played, 4);
        assert_eq!(result.snapshot.current_streak, 2);
        assert_eq!(result.snapshot.max_streak, 5);
        assert_eq!(result.snapshot.solve_list, vec![4, 4, 5, 0]);
        assert_eq!(result.snapshot.completed_days, local.completed_days);
    }

    #[test]
    fn completed_days_are_unioned() {
        let local = LocalSnapshot {
            played: 2,
            completed_days: days(&["01/01/2024", "01/02/2024"]),
            ..Default::default()
        };
        let remote_days = days(&["01/02/2024", "01/03/2024"]);
        let remote = remote(3, 0, &[]);

        let result = merge_on_login("u1", &local, Some(&remote), &remote_days, Utc::now());

        let merged: Vec<String> = result
            .snapshot
            .completed_days
            .iter()
            .map(|d| d.to_display())
            .collect();
        assert_eq!(merged, vec!["01/01/2024", "01/02/2024", "01/03/2024"]);
        assert_eq!(result.days_added, 1);
    }

    #[test]
    fn nothing_anywhere() {
        let result = merge_on_login(
            "u1",
            &LocalSnapshot::default(),
            None,
            &BTreeSet::new(),
            Utc::now(),
        );
        assert_eq!(result.source, MergeSource::Empty);
        assert!(result.upload.is_none());
        assert!(!result.local_changed);
    }

    #[test]
    fn inconsistent_remote_is_normalized() {
        let remote = remote(1, 3, &[(0, 3)]);
        let result = merge_on_login(
            "u1",
            &LocalSnapshot::default(),
            Some(&remote),
            &BTreeSet::new(),
            Utc::now(),
        );
        assert_eq!(result.snapshot.played, 3);
        assert_eq!(result.snapshot.solve_list, vec![4, 4, 4]);
    }
}
