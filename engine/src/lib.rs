//! # Stats Engine
//!
//! Deterministic reconciliation core for a daily puzzle game's player stats.
//!
//! A player's progress lives in two places that mutate independently: the
//! device (a [`LocalSnapshot`]) and a remote store (an [`AggregateStats`] row
//! plus one [`GameHistoryEntry`] per played day). This crate holds the logic
//! that keeps them converging without a central lock.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine knows nothing about storage, network or auth
//! - **Deterministic**: timestamps are passed in, never read from a clock
//! - **Recovering**: malformed local values decode to empty defaults and are
//!   reported, never propagated
//!
//! ## Core Concepts
//!
//! ### Dates
//!
//! [`PuzzleDate`] accepts both `MM/DD/YYYY` (local) and `YYYY-MM-DD` (remote)
//! and normalizes idempotently.
//!
//! ### Login merge
//!
//! [`merge_on_login`] plans how local and remote state combine: remote wins for
//! counters when present, local is uploaded when the remote is empty, and
//! completed days are always unioned.
//!
//! ### Completion delta
//!
//! [`apply_completion`] turns the current remote aggregate into the aggregate
//! after one more game, skipping dates already recorded.
//!
//! ### Offline queue
//!
//! [`OfflineQueue`] is the per-user FIFO of [`CompletionRequest`]s waiting for
//! the remote to become reachable.
//!
//! ## Quick Start
//!
//! ```rust
//! use stats_engine::{merge_on_login, LocalSnapshot, MergeSource, PuzzleDate};
//! use std::collections::BTreeSet;
//!
//! let local = LocalSnapshot {
//!     played: 5,
//!     solve_list: vec![4, 5, 0, 6, 4],
//!     completed_days: [PuzzleDate::parse("01/02/2024").unwrap()].into(),
//!     ..Default::default()
//! };
//!
//! let result = merge_on_login("user-1", &local, None, &BTreeSet::new(), chrono::Utc::now());
//! assert_eq!(result.source, MergeSource::Local);
//!
//! let upload = result.upload.unwrap();
//! assert_eq!(upload.aggregate.games_won, 4);
//! assert_eq!(upload.backfill.len(), 1);
//! ```

pub mod completion;
pub mod date;
pub mod distribution;
pub mod error;
pub mod queue;
pub mod reconcile;
pub mod snapshot;
pub mod stats;

// Re-export main types at crate root
pub use completion::{apply_completion, CompletionOutcome};
pub use date::PuzzleDate;
pub use distribution::{build_solve_list, distribution_of};
pub use error::Error;
pub use queue::{
    queue_key, CompletionRequest, OfflineQueue, QueueItem, QueueItemKind, LEGACY_QUEUE_KEY,
};
pub use reconcile::{merge_on_login, MergeResult, MergeSource, Upload};
pub use snapshot::{Decoded, LocalSnapshot, RawSnapshot};
pub use stats::{
    AggregateStats, GameData, GameHistoryEntry, GameResult, WinDistribution, PERFECT_SCORE,
};

/// Type aliases for clarity
pub type UserId = String;
pub type Timestamp = chrono::DateTime<chrono::Utc>;
