//! Remote stats store.
//!
//! [`StatsGateway`] is the only way the client talks to the remote store.
//! Every call returns a [`GatewayError`] on failure; "no row yet" is
//! `Ok(None)`, not an error.

mod memory;
mod postgres;

pub use memory::{GatewayOp, MemoryGateway};
pub use postgres::PgGateway;

use crate::error::GatewayError;
use async_trait::async_trait;
use stats_engine::{AggregateStats, GameHistoryEntry, PuzzleDate};
use std::collections::BTreeSet;

/// History rows returned when the caller has no preference.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Result type for gateway calls.
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

#[async_trait]
pub trait StatsGateway: Send + Sync {
    /// The user's aggregate row, if one exists.
    async fn get_aggregate(&self, user_id: &str) -> GatewayResult<Option<AggregateStats>>;

    /// Every day the user has a history row for.
    async fn get_completed_days(&self, user_id: &str) -> GatewayResult<BTreeSet<PuzzleDate>>;

    /// Up to `limit` history rows, most recently played first.
    async fn get_history(
        &self,
        user_id: &str,
        limit: usize,
    ) -> GatewayResult<Vec<GameHistoryEntry>>;

    /// Insert or replace the user's aggregate row.
    async fn upsert_aggregate(&self, stats: &AggregateStats) -> GatewayResult<()>;

    /// Insert a history row, replacing an existing row for the same day.
    async fn upsert_history(&self, entry: &GameHistoryEntry) -> GatewayResult<()>;

    /// Insert history rows, skipping days that already have one.
    async fn insert_history_ignoring_duplicates(
        &self,
        entries: &[GameHistoryEntry],
    ) -> GatewayResult<()>;
}
