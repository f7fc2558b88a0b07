use super::{GatewayResult, StatsGateway};
use crate::db::{self, Pool};
use crate::error::GatewayError;
use async_trait::async_trait;
use stats_engine::{AggregateStats, GameHistoryEntry, PuzzleDate};
use std::collections::BTreeSet;

/// [`StatsGateway`] over a PostgreSQL pool.
#[derive(Clone)]
pub struct PgGateway {
    pool: Pool,
}

impl PgGateway {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Connect, then bring the schema up to date.
    pub async fn connect(database_url: &str, max_connections: u32) -> GatewayResult<Self> {
        let pool = db::create_pool(database_url, max_connections).await?;
        db::run_migrations(&pool)
            .await
            .map_err(|e| GatewayError::transient(format!("migration failed: {e}")))?;
        tracing::info!("Database connected and migrated");
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}

impl From<sqlx::Error> for GatewayError {
    fn from(e: sqlx::Error) -> Self {
        let message = e.to_string();
        match &e {
            sqlx::Error::RowNotFound => GatewayError::not_found(message),
            _ if is_unique_violation(&e) => GatewayError::conflict(message),
            _ => GatewayError::transient(message),
        }
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = e {
        // PostgreSQL unique violation code is "23505"
        db_err.code().map(|c| c == "23505").unwrap_or(false)
    } else {
        false
    }
}

#[async_trait]
impl StatsGateway for PgGateway {
    async fn get_aggregate(&self, user_id: &str) -> GatewayResult<Option<AggregateStats>> {
        let row = db::get_aggregate(&self.pool, user_id).await?;
        Ok(row.map(|r| r.to_stats()))
    }

    async fn get_completed_days(&self, user_id: &str) -> GatewayResult<BTreeSet<PuzzleDate>> {
        Ok(db::get_completed_days(&self.pool, user_id).await?)
    }

    async fn get_history(
        &self,
        user_id: &str,
        limit: usize,
    ) -> GatewayResult<Vec<GameHistoryEntry>> {
        let rows = db::get_history(&self.pool, user_id, limit).await?;
        Ok(rows
            .iter()
            .filter_map(|row| {
                let entry = row.to_entry();
                if entry.is_none() {
                    tracing::warn!(
                        user_id = %row.user_id,
                        puzzle_date = %row.puzzle_date,
                        result = %row.result,
                        "Skipping history row with unknown result"
                    );
                }
                entry
            })
            .collect())
    }

    async fn upsert_aggregate(&self, stats: &AggregateStats) -> GatewayResult<()> {
        db::upsert_aggregate(&self.pool, stats).await?;
        Ok(())
    }

    async fn upsert_history(&self, entry: &GameHistoryEntry) -> GatewayResult<()> {
        db::upsert_history(&self.pool, entry).await?;
        Ok(())
    }

    async fn insert_history_ignoring_duplicates(
        &self,
        entries: &[GameHistoryEntry],
    ) -> GatewayResult<()> {
        let inserted = db::insert_history_ignoring_duplicates(&self.pool, entries).await?;
        tracing::debug!(
            requested = entries.len(),
            inserted,
            "Backfilled game history"
        );
        Ok(())
    }
}
