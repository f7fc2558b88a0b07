//! Database operations for the stats_aggregates table.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use sqlx::{PgPool, Row};
use stats_engine::{AggregateStats, PuzzleDate, WinDistribution};

/// A stored aggregate row from the database.
#[derive(Debug)]
pub struct StoredAggregate {
    pub user_id: String,
    pub games_played: i32,
    pub games_won: i32,
    pub current_streak: i32,
    pub max_streak: i32,
    pub win_distribution: Value,
    pub last_played_date: Option<NaiveDate>,
    pub updated_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredAggregate {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredAggregate {
            user_id: row.try_get("user_id")?,
            games_played: row.try_get("games_played")?,
            games_won: row.try_get("games_won")?,
            current_streak: row.try_get("current_streak")?,
            max_streak: row.try_get("max_streak")?,
            win_distribution: row.try_get("win_distribution")?,
            last_played_date: row.try_get("last_played_date")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl StoredAggregate {
    /// Convert a database row to a normalized aggregate.
    ///
    /// A distribution that does not decode is treated as empty; normalization
    /// then keeps the counters consistent.
    pub fn to_stats(&self) -> AggregateStats {
        let win_distribution = serde_json::from_value::<WinDistribution>(
            self.win_distribution.clone(),
        )
        .unwrap_or_else(|e| {
            tracing::warn!(user_id = %self.user_id, error = %e, "Ignoring malformed win distribution");
            WinDistribution::new()
        });

        AggregateStats {
            user_id: self.user_id.clone(),
            games_played: to_count(self.games_played),
            games_won: to_count(self.games_won),
            current_streak: to_count(self.current_streak),
            max_streak: to_count(self.max_streak),
            win_distribution,
            last_played_date: self.last_played_date.map(PuzzleDate::from),
            updated_at: self.updated_at,
        }
        .normalized()
    }
}

pub(crate) fn to_count(value: i32) -> u32 {
    value.max(0) as u32
}

pub(crate) fn to_column(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn distribution_json(distribution: &WinDistribution) -> Value {
    Value::Object(
        distribution
            .iter()
            .map(|(mistakes, count)| (mistakes.to_string(), Value::from(count)))
            .collect(),
    )
}

/// Upsert a user's aggregate row (insert or update).
pub async fn upsert_aggregate(pool: &PgPool, stats: &AggregateStats) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO stats_aggregates (
            user_id, games_played, games_won, current_streak, max_streak,
            win_distribution, last_played_date, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (user_id) DO UPDATE SET
            games_played = EXCLUDED.games_played,
            games_won = EXCLUDED.games_won,
            current_streak = EXCLUDED.current_streak,
            max_streak = EXCLUDED.max_streak,
            win_distribution = EXCLUDED.win_distribution,
            last_played_date = EXCLUDED.last_played_date,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(&stats.user_id)
    .bind(to_column(stats.games_played))
    .bind(to_column(stats.games_won))
    .bind(to_column(stats.current_streak))
    .bind(to_column(stats.max_streak))
    .bind(distribution_json(&stats.win_distribution))
    .bind(stats.last_played_date.map(|d| d.naive()))
    .bind(stats.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Get a user's aggregate row.
pub async fn get_aggregate(
    pool: &PgPool,
    user_id: &str,
) -> Result<Option<StoredAggregate>, sqlx::Error> {
    sqlx::query_as::<_, StoredAggregate>(
        r#"
        SELECT user_id, games_played, games_won, current_streak, max_streak,
               win_distribution, last_played_date, updated_at
        FROM stats_aggregates
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}
