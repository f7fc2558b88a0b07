//! Database operations for the game_history table.

use super::aggregates::{to_column, to_count};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Row};
use stats_engine::{GameHistoryEntry, GameResult, PuzzleDate};
use std::collections::BTreeSet;

/// A stored history row from the database.
#[derive(Debug)]
pub struct StoredHistory {
    pub user_id: String,
    pub puzzle_date: NaiveDate,
    pub result: String,
    pub guesses_count: i32,
    pub time_taken_seconds: Option<i32>,
    pub played_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredHistory {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredHistory {
            user_id: row.try_get("user_id")?,
            puzzle_date: row.try_get("puzzle_date")?,
            result: row.try_get("result")?,
            guesses_count: row.try_get("guesses_count")?,
            time_taken_seconds: row.try_get("time_taken_seconds")?,
            played_at: row.try_get("played_at")?,
        })
    }
}

impl StoredHistory {
    /// Convert a database row to a history entry. `None` for an unknown result.
    pub fn to_entry(&self) -> Option<GameHistoryEntry> {
        let result = GameResult::from_wire(&self.result)?;
        Some(GameHistoryEntry {
            user_id: self.user_id.clone(),
            puzzle_date: PuzzleDate::from(self.puzzle_date),
            result,
            guesses_count: to_count(self.guesses_count),
            time_taken_seconds: self.time_taken_seconds.map(to_count),
        })
    }
}

/// Insert a history row, overwriting an existing row for the same day.
pub async fn upsert_history(pool: &PgPool, entry: &GameHistoryEntry) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO game_history (
            user_id, puzzle_date, result, guesses_count, time_taken_seconds
        )
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (user_id, puzzle_date) DO UPDATE SET
            result = EXCLUDED.result,
            guesses_count = EXCLUDED.guesses_count,
            time_taken_seconds = EXCLUDED.time_taken_seconds,
            played_at = NOW()
        "#,
    )
    .bind(&entry.user_id)
    .bind(entry.puzzle_date.naive())
    .bind(entry.result.as_str())
    .bind(to_column(entry.guesses_count))
    .bind(entry.time_taken_seconds.map(to_column))
    .execute(pool)
    .await?;

    Ok(())
}

/// Insert history rows, leaving existing days untouched.
///
/// Runs in one transaction so a partial backfill is never visible.
pub async fn insert_history_ignoring_duplicates(
    pool: &PgPool,
    entries: &[GameHistoryEntry],
) -> Result<u64, sqlx::Error> {
    if entries.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    let mut inserted = 0;

    for entry in entries {
        let result = sqlx::query(
            r#"
            INSERT INTO game_history (
                user_id, puzzle_date, result, guesses_count, time_taken_seconds
            )
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, puzzle_date) DO NOTHING
            "#,
        )
        .bind(&entry.user_id)
        .bind(entry.puzzle_date.naive())
        .bind(entry.result.as_str())
        .bind(to_column(entry.guesses_count))
        .bind(entry.time_taken_seconds.map(to_column))
        .execute(&mut *tx)
        .await?;

        inserted += result.rows_affected();
    }

    tx.commit().await?;
    Ok(inserted)
}

/// Every day the user has a history row for.
pub async fn get_completed_days(
    pool: &PgPool,
    user_id: &str,
) -> Result<BTreeSet<PuzzleDate>, sqlx::Error> {
    let days: Vec<NaiveDate> = sqlx::query_scalar(
        r#"
        SELECT puzzle_date
        FROM game_history
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(days.into_iter().map(PuzzleDate::from).collect())
}

/// The user's most recently played games, newest first.
pub async fn get_history(
    pool: &PgPool,
    user_id: &str,
    limit: usize,
) -> Result<Vec<StoredHistory>, sqlx::Error> {
    sqlx::query_as::<_, StoredHistory>(
        r#"
        SELECT user_id, puzzle_date, result, guesses_count, time_taken_seconds, played_at
        FROM game_history
        WHERE user_id = $1
        ORDER BY played_at DESC, id DESC
        LIMIT $2
        "#,
    )
    .bind(user_id)
    .bind(i64::try_from(limit).unwrap_or(i64::MAX))
    .fetch_all(pool)
    .await
}
