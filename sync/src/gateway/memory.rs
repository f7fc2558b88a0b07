use super::{GatewayResult, StatsGateway};
use crate::error::{GatewayError, GatewayErrorKind};
use async_trait::async_trait;
use dashmap::DashMap;
use stats_engine::{AggregateStats, GameHistoryEntry, PuzzleDate, UserId};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};

/// Gateway operations, for failure injection and call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOp {
    GetAggregate,
    GetCompletedDays,
    GetHistory,
    UpsertAggregate,
    UpsertHistory,
    InsertHistory,
}

#[derive(Debug, Clone, Copy)]
struct Failure {
    kind: GatewayErrorKind,
    /// `None` fails until recovered.
    remaining: Option<usize>,
}

#[derive(Debug, Clone)]
struct StoredEntry {
    entry: GameHistoryEntry,
    /// Write sequence, standing in for `played_at`.
    played: u64,
}

/// In-process [`StatsGateway`] with the same uniqueness rules as the
/// database, plus injectable failures.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    aggregates: DashMap<UserId, AggregateStats>,
    history: DashMap<(UserId, PuzzleDate), StoredEntry>,
    clock: AtomicU64,
    failures: DashMap<GatewayOp, Failure>,
    calls: DashMap<GatewayOp, usize>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every call to `op` until [`recover`](Self::recover).
    pub fn fail(&self, op: GatewayOp, kind: GatewayErrorKind) {
        self.failures.insert(
            op,
            Failure {
                kind,
                remaining: None,
            },
        );
    }

    /// Fail the next `times` calls to `op`.
    pub fn fail_times(&self, op: GatewayOp, kind: GatewayErrorKind, times: usize) {
        self.failures.insert(
            op,
            Failure {
                kind,
                remaining: Some(times),
            },
        );
    }

    pub fn recover(&self, op: GatewayOp) {
        self.failures.remove(&op);
    }

    pub fn recover_all(&self) {
        self.failures.clear();
    }

    /// How many times `op` was attempted, failed attempts included.
    pub fn calls(&self, op: GatewayOp) -> usize {
        self.calls.get(&op).map(|c| *c).unwrap_or(0)
    }

    pub fn aggregate(&self, user_id: &str) -> Option<AggregateStats> {
        self.aggregates.get(user_id).map(|a| a.value().clone())
    }

    /// Seed an aggregate row directly.
    pub fn put_aggregate(&self, stats: AggregateStats) {
        self.aggregates.insert(stats.user_id.clone(), stats);
    }

    /// Seed a history row directly.
    pub fn put_history(&self, entry: GameHistoryEntry) {
        let stored = self.stored(entry);
        self.history
            .insert((stored.entry.user_id.clone(), stored.entry.puzzle_date), stored);
    }

    fn stored(&self, entry: GameHistoryEntry) -> StoredEntry {
        StoredEntry {
            entry,
            played: self.clock.fetch_add(1, Ordering::SeqCst),
        }
    }

    /// A user's history rows, oldest day first.
    pub fn history(&self, user_id: &str) -> Vec<GameHistoryEntry> {
        let mut rows: Vec<GameHistoryEntry> = self
            .history
            .iter()
            .filter(|e| e.key().0 == user_id)
            .map(|e| e.value().entry.clone())
            .collect();
        rows.sort_by_key(|e| e.puzzle_date);
        rows
    }

    fn enter(&self, op: GatewayOp) -> GatewayResult<()> {
        *self.calls.entry(op).or_insert(0) += 1;

        let Some(mut failure) = self.failures.get_mut(&op) else {
            return Ok(());
        };
        let kind = failure.kind;
        match failure.remaining {
            None => {}
            Some(0) => return Ok(()),
            Some(n) => failure.remaining = Some(n - 1),
        }
        Err(GatewayError::new(kind, format!("injected failure in {op:?}")))
    }
}

#[async_trait]
impl StatsGateway for MemoryGateway {
    async fn get_aggregate(&self, user_id: &str) -> GatewayResult<Option<AggregateStats>> {
        self.enter(GatewayOp::GetAggregate)?;
        Ok(self.aggregate(user_id).map(AggregateStats::normalized))
    }

    async fn get_completed_days(&self, user_id: &str) -> GatewayResult<BTreeSet<PuzzleDate>> {
        self.enter(GatewayOp::GetCompletedDays)?;
        Ok(self
            .history
            .iter()
            .filter(|e| e.key().0 == user_id)
            .map(|e| e.key().1)
            .collect())
    }

    async fn get_history(
        &self,
        user_id: &str,
        limit: usize,
    ) -> GatewayResult<Vec<GameHistoryEntry>> {
        self.enter(GatewayOp::GetHistory)?;
        let mut rows: Vec<StoredEntry> = self
            .history
            .iter()
            .filter(|e| e.key().0 == user_id)
            .map(|e| e.value().clone())
            .collect();
        rows.sort_by(|a, b| b.played.cmp(&a.played));
        Ok(rows.into_iter().take(limit).map(|s| s.entry).collect())
    }

    async fn upsert_aggregate(&self, stats: &AggregateStats) -> GatewayResult<()> {
        self.enter(GatewayOp::UpsertAggregate)?;
        self.put_aggregate(stats.clone());
        Ok(())
    }

    async fn upsert_history(&self, entry: &GameHistoryEntry) -> GatewayResult<()> {
        self.enter(GatewayOp::UpsertHistory)?;
        self.put_history(entry.clone());
        Ok(())
    }

    async fn insert_history_ignoring_duplicates(
        &self,
        entries: &[GameHistoryEntry],
    ) -> GatewayResult<()> {
        self.enter(GatewayOp::InsertHistory)?;
        for entry in entries {
            self.history
                .entry((entry.user_id.clone(), entry.puzzle_date))
                .or_insert_with(|| self.stored(entry.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stats_engine::{GameData, GameResult};

    fn entry(user: &str, date: &str, result: GameResult) -> GameHistoryEntry {
        GameData::new(PuzzleDate::parse(date).unwrap(), result, 6).history_entry(user)
    }

    #[tokio::test]
    async fn upsert_replaces_but_insert_ignores() {
        let gateway = MemoryGateway::new();
        gateway
            .upsert_history(&entry("u1", "01/01/2024", GameResult::Loss))
            .await
            .unwrap();
        gateway
            .insert_history_ignoring_duplicates(&[
                entry("u1", "01/01/2024", GameResult::Win),
                entry("u1", "01/02/2024", GameResult::Win),
            ])
            .await
            .unwrap();

        let rows = gateway.history("u1");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].result, GameResult::Loss);

        gateway
            .upsert_history(&entry("u1", "01/01/2024", GameResult::Win))
            .await
            .unwrap();
        assert_eq!(gateway.history("u1")[0].result, GameResult::Win);
    }

    #[tokio::test]
    async fn days_are_scoped_by_user() {
        let gateway = MemoryGateway::new();
        gateway.put_history(entry("u1", "01/01/2024", GameResult::Win));
        gateway.put_history(entry("u2", "01/02/2024", GameResult::Win));

        let days = gateway.get_completed_days("u1").await.unwrap();
        assert_eq!(days.len(), 1);
        assert!(gateway.get_aggregate("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn history_is_newest_first_and_limited() {
        let gateway = MemoryGateway::new();
        for date in ["01/03/2024", "01/01/2024", "01/02/2024"] {
            gateway
                .upsert_history(&entry("u1", date, GameResult::Win))
                .await
                .unwrap();
        }
        gateway.put_history(entry("u2", "01/04/2024", GameResult::Win));

        // Replaying a day moves it to the front.
        gateway
            .upsert_history(&entry("u1", "01/03/2024", GameResult::Loss))
            .await
            .unwrap();

        let rows = gateway.get_history("u1", 2).await.unwrap();
        let dates: Vec<String> = rows.iter().map(|r| r.puzzle_date.to_display()).collect();
        assert_eq!(dates, ["01/03/2024", "01/02/2024"]);
        assert_eq!(rows[0].result, GameResult::Loss);

        assert_eq!(gateway.get_history("u1", 10).await.unwrap().len(), 3);
        assert!(gateway.get_history("u1", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn injected_failures() {
        let gateway = MemoryGateway::new();
        gateway.fail_times(GatewayOp::GetAggregate, GatewayErrorKind::Transient, 1);

        let err = gateway.get_aggregate("u1").await.unwrap_err();
        assert_eq!(err.kind, GatewayErrorKind::Transient);
        assert!(gateway.get_aggregate("u1").await.is_ok());

        gateway.fail(GatewayOp::UpsertHistory, GatewayErrorKind::Conflict);
        let e = entry("u1", "01/01/2024", GameResult::Win);
        assert!(gateway.upsert_history(&e).await.is_err());
        assert!(gateway.upsert_history(&e).await.is_err());
        gateway.recover(GatewayOp::UpsertHistory);
        assert!(gateway.upsert_history(&e).await.is_ok());

        assert_eq!(gateway.calls(GatewayOp::GetAggregate), 2);
        assert_eq!(gateway.calls(GatewayOp::UpsertHistory), 3);
    }
}
