//! Durable per-user offline queue.
//!
//! [`OfflineQueue`] values are persisted as JSON under the user-scoped key.
//! Each mutation is a load-modify-save under one lock, so an enqueue that
//! lands while a drain is waiting on the network is never lost.

use crate::error::{ErrorKind, StorageError};
use crate::storage::LocalStorage;
use crate::writer::CompletionWriter;
use chrono::Utc;
use serde::Serialize;
use stats_engine::{queue_key, CompletionRequest, OfflineQueue, QueueItem, LEGACY_QUEUE_KEY};
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

/// Outcome of one drain pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrainReport {
    /// Items written and removed.
    pub processed: usize,
    /// Items still queued.
    pub remaining: usize,
    /// Why the pass stopped early, if it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stopped_on: Option<ErrorKind>,
}

pub struct QueueStore {
    storage: Arc<dyn LocalStorage>,
    lock: Mutex<()>,
    draining: tokio::sync::Mutex<()>,
}

impl QueueStore {
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        Self {
            storage,
            lock: Mutex::new(()),
            draining: tokio::sync::Mutex::new(()),
        }
    }

    /// Run `f` against the user's queue and persist the result.
    fn update<T>(
        &self,
        user_id: &str,
        f: impl FnOnce(&mut OfflineQueue) -> T,
    ) -> Result<T, StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut queue = self.read(user_id)?;
        let out = f(&mut queue);
        let json = serde_json::to_string(&queue)?;
        self.storage.set(&queue_key(user_id), &json)?;
        Ok(out)
    }

    fn read(&self, user_id: &str) -> Result<OfflineQueue, StorageError> {
        self.discard_legacy()?;

        let Some(raw) = self.storage.get(&queue_key(user_id))? else {
            return Ok(OfflineQueue::new());
        };
        match OfflineQueue::from_json(&raw) {
            Ok(queue) => Ok(queue),
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Discarding unreadable offline queue");
                Ok(OfflineQueue::new())
            }
        }
    }

    /// Drop the pre-scoping queue. Its items cannot be attributed to a user.
    fn discard_legacy(&self) -> Result<(), StorageError> {
        if let Some(raw) = self.storage.get(LEGACY_QUEUE_KEY)? {
            let items = OfflineQueue::from_json(&raw).map(|q| q.len()).unwrap_or(0);
            tracing::warn!(items, "Discarding legacy unscoped offline queue");
            self.storage.remove(LEGACY_QUEUE_KEY)?;
        }
        Ok(())
    }

    /// A copy of the user's queue.
    pub fn load(&self, user_id: &str) -> Result<OfflineQueue, StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.read(user_id)
    }

    pub fn len(&self, user_id: &str) -> Result<usize, StorageError> {
        Ok(self.load(user_id)?.len())
    }

    pub fn enqueue(
        &self,
        user_id: &str,
        request: CompletionRequest,
    ) -> Result<QueueItem, StorageError> {
        let item = QueueItem::completion(request, Utc::now());
        let queued = item.clone();
        let len = self.update(user_id, |queue| {
            queue.enqueue(item);
            queue.len()
        })?;
        tracing::info!(user_id = %user_id, item_id = %queued.id, queued = len, "Queued completion for later sync");
        Ok(queued)
    }

    fn remove(&self, user_id: &str, id: Uuid) -> Result<bool, StorageError> {
        self.update(user_id, |queue| queue.remove(id))
    }

    /// Replay queued writes oldest first.
    ///
    /// Each item is removed only after its write succeeds. The pass stops at
    /// the first failure so later items never overtake an earlier one. If a
    /// drain for this store is already running, returns `None`.
    pub async fn drain(
        &self,
        user_id: &str,
        writer: &CompletionWriter,
    ) -> Result<Option<DrainReport>, StorageError> {
        let Ok(_running) = self.draining.try_lock() else {
            tracing::debug!(user_id = %user_id, "Drain already in progress");
            return Ok(None);
        };

        let mut report = DrainReport::default();

        loop {
            let Some(item) = self.load(user_id)?.front().cloned() else {
                break;
            };

            match writer.write(user_id, &item.payload).await {
                Ok(_) => {
                    self.remove(user_id, item.id)?;
                    report.processed += 1;
                    tracing::debug!(user_id = %user_id, item_id = %item.id, "Replayed queued completion");
                }
                Err(e) => {
                    tracing::warn!(user_id = %user_id, item_id = %item.id, error = %e, "Queued completion still failing");
                    report.stopped_on = Some(e.kind.into());
                    break;
                }
            }
        }

        report.remaining = self.len(user_id)?;
        if report.processed > 0 || report.remaining > 0 {
            tracing::info!(
                user_id = %user_id,
                processed = report.processed,
                remaining = report.remaining,
                "Offline queue drained"
            );
        }
        Ok(Some(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use stats_engine::{GameData, GameResult, PuzzleDate};

    fn request(date: &str) -> CompletionRequest {
        CompletionRequest::new(
            GameData::new(PuzzleDate::parse(date).unwrap(), GameResult::Loss, 8),
            None,
        )
    }

    #[test]
    fn enqueue_persists_under_scoped_key() {
        let storage = Arc::new(MemoryStorage::new());
        let queues = QueueStore::new(storage.clone());

        queues.enqueue("u1", request("01/01/2024")).unwrap();
        queues.enqueue("u1", request("01/02/2024")).unwrap();

        assert_eq!(queues.len("u1").unwrap(), 2);
        assert_eq!(queues.len("u2").unwrap(), 0);
        assert!(storage.get(&queue_key("u1")).unwrap().is_some());

        // A fresh store over the same storage sees the same items.
        let reopened = QueueStore::new(storage);
        let queue = reopened.load("u1").unwrap();
        assert_eq!(
            queue.front().unwrap().payload.game_data.puzzle_date.to_display(),
            "01/01/2024"
        );
    }

    #[test]
    fn legacy_queue_is_discarded() {
        let storage = Arc::new(MemoryStorage::new());
        let mut legacy = OfflineQueue::new();
        legacy.enqueue(QueueItem::completion(request("01/01/2024"), Utc::now()));
        storage
            .set(LEGACY_QUEUE_KEY, &legacy.to_json().unwrap())
            .unwrap();

        let queues = QueueStore::new(storage.clone());
        assert_eq!(queues.len("u1").unwrap(), 0);
        assert_eq!(storage.get(LEGACY_QUEUE_KEY).unwrap(), None);
    }

    #[test]
    fn unreadable_queue_starts_over() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(&queue_key("u1"), "[{\"broken\":").unwrap();

        let queues = QueueStore::new(storage);
        assert_eq!(queues.len("u1").unwrap(), 0);
        queues.enqueue("u1", request("01/01/2024")).unwrap();
        assert_eq!(queues.len("u1").unwrap(), 1);
    }

    #[test]
    fn drain_report_serializes_camel_case() {
        let report = DrainReport {
            processed: 1,
            remaining: 2,
            stopped_on: None,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json, serde_json::json!({"processed": 1, "remaining": 2}));
    }
}
