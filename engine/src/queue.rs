//! Offline queue of pending remote writes.
//!
//! A per-user FIFO. Items are appended when a remote write cannot be made and
//! removed only once the corresponding write succeeds. Queues are stored under
//! a key scoped by user id so accounts sharing a device never see each other's
//! pending writes. The pre-scoping key ([`LEGACY_QUEUE_KEY`]) has ambiguous
//! ownership and is discarded, never migrated.

use crate::{
    error::{Error, Result},
    GameData, LocalSnapshot, Timestamp,
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

/// Unscoped key used before queues were per-user.
pub const LEGACY_QUEUE_KEY: &str = "offlineQueue";

/// Storage key for a user's queue.
pub fn queue_key(user_id: &str) -> String {
    format!("{LEGACY_QUEUE_KEY}:{user_id}")
}

/// Kind of pending write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueItemKind {
    GameCompletion,
}

/// A completion exactly as the game submitted it.
///
/// `updated_stats: None` marks a history-only write (replays, archives) that
/// must not touch the aggregate counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    pub game_data: GameData,
    pub updated_stats: Option<LocalSnapshot>,
}

impl CompletionRequest {
    pub fn new(game_data: GameData, updated_stats: Option<LocalSnapshot>) -> Self {
        Self {
            game_data,
            updated_stats,
        }
    }

    /// Whether the aggregate should be updated.
    pub fn updates_aggregate(&self) -> bool {
        self.updated_stats.is_some()
    }
}

/// One pending write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub id: Uuid,
    pub kind: QueueItemKind,
    pub payload: CompletionRequest,
    pub enqueued_at: Timestamp,
}

impl QueueItem {
    /// Wrap a completion for queuing.
    pub fn completion(payload: CompletionRequest, enqueued_at: Timestamp) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: QueueItemKind::GameCompletion,
            payload,
            enqueued_at,
        }
    }
}

/// A user's queue, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OfflineQueue {
    items: VecDeque<QueueItem>,
}

impl OfflineQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item at the back.
    pub fn enqueue(&mut self, item: QueueItem) {
        self.items.push_back(item);
    }

    /// The oldest item.
    pub fn front(&self) -> Option<&QueueItem> {
        self.items.front()
    }

    /// Remove an item by id. Returns whether it was present.
    pub fn remove(&mut self, id: Uuid) -> bool {
        match self.items.iter().position(|item| item.id == id) {
            Some(index) => {
                self.items.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueueItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Serialize as a JSON array.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidQueue(e.to_string()))
    }

    /// Parse a JSON array of items.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidQueue(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GameResult, PuzzleDate};
    use chrono::Utc;

    fn request(date: &str) -> CompletionRequest {
        CompletionRequest::new(
            GameData::new(PuzzleDate::parse(date).unwrap(), GameResult::Win, 5),
            Some(LocalSnapshot::default()),
        )
    }

    #[test]
    fn keys_are_scoped() {
        assert_eq!(queue_key("abc"), "offlineQueue:abc");
        assert_ne!(queue_key("a"), queue_key("b"));
        assert_ne!(queue_key("a"), LEGACY_QUEUE_KEY);
    }

    #[test]
    fn fifo_order() {
        let mut queue = OfflineQueue::new();
        let first = QueueItem::completion(request("01/01/2024"), Utc::now());
        let second = QueueItem::completion(request("01/02/2024"), Utc::now());
        let first_id = first.id;

        queue.enqueue(first);
        queue.enqueue(second);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.front().unwrap().id, first_id);

        assert!(queue.remove(first_id));
        assert!(!queue.remove(first_id));
        assert_eq!(
            queue.front().unwrap().payload.game_data.puzzle_date.to_display(),
            "01/02/2024"
        );
    }

    #[test]
    fn json_shape() {
        let mut queue = OfflineQueue::new();
        queue.enqueue(QueueItem::completion(
            CompletionRequest::new(
                GameData::new(PuzzleDate::parse("01/01/2024").unwrap(), GameResult::Loss, 8),
                None,
            ),
            Utc::now(),
        ));

        let json: serde_json::Value = serde_json::from_str(&queue.to_json().unwrap()).unwrap();
        let item = &json[0];
        assert_eq!(item["kind"], "GAME_COMPLETION");
        assert_eq!(item["payload"]["gameData"]["puzzleDate"], "2024-01-01");
        assert_eq!(item["payload"]["gameData"]["result"], "LOSS");
        assert!(item["payload"]["updatedStats"].is_null());
        assert!(item["enqueuedAt"].is_string());

        let restored = OfflineQueue::from_json(&queue.to_json().unwrap()).unwrap();
        assert_eq!(restored, queue);
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(matches!(
            OfflineQueue::from_json("{\"nope\":1}"),
            Err(Error::InvalidQueue(_))
        ));
    }
}
