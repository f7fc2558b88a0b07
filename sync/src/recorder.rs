//! Recording a finished puzzle.

use crate::auth::{SessionCheck, SessionGuard};
use crate::error::ErrorKind;
use crate::queue::QueueStore;
use crate::session::SessionState;
use crate::storage::LocalStateStore;
use crate::writer::CompletionWriter;
use serde::Serialize;
use stats_engine::{CompletionRequest, GameData, LocalSnapshot};
use std::sync::Arc;

/// What the player is told after a completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "message")]
pub enum RecordStatus {
    /// Written to the remote store.
    Saved,
    /// No usable session; kept on the device.
    SavedLocally,
    /// The remote write failed and was queued for retry.
    SyncError(String),
}

#[derive(Clone)]
pub struct CompletionRecorder {
    guard: SessionGuard,
    writer: CompletionWriter,
    queue: Arc<QueueStore>,
    local: LocalStateStore,
    state: Arc<SessionState>,
}

impl CompletionRecorder {
    pub fn new(
        guard: SessionGuard,
        writer: CompletionWriter,
        queue: Arc<QueueStore>,
        local: LocalStateStore,
        state: Arc<SessionState>,
    ) -> Self {
        Self {
            guard,
            writer,
            queue,
            local,
            state,
        }
    }

    /// Record a completion.
    ///
    /// `updated_stats` is the device's snapshot after this game; `None` marks
    /// a history-only write that leaves the aggregate alone. When the user
    /// already has queued completions, this one is queued behind them and the
    /// queue is replayed, so remote writes land in the order games were
    /// played. Never fails: any problem degrades to local persistence and the
    /// offline queue.
    pub async fn record(
        &self,
        game_data: GameData,
        updated_stats: Option<LocalSnapshot>,
    ) -> RecordStatus {
        if let Some(stats) = &updated_stats {
            if let Err(e) = self.local.save(stats) {
                tracing::error!(error = %e, "Failed to save local stats");
            }
        }

        let request = CompletionRequest::new(game_data, updated_stats);

        let user_id = match self.guard.ensure_valid().await {
            SessionCheck::Valid(user_id) => user_id,
            SessionCheck::Invalid => {
                match self.state.current_user() {
                    Some(user_id) => {
                        self.enqueue(&user_id, request);
                    }
                    None => tracing::debug!("No known user, completion kept on device only"),
                }
                return RecordStatus::SavedLocally;
            }
        };

        if self.has_backlog(&user_id) && self.enqueue(&user_id, request.clone()) {
            return self.replay_backlog(&user_id).await;
        }

        match self.writer.write(&user_id, &request).await {
            Ok(write) => {
                tracing::debug!(
                    user_id = %user_id,
                    puzzle_date = %request.game_data.puzzle_date,
                    aggregate = ?write,
                    "Recorded completion"
                );
                if let Err(e) = self.queue.drain(&user_id, &self.writer).await {
                    tracing::error!(user_id = %user_id, error = %e, "Failed to drain offline queue");
                }
                RecordStatus::Saved
            }
            Err(e) => {
                tracing::warn!(
                    user_id = %user_id,
                    puzzle_date = %request.game_data.puzzle_date,
                    error = %e,
                    "Remote write failed, queuing completion"
                );
                let message = e.to_string();
                self.enqueue(&user_id, request);
                self.state.mark_failed(message.clone());
                RecordStatus::SyncError(message)
            }
        }
    }

    fn has_backlog(&self, user_id: &str) -> bool {
        match self.queue.len(user_id) {
            Ok(len) => len > 0,
            Err(e) => {
                tracing::error!(user_id = %user_id, error = %e, "Failed to read offline queue");
                false
            }
        }
    }

    /// The completion was queued behind earlier ones; replay them in order.
    async fn replay_backlog(&self, user_id: &str) -> RecordStatus {
        match self.queue.drain(user_id, &self.writer).await {
            Ok(Some(report)) if report.remaining == 0 => RecordStatus::Saved,
            Ok(Some(report)) => {
                let kind = report.stopped_on.unwrap_or(ErrorKind::Transient);
                let message = format!(
                    "{kind} remote error: {} completions waiting to sync",
                    report.remaining
                );
                self.state.mark_failed(message.clone());
                RecordStatus::SyncError(message)
            }
            // A drain already running picks the new item up.
            Ok(None) => RecordStatus::SavedLocally,
            Err(e) => {
                tracing::error!(user_id = %user_id, error = %e, "Failed to drain offline queue");
                RecordStatus::SavedLocally
            }
        }
    }

    /// Returns whether the request is now queued.
    fn enqueue(&self, user_id: &str, request: CompletionRequest) -> bool {
        match self.queue.enqueue(user_id, request) {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(user_id = %user_id, error = %e, "Failed to queue completion");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serialization() {
        assert_eq!(
            serde_json::to_value(RecordStatus::Saved).unwrap(),
            serde_json::json!({"status": "saved"})
        );
        assert_eq!(
            serde_json::to_value(RecordStatus::SyncError("offline".into())).unwrap(),
            serde_json::json!({"status": "sync_error", "message": "offline"})
        );
    }
}
