//! The remote half of recording a completion.
//!
//! Shared by the recorder and the queue drain so a retried item runs exactly
//! the same steps as the original call.

use crate::error::GatewayError;
use crate::gateway::StatsGateway;
use chrono::Utc;
use stats_engine::{apply_completion, CompletionOutcome, CompletionRequest};
use std::sync::Arc;

/// What the remote write did to the aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregateWrite {
    /// History-only request.
    Skipped,
    /// The aggregate already covered this day.
    AlreadyRecorded,
    Updated,
}

#[derive(Clone)]
pub struct CompletionWriter {
    gateway: Arc<dyn StatsGateway>,
}

impl CompletionWriter {
    pub fn new(gateway: Arc<dyn StatsGateway>) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &Arc<dyn StatsGateway> {
        &self.gateway
    }

    /// Upsert the history row, then read-modify-write the aggregate.
    ///
    /// Every step is idempotent, so a request that failed part way can be
    /// replayed from the start.
    pub async fn write(
        &self,
        user_id: &str,
        request: &CompletionRequest,
    ) -> Result<AggregateWrite, GatewayError> {
        let game = &request.game_data;
        self.gateway
            .upsert_history(&game.history_entry(user_id))
            .await?;

        if !request.updates_aggregate() {
            return Ok(AggregateWrite::Skipped);
        }

        let current = self.gateway.get_aggregate(user_id).await?;
        let outcome = apply_completion(
            user_id,
            current.as_ref(),
            request.updated_stats.as_ref(),
            game,
            Utc::now(),
        );

        match outcome {
            CompletionOutcome::AlreadyRecorded => {
                tracing::debug!(
                    user_id = %user_id,
                    puzzle_date = %game.puzzle_date,
                    "Aggregate already covers this day"
                );
                Ok(AggregateWrite::AlreadyRecorded)
            }
            CompletionOutcome::Seeded(stats) | CompletionOutcome::Applied(stats) => {
                self.gateway.upsert_aggregate(&stats).await?;
                Ok(AggregateWrite::Updated)
            }
        }
    }
}
