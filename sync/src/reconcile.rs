//! Login merge against the live stores.
//!
//! The merge rules live in [`stats_engine::merge_on_login`]; this module does
//! the IO around them. Both remote reads happen before anything is written,
//! so a failed read leaves local state exactly as it was.

use crate::error::Result;
use crate::gateway::StatsGateway;
use crate::storage::LocalStateStore;
use chrono::Utc;
use stats_engine::{merge_on_login, MergeResult};
use std::sync::Arc;

#[derive(Clone)]
pub struct Reconciler {
    gateway: Arc<dyn StatsGateway>,
    local: LocalStateStore,
}

impl Reconciler {
    pub fn new(gateway: Arc<dyn StatsGateway>, local: LocalStateStore) -> Self {
        Self { gateway, local }
    }

    pub async fn run(&self, user_id: &str) -> Result<MergeResult> {
        let (remote, remote_days) = futures::try_join!(
            self.gateway.get_aggregate(user_id),
            self.gateway.get_completed_days(user_id),
        )?;
        let local = self.local.load()?;

        let result = merge_on_login(user_id, &local, remote.as_ref(), &remote_days, Utc::now());

        if let Some(upload) = &result.upload {
            // History first: the aggregate row is what marks the upload done.
            self.gateway
                .insert_history_ignoring_duplicates(&upload.backfill)
                .await?;
            self.gateway.upsert_aggregate(&upload.aggregate).await?;
            tracing::info!(
                user_id = %user_id,
                games_played = upload.aggregate.games_played,
                backfilled = upload.backfill.len(),
                "Uploaded local stats"
            );
        }

        if result.local_changed {
            self.local.save(&result.snapshot)?;
        }

        tracing::debug!(
            user_id = %user_id,
            source = ?result.source,
            days_added = result.days_added,
            "Login merge complete"
        );
        Ok(result)
    }
}
