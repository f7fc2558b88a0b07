use super::LocalStorage;
use crate::error::StorageError;
use stats_engine::snapshot::keys;
use stats_engine::{LocalSnapshot, RawSnapshot};
use std::sync::Arc;

/// The device's stats snapshot on top of a [`LocalStorage`].
#[derive(Clone)]
pub struct LocalStateStore {
    storage: Arc<dyn LocalStorage>,
}

impl LocalStateStore {
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        Self { storage }
    }

    /// Read the snapshot. Malformed values are logged and replaced with
    /// defaults; only a failing backend is an error.
    pub fn load(&self) -> Result<LocalSnapshot, StorageError> {
        let raw = RawSnapshot {
            played: self.storage.get(keys::PLAYED)?,
            current_streak: self.storage.get(keys::CURRENT_STREAK)?,
            max_streak: self.storage.get(keys::MAX_STREAK)?,
            solve_list: self.storage.get(keys::SOLVE_LIST)?,
            completed_days: self.storage.get(keys::COMPLETED_DAYS)?,
        };

        let decoded = LocalSnapshot::decode(&raw);
        for issue in &decoded.issues {
            tracing::warn!(error = %issue, "Recovered malformed local stats value");
        }
        Ok(decoded.snapshot)
    }

    /// Load, falling back to an empty snapshot when storage is unreadable.
    pub fn load_or_default(&self) -> LocalSnapshot {
        self.load().unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to read local stats");
            LocalSnapshot::default()
        })
    }

    pub fn save(&self, snapshot: &LocalSnapshot) -> Result<(), StorageError> {
        self.storage.set_many(&snapshot.encode())
    }
}
