//! Process-wide session state.
//!
//! One [`SessionState`] lives for the life of the client and is shared by
//! every component. It holds the signed-in user, the user the login merge
//! last ran for, and the observable [`SyncStatus`]. All three sit on
//! `tokio::sync::watch` channels so the UI can subscribe to changes.

use serde::Serialize;
use stats_engine::UserId;
use tokio::sync::watch;

/// What the UI shows about the remote sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub synced: bool,
    pub syncing: bool,
    pub last_sync_error: Option<String>,
}

#[derive(Debug)]
pub struct SessionState {
    user: watch::Sender<Option<UserId>>,
    last_reconciled: watch::Sender<Option<UserId>>,
    status: watch::Sender<SyncStatus>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            user: watch::channel(None).0,
            last_reconciled: watch::channel(None).0,
            status: watch::channel(SyncStatus::default()).0,
        }
    }

    /// The signed-in user, if any.
    pub fn current_user(&self) -> Option<UserId> {
        self.user.borrow().clone()
    }

    pub fn set_user(&self, user_id: Option<UserId>) {
        self.user.send_if_modified(|current| {
            if *current == user_id {
                return false;
            }
            *current = user_id;
            true
        });
    }

    pub fn subscribe_user(&self) -> watch::Receiver<Option<UserId>> {
        self.user.subscribe()
    }

    pub fn last_reconciled(&self) -> Option<UserId> {
        self.last_reconciled.borrow().clone()
    }

    /// Claim the login merge for `user_id`.
    ///
    /// Returns `false` if it already ran (or is running) for this user. The
    /// check and the claim are one atomic step.
    pub fn begin_reconcile(&self, user_id: &str) -> bool {
        self.last_reconciled.send_if_modified(|last| {
            if last.as_deref() == Some(user_id) {
                return false;
            }
            *last = Some(user_id.to_string());
            true
        })
    }

    /// Release a claim so the next session event retries the merge.
    pub fn abandon_reconcile(&self, user_id: &str) {
        self.last_reconciled.send_if_modified(|last| {
            if last.as_deref() != Some(user_id) {
                return false;
            }
            *last = None;
            true
        });
    }

    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    pub fn mark_syncing(&self) {
        self.status.send_modify(|s| s.syncing = true);
    }

    pub fn mark_synced(&self) {
        self.status.send_replace(SyncStatus {
            synced: true,
            syncing: false,
            last_sync_error: None,
        });
    }

    pub fn mark_failed(&self, message: impl Into<String>) {
        let message = message.into();
        self.status.send_modify(|s| {
            s.synced = false;
            s.syncing = false;
            s.last_sync_error = Some(message);
        });
    }

    /// Forget everything about the signed-in user.
    pub fn clear(&self) {
        self.user.send_replace(None);
        self.last_reconciled.send_replace(None);
        self.status.send_replace(SyncStatus::default());
    }
}
