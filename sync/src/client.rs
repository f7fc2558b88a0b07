//! The UI-facing entry point.
//!
//! [`StatsClient`] owns the process-wide [`SessionState`] and wires the
//! components together. None of its async entry points return errors; every
//! failure is logged and surfaced through [`SyncStatus`] or a status value.

use crate::auth::{AuthProvider, SessionCheck, SessionGuard};
use crate::config::{ClientOptions, Config};
use crate::error::{ErrorKind, Result, SyncError};
use crate::gateway::{PgGateway, StatsGateway};
use crate::queue::{DrainReport, QueueStore};
use crate::reconcile::Reconciler;
use crate::recorder::{CompletionRecorder, RecordStatus};
use crate::session::{SessionState, SyncStatus};
use crate::storage::{FileStorage, LocalStateStore, LocalStorage};
use crate::writer::CompletionWriter;
use stats_engine::{GameData, GameHistoryEntry, LocalSnapshot, MergeSource, UserId};
use std::sync::Arc;
use tokio::sync::watch;

/// Result of handling a session-established event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// The merge already ran for this user in this session.
    AlreadyReconciled,
    /// The session could not be confirmed; nothing was fetched.
    SessionInvalid,
    /// Merge finished, then the queue was drained.
    Merged {
        source: MergeSource,
        drain: Option<DrainReport>,
    },
    /// Merge aborted with local state untouched; the queue was still drained.
    MergeFailed {
        kind: ErrorKind,
        drain: Option<DrainReport>,
    },
}

pub struct StatsClient {
    state: Arc<SessionState>,
    auth: Arc<dyn AuthProvider>,
    storage: Arc<dyn LocalStorage>,
    gateway: Arc<dyn StatsGateway>,
    local: LocalStateStore,
    queue: Arc<QueueStore>,
    guard: SessionGuard,
    writer: CompletionWriter,
    reconciler: Reconciler,
    recorder: CompletionRecorder,
    options: ClientOptions,
}

impl StatsClient {
    pub fn new(
        storage: Arc<dyn LocalStorage>,
        gateway: Arc<dyn StatsGateway>,
        auth: Arc<dyn AuthProvider>,
        options: ClientOptions,
    ) -> Self {
        let state = Arc::new(SessionState::new());
        let local = LocalStateStore::new(storage.clone());
        let queue = Arc::new(QueueStore::new(storage.clone()));
        let guard = SessionGuard::new(auth.clone(), state.clone());
        let writer = CompletionWriter::new(gateway.clone());
        let reconciler = Reconciler::new(gateway.clone(), local.clone());
        let recorder = CompletionRecorder::new(
            guard.clone(),
            writer.clone(),
            queue.clone(),
            local.clone(),
            state.clone(),
        );

        Self {
            state,
            auth,
            storage,
            gateway,
            local,
            queue,
            guard,
            writer,
            reconciler,
            recorder,
            options,
        }
    }

    /// Build a client on the file-backed device store and PostgreSQL.
    pub async fn connect(config: &Config, auth: Arc<dyn AuthProvider>) -> Result<Self> {
        let storage = Arc::new(FileStorage::open(&config.state_dir)?);
        let gateway =
            Arc::new(PgGateway::connect(&config.database_url, config.max_connections).await?);
        tracing::info!(state_dir = %config.state_dir.display(), "Stats client ready");
        Ok(Self::new(storage, gateway, auth, config.client_options()))
    }

    pub fn current_user(&self) -> Option<UserId> {
        self.state.current_user()
    }

    pub fn status(&self) -> SyncStatus {
        self.state.status()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.state.subscribe_status()
    }

    /// Signed-in user changes, including sign-out.
    pub fn subscribe_user(&self) -> watch::Receiver<Option<UserId>> {
        self.state.subscribe_user()
    }

    pub fn session(&self) -> &Arc<SessionState> {
        &self.state
    }

    /// The device's stats, with malformed values recovered to defaults.
    pub fn local_snapshot(&self) -> LocalSnapshot {
        self.local.load_or_default()
    }

    /// Number of completions waiting for `user_id`.
    pub fn pending(&self, user_id: &str) -> usize {
        self.queue.len(user_id).unwrap_or_else(|e| {
            tracing::error!(user_id = %user_id, error = %e, "Failed to read offline queue");
            0
        })
    }

    /// The signed-in user's most recently played games, newest first.
    pub async fn recent_games(&self, limit: usize) -> Result<Vec<GameHistoryEntry>> {
        let user_id = self.state.current_user().ok_or(SyncError::SessionInvalid)?;
        Ok(self.gateway.get_history(&user_id, limit).await?)
    }

    /// Handle a session-established event for `user_id`.
    ///
    /// Runs the login merge at most once per user per session, then drains
    /// the offline queue whether or not the merge succeeded.
    pub async fn on_session_established(&self, user_id: &str) -> LoginOutcome {
        self.state.set_user(Some(user_id.to_string()));

        if !self.state.begin_reconcile(user_id) {
            tracing::debug!(user_id = %user_id, "Already reconciled, skipping");
            return LoginOutcome::AlreadyReconciled;
        }

        let user_id = match self.guard.ensure_valid().await {
            SessionCheck::Valid(verified) => {
                if verified != user_id {
                    self.state.abandon_reconcile(user_id);
                    if !self.state.begin_reconcile(&verified) {
                        return LoginOutcome::AlreadyReconciled;
                    }
                }
                verified
            }
            SessionCheck::Invalid => {
                self.state.abandon_reconcile(user_id);
                self.state.mark_failed(SyncError::SessionInvalid.to_string());
                return LoginOutcome::SessionInvalid;
            }
        };

        self.state.mark_syncing();
        tracing::info!(user_id = %user_id, "Reconciling stats");

        let merged = match self.reconciler.run(&user_id).await {
            Ok(result) => {
                self.state.mark_synced();
                Ok(result.source)
            }
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Login merge failed");
                // Let the next session event retry.
                self.state.abandon_reconcile(&user_id);
                self.state.mark_failed(e.to_string());
                Err(e.kind())
            }
        };

        let drain = self.drain_for(&user_id).await;

        match merged {
            Ok(source) => LoginOutcome::Merged { source, drain },
            Err(kind) => LoginOutcome::MergeFailed { kind, drain },
        }
    }

    /// Record a finished puzzle. See [`CompletionRecorder::record`].
    pub async fn record(
        &self,
        game_data: GameData,
        updated_stats: Option<LocalSnapshot>,
    ) -> RecordStatus {
        self.recorder.record(game_data, updated_stats).await
    }

    /// Drain the current user's offline queue. `None` without a user or
    /// while another drain is running.
    pub async fn drain(&self) -> Option<DrainReport> {
        let user_id = self.state.current_user()?;
        self.drain_for(&user_id).await
    }

    async fn drain_for(&self, user_id: &str) -> Option<DrainReport> {
        match self.queue.drain(user_id, &self.writer).await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(user_id = %user_id, error = %e, "Failed to drain offline queue");
                None
            }
        }
    }

    /// Sign out.
    ///
    /// The remote call is bounded by the configured timeout. Local cleanup
    /// runs whatever it returns: session state is reset and auth keys are
    /// removed from storage. Stats and offline queues stay on the device.
    pub async fn sign_out(&self) {
        match tokio::time::timeout(self.options.sign_out_timeout, self.auth.sign_out()).await {
            Ok(Ok(())) => tracing::debug!("Remote sign-out complete"),
            Ok(Err(e)) => tracing::warn!(error = %e, "Remote sign-out failed"),
            Err(_) => tracing::warn!(
                timeout_ms = self.options.sign_out_timeout.as_millis() as u64,
                "Remote sign-out timed out"
            ),
        }

        self.state.clear();

        match self.storage.remove_prefixed(&self.options.auth_key_prefix) {
            Ok(removed) => tracing::info!(removed, "Signed out"),
            Err(e) => tracing::error!(error = %e, "Failed to clear auth keys"),
        }
    }
}
