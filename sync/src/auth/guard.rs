use super::AuthProvider;
use crate::session::SessionState;
use stats_engine::UserId;
use std::sync::Arc;

/// Outcome of a session check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCheck {
    Valid(UserId),
    Invalid,
}

impl SessionCheck {
    pub fn user_id(&self) -> Option<&str> {
        match self {
            SessionCheck::Valid(user_id) => Some(user_id),
            SessionCheck::Invalid => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, SessionCheck::Valid(_))
    }
}

/// Confirms the session is usable before a remote write.
#[derive(Clone)]
pub struct SessionGuard {
    auth: Arc<dyn AuthProvider>,
    state: Arc<SessionState>,
}

impl SessionGuard {
    pub fn new(auth: Arc<dyn AuthProvider>, state: Arc<SessionState>) -> Self {
        Self { auth, state }
    }

    /// Check the session, refreshing once if verification fails.
    ///
    /// No session at all is invalid without a refresh attempt. Never errors:
    /// any provider failure is reported as [`SessionCheck::Invalid`]. A valid
    /// session becomes the current user.
    pub async fn ensure_valid(&self) -> SessionCheck {
        let session = match self.auth.current_session().await {
            Ok(Some(session)) => session,
            Ok(None) => {
                tracing::debug!("No session");
                return SessionCheck::Invalid;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read session");
                return SessionCheck::Invalid;
            }
        };

        match self.auth.verify(&session).await {
            Ok(user_id) => {
                self.state.set_user(Some(user_id.clone()));
                return SessionCheck::Valid(user_id);
            }
            Err(e) => tracing::debug!(error = %e, "Session verification failed, refreshing"),
        }

        match self.auth.refresh().await {
            Ok(session) => {
                tracing::info!(user_id = %session.user_id, "Session refreshed");
                self.state.set_user(Some(session.user_id.clone()));
                SessionCheck::Valid(session.user_id)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Session refresh failed");
                SessionCheck::Invalid
            }
        }
    }
}
