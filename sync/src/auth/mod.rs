//! Authentication seam.
//!
//! The client never talks to an identity service directly. It goes through
//! an [`AuthProvider`], and [`SessionGuard`] turns the provider's answers
//! into a single valid/invalid decision before any remote write.

mod guard;

pub use guard::{SessionCheck, SessionGuard};

use async_trait::async_trait;
use stats_engine::UserId;

/// An authenticated session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
    /// The bearer token
    pub access_token: String,
}

impl Session {
    pub fn new(user_id: impl Into<UserId>, access_token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            access_token: access_token.into(),
        }
    }
}

/// Failures reported by an [`AuthProvider`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("no active session")]
    NoSession,

    #[error("token rejected: {0}")]
    Rejected(String),

    #[error("auth service unavailable: {0}")]
    Unavailable(String),
}

/// The identity service as seen by the client.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// The locally held session, if any. Does not contact the server.
    async fn current_session(&self) -> Result<Option<Session>, AuthError>;

    /// Confirm the session with the server. Returns the user it belongs to.
    async fn verify(&self, session: &Session) -> Result<UserId, AuthError>;

    /// Exchange the refresh token for a new session.
    async fn refresh(&self) -> Result<Session, AuthError>;

    /// End the session on the server.
    async fn sign_out(&self) -> Result<(), AuthError>;
}
