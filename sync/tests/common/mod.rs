//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use stats_engine::{AggregateStats, GameData, GameResult, LocalSnapshot, PuzzleDate, UserId};
use stats_sync::{
    AuthError, AuthProvider, ClientOptions, MemoryGateway, MemoryStorage, Session, StatsClient,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Install a test subscriber once. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stats_sync=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Scripted auth provider
// ============================================================================

struct AuthInner {
    user: Option<UserId>,
    token_valid: bool,
    can_refresh: bool,
    sign_out_delay: Option<Duration>,
    refresh_calls: usize,
    sign_out_calls: usize,
}

/// An [`AuthProvider`] whose answers are set by the test.
pub struct ScriptedAuth {
    inner: Mutex<AuthInner>,
}

impl ScriptedAuth {
    pub fn signed_in(user_id: &str) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(AuthInner {
                user: Some(user_id.to_string()),
                token_valid: true,
                can_refresh: true,
                sign_out_delay: None,
                refresh_calls: 0,
                sign_out_calls: 0,
            }),
        })
    }

    pub fn signed_out() -> Arc<Self> {
        let auth = Self::signed_in("nobody");
        auth.inner.lock().unwrap().user = None;
        auth
    }

    /// Token rejected, and the refresh token is gone too.
    pub fn expire(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.token_valid = false;
        inner.can_refresh = false;
    }

    /// Token rejected, but a refresh will succeed.
    pub fn expire_refreshable(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.token_valid = false;
        inner.can_refresh = true;
    }

    pub fn switch_user(&self, user_id: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.user = Some(user_id.to_string());
        inner.token_valid = true;
    }

    /// Make the remote sign-out take `delay`.
    pub fn hang_sign_out(&self, delay: Duration) {
        self.inner.lock().unwrap().sign_out_delay = Some(delay);
    }

    pub fn refresh_calls(&self) -> usize {
        self.inner.lock().unwrap().refresh_calls
    }

    pub fn sign_out_calls(&self) -> usize {
        self.inner.lock().unwrap().sign_out_calls
    }
}

#[async_trait]
impl AuthProvider for ScriptedAuth {
    async fn current_session(&self) -> Result<Option<Session>, AuthError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.user.as_ref().map(|u| Session::new(u.clone(), "access")))
    }

    async fn verify(&self, session: &Session) -> Result<UserId, AuthError> {
        let inner = self.inner.lock().unwrap();
        if inner.token_valid {
            Ok(session.user_id.clone())
        } else {
            Err(AuthError::Rejected("jwt expired".into()))
        }
    }

    async fn refresh(&self) -> Result<Session, AuthError> {
        let mut inner = self.inner.lock().unwrap();
        inner.refresh_calls += 1;
        match (inner.user.clone(), inner.can_refresh) {
            (Some(user), true) => {
                inner.token_valid = true;
                Ok(Session::new(user, "refreshed"))
            }
            _ => Err(AuthError::Unavailable("refresh token revoked".into())),
        }
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let delay = {
            let mut inner = self.inner.lock().unwrap();
            inner.sign_out_calls += 1;
            inner.user = None;
            inner.sign_out_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }
}

// ============================================================================
// Builders
// ============================================================================

pub struct Harness {
    pub client: StatsClient,
    pub storage: Arc<MemoryStorage>,
    pub gateway: Arc<MemoryGateway>,
    pub auth: Arc<ScriptedAuth>,
}

pub fn harness(auth: Arc<ScriptedAuth>) -> Harness {
    harness_with(auth, Arc::new(MemoryGateway::new()), Arc::new(MemoryStorage::new()))
}

pub fn harness_with(
    auth: Arc<ScriptedAuth>,
    gateway: Arc<MemoryGateway>,
    storage: Arc<MemoryStorage>,
) -> Harness {
    init_tracing();
    let client = StatsClient::new(
        storage.clone(),
        gateway.clone(),
        auth.clone(),
        ClientOptions {
            sign_out_timeout: Duration::from_millis(50),
            ..ClientOptions::default()
        },
    );
    Harness {
        client,
        storage,
        gateway,
        auth,
    }
}

pub fn day(s: &str) -> PuzzleDate {
    PuzzleDate::parse(s).unwrap()
}

pub fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

pub fn win(date: &str, guesses: u32) -> GameData {
    GameData::new(day(date), GameResult::Win, guesses)
}

pub fn loss(date: &str) -> GameData {
    GameData::new(day(date), GameResult::Loss, 8)
}

pub fn snapshot(played: u32, solve_list: &[u32], days: &[&str]) -> LocalSnapshot {
    LocalSnapshot {
        played,
        current_streak: 1,
        max_streak: 2,
        solve_list: solve_list.to_vec(),
        completed_days: days.iter().map(|d| day(d)).collect(),
    }
}

pub fn remote(user_id: &str, played: u32, won: u32, dist: &[(u32, u32)]) -> AggregateStats {
    AggregateStats {
        games_played: played,
        games_won: won,
        current_streak: 2,
        max_streak: 4,
        win_distribution: dist.iter().copied().collect(),
        ..AggregateStats::empty(user_id, now())
    }
}

/// Counters only, for comparing aggregates written at different times.
pub fn counters(stats: &AggregateStats) -> (u32, u32, u32, u32, Vec<(u32, u32)>, Option<PuzzleDate>) {
    (
        stats.games_played,
        stats.games_won,
        stats.current_streak,
        stats.max_streak,
        stats.win_distribution.iter().collect(),
        stats.last_played_date,
    )
}
