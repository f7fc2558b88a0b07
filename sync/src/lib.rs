//! # Stats Sync
//!
//! Offline-tolerant sync between a device and the remote stats store, built
//! on the pure merge and delta logic in [`stats_engine`].
//!
//! ## Components
//!
//! - [`storage`]: device key/value persistence and the stats snapshot codec
//! - [`gateway`]: the remote store ([`PgGateway`] for PostgreSQL,
//!   [`MemoryGateway`] in-process)
//! - [`auth`]: the identity seam and the [`SessionGuard`]
//! - [`queue`]: durable per-user offline queue
//! - [`recorder`] / [`reconcile`]: the completion write and the login merge
//! - [`StatsClient`]: the facade the UI calls
//!
//! ## Example
//!
//! ```rust,no_run
//! use stats_sync::{Config, StatsClient};
//! # use stats_sync::auth::AuthProvider;
//! # use std::sync::Arc;
//! # async fn run(auth: Arc<dyn AuthProvider>) -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env()?;
//! let client = StatsClient::connect(&config, auth).await?;
//!
//! client.on_session_established("user-1").await;
//! println!("{:?}", client.status());
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod queue;
pub mod reconcile;
pub mod recorder;
pub mod session;
pub mod storage;
pub mod writer;

pub use auth::{AuthError, AuthProvider, Session, SessionCheck, SessionGuard};
pub use client::{LoginOutcome, StatsClient};
pub use config::{ClientOptions, Config, ConfigError};
pub use error::{ErrorKind, GatewayError, GatewayErrorKind, Result, StorageError, SyncError};
pub use gateway::{GatewayOp, MemoryGateway, PgGateway, StatsGateway, DEFAULT_HISTORY_LIMIT};
pub use queue::{DrainReport, QueueStore};
pub use reconcile::Reconciler;
pub use recorder::{CompletionRecorder, RecordStatus};
pub use session::{SessionState, SyncStatus};
pub use storage::{FileStorage, LocalStateStore, LocalStorage, MemoryStorage};
pub use writer::{AggregateWrite, CompletionWriter};
