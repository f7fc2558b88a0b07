//! Durability tests.
//!
//! The file-backed tests run everywhere. The PostgreSQL tests require a
//! running database; set DATABASE_URL and run with `--ignored`.

mod common;

use common::*;
use stats_sync::{
    ClientOptions, FileStorage, GatewayErrorKind, GatewayOp, LoginOutcome, MemoryGateway,
    RecordStatus, StatsClient,
};
use std::sync::Arc;
use tempfile::tempdir;

#[cfg(test)]
mod file_storage_tests {
    use super::*;

    #[tokio::test]
    async fn test_queue_and_stats_survive_restart() {
        init_tracing();
        let dir = tempdir().unwrap();
        let after = snapshot(1, &[5], &["01/05/2024"]);

        {
            let gateway = Arc::new(MemoryGateway::new());
            gateway.fail(GatewayOp::UpsertHistory, GatewayErrorKind::Transient);
            let client = StatsClient::new(
                Arc::new(FileStorage::open(dir.path()).unwrap()),
                gateway,
                ScriptedAuth::signed_in("u1"),
                ClientOptions::default(),
            );

            let status = client.record(win("01/05/2024", 5), Some(after.clone())).await;
            assert!(matches!(status, RecordStatus::SyncError(_)));
            assert_eq!(client.pending("u1"), 1);
        }

        let gateway = Arc::new(MemoryGateway::new());
        let client = StatsClient::new(
            Arc::new(FileStorage::open(dir.path()).unwrap()),
            gateway.clone(),
            ScriptedAuth::signed_in("u1"),
            ClientOptions::default(),
        );
        assert_eq!(client.local_snapshot(), after);

        let outcome = client.on_session_established("u1").await;
        let LoginOutcome::Merged { drain, .. } = outcome else {
            panic!("unexpected outcome: {outcome:?}");
        };
        assert_eq!(drain.unwrap().processed, 1);
        assert_eq!(client.pending("u1"), 0);

        // The upload already counted the game; the replay only touches history.
        let stats = gateway.aggregate("u1").unwrap();
        assert_eq!(stats.games_played, 1);
        assert_eq!(stats.last_played_date, Some(day("01/05/2024")));
        assert_eq!(gateway.history("u1").len(), 1);
        assert_eq!(gateway.history("u1")[0].guesses_count, 5);
    }
}

#[cfg(test)]
mod postgres_tests {
    use super::*;
    use stats_engine::{GameHistoryEntry, GameResult};
    use stats_sync::{Config, PgGateway, StatsGateway};

    async fn gateway() -> PgGateway {
        init_tracing();
        let config = Config::from_env().expect("DATABASE_URL must be set");
        PgGateway::connect(&config.database_url, config.max_connections)
            .await
            .expect("database reachable")
    }

    fn unique_user() -> String {
        format!("test-{}", uuid::Uuid::new_v4())
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_aggregate_round_trip() {
        let gateway = gateway().await;
        let user = unique_user();
        assert!(gateway.get_aggregate(&user).await.unwrap().is_none());

        let mut stats = remote(&user, 10, 8, &[(0, 5), (2, 3)]);
        stats.last_played_date = Some(day("02/29/2024"));
        gateway.upsert_aggregate(&stats).await.unwrap();

        let loaded = gateway.get_aggregate(&user).await.unwrap().unwrap();
        assert_eq!(counters(&loaded), counters(&stats));

        stats.games_played = 11;
        gateway.upsert_aggregate(&stats).await.unwrap();
        let loaded = gateway.get_aggregate(&user).await.unwrap().unwrap();
        assert_eq!(loaded.games_played, 11);
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_history_upsert_and_backfill() {
        let gateway = gateway().await;
        let user = unique_user();

        gateway
            .upsert_history(&loss("01/01/2024").history_entry(user.as_str()))
            .await
            .unwrap();
        gateway
            .upsert_history(&win("01/01/2024", 6).history_entry(user.as_str()))
            .await
            .unwrap();
        gateway
            .insert_history_ignoring_duplicates(&[
                GameHistoryEntry::backfill(user.as_str(), day("01/01/2024")),
                GameHistoryEntry::backfill(user.as_str(), day("01/02/2024")),
            ])
            .await
            .unwrap();

        let days = gateway.get_completed_days(&user).await.unwrap();
        assert_eq!(days, [day("01/01/2024"), day("01/02/2024")].into());

        let result: String = sqlx::query_scalar(
            "SELECT result FROM game_history WHERE user_id = $1 AND puzzle_date = $2",
        )
        .bind(&user)
        .bind(day("01/01/2024").naive())
        .fetch_one(gateway.pool())
        .await
        .unwrap();
        assert_eq!(result, GameResult::Win.as_str());

        let recent = gateway.get_history(&user, 1).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].puzzle_date, day("01/02/2024"));
        assert_eq!(recent[0].guesses_count, stats_engine::PERFECT_SCORE);
        assert_eq!(gateway.get_history(&user, 10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_client_against_postgres() {
        let config = Config::from_env().expect("DATABASE_URL must be set");
        let dir = tempdir().unwrap();
        let config = Config {
            state_dir: dir.path().to_path_buf(),
            ..config
        };
        let user = unique_user();
        let client = StatsClient::connect(&config, ScriptedAuth::signed_in(&user))
            .await
            .unwrap();

        let status = client
            .record(win("03/01/2024", 4), Some(snapshot(1, &[4], &["03/01/2024"])))
            .await;
        assert_eq!(status, RecordStatus::Saved);

        let again = client
            .record(win("03/01/2024", 4), Some(snapshot(1, &[4], &["03/01/2024"])))
            .await;
        assert_eq!(again, RecordStatus::Saved);
    }
}
