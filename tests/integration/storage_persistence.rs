//! Integration tests for storage persistence
//!
//! These tests verify that:
//! - Targets and history survive reopening the database
//! - The scheduler records into SQLite
//! - `open_store` selects the configured backend

use std::sync::Arc;

use pretty_assertions::assert_eq;
use tempfile::tempdir;
use uptime_fetcher::config::StorageConfig;
use uptime_fetcher::scheduler::Scheduler;
use uptime_fetcher::storage::sqlite::SqliteStore;
use uptime_fetcher::storage::{TargetStore, open_store};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::*;

#[tokio::test]
async fn test_targets_survive_reopen() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("fetcher.db");

    let (target, history) = {
        let store = SqliteStore::new(&db_path).await.unwrap();
        let target = create_target(&store, "https://example.com", 30).await;
        store
            .append_history(target.id, "first".to_string(), 0.25)
            .await
            .unwrap();
        store
            .append_history(target.id, "second".to_string(), 0.5)
            .await
            .unwrap();
        let history = store.list_history(target.id).await.unwrap();
        store.close().await.unwrap();
        (target, history)
    };

    let store = SqliteStore::new(&db_path).await.unwrap();

    let targets = store.list_targets().await.unwrap();
    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].id, target.id);
    assert_eq!(targets[0].url, "https://example.com");
    assert_eq!(targets[0].interval_secs, 30);
    assert_eq!(targets[0].last_check, Some(history[1].created_at));

    let reopened = store.list_history(target.id).await.unwrap();
    assert_eq!(reopened, history);
    assert_eq!(reopened[0].response, "first");
    assert_eq!(reopened[1].duration_secs, 0.5);

    // Ids keep increasing after a restart
    let next = create_target(&store, "https://example.org", 30).await;
    assert!(next.id > target.id);
}

#[tokio::test]
async fn test_scheduler_records_into_sqlite() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("persisted"))
        .mount(&mock_server)
        .await;

    let temp_dir = tempdir().unwrap();
    let store = Arc::new(
        SqliteStore::new(temp_dir.path().join("fetcher.db"))
            .await
            .unwrap(),
    );
    let target = create_target(&*store, mock_server.uri(), 60).await;

    let scheduler = Scheduler::new(store.clone(), &manual_tick_config()).unwrap();
    assert_eq!(scheduler.tick().await.dispatched, 1);
    wait_until_idle(scheduler.in_flight()).await;

    let history = store.list_history(target.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].response, "persisted");

    let last_check = store.get_last_check(target.id).await.unwrap();
    assert_eq!(last_check, Some(history[0].created_at));

    // Not due again for another minute
    assert_eq!(scheduler.tick().await.due, 0);
}

#[tokio::test]
async fn test_open_store_from_config() {
    let temp_dir = tempdir().unwrap();
    let config = StorageConfig::Sqlite {
        path: temp_dir.path().join("configured.db"),
    };

    let store = open_store(&config).await.unwrap();
    assert!(store.health_check().await.unwrap().healthy);
    assert!(temp_dir.path().join("configured.db").exists());

    let memory = open_store(&StorageConfig::None).await.unwrap();
    create_target(&*memory, "https://example.com", 5).await;
    assert_eq!(memory.list_targets().await.unwrap().len(), 1);
}
