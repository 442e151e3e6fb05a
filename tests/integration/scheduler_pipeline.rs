//! End-to-end tests of the tick → fetch → record pipeline
//!
//! These tests verify that:
//! - Only due targets are fetched
//! - Every completed fetch appends exactly one history record
//! - Error status codes are recorded like any other response
//! - The background loop ticks on its own

use std::sync::Arc;
use std::time::Duration;

use uptime_fetcher::scheduler::Scheduler;
use uptime_fetcher::storage::{MemoryStore, TargetStore};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::*;

#[tokio::test]
async fn test_only_due_targets_are_fetched() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_string("fresh"))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/recent"))
        .respond_with(ResponseTemplate::new(200).set_body_string("recent"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let fresh = create_target(&*store, format!("{}/fresh", mock_server.uri()), 60).await;
    let recent = create_target(&*store, format!("{}/recent", mock_server.uri()), 60).await;
    store
        .append_history(recent.id, "earlier".to_string(), 0.1)
        .await
        .unwrap();

    let scheduler = Scheduler::new(store.clone(), &manual_tick_config()).unwrap();

    let report = scheduler.tick().await;
    assert_eq!(report.listed, 2);
    assert_eq!(report.due, 1);
    assert_eq!(report.dispatched, 1);
    assert_eq!(report.skipped_in_flight, 0);

    wait_until_idle(scheduler.in_flight()).await;

    let history = store.list_history(fresh.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].response, "fresh");
    assert_eq!(history[0].target_id, fresh.id);
    assert!(history[0].duration_secs >= 0.0);

    // Untouched: still only the record appended by hand
    assert_eq!(store.list_history(recent.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_error_status_is_recorded() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&mock_server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let target = create_target(&*store, mock_server.uri(), 60).await;

    let scheduler = Scheduler::new(store.clone(), &manual_tick_config()).unwrap();
    scheduler.tick().await;
    wait_until_idle(scheduler.in_flight()).await;

    let history = store.list_history(target.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].response, "internal error");
}

#[tokio::test]
async fn test_target_due_again_after_interval() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let target = create_target(&*store, mock_server.uri(), 1).await;

    let scheduler = Scheduler::new(store.clone(), &manual_tick_config()).unwrap();

    assert_eq!(scheduler.tick().await.dispatched, 1);
    wait_until_idle(scheduler.in_flight()).await;

    // Checked moments ago
    assert_eq!(scheduler.tick().await.dispatched, 0);

    tokio::time::sleep(Duration::from_millis(1100)).await;

    assert_eq!(scheduler.tick().await.dispatched, 1);
    wait_until_idle(scheduler.in_flight()).await;

    let history = store.list_history(target.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert!(history[0].created_at <= history[1].created_at);
}

#[tokio::test]
async fn test_background_loop_fetches_new_targets() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("pong"))
        .mount(&mock_server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let handle = Scheduler::new(store.clone(), &fast_tick_config())
        .unwrap()
        .start();

    // Registered after the scheduler started
    let target = create_target(&*store, mock_server.uri(), 60).await;

    let recorded = wait_for(|| {
        let store = store.clone();
        async move { !store.list_history(target.id).await.unwrap().is_empty() }
    })
    .await;
    assert!(recorded, "background loop never fetched the target");

    handle.shutdown().await;
    assert!(!handle.is_running());

    // Fetched once: the interval has not elapsed since
    assert_eq!(store.list_history(target.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_tick_now_reports_dispatch() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let store = Arc::new(MemoryStore::new());
    create_target(&*store, mock_server.uri(), 60).await;
    create_target(&*store, mock_server.uri(), 60).await;

    let handle = Scheduler::new(store.clone(), &manual_tick_config())
        .unwrap()
        .start();

    let report = handle.tick_now().await.unwrap();
    assert_eq!(report.listed, 2);
    assert_eq!(report.dispatched, 2);
    assert!(!report.list_failed);

    handle.shutdown().await;
}
