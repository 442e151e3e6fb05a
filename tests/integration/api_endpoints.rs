//! Integration tests for API endpoints
//!
//! These tests verify that:
//! - Targets registered over HTTP are picked up by the scheduler
//! - History recorded by the scheduler is served back
//! - Error responses carry the expected status codes
//! - The server stops on cancellation

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uptime_fetcher::api::{ApiState, CreatedResponse, HistoryResponse, spawn_api_server};
use uptime_fetcher::scheduler::{Scheduler, SchedulerHandle};
use uptime_fetcher::storage::{MemoryStore, TargetStore};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::*;

struct TestApi {
    addr: SocketAddr,
    store: Arc<MemoryStore>,
    scheduler: SchedulerHandle,
    shutdown: CancellationToken,
    server: JoinHandle<()>,
}

impl TestApi {
    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

async fn spawn_test_api() -> TestApi {
    let store = Arc::new(MemoryStore::new());
    let scheduler = Scheduler::new(store.clone(), &manual_tick_config())
        .unwrap()
        .start();
    let shutdown = CancellationToken::new();

    let state = ApiState::new(store.clone()).with_scheduler(scheduler.clone());
    let (addr, server) =
        spawn_api_server("127.0.0.1:0".parse().unwrap(), state, shutdown.clone())
            .await
            .unwrap();

    TestApi {
        addr,
        store,
        scheduler,
        shutdown,
        server,
    }
}

#[tokio::test]
async fn test_register_fetch_and_read_history() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("hello from target"))
        .mount(&mock_server)
        .await;

    let api = spawn_test_api().await;
    let client = reqwest::Client::new();

    let response = client
        .post(api.url("/api/fetcher"))
        .json(&json!({ "url": mock_server.uri(), "interval": 60 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: CreatedResponse = response.json().await.unwrap();

    let listed: Value = client
        .get(api.url("/api/fetcher"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        listed,
        json!([{ "id": created.id, "url": mock_server.uri(), "interval": 60 }])
    );

    let report = api.scheduler.tick_now().await.unwrap();
    assert_eq!(report.dispatched, 1);

    let id = created.id;
    let store = api.store.clone();
    let recorded = wait_for(|| {
        let store = store.clone();
        async move { !store.list_history(id).await.unwrap().is_empty() }
    })
    .await;
    assert!(recorded);

    let history: Vec<HistoryResponse> = client
        .get(api.url(&format!("/api/fetcher/{}/history", created.id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].response, "hello from target");
    assert!(history[0].duration >= 0.0);
    assert!(history[0].created_at > 0);

    api.scheduler.shutdown().await;
    api.shutdown.cancel();
}

#[tokio::test]
async fn test_delete_target_over_http() {
    let api = spawn_test_api().await;
    let client = reqwest::Client::new();

    let target = create_target(&*api.store, "https://example.com", 60).await;

    let response = client
        .delete(api.url(&format!("/api/fetcher/{}", target.id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(api.store.list_targets().await.unwrap().is_empty());

    let again = client
        .delete(api.url(&format!("/api/fetcher/{}", target.id)))
        .send()
        .await
        .unwrap();
    assert_eq!(again.status(), StatusCode::NOT_FOUND);
    let body: Value = again.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("not found"));

    for bad in ["0", "-1", "abc"] {
        let response = client
            .delete(api.url(&format!("/api/fetcher/{bad}")))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "id: {bad}");
    }

    api.shutdown.cancel();
}

#[tokio::test]
async fn test_history_of_unknown_target() {
    let api = spawn_test_api().await;

    let response = reqwest::get(api.url("/api/fetcher/42/history"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    api.shutdown.cancel();
}

#[tokio::test]
async fn test_health_reports_scheduler() {
    let api = spawn_test_api().await;

    let health: Value = reqwest::get(api.url("/api/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(health["status"], "ok");
    assert_eq!(health["storage_healthy"], true);
    assert_eq!(health["in_flight"], 0);

    api.shutdown.cancel();
}

#[tokio::test]
async fn test_server_stops_on_cancel() {
    let api = spawn_test_api().await;

    let response = reqwest::get(api.url("/api/fetcher")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    api.shutdown.cancel();

    tokio::time::timeout(Duration::from_secs(5), api.server)
        .await
        .expect("server task did not finish")
        .unwrap();

    let client = reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .build()
        .unwrap();
    let addr = api.addr;
    let stopped = wait_for(|| {
        let client = client.clone();
        let url = format!("http://{addr}/api/fetcher");
        async move { client.get(url).send().await.is_err() }
    })
    .await;
    assert!(stopped, "server still accepting connections");
}
