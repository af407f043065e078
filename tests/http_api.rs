//! HTTP API Tests
//!
//! End-to-end through the combined router: parameter checking, status codes
//! in the body, failover visible to HTTP callers.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use transfer_history::http_server::{HttpServer, HttpServerConfig, VerificationCodes};
use transfer_history::replication::ReplicaDescriptor;
use transfer_history::service::{ServiceConfig, TransferHistoryService};
use transfer_history::store::{MemoryConnector, MemoryReplica, StoredTransfer};

struct Harness {
    service: Arc<TransferHistoryService>,
    router: Router,
    a: MemoryReplica,
    b: MemoryReplica,
}

async fn harness() -> Harness {
    let a = MemoryReplica::new()
        .with_watermark(100)
        .with_transfer(StoredTransfer::new("a-10", "alice", "bob", "", 5, 10))
        .with_transfer(StoredTransfer::new("a-50", "alice", "bob", "", 6, 50));
    let b = MemoryReplica::new()
        .with_watermark(130)
        .with_transfer(StoredTransfer::new("a-10", "alice", "bob", "", 5, 10))
        .with_transfer(StoredTransfer::new("a-50", "alice", "bob", "", 6, 50))
        .with_transfer(StoredTransfer::new("a-120", "alice", "bob", "", 7, 120));
    let connector = MemoryConnector::new()
        .with_replica("a:3306", a.clone())
        .with_replica("b:3306", b.clone());

    let config = ServiceConfig::new(vec![
        ReplicaDescriptor::new("mysql", "u", "p", "a", 3306, "cos"),
        ReplicaDescriptor::new("mysql", "u", "p", "b", 3306, "cos"),
    ]);
    let service = Arc::new(TransferHistoryService::new(config, Arc::new(connector)));
    service.start_service().await.unwrap();

    let router = HttpServer::new(
        HttpServerConfig::default(),
        Arc::clone(&service),
        VerificationCodes::new(["exchange-1", "exchange-2"]),
    )
    .router();

    Harness {
        service,
        router,
        a,
        b,
    }
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn operation_ids(body: &Value) -> Vec<String> {
    body["List"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["OperationId"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_history_follows_failover() {
    let h = harness().await;
    let uri = "/api/getTransferHistory?code=exchange-2&direction=1&account=alice&start=0";

    let (status, body) = get(&h.router, uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["Status"], 200);
    assert_eq!(body["HeadBlockHeight"], "100");
    assert_eq!(body["MaxBlockHeight"], "50");
    assert_eq!(operation_ids(&body), vec!["a-10", "a-50"]);

    // A never advances; the second check swaps to B.
    h.service.check_health().await.unwrap();
    h.service.check_health().await.unwrap();

    let (_, body) = get(&h.router, uri).await;
    assert_eq!(body["HeadBlockHeight"], "130");
    assert_eq!(body["MaxBlockHeight"], "120");
    assert_eq!(operation_ids(&body), vec!["a-10", "a-50", "a-120"]);

    let (_, status) = get(&h.router, "/observability/status").await;
    assert_eq!(status["active_replica"], "b:3306");

    h.service.stop_service().await;
    assert_eq!(h.a.open_connections(), 0);
    assert_eq!(h.b.open_connections(), 0);
}

#[tokio::test]
async fn test_rejections_keep_http_200() {
    let h = harness().await;
    let cases = [
        ("/api/getTransferHistory?code=nope&direction=1&account=alice&start=0", 505),
        ("/api/getTransferHistory?code=exchange-1&direction=0&account=alice&start=0", 506),
        ("/api/getTransferHistory?code=exchange-1&direction=1&account=alice&start=1e3", 504),
        ("/api/getTransferHistoryByBlock?code=exchange-1&direction=2&block=1", 503),
        ("/api/getTransferHistory?code=nope&code=exchange-1&direction=1&account=alice&start=0", 505),
    ];

    for (uri, expected) in cases {
        let (status, body) = get(&h.router, uri).await;
        assert_eq!(status, StatusCode::OK, "{}", uri);
        assert_eq!(body["Status"], expected, "{}", uri);
        assert!(!body["Msg"].as_str().unwrap().is_empty(), "{}", uri);
    }
    assert_eq!(h.service.metrics().range_queries, 0);
    h.service.stop_service().await;
}

#[tokio::test]
async fn test_block_query_over_http() {
    let h = harness().await;

    let (_, body) = get(
        &h.router,
        "/api/getTransferHistoryByBlock?code=exchange-1&direction=1&account=alice&block=50",
    )
    .await;

    assert_eq!(body["Status"], 200);
    assert_eq!(operation_ids(&body), vec!["a-50"]);
    assert_eq!(body["List"][0]["Amount"], "6");
    h.service.stop_service().await;
}

#[tokio::test]
async fn test_health_endpoint() {
    let h = harness().await;

    let (status, body) = get(&h.router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    h.service.stop_service().await;
    let (status, _) = get(&h.router, "/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_server_binds_and_shuts_down() {
    let h = harness().await;
    let server = HttpServer::new(
        HttpServerConfig::new("127.0.0.1", 0),
        Arc::clone(&h.service),
        VerificationCodes::default(),
    );

    server.start(async {}).await.unwrap();
    h.service.stop_service().await;
}
