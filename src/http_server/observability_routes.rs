//! Observability HTTP Routes
//!
//! Health check, counters and replica status.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;

use crate::service::TransferHistoryService;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub active_replica: Option<String>,
}

/// Create observability routes
pub fn observability_routes(service: Arc<TransferHistoryService>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/status", get(status_handler))
        .with_state(service)
}

/// Health check route (also available at root /health)
pub fn health_routes(service: Arc<TransferHistoryService>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(service)
}

/// 200 while a replica connection is active, 503 otherwise
async fn health_handler(State(service): State<Arc<TransferHistoryService>>) -> impl IntoResponse {
    let active_replica = service.active_replica();
    let (code, status) = if active_replica.is_some() {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
    };
    let response = HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        active_replica,
    };

    (code, Json(response))
}

async fn metrics_handler(State(service): State<Arc<TransferHistoryService>>) -> impl IntoResponse {
    (StatusCode::OK, Json(service.metrics()))
}

async fn status_handler(State(service): State<Arc<TransferHistoryService>>) -> impl IntoResponse {
    (StatusCode::OK, Json(service.status()))
}
