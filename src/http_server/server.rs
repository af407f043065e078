//! # HTTP Server
//!
//! Combines the history and observability routers into one Axum server.

use std::future::Future;
use std::io;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use super::config::HttpServerConfig;
use super::history_routes::{history_routes, HistoryState};
use super::observability_routes::{health_routes, observability_routes};
use super::verification::VerificationCodes;
use crate::observability::{log_event, Event};
use crate::service::TransferHistoryService;

/// HTTP front end for the transfer history service
pub struct HttpServer {
    config: HttpServerConfig,
    router: Router,
}

impl HttpServer {
    pub fn new(
        config: HttpServerConfig,
        service: Arc<TransferHistoryService>,
        codes: VerificationCodes,
    ) -> Self {
        let router = Self::build_router(&config, service, codes);
        Self { config, router }
    }

    fn build_router(
        config: &HttpServerConfig,
        service: Arc<TransferHistoryService>,
        codes: VerificationCodes,
    ) -> Router {
        let history_state = Arc::new(HistoryState::new(Arc::clone(&service), codes));

        let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
        let cors = match config.cors_origins() {
            [] => cors.allow_origin(Any),
            origins => cors.allow_origin(AllowOrigin::list(origins.iter().cloned())),
        };

        Router::new()
            .merge(health_routes(Arc::clone(&service)))
            .nest("/api", history_routes(history_state))
            .nest("/observability", observability_routes(service))
            .layer(cors)
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Serve until `shutdown` resolves, then finish in-flight requests.
    pub async fn start<F>(self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.socket_addr()).await?;
        let local = listener.local_addr()?.to_string();
        log_event(Event::HttpServing, &[("addr", &local)]);

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    use crate::replication::ReplicaDescriptor;
    use crate::service::ServiceConfig;
    use crate::store::MemoryConnector;

    fn server(config: HttpServerConfig) -> HttpServer {
        let service = TransferHistoryService::new(
            ServiceConfig::new(vec![ReplicaDescriptor::new(
                "mysql", "u", "p", "a", 3306, "cos",
            )]),
            Arc::new(MemoryConnector::new()),
        );
        HttpServer::new(config, Arc::new(service), VerificationCodes::new(["good"]))
    }

    #[test]
    fn test_server_with_custom_port() {
        let server = server(HttpServerConfig::new("0.0.0.0", 8080));
        assert_eq!(server.socket_addr(), "0.0.0.0:8080");
    }

    #[tokio::test]
    async fn test_routes_are_mounted_with_cors() {
        let router = server(HttpServerConfig::default()).router();

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/api/getTransferHistory?code=good&direction=1&account=a&start=0")
                    .header(header::ORIGIN, "http://exchange.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn test_restricted_cors_echoes_listed_origin_only() {
        let config = HttpServerConfig::default()
            .with_cors_origins(["https://exchange.example"])
            .unwrap();
        let router = server(config).router();

        let request = |origin: &str| {
            Request::builder()
                .uri("/health")
                .header(header::ORIGIN, origin)
                .body(Body::empty())
                .unwrap()
        };

        let allowed = router
            .clone()
            .oneshot(request("https://exchange.example"))
            .await
            .unwrap();
        assert_eq!(
            allowed.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://exchange.example"
        );

        let other = router.oneshot(request("https://elsewhere.example")).await.unwrap();
        assert!(other.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[tokio::test]
    async fn test_unknown_path_is_404() {
        let router = server(HttpServerConfig::default()).router();

        let response = router
            .oneshot(Request::builder().uri("/api/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
