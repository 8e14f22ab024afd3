//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, limits, timeout, request ID)
//! - Record per-route request metrics
//! - Bind server to listener and stop on shutdown

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::cache::CacheClient;
use crate::config::ListenerConfig;
use crate::http::request::{request_id_of, RequestIdGenerator, X_REQUEST_ID};
use crate::http::{cart, products};
use crate::observability::metrics;
use crate::repository::{CartRepository, ProductRepository};
use crate::resilience::CircuitState;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<CacheClient>,
    pub carts: Arc<CartRepository>,
    pub products: Arc<ProductRepository>,
}

impl AppState {
    pub fn new(cache: Arc<CacheClient>, products: ProductRepository) -> Self {
        Self {
            carts: Arc::new(CartRepository::new(cache.clone())),
            products: Arc::new(products),
            cache,
        }
    }
}

/// Public HTTP server.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(state: AppState, config: &ListenerConfig) -> Self {
        Self {
            router: build_router(state, config),
        }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until the shutdown channel fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
pub fn build_router(state: AppState, config: &ListenerConfig) -> Router {
    let stack = ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(X_REQUEST_ID.clone(), RequestIdGenerator))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id_of(request),
            )
        }))
        .layer(PropagateRequestIdLayer::new(X_REQUEST_ID.clone()))
        .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)));

    Router::new()
        .route("/health", get(health))
        .route("/cart", get(cart::list_carts).post(cart::create_cart))
        .route("/cart/stats/cache", get(cart::cart_cache_stats))
        .route(
            "/cart/{id}",
            get(cart::get_cart).patch(cart::update_cart).delete(cart::delete_cart),
        )
        .route("/products", get(products::list_products))
        .route("/products/{id}", get(products::get_product))
        .with_state(state)
        .layer(middleware::from_fn(track_metrics))
        .layer(stack)
}

async fn track_metrics(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;
    metrics::record_request(&method, &route, response.status().as_u16(), start);
    response
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub cache: CacheHealth,
}

#[derive(Debug, Serialize)]
pub struct CacheHealth {
    pub backend: &'static str,
    pub state: CircuitState,
}

/// Liveness plus breaker state. Always 200: the service keeps answering
/// with the cache down.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let circuit = state.cache.state();
    Json(HealthResponse {
        status: if circuit == CircuitState::Closed { "ok" } else { "degraded" },
        cache: CacheHealth {
            backend: state.cache.backend(),
            state: circuit,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheClientConfig, MemoryConnector};
    use crate::repository::product::seed_catalog;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    fn router() -> Router {
        router_with(&ListenerConfig::default())
    }

    fn router_with(config: &ListenerConfig) -> Router {
        let cache = Arc::new(CacheClient::new(
            Arc::new(MemoryConnector::new()),
            CacheClientConfig::default(),
        ));
        let products = ProductRepository::new(cache.clone(), seed_catalog(), 600, 100);
        build_router(AppState::new(cache, products), config)
    }

    #[tokio::test]
    async fn test_health_reports_closed_breaker() {
        let response = router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["cache"]["state"], "CLOSED");
        assert_eq!(json["cache"]["backend"], "memory");
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let router = router_with(&ListenerConfig {
            max_body_bytes: 16,
            ..ListenerConfig::default()
        });

        let body = format!("{{\"name\":\"{}\"}}", "x".repeat(64));
        let request = Request::post("/cart")
            .header("content-type", "application/json")
            .header("content-length", body.len())
            .body(Body::from(body))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_request_id_is_propagated() {
        let request = Request::get("/health")
            .header("x-request-id", "client-chosen")
            .body(Body::empty())
            .unwrap();
        let response = router().oneshot(request).await.unwrap();
        assert_eq!(response.headers()["x-request-id"], "client-chosen");
    }
}
