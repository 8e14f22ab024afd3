use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::http::response::{ApiError, ApiResult};
use crate::http::server::AppState;
use crate::resilience::BreakerSnapshot;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub backend: &'static str,
}

#[derive(Deserialize)]
pub struct KeysQuery {
    pub pattern: Option<String>,
}

#[derive(Serialize)]
pub struct KeysResponse {
    pub pattern: String,
    pub keys: Vec<String>,
}

#[derive(Serialize)]
pub struct InfoResponse {
    pub backend: &'static str,
    pub info: String,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        backend: state.cache.backend(),
    })
}

pub async fn get_cache(State(state): State<AppState>) -> Json<BreakerSnapshot> {
    Json(state.cache.snapshot())
}

pub async fn get_keys(
    State(state): State<AppState>,
    Query(query): Query<KeysQuery>,
) -> ApiResult<Json<KeysResponse>> {
    let pattern = query.pattern.unwrap_or_else(|| "*".to_string());
    let keys = state
        .cache
        .try_keys(&pattern)
        .await
        .map_err(|e| ApiError::service_unavailable(e.to_string()))?;
    Ok(Json(KeysResponse { pattern, keys }))
}

pub async fn get_info(State(state): State<AppState>) -> ApiResult<Json<InfoResponse>> {
    let info = state
        .cache
        .try_info()
        .await
        .map_err(|e| ApiError::service_unavailable(e.to_string()))?;
    Ok(Json(InfoResponse {
        backend: state.cache.backend(),
        info,
    }))
}

pub async fn flush_cache(State(state): State<AppState>) -> ApiResult<Json<serde_json::Value>> {
    state
        .cache
        .try_flush_all()
        .await
        .map_err(|e| ApiError::service_unavailable(e.to_string()))?;
    tracing::warn!("Cache flushed via admin API");
    Ok(Json(serde_json::json!({ "flushed": true })))
}

#[cfg(test)]
mod tests {
    use crate::admin::setup_admin_router;
    use crate::cache::{CacheClient, CacheClientConfig, MemoryConnector};
    use crate::http::server::AppState;
    use crate::repository::product::{seed_catalog, ProductRepository};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn state() -> AppState {
        let cache = Arc::new(CacheClient::new(
            Arc::new(MemoryConnector::new()),
            CacheClientConfig::default(),
        ));
        let products = ProductRepository::new(cache.clone(), seed_catalog(), 600, 100);
        AppState::new(cache, products)
    }

    #[tokio::test]
    async fn test_requires_bearer_key() {
        let router = setup_admin_router(state(), "s3cret");

        let anonymous = Request::get("/admin/status").body(Body::empty()).unwrap();
        let response = router.clone().oneshot(anonymous).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let wrong = Request::get("/admin/status")
            .header("authorization", "Bearer nope")
            .body(Body::empty())
            .unwrap();
        let response = router.clone().oneshot(wrong).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let authorized = Request::get("/admin/status")
            .header("authorization", "Bearer s3cret")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(authorized).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_keys_and_flush() {
        let state = state();
        state.cache.set("cart:1", &1, 0).await;
        state.cache.set("product:1", &1, 0).await;
        let router = setup_admin_router(state.clone(), "k");

        let keys = Request::get("/admin/cache/keys?pattern=cart:*")
            .header("authorization", "Bearer k")
            .body(Body::empty())
            .unwrap();
        let response = router.clone().oneshot(keys).await.unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["keys"], serde_json::json!(["cart:1"]));

        let flush = Request::post("/admin/cache/flush")
            .header("authorization", "Bearer k")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(flush).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(state.cache.keys("*").await.is_empty());
    }
}
