//! Administrative API, served on its own listener.
//!
//! Every route requires `Authorization: Bearer <api_key>`.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::http::server::AppState;
use self::auth::{admin_auth_middleware, AdminKey};
use self::handlers::*;

pub fn setup_admin_router(state: AppState, api_key: &str) -> Router {
    let key = AdminKey(Arc::from(api_key));
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/cache", get(get_cache))
        .route("/admin/cache/keys", get(get_keys))
        .route("/admin/cache/info", get(get_info))
        .route("/admin/cache/flush", post(flush_cache))
        .layer(middleware::from_fn_with_state(key, admin_auth_middleware))
        .with_state(state)
}
