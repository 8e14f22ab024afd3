use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::http::ApiError;

/// Expected bearer token.
#[derive(Clone)]
pub struct AdminKey(pub Arc<str>);

pub async fn admin_auth_middleware(
    State(AdminKey(key)): State<AdminKey>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let authorized = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|token| token == &*key);

    if authorized {
        return next.run(request).await;
    }

    tracing::warn!(path = %request.uri().path(), "Rejected admin request");
    ApiError::unauthorized("Missing or invalid admin API key").into_response()
}
