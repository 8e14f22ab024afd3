use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::time::Instant;

use crate::http::response::{ApiError, ApiResult, Timed};
use crate::http::server::AppState;
use crate::repository::{Cart, CartStats, CartUpdate, NewCart};

#[derive(Debug, Serialize)]
pub struct CartList {
    pub carts: Vec<Cart>,
    pub count: usize,
}

fn cart_not_found(id: u64) -> ApiError {
    ApiError::not_found(format!("Cart {id} not found"))
}

pub async fn create_cart(
    State(state): State<AppState>,
    body: Result<Json<NewCart>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let started = Instant::now();
    let Json(new_cart) = body?;
    new_cart.validate().map_err(ApiError::validation)?;

    let cart = state.carts.create(new_cart).await;
    Ok((
        StatusCode::CREATED,
        Json(Timed::new(cart, started, state.cache.backend())),
    ))
}

pub async fn list_carts(State(state): State<AppState>) -> Json<Timed<CartList>> {
    let started = Instant::now();
    let carts = state.carts.list().await;
    let list = CartList {
        count: carts.len(),
        carts,
    };
    Json(Timed::new(list, started, state.cache.backend()))
}

pub async fn get_cart(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
) -> ApiResult<Json<Timed<Cart>>> {
    let started = Instant::now();
    let Path(id) = id?;
    let cart = state.carts.find(id).await.ok_or_else(|| cart_not_found(id))?;
    Ok(Json(Timed::new(cart, started, state.cache.backend())))
}

pub async fn update_cart(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
    body: Result<Json<CartUpdate>, JsonRejection>,
) -> ApiResult<Json<Timed<Cart>>> {
    let started = Instant::now();
    let Path(id) = id?;
    let Json(update) = body?;
    update.validate().map_err(ApiError::validation)?;

    let cart = state
        .carts
        .update(id, update)
        .await
        .ok_or_else(|| cart_not_found(id))?;
    Ok(Json(Timed::new(cart, started, state.cache.backend())))
}

pub async fn delete_cart(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
) -> ApiResult<Json<Timed<Cart>>> {
    let started = Instant::now();
    let Path(id) = id?;
    let cart = state.carts.remove(id).await.ok_or_else(|| cart_not_found(id))?;
    Ok(Json(Timed::new(cart, started, state.cache.backend())))
}

pub async fn cart_cache_stats(State(state): State<AppState>) -> Json<CartStats> {
    Json(state.carts.stats().await)
}
