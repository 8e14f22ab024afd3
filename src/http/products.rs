use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::http::response::{ApiError, ApiResult};
use crate::http::server::AppState;
use crate::repository::product::project;
use crate::repository::Product;

#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
    /// Comma-separated field names to keep, e.g. `name,price`.
    pub fields: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProductPage {
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub data: Vec<Value>,
}

pub async fn list_products(
    State(state): State<AppState>,
    query: Result<Query<ProductQuery>, QueryRejection>,
) -> ApiResult<Json<ProductPage>> {
    let Query(query) = query?;
    let (page, limit) = state.products.normalize(query.page, query.limit);

    let fields: Vec<&str> = query
        .fields
        .as_deref()
        .map(|raw| raw.split(',').map(str::trim).filter(|f| !f.is_empty()).collect())
        .unwrap_or_default();

    let products = state.products.page(page, limit).await;
    Ok(Json(ProductPage {
        page,
        limit,
        total: state.products.total(),
        data: project(&products, &fields),
    }))
}

pub async fn get_product(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
) -> ApiResult<Json<Product>> {
    let Path(id) = id?;

    state
        .products
        .find(id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Product {id} not found")))
}
