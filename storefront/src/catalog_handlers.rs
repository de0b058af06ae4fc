use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use common_http_errors::{ApiError, ApiResult};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::app::AppState;
use crate::sessions::require_admin;
use crate::store::{Category, CategoryUpdate, NewCategory, NewProduct, Product, ProductUpdate};

// --- Products ---

pub async fn list_products(State(state): State<AppState>) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(state.store.list_products().await?))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Product>> {
    let product = state
        .store
        .get_product(id)
        .await?
        .ok_or_else(|| ApiError::not_found("product_not_found"))?;
    Ok(Json(product))
}

pub async fn create_product(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(new): Json<NewProduct>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    require_admin(&state.sessions, &headers).await?;
    let product = state.store.create_product(new).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(update): Json<ProductUpdate>,
) -> ApiResult<Json<Product>> {
    require_admin(&state.sessions, &headers).await?;
    let product = state
        .store
        .update_product(id, update)
        .await?
        .ok_or_else(|| ApiError::not_found("product_not_found"))?;
    Ok(Json(product))
}

pub async fn delete_product(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    require_admin(&state.sessions, &headers).await?;
    if !state.store.delete_product(id).await? {
        return Err(ApiError::not_found("product_not_found"));
    }
    Ok(Json(json!({ "message": "Product deleted" })))
}

// --- Categories ---

pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(state.store.list_categories().await?))
}

pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Category>> {
    let category = state
        .store
        .get_category(id)
        .await?
        .ok_or_else(|| ApiError::not_found("category_not_found"))?;
    Ok(Json(category))
}

pub async fn create_category(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(new): Json<NewCategory>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    require_admin(&state.sessions, &headers).await?;
    let category = state.store.create_category(new).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(update): Json<CategoryUpdate>,
) -> ApiResult<Json<Category>> {
    require_admin(&state.sessions, &headers).await?;
    let category = state
        .store
        .update_category(id, update)
        .await?
        .ok_or_else(|| ApiError::not_found("category_not_found"))?;
    Ok(Json(category))
}

pub async fn delete_category(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    require_admin(&state.sessions, &headers).await?;
    if !state.store.delete_category(id).await? {
        return Err(ApiError::not_found("category_not_found"));
    }
    Ok(Json(json!({ "message": "Category deleted" })))
}
