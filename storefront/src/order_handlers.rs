use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{DateTime, Utc};
use common_http_errors::{ApiError, ApiResult};
use common_money::Amount;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::AppState;
use crate::pricing::CartLine;
use crate::sessions::require_admin;
use crate::store::{Customer, LineItem, Order, OrderStatus};

#[derive(Deserialize)]
pub struct NewOrderRequest {
    pub customer: Customer,
    pub items: Vec<CartLine>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Limited view returned to unauthenticated callers; the full record with the
/// customer snapshot is admin-only.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicOrder {
    pub id: Uuid,
    pub status: OrderStatus,
    pub total: Amount,
    pub items: Vec<LineItem>,
    pub created_at: DateTime<Utc>,
}

impl From<Order> for PublicOrder {
    fn from(order: Order) -> Self {
        PublicOrder {
            id: order.id,
            status: order.status,
            total: order.total,
            items: order.items,
            created_at: order.created_at,
        }
    }
}

/// POST /api/orders: manual (non-card) order, priced server-side.
pub async fn create_manual_order(
    State(state): State<AppState>,
    Json(req): Json<NewOrderRequest>,
) -> ApiResult<(StatusCode, Json<Order>)> {
    let order = state
        .lifecycle
        .place_manual_order(req.customer, req.notes, &req.items)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /api/orders/:id, public order lookup with redacted fields.
pub async fn get_order_public(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PublicOrder>> {
    let order = state
        .store
        .get_order(id)
        .await?
        .ok_or_else(|| ApiError::not_found("order_not_found"))?;
    Ok(Json(order.into()))
}

/// GET /api/orders, full listing, admin only.
pub async fn list_orders(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<Order>>> {
    require_admin(&state.sessions, &headers).await?;
    Ok(Json(state.store.list_orders().await?))
}

#[derive(Deserialize)]
pub struct UpdateOrderRequest {
    pub status: String,
}

/// PUT /api/orders/:id, admin status override.
pub async fn update_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateOrderRequest>,
) -> ApiResult<Json<Order>> {
    require_admin(&state.sessions, &headers).await?;
    let status = OrderStatus::parse(&req.status)
        .ok_or_else(|| ApiError::bad_request_msg("invalid_status", format!("unknown status: {}", req.status)))?;
    let order = state
        .lifecycle
        .override_status(id, status)
        .await?
        .ok_or_else(|| ApiError::not_found("order_not_found"))?;
    Ok(Json(order))
}
