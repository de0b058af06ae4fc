use axum::extract::{Path, State};
use axum::Json;
use common_http_errors::ApiResult;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::pricing::CartLine;
use crate::store::Customer;

#[derive(Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<CartLine>,
    pub customer: Customer,
    #[serde(default)]
    pub notes: Option<String>,
}

/// GET /api/stripe/config. Lets the frontend decide whether to offer card
/// payment at all.
pub async fn stripe_config(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "publishableKey": state.config.stripe_publishable_key,
        "isConfigured": state.gateway.is_configured(),
    }))
}

/// POST /api/stripe/create-checkout-session
pub async fn create_checkout_session(
    State(state): State<AppState>,
    Json(req): Json<CheckoutRequest>,
) -> ApiResult<Json<Value>> {
    let (order, session) = state
        .lifecycle
        .checkout(req.customer, req.notes, &req.items)
        .await?;
    Ok(Json(json!({
        "sessionId": session.id,
        "url": session.url,
        "orderId": order.id,
    })))
}

/// GET /api/stripe/session/:session_id, the poll fallback after redirect-back.
/// A `paid` answer drives the same idempotent confirmation as the webhook.
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let status = state.lifecycle.poll_session(&session_id).await?;
    Ok(Json(json!({
        "status": status.payment_status,
        "customerEmail": status.customer_email,
        "amountTotal": status.amount_total_minor.map(|minor| minor / 100),
    })))
}
