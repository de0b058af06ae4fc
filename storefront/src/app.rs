use std::sync::Arc;

use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method, StatusCode,
};
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use chrono::Utc;
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::admin_handlers::{change_password, login, logout, verify};
use crate::catalog_handlers::{
    create_category, create_product, delete_category, delete_product, get_category, get_product,
    list_categories, list_products, update_category, update_product,
};
use crate::checkout_handlers::{create_checkout_session, get_session, stripe_config};
use crate::config::Config;
use crate::gateway::CheckoutGateway;
use crate::lifecycle::OrderLifecycle;
use crate::metrics;
use crate::order_handlers::{create_manual_order, get_order_public, list_orders, update_order};
use crate::sessions::AdminSessions;
use crate::store::Store;
use crate::webhook::stripe_webhook;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub gateway: Arc<dyn CheckoutGateway>,
    pub lifecycle: Arc<OrderLifecycle>,
    pub sessions: AdminSessions,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, gateway: Arc<dyn CheckoutGateway>, config: Config) -> Self {
        let lifecycle = Arc::new(OrderLifecycle::new(
            store.clone(),
            gateway.clone(),
            config.shipping,
        ));
        Self {
            store,
            gateway,
            lifecycle,
            sessions: AdminSessions::new(),
            config: Arc::new(config),
        }
    }
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "timestamp": Utc::now() }))
}

async fn metrics_endpoint() -> (StatusCode, String) {
    match metrics::render() {
        Ok(text) => (StatusCode::OK, text),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("metrics encode error: {e}"),
        ),
    }
}

pub fn build_router(state: AppState) -> Router {
    let mut allowed_origins = vec![
        state.config.frontend_url.clone(),
        "http://localhost:3000".to_string(),
        "http://localhost:5173".to_string(),
    ];
    allowed_origins.dedup();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(
            allowed_origins
                .iter()
                .filter_map(|o| o.parse::<HeaderValue>().ok())
                .collect::<Vec<_>>(),
        ))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([ACCEPT, AUTHORIZATION, CONTENT_TYPE]);

    Router::new()
        .route("/api/health", get(health))
        .route("/metrics", get(metrics_endpoint))
        // Catalog
        .route("/api/products", get(list_products).post(create_product))
        .route(
            "/api/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/api/categories", get(list_categories).post(create_category))
        .route(
            "/api/categories/:id",
            get(get_category).put(update_category).delete(delete_category),
        )
        // Orders
        .route("/api/orders", get(list_orders).post(create_manual_order))
        .route("/api/orders/:id", get(get_order_public).put(update_order))
        // Card checkout
        .route("/api/stripe/config", get(stripe_config))
        .route("/api/stripe/create-checkout-session", post(create_checkout_session))
        .route("/api/stripe/session/:session_id", get(get_session))
        .route("/api/stripe/webhook", post(stripe_webhook))
        // Admin auth
        .route("/api/login", post(login))
        .route("/api/logout", post(logout))
        .route("/api/verify", get(verify))
        .route("/api/change-password", post(change_password))
        .with_state(state)
        .layer(cors)
        .layer(middleware::from_fn(metrics::http_error_metrics))
}
