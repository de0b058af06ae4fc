#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use chrono::Utc;
use common_money::Amount;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use storefront::app::{build_router, AppState};
use storefront::config::Config;
use storefront::gateway::{CheckoutGateway, StubGateway};
use storefront::pricing::ShippingPolicy;
use storefront::sessions::hash_password;
use storefront::store::{memory::MemoryStore, Admin, NewProduct, Product, Store};

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "hemligt123";
pub const WEBHOOK_SECRET: &str = "whsec_test_secret";

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub gateway: Arc<StubGateway>,
}

fn test_config(webhook_secret: Option<&str>) -> Config {
    Config {
        host: "127.0.0.1".into(),
        port: 0,
        frontend_url: "http://localhost:3000".into(),
        database_url: None,
        stripe_secret_key: Some("sk_test_abc".into()),
        stripe_publishable_key: Some("pk_test_abc".into()),
        stripe_webhook_secret: webhook_secret.map(String::from),
        webhook_tolerance_secs: 300,
        shipping: ShippingPolicy::default(),
        bootstrap_admin_username: ADMIN_USERNAME.into(),
        bootstrap_admin_password: Some(ADMIN_PASSWORD.into()),
    }
}

/// In-process app over the in-memory store and the stub gateway, with one
/// admin account seeded.
pub async fn test_app(webhook_secret: Option<&str>) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let gateway = Arc::new(StubGateway::new());

    store
        .create_admin(Admin {
            id: Uuid::new_v4(),
            username: ADMIN_USERNAME.into(),
            password_hash: hash_password(ADMIN_PASSWORD).unwrap(),
            created_at: Utc::now(),
        })
        .await
        .unwrap();

    let state = AppState::new(
        store.clone() as Arc<dyn Store>,
        gateway.clone() as Arc<dyn CheckoutGateway>,
        test_config(webhook_secret),
    );
    TestApp {
        router: build_router(state),
        store,
        gateway,
    }
}

impl TestApp {
    pub async fn seed_product(&self, name: &str, price: i64) -> Product {
        self.store
            .create_product(NewProduct {
                name: name.into(),
                category: "te".into(),
                price: Amount::new(price),
                description: None,
                image: None,
                weight: Some("100g".into()),
                origin: None,
                in_stock: true,
                featured: false,
            })
            .await
            .unwrap()
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn login(&self) -> String {
        let resp = self
            .request(
                "POST",
                "/api/login",
                None,
                Some(serde_json::json!({
                    "username": ADMIN_USERNAME,
                    "password": ADMIN_PASSWORD,
                })),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        body["token"].as_str().unwrap().to_string()
    }
}

pub async fn body_json(resp: Response<Body>) -> Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
