mod support;

use axum::http::StatusCode;
use serde_json::json;

use support::{body_json, test_app};

#[tokio::test]
async fn not_found_carries_code_in_body_and_header() {
    let app = test_app(None).await;
    let resp = app
        .request(
            "GET",
            &format!("/api/products/{}", uuid::Uuid::new_v4()),
            None,
            None,
        )
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        resp.headers().get("X-Error-Code").unwrap(),
        "product_not_found"
    );
    let body = body_json(resp).await;
    assert_eq!(body["code"], "product_not_found");
}

#[tokio::test]
async fn unauthorized_error_shape() {
    let app = test_app(None).await;
    let resp = app.request("GET", "/api/orders", None, None).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "unauthorized");
    assert_eq!(body_json(resp).await["code"], "unauthorized");
}

#[tokio::test]
async fn health_reports_ok() {
    let app = test_app(None).await;
    let resp = app.request("GET", "/api/health", None, None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn stripe_config_reports_configured_gateway() {
    let app = test_app(None).await;
    let resp = app.request("GET", "/api/stripe/config", None, None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["isConfigured"], true);
    assert_eq!(body["publishableKey"], "pk_test_abc");
}

#[tokio::test]
async fn duplicate_category_slug_is_a_conflict() {
    let app = test_app(None).await;
    let token = app.login().await;

    let resp = app
        .request(
            "POST",
            "/api/categories",
            Some(&token),
            Some(json!({ "name": "Te", "slug": "te" })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = app
        .request(
            "POST",
            "/api/categories",
            Some(&token),
            Some(json!({ "name": "Te igen", "slug": "te" })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["code"], "conflict");
}

#[tokio::test]
async fn errors_are_visible_in_metrics_output() {
    let app = test_app(None).await;
    let resp = app
        .request(
            "GET",
            &format!("/api/products/{}", uuid::Uuid::new_v4()),
            None,
            None,
        )
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app.request("GET", "/metrics", None, None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let text = String::from_utf8(
        axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec(),
    )
    .unwrap();
    assert!(text.contains("http_errors_total"));
    assert!(text.contains("product_not_found"));
}
