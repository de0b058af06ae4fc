mod support;

use axum::http::StatusCode;
use serde_json::json;
use storefront::store::Store;

use support::{body_json, test_app, ADMIN_PASSWORD, ADMIN_USERNAME};

#[tokio::test]
async fn mutations_require_a_token_and_leave_state_untouched() {
    let app = test_app(None).await;

    let resp = app
        .request(
            "POST",
            "/api/products",
            None,
            Some(json!({ "name": "Rooibos", "category": "te", "price": 119 })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(resp).await["code"], "unauthorized");
    assert!(app.store.list_products().await.unwrap().is_empty());

    let resp = app.request("GET", "/api/orders", None, None).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app
        .request("GET", "/api/orders", Some("not-a-real-token"), None)
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_credentials_are_rejected() {
    let app = test_app(None).await;
    let resp = app
        .request(
            "POST",
            "/api/login",
            None,
            Some(json!({ "username": ADMIN_USERNAME, "password": "fel" })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // Unknown username takes the same path as a bad password.
    let resp = app
        .request(
            "POST",
            "/api/login",
            None,
            Some(json!({ "username": "ghost", "password": ADMIN_PASSWORD })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_verify_logout_round_trip() {
    let app = test_app(None).await;
    let token = app.login().await;

    let resp = app.request("GET", "/api/verify", Some(&token), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["valid"], true);

    let resp = app.request("POST", "/api/logout", Some(&token), None).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // The token is gone after logout.
    let resp = app.request("GET", "/api/verify", Some(&token), None).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn change_password_requires_current_password() {
    let app = test_app(None).await;
    let token = app.login().await;

    let resp = app
        .request(
            "POST",
            "/api/change-password",
            Some(&token),
            Some(json!({ "currentPassword": "fel", "newPassword": "nytt-lösenord" })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app
        .request(
            "POST",
            "/api/change-password",
            Some(&token),
            Some(json!({
                "currentPassword": ADMIN_PASSWORD,
                "newPassword": "nytt-lösenord"
            })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    // Old password no longer works, the new one does.
    let resp = app
        .request(
            "POST",
            "/api/login",
            None,
            Some(json!({ "username": ADMIN_USERNAME, "password": ADMIN_PASSWORD })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let resp = app
        .request(
            "POST",
            "/api/login",
            None,
            Some(json!({ "username": ADMIN_USERNAME, "password": "nytt-lösenord" })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn admin_can_drive_order_status_forward() {
    let app = test_app(None).await;
    let product = app.seed_product("Earl Grey", 149).await;
    let token = app.login().await;

    let resp = app
        .request(
            "POST",
            "/api/orders",
            None,
            Some(json!({
                "items": [{ "productId": product.id, "quantity": 1 }],
                "customer": { "name": "Erik", "email": "erik@example.com" }
            })),
        )
        .await;
    let order = body_json(resp).await;
    let order_id = order["id"].as_str().unwrap().to_string();

    for status in ["confirmed", "shipped", "completed"] {
        let resp = app
            .request(
                "PUT",
                &format!("/api/orders/{order_id}"),
                Some(&token),
                Some(json!({ "status": status })),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["status"], status);
    }

    let resp = app
        .request(
            "PUT",
            &format!("/api/orders/{order_id}"),
            Some(&token),
            Some(json!({ "status": "not-a-status" })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["code"], "invalid_status");
}
