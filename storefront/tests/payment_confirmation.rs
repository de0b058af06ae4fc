mod support;

use axum::http::StatusCode;
use serde_json::json;
use storefront::store::Store;

use support::{body_json, test_app, TestApp};

async fn open_checkout(app: &TestApp) -> (String, String) {
    let product = app.seed_product("Mörk choklad 70%", 89).await;
    let resp = app
        .request(
            "POST",
            "/api/stripe/create-checkout-session",
            None,
            Some(json!({
                "items": [{ "productId": product.id, "quantity": 1 }],
                "customer": { "name": "Anna", "email": "anna@example.com" }
            })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    (
        body["orderId"].as_str().unwrap().to_string(),
        body["sessionId"].as_str().unwrap().to_string(),
    )
}

fn completed_event(session_id: &str, payment_intent: &str) -> serde_json::Value {
    json!({
        "type": "checkout.session.completed",
        "data": { "object": {
            "id": session_id,
            "payment_intent": payment_intent,
            "payment_status": "paid"
        }}
    })
}

#[tokio::test]
async fn webhook_marks_order_paid_exactly_once() {
    let app = test_app(None).await;
    let (order_id, session_id) = open_checkout(&app).await;

    let resp = app
        .request(
            "POST",
            "/api/stripe/webhook",
            None,
            Some(completed_event(&session_id, "pi_111")),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["received"], true);

    let order = app
        .store
        .get_order(order_id.parse().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.status.as_str(), "paid");
    assert_eq!(order.stripe_payment_intent.as_deref(), Some("pi_111"));
    let paid_at = order.paid_at.unwrap();

    // Redelivery of the same event: still 200, nothing overwritten.
    let resp = app
        .request(
            "POST",
            "/api/stripe/webhook",
            None,
            Some(completed_event(&session_id, "pi_222")),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let order = app
        .store
        .get_order(order_id.parse().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.stripe_payment_intent.as_deref(), Some("pi_111"));
    assert_eq!(order.paid_at, Some(paid_at));
}

#[tokio::test]
async fn poll_confirms_payment_when_provider_says_paid() {
    let app = test_app(None).await;
    let (order_id, session_id) = open_checkout(&app).await;

    // Not paid yet: polling reports the provider state and changes nothing.
    let resp = app
        .request("GET", &format!("/api/stripe/session/{session_id}"), None, None)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["status"], "unpaid");

    app.gateway.mark_paid(&session_id, "pi_poll").await;
    let resp = app
        .request("GET", &format!("/api/stripe/session/{session_id}"), None, None)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["status"], "paid");
    assert_eq!(body["customerEmail"], "anna@example.com");
    assert_eq!(body["amountTotal"], 89 + 59);

    let order = app
        .store
        .get_order(order_id.parse().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.status.as_str(), "paid");
    assert_eq!(order.stripe_payment_intent.as_deref(), Some("pi_poll"));
}

#[tokio::test]
async fn webhook_for_unknown_session_is_acknowledged() {
    let app = test_app(None).await;
    let resp = app
        .request(
            "POST",
            "/api/stripe/webhook",
            None,
            Some(completed_event("cs_someone_elses_session", "pi_x")),
        )
        .await;
    // Acknowledged so the provider stops retrying; nothing to update locally.
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["received"], true);
}

#[tokio::test]
async fn unrelated_event_types_are_acknowledged_without_effect() {
    let app = test_app(None).await;
    let (order_id, _session_id) = open_checkout(&app).await;

    let resp = app
        .request(
            "POST",
            "/api/stripe/webhook",
            None,
            Some(json!({ "type": "payment_intent.created", "data": { "object": {} } })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let order = app
        .store
        .get_order(order_id.parse().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.status.as_str(), "pending_payment");
}
