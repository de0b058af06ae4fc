use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use common_http_errors::{ApiError, ApiResult};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::{info, warn};

use crate::app::AppState;

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("missing or malformed Stripe-Signature header")]
    MalformedHeader,
    #[error("timestamp outside tolerance")]
    Skew,
    #[error("signature mismatch")]
    Mismatch,
}

/// Verify a `Stripe-Signature: t=<unix>,v1=<hex>` header against the raw,
/// unparsed payload. Decoding the JSON first would invalidate this check.
pub fn verify_stripe_signature(
    secret: &str,
    header: &str,
    payload: &[u8],
    tolerance_secs: i64,
    now_unix: i64,
) -> Result<(), SignatureError> {
    let mut timestamp: Option<i64> = None;
    let mut candidates: Vec<&str> = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => candidates.push(value),
            _ => {}
        }
    }
    let timestamp = timestamp.ok_or(SignatureError::MalformedHeader)?;
    if candidates.is_empty() {
        return Err(SignatureError::MalformedHeader);
    }
    if (now_unix - timestamp).unsigned_abs() > tolerance_secs.unsigned_abs() {
        return Err(SignatureError::Skew);
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| SignatureError::MalformedHeader)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    let expected = hex::encode(mac.finalize().into_bytes());

    for candidate in candidates {
        if ConstantTimeEq::ct_eq(expected.as_bytes(), candidate.as_bytes()).unwrap_u8() == 1 {
            return Ok(());
        }
    }
    Err(SignatureError::Mismatch)
}

/// POST /api/stripe/webhook
///
/// Primary confirmation path. Verified `checkout.session.completed` events
/// drive the idempotent paid transition; everything else is acknowledged so
/// the provider stops retrying events we intentionally ignore.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    if let Some(secret) = &state.config.stripe_webhook_secret {
        let header = headers
            .get("Stripe-Signature")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        verify_stripe_signature(
            secret,
            header,
            &body,
            state.config.webhook_tolerance_secs,
            Utc::now().timestamp(),
        )
        .map_err(|err| {
            warn!(error = %err, "webhook signature verification failed");
            ApiError::bad_request("invalid_signature")
        })?;
    } else {
        // Local development without a shared secret: payload is trusted as-is.
        warn!("no webhook secret configured; accepting unsigned payload");
    }

    let event: Value =
        serde_json::from_slice(&body).map_err(|_| ApiError::bad_request("invalid_payload"))?;

    let event_type = event.get("type").and_then(Value::as_str).unwrap_or_default();
    if event_type == "checkout.session.completed" {
        let session = &event["data"]["object"];
        if let Some(session_id) = session.get("id").and_then(Value::as_str) {
            let payment_intent = session.get("payment_intent").and_then(Value::as_str);
            state
                .lifecycle
                .confirm_paid(session_id, payment_intent)
                .await
                .map_err(ApiError::internal)?;
        }
    } else {
        info!(event_type, "unhandled webhook event type");
    }

    Ok(Json(json!({ "received": true })))
}
