use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use common_http_errors::{ApiError, ApiResult};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::app::AppState;
use crate::sessions::{bearer_token, hash_password, require_admin, verify_password};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// POST /api/login: exchange credentials for an opaque bearer token.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<Value>> {
    let admin = state.store.get_admin(&req.username).await?;
    let valid = admin
        .as_ref()
        .map(|a| verify_password(&a.password_hash, &req.password))
        .unwrap_or(false);
    if !valid {
        return Err(ApiError::unauthorized());
    }
    let token = state.sessions.issue(&req.username).await;
    info!(username = %req.username, "admin logged in");
    Ok(Json(json!({ "token": token, "username": req.username })))
}

/// POST /api/logout. Revoking an unknown token is fine.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Json<Value> {
    if let Some(token) = bearer_token(&headers) {
        state.sessions.revoke(token).await;
    }
    Json(json!({ "message": "Logged out" }))
}

/// GET /api/verify
pub async fn verify(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<Value>> {
    require_admin(&state.sessions, &headers).await?;
    Ok(Json(json!({ "valid": true })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// POST /api/change-password. Re-verifies the current password before
/// replacing the hash.
pub async fn change_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<Json<Value>> {
    let session = require_admin(&state.sessions, &headers).await?;
    let admin = state
        .store
        .get_admin(&session.username)
        .await?
        .ok_or_else(ApiError::unauthorized)?;
    if !verify_password(&admin.password_hash, &req.current_password) {
        return Err(ApiError::unauthorized());
    }
    let hash = hash_password(&req.new_password).map_err(ApiError::internal)?;
    state
        .store
        .update_admin_password(&session.username, &hash)
        .await?;
    info!(username = %session.username, "admin password changed");
    Ok(Json(json!({ "message": "Password changed successfully" })))
}
