use std::collections::HashMap;
use std::sync::Arc;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use common_http_errors::{ApiError, ApiResult};
use rand_core::OsRng;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct AdminSession {
    pub username: String,
    pub login_at: DateTime<Utc>,
}

/// Opaque bearer-token session store for admin actions.
///
/// Process-local and volatile: tokens do not survive a restart and are not
/// shared between instances. Known single-instance limitation.
#[derive(Clone, Default)]
pub struct AdminSessions {
    inner: Arc<Mutex<HashMap<String, AdminSession>>>,
}

impl AdminSessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn issue(&self, username: &str) -> String {
        let token = Uuid::new_v4().to_string();
        self.inner.lock().await.insert(
            token.clone(),
            AdminSession {
                username: username.to_string(),
                login_at: Utc::now(),
            },
        );
        token
    }

    pub async fn get(&self, token: &str) -> Option<AdminSession> {
        self.inner.lock().await.get(token).cloned()
    }

    pub async fn revoke(&self, token: &str) {
        self.inner.lock().await.remove(token);
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let raw = headers.get(AUTHORIZATION)?.to_str().ok()?;
    // The admin UI sends the bare token; accept a Bearer prefix too.
    Some(raw.strip_prefix("Bearer ").unwrap_or(raw).trim())
}

/// Auth gate in front of every mutating admin operation.
pub async fn require_admin(sessions: &AdminSessions, headers: &HeaderMap) -> ApiResult<AdminSession> {
    let token = bearer_token(headers).ok_or_else(ApiError::unauthorized)?;
    sessions.get(token).await.ok_or_else(ApiError::unauthorized)
}

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

pub fn verify_password(stored_hash: &str, password: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("tegrevinnan2024").unwrap();
        assert!(verify_password(&hash, "tegrevinnan2024"));
        assert!(!verify_password(&hash, "fel-lösenord"));
        assert!(!verify_password("not-a-phc-string", "tegrevinnan2024"));
    }

    #[tokio::test]
    async fn tokens_are_issued_and_revoked() {
        let sessions = AdminSessions::new();
        let token = sessions.issue("admin").await;
        assert_eq!(sessions.get(&token).await.unwrap().username, "admin");
        sessions.revoke(&token).await;
        assert!(sessions.get(&token).await.is_none());
    }

    #[test]
    fn bearer_prefix_is_optional() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "abc123".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc123"));
        headers.insert(AUTHORIZATION, "Bearer abc123".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc123"));
    }
}
