use std::env;

use anyhow::{Context, Result};
use common_money::Amount;

use crate::pricing::ShippingPolicy;
use crate::webhook::DEFAULT_TOLERANCE_SECS;

const PLACEHOLDER_SECRET_KEY: &str = "sk_test_PLACEHOLDER";
const PLACEHOLDER_PUBLISHABLE_KEY: &str = "pk_test_PLACEHOLDER";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub frontend_url: String,
    pub database_url: Option<String>,
    pub stripe_secret_key: Option<String>,
    pub stripe_publishable_key: Option<String>,
    pub stripe_webhook_secret: Option<String>,
    pub webhook_tolerance_secs: i64,
    pub shipping: ShippingPolicy,
    pub bootstrap_admin_username: String,
    pub bootstrap_admin_password: Option<String>,
}

pub fn load_config() -> Result<Config> {
    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse()
        .context("PORT must be a valid port number")?;
    let frontend_url = env::var("FRONTEND_URL")
        .ok()
        .and_then(|v| normalize_optional(&v))
        .unwrap_or_else(|| "http://localhost:3000".to_string());

    let shipping = ShippingPolicy {
        free_threshold: amount_from_env("FREE_SHIPPING_THRESHOLD")?
            .unwrap_or(ShippingPolicy::default().free_threshold),
        flat_fee: amount_from_env("SHIPPING_FEE")?.unwrap_or(ShippingPolicy::default().flat_fee),
    };

    let webhook_tolerance_secs = env::var("STRIPE_WEBHOOK_TOLERANCE_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_TOLERANCE_SECS);

    Ok(Config {
        host,
        port,
        frontend_url,
        database_url: env::var("DATABASE_URL").ok().and_then(|v| normalize_optional(&v)),
        stripe_secret_key: configured_key(env::var("STRIPE_SECRET_KEY").ok(), PLACEHOLDER_SECRET_KEY),
        stripe_publishable_key: configured_key(
            env::var("STRIPE_PUBLISHABLE_KEY").ok(),
            PLACEHOLDER_PUBLISHABLE_KEY,
        ),
        stripe_webhook_secret: env::var("STRIPE_WEBHOOK_SECRET")
            .ok()
            .and_then(|v| normalize_optional(&v)),
        webhook_tolerance_secs,
        shipping,
        bootstrap_admin_username: env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string()),
        bootstrap_admin_password: env::var("ADMIN_PASSWORD")
            .ok()
            .and_then(|v| normalize_optional(&v)),
    })
}

/// Placeholder keys count as unconfigured; the shop then runs in
/// manual-orders-only mode.
fn configured_key(value: Option<String>, placeholder: &str) -> Option<String> {
    value
        .and_then(|v| normalize_optional(&v))
        .filter(|v| v != placeholder)
}

fn amount_from_env(key: &str) -> Result<Option<Amount>> {
    match env::var(key) {
        Ok(value) => {
            let units: i64 = value
                .trim()
                .parse()
                .with_context(|| format!("{key} must be a whole currency amount"))?;
            Ok(Some(Amount::new(units)))
        }
        Err(_) => Ok(None),
    }
}

fn normalize_optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_keys_are_unconfigured() {
        assert_eq!(
            configured_key(Some("sk_test_PLACEHOLDER".into()), PLACEHOLDER_SECRET_KEY),
            None
        );
        assert_eq!(configured_key(Some("  ".into()), PLACEHOLDER_SECRET_KEY), None);
        assert_eq!(
            configured_key(Some("sk_live_abc".into()), PLACEHOLDER_SECRET_KEY),
            Some("sk_live_abc".into())
        );
    }

    #[test]
    fn normalize_optional_trims() {
        assert_eq!(normalize_optional(" x "), Some("x".to_string()));
        assert_eq!(normalize_optional(""), None);
        assert_eq!(normalize_optional("   "), None);
    }
}
