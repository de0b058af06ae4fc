use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::store::OrderDraft;

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Countries we ship to. A business rule, not a technical constraint.
const ALLOWED_COUNTRIES: &[&str] = &["SE", "NO", "DK", "FI"];
const CURRENCY: &str = "sek";
const CHECKOUT_LOCALE: &str = "sv";
const SHIPPING_LINE_NAME: &str = "Frakt";
const SHIPPING_LINE_DESCRIPTION: &str = "Leverans inom 2-5 arbetsdagar";

#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// Provider-side view of a session, as needed by the poll fallback path.
#[derive(Debug, Clone)]
pub struct SessionStatus {
    pub payment_status: String,
    pub payment_intent: Option<String>,
    pub customer_email: Option<String>,
    pub amount_total_minor: Option<i64>,
}

impl SessionStatus {
    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid"
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("checkout provider rejected the request: {0}")]
    Provider(String),
    #[error("checkout provider unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("payment provider is not configured")]
    NotConfigured,
}

/// Seam to the hosted-checkout provider. The Stripe implementation talks to
/// the live API; the stub backs tests and DB-less development.
#[async_trait]
pub trait CheckoutGateway: Send + Sync {
    async fn create_session(&self, order: &OrderDraft) -> Result<CheckoutSession, GatewayError>;
    async fn fetch_session(&self, session_id: &str) -> Result<SessionStatus, GatewayError>;
    fn is_configured(&self) -> bool;
}

pub struct StripeGateway {
    client: reqwest::Client,
    secret_key: String,
    frontend_url: String,
}

impl StripeGateway {
    pub fn new(secret_key: String, frontend_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            secret_key,
            frontend_url,
        }
    }
}

#[derive(Deserialize)]
struct StripeSessionResponse {
    id: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    payment_status: Option<String>,
    #[serde(default)]
    payment_intent: Option<String>,
    #[serde(default)]
    customer_details: Option<StripeCustomerDetails>,
    #[serde(default)]
    amount_total: Option<i64>,
}

#[derive(Deserialize)]
struct StripeCustomerDetails {
    #[serde(default)]
    email: Option<String>,
}

#[derive(Deserialize)]
struct StripeErrorResponse {
    error: StripeErrorBody,
}

#[derive(Deserialize)]
struct StripeErrorBody {
    #[serde(default)]
    message: Option<String>,
}

async fn read_stripe_error(resp: reqwest::Response) -> GatewayError {
    let status = resp.status();
    match resp.json::<StripeErrorResponse>().await {
        Ok(body) => GatewayError::Provider(
            body.error
                .message
                .unwrap_or_else(|| format!("provider returned {status}")),
        ),
        Err(_) => GatewayError::Provider(format!("provider returned {status}")),
    }
}

#[async_trait]
impl CheckoutGateway for StripeGateway {
    async fn create_session(&self, order: &OrderDraft) -> Result<CheckoutSession, GatewayError> {
        let mut form: Vec<(String, String)> = vec![
            ("mode".into(), "payment".into()),
            ("payment_method_types[0]".into(), "card".into()),
            ("payment_method_types[1]".into(), "klarna".into()),
            ("locale".into(), CHECKOUT_LOCALE.into()),
            ("customer_email".into(), order.customer.email.clone()),
            // The session-id placeholder is resolved by the provider redirect;
            // the literal order id lets the success page recover the order
            // even when webhook delivery is delayed.
            (
                "success_url".into(),
                format!(
                    "{}/success.html?session_id={{CHECKOUT_SESSION_ID}}&order_id={}",
                    self.frontend_url, order.id
                ),
            ),
            (
                "cancel_url".into(),
                format!("{}/?cancelled=true", self.frontend_url),
            ),
            ("metadata[order_id]".into(), order.id.to_string()),
        ];
        for (i, country) in ALLOWED_COUNTRIES.iter().enumerate() {
            form.push((
                format!("shipping_address_collection[allowed_countries][{i}]"),
                (*country).into(),
            ));
        }
        let mut idx = 0;
        for item in &order.items {
            form.push((
                format!("line_items[{idx}][price_data][currency]"),
                CURRENCY.into(),
            ));
            form.push((
                format!("line_items[{idx}][price_data][product_data][name]"),
                item.name.clone(),
            ));
            form.push((
                format!("line_items[{idx}][price_data][unit_amount]"),
                item.price.minor_units().to_string(),
            ));
            form.push((format!("line_items[{idx}][quantity]"), item.quantity.to_string()));
            idx += 1;
        }
        if !order.shipping.is_zero() {
            form.push((
                format!("line_items[{idx}][price_data][currency]"),
                CURRENCY.into(),
            ));
            form.push((
                format!("line_items[{idx}][price_data][product_data][name]"),
                SHIPPING_LINE_NAME.into(),
            ));
            form.push((
                format!("line_items[{idx}][price_data][product_data][description]"),
                SHIPPING_LINE_DESCRIPTION.into(),
            ));
            form.push((
                format!("line_items[{idx}][price_data][unit_amount]"),
                order.shipping.minor_units().to_string(),
            ));
            form.push((format!("line_items[{idx}][quantity]"), "1".into()));
        }

        let resp = self
            .client
            .post(format!("{STRIPE_API_BASE}/checkout/sessions"))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&form)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(read_stripe_error(resp).await);
        }
        let session: StripeSessionResponse = resp.json().await?;
        let url = session
            .url
            .ok_or_else(|| GatewayError::Provider("session has no redirect url".into()))?;
        Ok(CheckoutSession { id: session.id, url })
    }

    async fn fetch_session(&self, session_id: &str) -> Result<SessionStatus, GatewayError> {
        let resp = self
            .client
            .get(format!("{STRIPE_API_BASE}/checkout/sessions/{session_id}"))
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(read_stripe_error(resp).await);
        }
        let session: StripeSessionResponse = resp.json().await?;
        Ok(SessionStatus {
            payment_status: session.payment_status.unwrap_or_else(|| "unpaid".into()),
            payment_intent: session.payment_intent,
            customer_email: session.customer_details.and_then(|d| d.email),
            amount_total_minor: session.amount_total,
        })
    }

    fn is_configured(&self) -> bool {
        true
    }
}

/// Gateway used when no provider key is configured: checkout is refused with
/// `NotConfigured` and nothing is persisted, matching the manual-only mode.
pub struct UnconfiguredGateway;

#[async_trait]
impl CheckoutGateway for UnconfiguredGateway {
    async fn create_session(&self, _order: &OrderDraft) -> Result<CheckoutSession, GatewayError> {
        Err(GatewayError::NotConfigured)
    }

    async fn fetch_session(&self, _session_id: &str) -> Result<SessionStatus, GatewayError> {
        Err(GatewayError::NotConfigured)
    }

    fn is_configured(&self) -> bool {
        false
    }
}

/// Deterministic in-process gateway for tests: sessions are held in a map and
/// can be flipped to paid to simulate the provider confirming payment.
#[derive(Default)]
pub struct StubGateway {
    sessions: Mutex<HashMap<String, SessionStatus>>,
}

impl StubGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the customer completing payment on the hosted page.
    pub async fn mark_paid(&self, session_id: &str, payment_intent: &str) {
        let mut sessions = self.sessions.lock().await;
        if let Some(status) = sessions.get_mut(session_id) {
            status.payment_status = "paid".into();
            status.payment_intent = Some(payment_intent.to_string());
        }
    }
}

#[async_trait]
impl CheckoutGateway for StubGateway {
    async fn create_session(&self, order: &OrderDraft) -> Result<CheckoutSession, GatewayError> {
        let id = format!("cs_stub_{}", order.id.simple());
        self.sessions.lock().await.insert(
            id.clone(),
            SessionStatus {
                payment_status: "unpaid".into(),
                payment_intent: None,
                customer_email: Some(order.customer.email.clone()),
                amount_total_minor: Some(order.total.minor_units()),
            },
        );
        Ok(CheckoutSession {
            url: format!("https://checkout.stripe.test/pay/{id}"),
            id,
        })
    }

    async fn fetch_session(&self, session_id: &str) -> Result<SessionStatus, GatewayError> {
        self.sessions
            .lock()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| GatewayError::Provider(format!("no such session: {session_id}")))
    }

    fn is_configured(&self) -> bool {
        true
    }
}
