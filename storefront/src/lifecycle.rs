use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::gateway::{CheckoutGateway, CheckoutSession, GatewayError, SessionStatus};
use crate::pricing::{self, CartLine, PricingError, ShippingPolicy};
use crate::store::{
    is_forward_transition, Customer, Order, OrderStatus, PaidOutcome, PaymentMethod, Store,
    StoreError,
};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Pricing(#[from] PricingError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Owns the order state machine. Orders are created here, and the paid
/// transition happens here and nowhere else; both the webhook and the poll
/// fallback funnel into [`OrderLifecycle::confirm_paid`].
pub struct OrderLifecycle {
    store: Arc<dyn Store>,
    gateway: Arc<dyn CheckoutGateway>,
    shipping: ShippingPolicy,
}

impl OrderLifecycle {
    pub fn new(
        store: Arc<dyn Store>,
        gateway: Arc<dyn CheckoutGateway>,
        shipping: ShippingPolicy,
    ) -> Self {
        Self {
            store,
            gateway,
            shipping,
        }
    }

    /// Card checkout: price the cart, open a hosted session, then persist the
    /// order as `pending_payment` bound to the session id.
    ///
    /// The gateway call comes first on purpose: if the provider rejects the
    /// session, no order record exists that references a session that was
    /// never created.
    pub async fn checkout(
        &self,
        customer: Customer,
        notes: Option<String>,
        cart: &[CartLine],
    ) -> Result<(Order, CheckoutSession), LifecycleError> {
        let mut draft = pricing::build_order(
            self.store.as_ref(),
            &self.shipping,
            customer,
            notes,
            cart,
            PaymentMethod::Stripe,
        )
        .await?;
        let session = self.gateway.create_session(&draft).await?;
        draft.stripe_session_id = Some(session.id.clone());
        let order = self.store.create_order(draft).await?;
        info!(order_id = %order.id, session_id = %session.id, total = %order.total, "checkout session opened");
        Ok((order, session))
    }

    /// Manual (non-card) order: priced the same way, persisted as `pending`
    /// and left for an admin to move forward. Creation never produces `paid`.
    pub async fn place_manual_order(
        &self,
        customer: Customer,
        notes: Option<String>,
        cart: &[CartLine],
    ) -> Result<Order, LifecycleError> {
        let draft = pricing::build_order(
            self.store.as_ref(),
            &self.shipping,
            customer,
            notes,
            cart,
            PaymentMethod::Manual,
        )
        .await?;
        let order = self.store.create_order(draft).await?;
        info!(order_id = %order.id, total = %order.total, "manual order placed");
        Ok(order)
    }

    /// Idempotent payment confirmation, keyed by provider session id.
    ///
    /// Duplicate deliveries and webhook/poll races are expected; the store's
    /// compare-and-set guarantees at most one effective transition, and this
    /// layer only classifies and logs the outcome. An unknown session is the
    /// one sanctioned silent no-op (test events, foreign sessions).
    pub async fn confirm_paid(
        &self,
        session_id: &str,
        payment_intent: Option<&str>,
    ) -> Result<PaidOutcome, LifecycleError> {
        let outcome = self
            .store
            .confirm_order_paid(session_id, payment_intent, Utc::now())
            .await?;
        match &outcome {
            PaidOutcome::Confirmed(order) => {
                info!(order_id = %order.id, session_id, "order marked as paid");
            }
            PaidOutcome::AlreadyPaid(order) => {
                debug!(order_id = %order.id, session_id, "duplicate payment confirmation absorbed");
            }
            PaidOutcome::UnknownSession => {
                info!(session_id, "payment confirmation for unknown session ignored");
            }
        }
        Ok(outcome)
    }

    /// Poll fallback after redirect-back: ask the provider for the session
    /// state and, when paid, drive the same confirmation as the webhook.
    pub async fn poll_session(&self, session_id: &str) -> Result<SessionStatus, LifecycleError> {
        let status = self.gateway.fetch_session(session_id).await?;
        if status.is_paid() {
            self.confirm_paid(session_id, status.payment_intent.as_deref())
                .await?;
        }
        Ok(status)
    }

    /// Admin status override. Any jump is allowed as an operational escape
    /// hatch; jumps outside the forward progression are logged so they stay
    /// visible.
    pub async fn override_status(
        &self,
        order_id: Uuid,
        status: OrderStatus,
    ) -> Result<Option<Order>, LifecycleError> {
        if let Some(current) = self.store.get_order(order_id).await? {
            if current.status != status && !is_forward_transition(current.status, status) {
                warn!(
                    order_id = %order_id,
                    from = current.status.as_str(),
                    to = status.as_str(),
                    "admin status override outside forward progression"
                );
            }
        }
        Ok(self.store.set_order_status(order_id, status).await?)
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::StubGateway;
    use crate::store::{memory::MemoryStore, NewProduct};
    use common_money::Amount;

    fn customer() -> Customer {
        Customer {
            name: "Erik Svensson".into(),
            email: "erik@example.com".into(),
            phone: Some("0701234567".into()),
            address: Some("Lillgatan 3".into()),
            postal_code: Some("211 11".into()),
            city: Some("Malmö".into()),
        }
    }

    async fn lifecycle_with_product() -> (OrderLifecycle, Arc<StubGateway>, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let gateway = Arc::new(StubGateway::new());
        let product = store
            .create_product(NewProduct {
                name: "Mörk choklad 70%".into(),
                category: "choklad".into(),
                price: Amount::new(89),
                description: None,
                image: None,
                weight: Some("100g".into()),
                origin: Some("Ecuador".into()),
                in_stock: true,
                featured: false,
            })
            .await
            .unwrap();
        let lifecycle = OrderLifecycle::new(
            store,
            gateway.clone(),
            ShippingPolicy::default(),
        );
        (lifecycle, gateway, product.id)
    }

    #[tokio::test]
    async fn checkout_persists_pending_payment_bound_to_session() {
        let (lifecycle, _gateway, product_id) = lifecycle_with_product().await;
        let cart = vec![CartLine { product_id, quantity: 1 }];
        let (order, session) = lifecycle.checkout(customer(), None, &cart).await.unwrap();
        assert_eq!(order.status, OrderStatus::PendingPayment);
        assert_eq!(order.stripe_session_id.as_deref(), Some(session.id.as_str()));
        assert!(order.paid_at.is_none());
        assert!(order.stripe_payment_intent.is_none());
    }

    #[tokio::test]
    async fn confirmation_is_idempotent() {
        let (lifecycle, gateway, product_id) = lifecycle_with_product().await;
        let cart = vec![CartLine { product_id, quantity: 2 }];
        let (_, session) = lifecycle.checkout(customer(), None, &cart).await.unwrap();
        gateway.mark_paid(&session.id, "pi_123").await;

        let first = lifecycle.confirm_paid(&session.id, Some("pi_123")).await.unwrap();
        let order = match first {
            PaidOutcome::Confirmed(o) => o,
            other => panic!("expected Confirmed, got {other:?}"),
        };
        assert_eq!(order.status, OrderStatus::Paid);
        let paid_at = order.paid_at.expect("paid_at stamped");

        // Same event delivered again: absorbed, nothing overwritten.
        let second = lifecycle.confirm_paid(&session.id, Some("pi_123")).await.unwrap();
        let order = match second {
            PaidOutcome::AlreadyPaid(o) => o,
            other => panic!("expected AlreadyPaid, got {other:?}"),
        };
        assert_eq!(order.paid_at, Some(paid_at));
        assert_eq!(order.stripe_payment_intent.as_deref(), Some("pi_123"));
    }

    #[tokio::test]
    async fn concurrent_webhook_and_poll_apply_once() {
        let (lifecycle, gateway, product_id) = lifecycle_with_product().await;
        let cart = vec![CartLine { product_id, quantity: 1 }];
        let (_, session) = lifecycle.checkout(customer(), None, &cart).await.unwrap();
        gateway.mark_paid(&session.id, "pi_race").await;

        // Webhook and poll racing on the same session.
        let (a, b) = tokio::join!(
            lifecycle.confirm_paid(&session.id, Some("pi_race")),
            lifecycle.poll_session(&session.id),
        );
        a.unwrap();
        b.unwrap();

        let order = lifecycle
            .store()
            .get_order_by_session(&session.id)
            .await
            .unwrap()
            .expect("order exists");
        assert_eq!(order.status, OrderStatus::Paid);
        assert_eq!(order.stripe_payment_intent.as_deref(), Some("pi_race"));
        assert!(order.paid_at.is_some());
    }

    #[tokio::test]
    async fn unknown_session_is_a_silent_no_op() {
        let (lifecycle, _gateway, _product_id) = lifecycle_with_product().await;
        let outcome = lifecycle
            .confirm_paid("cs_foreign_session", Some("pi_x"))
            .await
            .unwrap();
        assert!(matches!(outcome, PaidOutcome::UnknownSession));
    }

    #[tokio::test]
    async fn manual_order_never_starts_paid() {
        let (lifecycle, _gateway, product_id) = lifecycle_with_product().await;
        let cart = vec![CartLine { product_id, quantity: 1 }];
        let order = lifecycle
            .place_manual_order(customer(), Some("ring vid porten".into()), &cart)
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_method, PaymentMethod::Manual);
        assert!(order.paid_at.is_none());
    }

    #[tokio::test]
    async fn admin_override_allows_backwards_jump() {
        let (lifecycle, _gateway, product_id) = lifecycle_with_product().await;
        let cart = vec![CartLine { product_id, quantity: 1 }];
        let order = lifecycle.place_manual_order(customer(), None, &cart).await.unwrap();

        let shipped = lifecycle
            .override_status(order.id, OrderStatus::Shipped)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(shipped.status, OrderStatus::Shipped);

        // Operators may move an order backwards; the jump is only logged.
        let reverted = lifecycle
            .override_status(order.id, OrderStatus::Pending)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reverted.status, OrderStatus::Pending);
    }
}
