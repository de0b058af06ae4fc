use common_money::{Amount, MoneyError};
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::store::{Customer, LineItem, OrderDraft, OrderStatus, PaymentMethod, Store, StoreError};

/// One cart entry as submitted by the client. Prices are never trusted from
/// the client; they are resolved server-side at build time.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: Uuid,
    pub quantity: u32,
}

#[derive(Debug, Error)]
pub enum PricingError {
    #[error("product not found: {0}")]
    ProductNotFound(Uuid),
    #[error("cart is empty")]
    EmptyCart,
    #[error("invalid quantity for product {0}")]
    InvalidQuantity(Uuid),
    #[error(transparent)]
    Money(#[from] MoneyError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Flat-fee shipping with a free threshold, a pure function of the subtotal.
#[derive(Debug, Clone, Copy)]
pub struct ShippingPolicy {
    pub free_threshold: Amount,
    pub flat_fee: Amount,
}

impl Default for ShippingPolicy {
    fn default() -> Self {
        Self {
            free_threshold: Amount::new(500),
            flat_fee: Amount::new(59),
        }
    }
}

impl ShippingPolicy {
    pub fn quote(&self, subtotal: Amount) -> Amount {
        if subtotal >= self.free_threshold {
            Amount::ZERO
        } else {
            self.flat_fee
        }
    }
}

/// Convert a cart into a priced, unpersisted order draft.
///
/// Every line must resolve against the store; a single unknown product id
/// aborts the whole build, so nothing partial ever reaches persistence.
/// Product name and price are frozen into the line items at this moment.
pub async fn build_order(
    store: &dyn Store,
    shipping: &ShippingPolicy,
    customer: Customer,
    notes: Option<String>,
    cart: &[CartLine],
    payment_method: PaymentMethod,
) -> Result<OrderDraft, PricingError> {
    if cart.is_empty() {
        return Err(PricingError::EmptyCart);
    }

    let mut items = Vec::with_capacity(cart.len());
    let mut subtotal = Amount::ZERO;
    for line in cart {
        if line.quantity == 0 {
            return Err(PricingError::InvalidQuantity(line.product_id));
        }
        let product = store
            .get_product(line.product_id)
            .await?
            .ok_or(PricingError::ProductNotFound(line.product_id))?;
        let line_subtotal = product.price.checked_mul_qty(line.quantity)?;
        subtotal = subtotal.checked_add(line_subtotal)?;
        items.push(LineItem {
            product_id: product.id,
            name: product.name,
            price: product.price,
            quantity: line.quantity,
            subtotal: line_subtotal,
        });
    }

    let shipping_fee = shipping.quote(subtotal);
    let total = subtotal.checked_add(shipping_fee)?;

    let status = match payment_method {
        PaymentMethod::Manual => OrderStatus::Pending,
        PaymentMethod::Stripe => OrderStatus::PendingPayment,
    };

    Ok(OrderDraft {
        id: Uuid::new_v4(),
        customer,
        items,
        subtotal,
        shipping: shipping_fee,
        total,
        notes,
        status,
        payment_method,
        stripe_session_id: None,
    })
}
