pub mod memory;
pub mod pg;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common_money::Amount;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Manual order awaiting offline confirmation by an admin.
    Pending,
    /// Card order awaiting provider confirmation.
    PendingPayment,
    Paid,
    Confirmed,
    Shipped,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::PendingPayment => "pending_payment",
            OrderStatus::Paid => "paid",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<OrderStatus> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "pending_payment" => Some(OrderStatus::PendingPayment),
            "paid" => Some(OrderStatus::Paid),
            "confirmed" => Some(OrderStatus::Confirmed),
            "shipped" => Some(OrderStatus::Shipped),
            "completed" => Some(OrderStatus::Completed),
            "cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

/// Expected forward progression:
/// pending_payment -> paid (confirmation only)
/// pending | paid -> confirmed -> shipped -> completed
/// any non-terminal -> cancelled
/// Admin overrides may jump outside this; such jumps are logged, not blocked.
pub fn is_forward_transition(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;
    match from {
        Pending => matches!(to, Paid | Confirmed | Shipped | Completed | Cancelled),
        PendingPayment => matches!(to, Paid | Cancelled),
        Paid => matches!(to, Confirmed | Shipped | Completed | Cancelled),
        Confirmed => matches!(to, Shipped | Completed | Cancelled),
        Shipped => matches!(to, Completed | Cancelled),
        Completed | Cancelled => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Manual,
    Stripe,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Manual => "manual",
            PaymentMethod::Stripe => "stripe",
        }
    }

    pub fn parse(s: &str) -> Option<PaymentMethod> {
        match s {
            "manual" => Some(PaymentMethod::Manual),
            "stripe" => Some(PaymentMethod::Stripe),
            _ => None,
        }
    }
}

/// Customer details captured at order-creation time. There is no customer
/// entity; every order carries its own snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
}

/// Frozen copy of product data at purchase time. Later product edits or
/// deletion must not affect it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: Uuid,
    pub name: String,
    pub price: Amount,
    pub quantity: u32,
    pub subtotal: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub customer: Customer,
    pub items: Vec<LineItem>,
    pub subtotal: Amount,
    pub shipping: Amount,
    pub total: Amount,
    pub notes: Option<String>,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub stripe_session_id: Option<String>,
    pub stripe_payment_intent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

/// Priced but not yet persisted order, as produced by the order builder.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub id: Uuid,
    pub customer: Customer,
    pub items: Vec<LineItem>,
    pub subtotal: Amount,
    pub shipping: Amount,
    pub total: Amount,
    pub notes: Option<String>,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub stripe_session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub price: Amount,
    pub description: Option<String>,
    pub image: Option<String>,
    pub weight: Option<String>,
    pub origin: Option<String>,
    pub in_stock: bool,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub category: String,
    pub price: Amount,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub weight: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default = "default_true")]
    pub in_stock: bool,
    #[serde(default)]
    pub featured: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub category: Option<String>,
    pub price: Option<Amount>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub weight: Option<String>,
    pub origin: Option<String>,
    pub in_stock: Option<bool>,
    pub featured: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub icon: String,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCategory {
    pub name: String,
    pub slug: String,
    #[serde(default = "default_icon")]
    pub icon: String,
    #[serde(default)]
    pub sort_order: i32,
}

fn default_icon() -> String {
    "\u{1F4E6}".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub icon: Option<String>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct Admin {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Result of the idempotent paid-transition compare-and-set.
#[derive(Debug, Clone)]
pub enum PaidOutcome {
    /// The order transitioned to paid by this call.
    Confirmed(Order),
    /// The order was already paid; this delivery was absorbed.
    AlreadyPaid(Order),
    /// No order references this session; expected for test/foreign sessions.
    UnknownSession,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("duplicate {0}")]
    Conflict(&'static str),
    #[error("stored {0} could not be decoded")]
    Decode(&'static str),
}

/// Persistence boundary. The service runs against Postgres in production and
/// against the in-memory implementation in tests and DB-less development.
#[async_trait]
pub trait Store: Send + Sync {
    // Products
    async fn list_products(&self) -> Result<Vec<Product>, StoreError>;
    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, StoreError>;
    async fn create_product(&self, new: NewProduct) -> Result<Product, StoreError>;
    async fn update_product(
        &self,
        id: Uuid,
        update: ProductUpdate,
    ) -> Result<Option<Product>, StoreError>;
    async fn delete_product(&self, id: Uuid) -> Result<bool, StoreError>;

    // Categories
    async fn list_categories(&self) -> Result<Vec<Category>, StoreError>;
    async fn get_category(&self, id: Uuid) -> Result<Option<Category>, StoreError>;
    async fn create_category(&self, new: NewCategory) -> Result<Category, StoreError>;
    async fn update_category(
        &self,
        id: Uuid,
        update: CategoryUpdate,
    ) -> Result<Option<Category>, StoreError>;
    async fn delete_category(&self, id: Uuid) -> Result<bool, StoreError>;

    // Orders
    async fn create_order(&self, draft: OrderDraft) -> Result<Order, StoreError>;
    async fn list_orders(&self) -> Result<Vec<Order>, StoreError>;
    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, StoreError>;
    async fn get_order_by_session(&self, session_id: &str) -> Result<Option<Order>, StoreError>;

    /// Atomic paid transition keyed by provider session id. Implementations
    /// must apply the status check and the write as one step ("set paid only
    /// where current status is not paid") so a racing webhook and poll cannot
    /// both take effect.
    async fn confirm_order_paid(
        &self,
        session_id: &str,
        payment_intent: Option<&str>,
        paid_at: DateTime<Utc>,
    ) -> Result<PaidOutcome, StoreError>;

    async fn set_order_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<Option<Order>, StoreError>;

    // Admins
    async fn get_admin(&self, username: &str) -> Result<Option<Admin>, StoreError>;
    async fn create_admin(&self, admin: Admin) -> Result<(), StoreError>;
    async fn update_admin_password(&self, username: &str, hash: &str) -> Result<(), StoreError>;
    async fn admin_count(&self) -> Result<i64, StoreError>;
}
