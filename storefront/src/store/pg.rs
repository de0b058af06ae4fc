use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common_money::Amount;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    Admin, Category, CategoryUpdate, Customer, LineItem, NewCategory, NewProduct, Order,
    OrderDraft, OrderStatus, PaidOutcome, PaymentMethod, Product, ProductUpdate, Store, StoreError,
};

const ORDER_COLUMNS: &str = "id, customer_name, customer_email, customer_phone, address, \
     postal_code, city, items, subtotal, shipping, total, notes, status, payment_method, \
     stripe_session_id, stripe_payment_intent, created_at, updated_at, paid_at";

const PRODUCT_COLUMNS: &str =
    "id, name, category, price, description, image, weight, origin, in_stock, featured, \
     created_at, updated_at";

const CATEGORY_COLUMNS: &str = "id, name, slug, icon, sort_order, created_at, updated_at";

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect and bring the schema up to date before serving traffic.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(sqlx::Error::from)?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    category: String,
    price: i64,
    description: Option<String>,
    image: Option<String>,
    weight: Option<String>,
    origin: Option<String>,
    in_stock: bool,
    featured: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Product {
        Product {
            id: row.id,
            name: row.name,
            category: row.category,
            price: Amount::new(row.price),
            description: row.description,
            image: row.image,
            weight: row.weight,
            origin: row.origin,
            in_stock: row.in_stock,
            featured: row.featured,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: Uuid,
    name: String,
    slug: String,
    icon: String,
    sort_order: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Category {
        Category {
            id: row.id,
            name: row.name,
            slug: row.slug,
            icon: row.icon,
            sort_order: row.sort_order,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    customer_name: String,
    customer_email: String,
    customer_phone: Option<String>,
    address: Option<String>,
    postal_code: Option<String>,
    city: Option<String>,
    items: serde_json::Value,
    subtotal: i64,
    shipping: i64,
    total: i64,
    notes: Option<String>,
    status: String,
    payment_method: String,
    stripe_session_id: Option<String>,
    stripe_payment_intent: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
}

impl OrderRow {
    fn into_order(self) -> Result<Order, StoreError> {
        let status = OrderStatus::parse(&self.status).ok_or(StoreError::Decode("order status"))?;
        let payment_method = PaymentMethod::parse(&self.payment_method)
            .ok_or(StoreError::Decode("payment method"))?;
        let items: Vec<LineItem> =
            serde_json::from_value(self.items).map_err(|_| StoreError::Decode("order items"))?;
        Ok(Order {
            id: self.id,
            customer: Customer {
                name: self.customer_name,
                email: self.customer_email,
                phone: self.customer_phone,
                address: self.address,
                postal_code: self.postal_code,
                city: self.city,
            },
            items,
            subtotal: Amount::new(self.subtotal),
            shipping: Amount::new(self.shipping),
            total: Amount::new(self.total),
            notes: self.notes,
            status,
            payment_method,
            stripe_session_id: self.stripe_session_id,
            stripe_payment_intent: self.stripe_payment_intent,
            created_at: self.created_at,
            updated_at: self.updated_at,
            paid_at: self.paid_at,
        })
    }
}

fn map_unique_violation(err: sqlx::Error, what: &'static str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict(what),
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY category, name"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Product::from))
    }

    async fn create_product(&self, new: NewProduct) -> Result<Product, StoreError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "INSERT INTO products (id, name, category, price, description, image, weight, origin, in_stock, featured)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(new.name)
        .bind(new.category)
        .bind(new.price.units())
        .bind(new.description)
        .bind(new.image)
        .bind(new.weight)
        .bind(new.origin)
        .bind(new.in_stock)
        .bind(new.featured)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn update_product(
        &self,
        id: Uuid,
        update: ProductUpdate,
    ) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "UPDATE products SET
                name = COALESCE($2, name),
                category = COALESCE($3, category),
                price = COALESCE($4, price),
                description = COALESCE($5, description),
                image = COALESCE($6, image),
                weight = COALESCE($7, weight),
                origin = COALESCE($8, origin),
                in_stock = COALESCE($9, in_stock),
                featured = COALESCE($10, featured),
                updated_at = now()
             WHERE id = $1
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .bind(update.name)
        .bind(update.category)
        .bind(update.price.map(|p| p.units()))
        .bind(update.description)
        .bind(update.image)
        .bind(update.weight)
        .bind(update.origin)
        .bind(update.in_stock)
        .bind(update.featured)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Product::from))
    }

    async fn delete_product(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let rows = sqlx::query_as::<_, CategoryRow>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY sort_order, name"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn get_category(&self, id: Uuid) -> Result<Option<Category>, StoreError> {
        let row = sqlx::query_as::<_, CategoryRow>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Category::from))
    }

    async fn create_category(&self, new: NewCategory) -> Result<Category, StoreError> {
        let row = sqlx::query_as::<_, CategoryRow>(&format!(
            "INSERT INTO categories (id, name, slug, icon, sort_order)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(new.name)
        .bind(new.slug)
        .bind(new.icon)
        .bind(new.sort_order)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "category slug"))?;
        Ok(row.into())
    }

    async fn update_category(
        &self,
        id: Uuid,
        update: CategoryUpdate,
    ) -> Result<Option<Category>, StoreError> {
        let row = sqlx::query_as::<_, CategoryRow>(&format!(
            "UPDATE categories SET
                name = COALESCE($2, name),
                slug = COALESCE($3, slug),
                icon = COALESCE($4, icon),
                sort_order = COALESCE($5, sort_order),
                updated_at = now()
             WHERE id = $1
             RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(id)
        .bind(update.name)
        .bind(update.slug)
        .bind(update.icon)
        .bind(update.sort_order)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "category slug"))?;
        Ok(row.map(Category::from))
    }

    async fn delete_category(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_order(&self, draft: OrderDraft) -> Result<Order, StoreError> {
        let items =
            serde_json::to_value(&draft.items).map_err(|_| StoreError::Decode("order items"))?;
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "INSERT INTO orders (id, customer_name, customer_email, customer_phone, address,
                                 postal_code, city, items, subtotal, shipping, total, notes,
                                 status, payment_method, stripe_session_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(draft.id)
        .bind(draft.customer.name)
        .bind(draft.customer.email)
        .bind(draft.customer.phone)
        .bind(draft.customer.address)
        .bind(draft.customer.postal_code)
        .bind(draft.customer.city)
        .bind(items)
        .bind(draft.subtotal.units())
        .bind(draft.shipping.units())
        .bind(draft.total.units())
        .bind(draft.notes)
        .bind(draft.status.as_str())
        .bind(draft.payment_method.as_str())
        .bind(draft.stripe_session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "stripe session id"))?;
        row.into_order()
    }

    async fn list_orders(&self) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(OrderRow::into_order).collect()
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(OrderRow::into_order).transpose()
    }

    async fn get_order_by_session(&self, session_id: &str) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE stripe_session_id = $1"
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(OrderRow::into_order).transpose()
    }

    async fn confirm_order_paid(
        &self,
        session_id: &str,
        payment_intent: Option<&str>,
        paid_at: DateTime<Utc>,
    ) -> Result<PaidOutcome, StoreError> {
        // Conditional update: the status guard and the write are one statement,
        // so a webhook and a poll racing on the same session cannot both win.
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "UPDATE orders
                SET status = 'paid',
                    stripe_payment_intent = COALESCE($2, stripe_payment_intent),
                    paid_at = $3,
                    updated_at = now()
              WHERE stripe_session_id = $1 AND status <> 'paid'
              RETURNING {ORDER_COLUMNS}"
        ))
        .bind(session_id)
        .bind(payment_intent)
        .bind(paid_at)
        .fetch_optional(&self.pool)
        .await?;
        if let Some(row) = row {
            return Ok(PaidOutcome::Confirmed(row.into_order()?));
        }
        // Lost the race or the session never matched; classify for the caller.
        match self.get_order_by_session(session_id).await? {
            Some(order) => Ok(PaidOutcome::AlreadyPaid(order)),
            None => Ok(PaidOutcome::UnknownSession),
        }
    }

    async fn set_order_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "UPDATE orders SET status = $2, updated_at = now()
              WHERE id = $1
              RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(OrderRow::into_order).transpose()
    }

    async fn get_admin(&self, username: &str) -> Result<Option<Admin>, StoreError> {
        let row = sqlx::query_as::<_, (Uuid, String, String, DateTime<Utc>)>(
            "SELECT id, username, password, created_at FROM admins WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id, username, password_hash, created_at)| Admin {
            id,
            username,
            password_hash,
            created_at,
        }))
    }

    async fn create_admin(&self, admin: Admin) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO admins (id, username, password, created_at) VALUES ($1, $2, $3, $4)")
            .bind(admin.id)
            .bind(admin.username)
            .bind(admin.password_hash)
            .bind(admin.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, "admin username"))?;
        Ok(())
    }

    async fn update_admin_password(&self, username: &str, hash: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE admins SET password = $1 WHERE username = $2")
            .bind(hash)
            .bind(username)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn admin_count(&self) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM admins")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
