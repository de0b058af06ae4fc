use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    Admin, Category, CategoryUpdate, NewCategory, NewProduct, Order, OrderDraft, OrderStatus,
    PaidOutcome, Product, ProductUpdate, Store, StoreError,
};

#[derive(Default)]
struct Inner {
    products: HashMap<Uuid, Product>,
    categories: HashMap<Uuid, Category>,
    orders: HashMap<Uuid, Order>,
    admins: HashMap<String, Admin>,
}

/// In-memory store used by tests and DB-less local development. All data is
/// lost on restart. The single mutex makes `confirm_order_paid` a true
/// check-and-set: no interleaving between the status read and the write.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let inner = self.inner.lock().await;
        let mut products: Vec<Product> = inner.products.values().cloned().collect();
        products.sort_by(|a, b| (a.category.as_str(), a.name.as_str()).cmp(&(b.category.as_str(), b.name.as_str())));
        Ok(products)
    }

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        Ok(self.inner.lock().await.products.get(&id).cloned())
    }

    async fn create_product(&self, new: NewProduct) -> Result<Product, StoreError> {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4(),
            name: new.name,
            category: new.category,
            price: new.price,
            description: new.description,
            image: new.image,
            weight: new.weight,
            origin: new.origin,
            in_stock: new.in_stock,
            featured: new.featured,
            created_at: now,
            updated_at: now,
        };
        self.inner
            .lock()
            .await
            .products
            .insert(product.id, product.clone());
        Ok(product)
    }

    async fn update_product(
        &self,
        id: Uuid,
        update: ProductUpdate,
    ) -> Result<Option<Product>, StoreError> {
        let mut inner = self.inner.lock().await;
        let Some(product) = inner.products.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = update.name {
            product.name = name;
        }
        if let Some(category) = update.category {
            product.category = category;
        }
        if let Some(price) = update.price {
            product.price = price;
        }
        if let Some(description) = update.description {
            product.description = Some(description);
        }
        if let Some(image) = update.image {
            product.image = Some(image);
        }
        if let Some(weight) = update.weight {
            product.weight = Some(weight);
        }
        if let Some(origin) = update.origin {
            product.origin = Some(origin);
        }
        if let Some(in_stock) = update.in_stock {
            product.in_stock = in_stock;
        }
        if let Some(featured) = update.featured {
            product.featured = featured;
        }
        product.updated_at = Utc::now();
        Ok(Some(product.clone()))
    }

    async fn delete_product(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.inner.lock().await.products.remove(&id).is_some())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let inner = self.inner.lock().await;
        let mut categories: Vec<Category> = inner.categories.values().cloned().collect();
        categories.sort_by(|a, b| (a.sort_order, a.name.as_str()).cmp(&(b.sort_order, b.name.as_str())));
        Ok(categories)
    }

    async fn get_category(&self, id: Uuid) -> Result<Option<Category>, StoreError> {
        Ok(self.inner.lock().await.categories.get(&id).cloned())
    }

    async fn create_category(&self, new: NewCategory) -> Result<Category, StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.categories.values().any(|c| c.slug == new.slug) {
            return Err(StoreError::Conflict("category slug"));
        }
        let now = Utc::now();
        let category = Category {
            id: Uuid::new_v4(),
            name: new.name,
            slug: new.slug,
            icon: new.icon,
            sort_order: new.sort_order,
            created_at: now,
            updated_at: now,
        };
        inner.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn update_category(
        &self,
        id: Uuid,
        update: CategoryUpdate,
    ) -> Result<Option<Category>, StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(slug) = &update.slug {
            if inner.categories.values().any(|c| c.id != id && &c.slug == slug) {
                return Err(StoreError::Conflict("category slug"));
            }
        }
        let Some(category) = inner.categories.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = update.name {
            category.name = name;
        }
        if let Some(slug) = update.slug {
            category.slug = slug;
        }
        if let Some(icon) = update.icon {
            category.icon = icon;
        }
        if let Some(sort_order) = update.sort_order {
            category.sort_order = sort_order;
        }
        category.updated_at = Utc::now();
        Ok(Some(category.clone()))
    }

    async fn delete_category(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.inner.lock().await.categories.remove(&id).is_some())
    }

    async fn create_order(&self, draft: OrderDraft) -> Result<Order, StoreError> {
        let now = Utc::now();
        let OrderDraft {
            id,
            customer,
            items,
            subtotal,
            shipping,
            total,
            notes,
            status,
            payment_method,
            stripe_session_id,
        } = draft;
        let order = Order {
            id,
            customer,
            items,
            subtotal,
            shipping,
            total,
            notes,
            status,
            payment_method,
            stripe_session_id,
            stripe_payment_intent: None,
            created_at: now,
            updated_at: now,
            paid_at: None,
        };
        self.inner.lock().await.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn list_orders(&self) -> Result<Vec<Order>, StoreError> {
        let inner = self.inner.lock().await;
        let mut orders: Vec<Order> = inner.orders.values().cloned().collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        Ok(self.inner.lock().await.orders.get(&id).cloned())
    }

    async fn get_order_by_session(&self, session_id: &str) -> Result<Option<Order>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .orders
            .values()
            .find(|o| o.stripe_session_id.as_deref() == Some(session_id))
            .cloned())
    }

    async fn confirm_order_paid(
        &self,
        session_id: &str,
        payment_intent: Option<&str>,
        paid_at: DateTime<Utc>,
    ) -> Result<PaidOutcome, StoreError> {
        let mut inner = self.inner.lock().await;
        let Some(order) = inner
            .orders
            .values_mut()
            .find(|o| o.stripe_session_id.as_deref() == Some(session_id))
        else {
            return Ok(PaidOutcome::UnknownSession);
        };
        if order.status == OrderStatus::Paid {
            return Ok(PaidOutcome::AlreadyPaid(order.clone()));
        }
        order.status = OrderStatus::Paid;
        order.stripe_payment_intent = payment_intent.map(str::to_string);
        order.paid_at = Some(paid_at);
        order.updated_at = paid_at;
        Ok(PaidOutcome::Confirmed(order.clone()))
    }

    async fn set_order_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<Option<Order>, StoreError> {
        let mut inner = self.inner.lock().await;
        let Some(order) = inner.orders.get_mut(&id) else {
            return Ok(None);
        };
        order.status = status;
        order.updated_at = Utc::now();
        Ok(Some(order.clone()))
    }

    async fn get_admin(&self, username: &str) -> Result<Option<Admin>, StoreError> {
        Ok(self.inner.lock().await.admins.get(username).cloned())
    }

    async fn create_admin(&self, admin: Admin) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.admins.contains_key(&admin.username) {
            return Err(StoreError::Conflict("admin username"));
        }
        inner.admins.insert(admin.username.clone(), admin);
        Ok(())
    }

    async fn update_admin_password(&self, username: &str, hash: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(admin) = inner.admins.get_mut(username) {
            admin.password_hash = hash.to_string();
        }
        Ok(())
    }

    async fn admin_count(&self) -> Result<i64, StoreError> {
        Ok(self.inner.lock().await.admins.len() as i64)
    }
}
