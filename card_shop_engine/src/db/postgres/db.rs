use std::fmt::Debug;

use chrono::Utc;
use log::*;
use sqlx::PgPool;

use super::{card_secrets, new_pool, orders, products};
use crate::{
    db::{
        traits::{CardSecretManagement, OrderManagement, ProductManagement, ShopDatabase},
        StoreError,
    },
    db_types::*,
};

#[derive(Clone)]
pub struct PostgresDatabase {
    pool: PgPool,
}

impl Debug for PostgresDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PostgresDatabase ({:?})", self.pool)
    }
}

impl PostgresDatabase {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Applies the embedded schema migrations. Safe to call on every startup.
    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations are up to date");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl ProductManagement for PostgresDatabase {
    async fn fetch_products(&self) -> Result<Vec<Product>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        products::fetch_products(&mut conn).await
    }

    async fn fetch_product(&self, id: &str) -> Result<Option<Product>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        products::fetch_product(id, &mut conn).await
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let product = product.into_product(new_record_id(), Utc::now());
        let product = products::upsert_product(&product, &mut conn).await?;
        debug!("🗃️ Product {} ({}) created", product.id, product.title);
        Ok(product)
    }

    async fn upsert_product(&self, mut product: Product) -> Result<Product, StoreError> {
        if product.stock < 0 || product.sold_count < 0 {
            return Err(StoreError::InvalidRecord(format!("Product {} has negative stock or sold count", product.id)));
        }
        product.updated_at = Utc::now();
        let mut conn = self.pool.acquire().await?;
        products::upsert_product(&product, &mut conn).await
    }

    async fn delete_product(&self, id: &str) -> Result<Option<ProductDeletion>, StoreError> {
        let mut tx = self.pool.begin().await?;
        if products::fetch_product(id, &mut tx).await?.is_none() {
            return Ok(None);
        }
        let result = if products::is_product_referenced(id, &mut tx).await? {
            products::set_product_status(id, ProductStatus::Inactive, &mut tx).await?;
            info!("🗃️ Product {id} is referenced by orders. It has been deactivated instead of deleted.");
            ProductDeletion::Deactivated
        } else {
            products::delete_product(id, &mut tx).await?;
            info!("🗃️ Product {id} deleted");
            ProductDeletion::Deleted
        };
        tx.commit().await?;
        Ok(Some(result))
    }

    async fn update_product_stock(&self, id: &str, stock: i64) -> Result<Option<Product>, StoreError> {
        if stock < 0 {
            return Err(StoreError::InvalidRecord(format!("Stock cannot be negative ({stock})")));
        }
        let mut conn = self.pool.acquire().await?;
        products::set_product_stock(id, stock, &mut conn).await
    }

    async fn update_product_fields(&self, id: &str, update: ProductUpdate) -> Result<Option<Product>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        products::update_product_fields(id, update, &mut conn).await
    }

    async fn adjust_product_stock(&self, id: &str, delta: i64) -> Result<Option<Product>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        products::adjust_product_stock(id, delta, &mut conn).await
    }
}

impl CardSecretManagement for PostgresDatabase {
    async fn fetch_card_secrets(&self) -> Result<Vec<CardSecret>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        card_secrets::fetch_card_secrets(&mut conn).await
    }

    async fn fetch_card_secret(&self, id: &str) -> Result<Option<CardSecret>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        card_secrets::fetch_card_secret(id, &mut conn).await
    }

    async fn fetch_card_secrets_for_product(
        &self,
        product_id: &str,
        status: Option<CardSecretStatus>,
    ) -> Result<Vec<CardSecret>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        card_secrets::fetch_for_product(product_id, status, &mut conn).await
    }

    async fn insert_card_secret(&self, secret: NewCardSecret) -> Result<CardSecret, StoreError> {
        let secret = secret.into_card_secret(new_record_id(), Utc::now());
        let mut conn = self.pool.acquire().await?;
        card_secrets::upsert_card_secret(&secret, &mut conn)
            .await?
            .ok_or_else(|| StoreError::Duplicate(format!("Card secret {}", secret.id)))
    }

    async fn upsert_card_secret(&self, mut secret: CardSecret) -> Result<CardSecret, StoreError> {
        secret.updated_at = Utc::now();
        let mut conn = self.pool.acquire().await?;
        card_secrets::upsert_card_secret(&secret, &mut conn).await?.ok_or_else(|| {
            StoreError::InvalidRecord(format!("Card secret {} is already assigned to another order", secret.id))
        })
    }

    async fn delete_card_secret(&self, id: &str) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        let Some(secret) = card_secrets::fetch_card_secret(id, &mut tx).await? else {
            return Ok(false);
        };
        if !secret.is_available() {
            return Err(StoreError::CardSecretSold(id.to_string()));
        }
        let deleted = card_secrets::delete_available(id, &mut tx).await?;
        tx.commit().await?;
        if deleted == 0 {
            // Sold between the read and the delete.
            return Err(StoreError::CardSecretSold(id.to_string()));
        }
        debug!("🗃️ Card secret {id} deleted");
        Ok(true)
    }
}

impl OrderManagement for PostgresDatabase {
    async fn fetch_orders(&self) -> Result<Vec<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_orders(&mut conn).await
    }

    async fn fetch_order(&self, id: &str) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order(id, &mut conn).await
    }

    async fn fetch_order_by_number(&self, order_number: &str) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_by_number(order_number, &mut conn).await
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, StoreError> {
        let order = order.into_order(new_record_id(), Utc::now());
        let mut conn = self.pool.acquire().await?;
        let order = orders::upsert_order(&order, &mut conn)
            .await?
            .ok_or_else(|| StoreError::Duplicate(format!("Order {}", order.id)))?;
        debug!("🗃️ Order {} ({}) created for {}", order.order_number, order.id, order.total_amount);
        Ok(order)
    }

    async fn upsert_order(&self, mut order: Order) -> Result<Order, StoreError> {
        order.updated_at = Utc::now();
        let mut conn = self.pool.acquire().await?;
        orders::upsert_order(&order, &mut conn)
            .await?
            .ok_or_else(|| StoreError::InvalidRecord(format!("The total of order {} cannot change", order.id)))
    }

    async fn fetch_orders_by_contact_info(&self, contact_info: &str) -> Result<Vec<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_orders_by_contact(contact_info, &mut conn).await
    }
}

impl ShopDatabase for PostgresDatabase {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        let _: (i32,) = sqlx::query_as("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    async fn record_gateway_order(&self, order_id: &str, gateway_order_id: &str) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::set_gateway_order_id(order_id, gateway_order_id, &mut conn).await
    }

    async fn set_order_status(
        &self,
        order_id: &str,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> Result<Option<Order>, StoreError> {
        if to == PaymentStatus::Paid {
            return Err(StoreError::InvalidRecord("Orders can only be marked paid by fulfillment".into()));
        }
        let mut conn = self.pool.acquire().await?;
        let updated = orders::transition_status(order_id, from, to, &mut conn).await?;
        if updated.is_some() {
            debug!("🗃️ Order {order_id} moved from {from} to {to}");
        }
        Ok(updated)
    }

    async fn fulfill_order(
        &self,
        order_id: &str,
        trigger: FulfillmentTrigger,
    ) -> Result<FulfillmentResult, StoreError> {
        let mut tx = self.pool.begin().await?;
        // The row lock makes concurrent fulfillments of the same order queue up behind this one.
        let Some(mut order) = orders::fetch_order_for_update(order_id, &mut tx).await? else {
            return Ok(FulfillmentResult::OrderNotFound);
        };
        match order.payment_status {
            PaymentStatus::Paid => return Ok(FulfillmentResult::AlreadyFulfilled(order)),
            PaymentStatus::Failed | PaymentStatus::Cancelled => return Ok(FulfillmentResult::NotPayable(order)),
            PaymentStatus::Pending => {},
        }
        let now = Utc::now();
        match trigger {
            FulfillmentTrigger::PaymentConfirmed if order.paid_at.is_none() => {
                order = orders::record_payment(&order.id, now, &mut tx)
                    .await?
                    .ok_or_else(|| StoreError::InvalidRecord(format!("Order {order_id} left the pending state")))?;
            },
            FulfillmentTrigger::Retry if order.paid_at.is_none() => {
                return Ok(FulfillmentResult::AwaitingPayment(order));
            },
            _ => {},
        }
        let Some(secret) = card_secrets::lock_next_available(&order.product_id, &mut tx).await? else {
            warn!("🗃️ Order {order_id} is paid, but product {} has no card secrets left", order.product_id);
            tx.commit().await?;
            return Ok(FulfillmentResult::OutOfStock(order));
        };
        let sold = card_secrets::mark_sold(&secret.id, &order.id, now, &mut tx)
            .await?
            .ok_or_else(|| StoreError::InvalidRecord(format!("Card secret {} could not be assigned", secret.id)))?;
        let paid = orders::mark_paid(&order.id, &sold.snapshot(), now, &mut tx)
            .await?
            .ok_or_else(|| StoreError::InvalidRecord(format!("Order {order_id} left the pending state")))?;
        if products::record_sale(&paid.product_id, paid.quantity, &mut tx).await?.is_none() {
            warn!("🗃️ Product {} for order {order_id} no longer exists. Counters not updated.", paid.product_id);
        }
        tx.commit().await?;
        info!("🗃️ Order {order_id} paid. Card secret {} delivered.", sold.id);
        Ok(FulfillmentResult::Fulfilled(paid))
    }
}
