//! A backend chosen at runtime, so that one test suite can drive both the JSON store and Postgres.
use crate::{
    db::{
        traits::{CardSecretManagement, OrderManagement, ProductManagement, ShopDatabase},
        StoreError,
    },
    db_types::*,
    JsonFileStore,
};
#[cfg(feature = "postgres")]
use crate::PostgresDatabase;

#[derive(Debug, Clone)]
pub enum AnyStore {
    Json(JsonFileStore),
    #[cfg(feature = "postgres")]
    Postgres(PostgresDatabase),
}

macro_rules! dispatch {
    ($self:ident, $db:ident => $call:expr) => {
        match $self {
            AnyStore::Json($db) => $call,
            #[cfg(feature = "postgres")]
            AnyStore::Postgres($db) => $call,
        }
    };
}

impl From<JsonFileStore> for AnyStore {
    fn from(db: JsonFileStore) -> Self {
        Self::Json(db)
    }
}

#[cfg(feature = "postgres")]
impl From<PostgresDatabase> for AnyStore {
    fn from(db: PostgresDatabase) -> Self {
        Self::Postgres(db)
    }
}

impl ProductManagement for AnyStore {
    async fn fetch_products(&self) -> Result<Vec<Product>, StoreError> {
        dispatch!(self, db => db.fetch_products().await)
    }

    async fn fetch_product(&self, id: &str) -> Result<Option<Product>, StoreError> {
        dispatch!(self, db => db.fetch_product(id).await)
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product, StoreError> {
        dispatch!(self, db => db.insert_product(product).await)
    }

    async fn upsert_product(&self, product: Product) -> Result<Product, StoreError> {
        dispatch!(self, db => db.upsert_product(product).await)
    }

    async fn delete_product(&self, id: &str) -> Result<Option<ProductDeletion>, StoreError> {
        dispatch!(self, db => db.delete_product(id).await)
    }

    async fn update_product_fields(&self, id: &str, update: ProductUpdate) -> Result<Option<Product>, StoreError> {
        dispatch!(self, db => db.update_product_fields(id, update).await)
    }

    async fn update_product_stock(&self, id: &str, stock: i64) -> Result<Option<Product>, StoreError> {
        dispatch!(self, db => db.update_product_stock(id, stock).await)
    }

    async fn adjust_product_stock(&self, id: &str, delta: i64) -> Result<Option<Product>, StoreError> {
        dispatch!(self, db => db.adjust_product_stock(id, delta).await)
    }
}

impl CardSecretManagement for AnyStore {
    async fn fetch_card_secrets(&self) -> Result<Vec<CardSecret>, StoreError> {
        dispatch!(self, db => db.fetch_card_secrets().await)
    }

    async fn fetch_card_secret(&self, id: &str) -> Result<Option<CardSecret>, StoreError> {
        dispatch!(self, db => db.fetch_card_secret(id).await)
    }

    async fn fetch_card_secrets_for_product(
        &self,
        product_id: &str,
        status: Option<CardSecretStatus>,
    ) -> Result<Vec<CardSecret>, StoreError> {
        dispatch!(self, db => db.fetch_card_secrets_for_product(product_id, status).await)
    }

    async fn insert_card_secret(&self, secret: NewCardSecret) -> Result<CardSecret, StoreError> {
        dispatch!(self, db => db.insert_card_secret(secret).await)
    }

    async fn upsert_card_secret(&self, secret: CardSecret) -> Result<CardSecret, StoreError> {
        dispatch!(self, db => db.upsert_card_secret(secret).await)
    }

    async fn delete_card_secret(&self, id: &str) -> Result<bool, StoreError> {
        dispatch!(self, db => db.delete_card_secret(id).await)
    }
}

impl OrderManagement for AnyStore {
    async fn fetch_orders(&self) -> Result<Vec<Order>, StoreError> {
        dispatch!(self, db => db.fetch_orders().await)
    }

    async fn fetch_order(&self, id: &str) -> Result<Option<Order>, StoreError> {
        dispatch!(self, db => db.fetch_order(id).await)
    }

    async fn fetch_order_by_number(&self, order_number: &str) -> Result<Option<Order>, StoreError> {
        dispatch!(self, db => db.fetch_order_by_number(order_number).await)
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, StoreError> {
        dispatch!(self, db => db.insert_order(order).await)
    }

    async fn upsert_order(&self, order: Order) -> Result<Order, StoreError> {
        dispatch!(self, db => db.upsert_order(order).await)
    }

    async fn delete_order(&self, id: &str) -> Result<bool, StoreError> {
        dispatch!(self, db => db.delete_order(id).await)
    }

    async fn fetch_orders_by_contact_info(&self, contact_info: &str) -> Result<Vec<Order>, StoreError> {
        dispatch!(self, db => db.fetch_orders_by_contact_info(contact_info).await)
    }

    async fn email_stats(&self) -> Result<EmailStats, StoreError> {
        dispatch!(self, db => db.email_stats().await)
    }
}

impl ShopDatabase for AnyStore {
    fn backend_name(&self) -> &'static str {
        dispatch!(self, db => db.backend_name())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        dispatch!(self, db => db.health_check().await)
    }

    async fn record_gateway_order(&self, order_id: &str, gateway_order_id: &str) -> Result<Option<Order>, StoreError> {
        dispatch!(self, db => db.record_gateway_order(order_id, gateway_order_id).await)
    }

    async fn set_order_status(
        &self,
        order_id: &str,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> Result<Option<Order>, StoreError> {
        dispatch!(self, db => db.set_order_status(order_id, from, to).await)
    }

    async fn fulfill_order(
        &self,
        order_id: &str,
        trigger: FulfillmentTrigger,
    ) -> Result<FulfillmentResult, StoreError> {
        dispatch!(self, db => db.fulfill_order(order_id, trigger).await)
    }
}
