use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, Ordering},
};

use card_shop_engine::{
    db_types::{FulfillmentResult, Order, Product},
    test_utils::{
        prepare_env::{temp_json_store, test_postgres_store},
        AnyStore,
    },
    CatalogApi,
    OrderFlowApi,
    OrderFlowError,
    PostgresDatabase,
};
use cucumber::World;
use log::*;
use tempfile::TempDir;
use tokio::sync::OnceCell;

/// Set while the suite is running against Postgres rather than the JSON store.
pub static USE_POSTGRES: AtomicBool = AtomicBool::new(false);
static POSTGRES: OnceCell<PostgresDatabase> = OnceCell::const_new();

#[derive(Default, Debug, World)]
pub struct ShopWorld {
    pub system: Option<ShopSystem>,
    pub products: HashMap<String, Product>,
    pub orders: HashMap<String, Order>,
    pub last_error: Option<OrderFlowError>,
    pub last_fulfillment: Option<FulfillmentResult>,
}

#[derive(Debug)]
pub struct ShopSystem {
    /// The JSON store's directory. Postgres runs have none.
    pub data_dir: Option<TempDir>,
    pub orders: OrderFlowApi<AnyStore>,
    pub catalog: CatalogApi<AnyStore>,
}

impl ShopWorld {
    pub fn system(&self) -> &ShopSystem {
        self.system.as_ref().expect("Shop not initialised")
    }

    pub fn orders(&self) -> &OrderFlowApi<AnyStore> {
        &self.system().orders
    }

    pub fn catalog(&self) -> &CatalogApi<AnyStore> {
        &self.system().catalog
    }

    pub fn product(&self, title: &str) -> &Product {
        self.products.get(title).unwrap_or_else(|| panic!("No product called {title}"))
    }

    pub fn order(&self, label: &str) -> &Order {
        self.orders.get(label).unwrap_or_else(|| panic!("No order labelled {label}"))
    }
}

impl ShopSystem {
    pub async fn new() -> Self {
        let (data_dir, db) = if USE_POSTGRES.load(Ordering::SeqCst) {
            let db = POSTGRES
                .get_or_init(|| async { test_postgres_store().await.expect("SHOP_TEST_DATABASE_URL is not set") })
                .await
                .clone();
            (None, AnyStore::from(db))
        } else {
            let (dir, db) = temp_json_store().await;
            debug!("🚀️ Created shop in {}", dir.path().display());
            (Some(dir), AnyStore::from(db))
        };
        let orders = OrderFlowApi::new(db.clone());
        let catalog = CatalogApi::new(db);
        Self { data_dir, orders, catalog }
    }
}
