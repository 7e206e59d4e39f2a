//! One-shot copy of a JSON file store into another backend. Records keep their ids and timestamps, so the copy can be
//! re-run safely: every write is an upsert.
use std::{fmt::Display, path::Path};

use anyhow::{bail, Context, Result};
use card_shop_engine::{
    db::json_store::{read_collection, CARD_SECRETS_FILE, ORDERS_FILE, PRODUCTS_FILE},
    db_types::{CardSecret, Order, Product},
    ShopDatabase,
};
use log::*;
use serde::de::DeserializeOwned;

use crate::MigrateParams;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionSummary {
    pub migrated: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationSummary {
    pub products: CollectionSummary,
    pub card_secrets: CollectionSummary,
    pub orders: CollectionSummary,
}

impl MigrationSummary {
    pub fn failures(&self) -> usize {
        self.products.failed + self.card_secrets.failed + self.orders.failed
    }
}

impl Display for MigrationSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Products     : {} migrated, {} failed", self.products.migrated, self.products.failed)?;
        writeln!(f, "Card secrets : {} migrated, {} failed", self.card_secrets.migrated, self.card_secrets.failed)?;
        write!(f, "Orders       : {} migrated, {} failed", self.orders.migrated, self.orders.failed)
    }
}

#[cfg(feature = "postgres")]
pub fn run_migration(params: MigrateParams) -> Result<()> {
    use card_shop_engine::PostgresDatabase;

    let runtime = tokio::runtime::Runtime::new().context("Could not start the async runtime")?;
    let summary = runtime.block_on(async {
        let db = PostgresDatabase::new_with_url(&params.database_url, 5)
            .await
            .context("Could not connect to the target database")?;
        db.run_migrations().await.context("Could not prepare the target schema")?;
        let summary = migrate_store(&params.data_dir, &db).await?;
        db.close().await;
        anyhow::Ok(summary)
    })?;
    println!("{summary}");
    if summary.failures() > 0 {
        bail!("{} records could not be migrated. See the log for details.", summary.failures());
    }
    Ok(())
}

#[cfg(not(feature = "postgres"))]
pub fn run_migration(_params: MigrateParams) -> Result<()> {
    bail!("shoptools was built without Postgres support")
}

/// Copies products, then card secrets, then orders, so that every reference points at a record that already exists.
/// A failing record is logged and counted; it does not stop the run.
pub async fn migrate_store<B: ShopDatabase>(data_dir: &Path, target: &B) -> Result<MigrationSummary> {
    let mut summary = MigrationSummary::default();

    let products = load::<Product>(data_dir, PRODUCTS_FILE).await?;
    for product in products {
        let id = product.id.clone();
        record(&mut summary.products, "product", &id, target.upsert_product(product).await);
    }

    let secrets = load::<CardSecret>(data_dir, CARD_SECRETS_FILE).await?;
    for secret in secrets {
        let id = secret.id.clone();
        record(&mut summary.card_secrets, "card secret", &id, target.upsert_card_secret(secret).await);
    }

    let orders = load::<Order>(data_dir, ORDERS_FILE).await?;
    for order in orders {
        let id = order.id.clone();
        record(&mut summary.orders, "order", &id, target.upsert_order(order).await);
    }

    info!("🗃️ Migration finished with {} failures", summary.failures());
    Ok(summary)
}

async fn load<T: DeserializeOwned>(data_dir: &Path, file: &str) -> Result<Vec<T>> {
    let path = data_dir.join(file);
    if !path.exists() {
        warn!("🗃️ {} does not exist. Skipping.", path.display());
        return Ok(vec![]);
    }
    let records = read_collection::<T>(&path).await.with_context(|| format!("Could not read {}", path.display()))?;
    info!("🗃️ Read {} records from {}", records.len(), path.display());
    Ok(records)
}

fn record<T, E: Display>(summary: &mut CollectionSummary, kind: &str, id: &str, result: Result<T, E>) {
    match result {
        Ok(_) => {
            debug!("🗃️ Migrated {kind} {id}");
            summary.migrated += 1;
        },
        Err(e) => {
            error!("🗃️ Could not migrate {kind} {id}. {e}");
            summary.failed += 1;
        },
    }
}

#[cfg(test)]
mod test {
    use card_shop_engine::{
        db_types::PaymentMethod,
        order_objects::{CheckoutRequest, PaymentConfirmation},
        test_utils::prepare_env::{seed_product, temp_json_store},
        CardSecretManagement,
        OrderFlowApi,
        OrderManagement,
        ProductManagement,
    };

    use super::*;

    #[tokio::test]
    async fn copies_every_collection() {
        let (source_dir, source) = temp_json_store().await;
        let product = seed_product(&source, "Steam Key", 1500, 2).await;
        let orders = OrderFlowApi::new(source.clone());
        let order = orders
            .checkout(CheckoutRequest {
                product_id: product.id.clone(),
                quantity: 1,
                contact_info: "alice@example.com".into(),
                payment_method: PaymentMethod::Wechat,
            })
            .await
            .unwrap();
        orders
            .confirm_payment(PaymentConfirmation {
                order_id: order.id.clone(),
                product_id: product.id.clone(),
                amount_paid: Some(order.total_amount),
            })
            .await
            .unwrap();

        let (_target_dir, target) = temp_json_store().await;
        let summary = migrate_store(source_dir.path(), &target).await.unwrap();
        assert_eq!(summary.products, CollectionSummary { migrated: 1, failed: 0 });
        assert_eq!(summary.card_secrets, CollectionSummary { migrated: 2, failed: 0 });
        assert_eq!(summary.orders, CollectionSummary { migrated: 1, failed: 0 });

        let copied = target.fetch_order(&order.id).await.unwrap().unwrap();
        let original = source.fetch_order(&order.id).await.unwrap().unwrap();
        assert_eq!(copied.created_at, original.created_at);
        assert_eq!(copied.card_secret, original.card_secret);
        assert_eq!(copied.paid_at, original.paid_at);
        assert_eq!(target.fetch_card_secrets().await.unwrap().len(), 2);
        assert_eq!(target.fetch_product(&product.id).await.unwrap().unwrap().sold_count, 1);

        // Re-running is harmless
        let again = migrate_store(source_dir.path(), &target).await.unwrap();
        assert_eq!(again.failures(), 0);
        assert_eq!(target.fetch_orders().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_files_are_skipped() {
        let empty = tempfile::tempdir().unwrap();
        let (_target_dir, target) = temp_json_store().await;
        let summary = migrate_store(empty.path(), &target).await.unwrap();
        assert_eq!(summary, MigrationSummary::default());
    }

    #[tokio::test]
    async fn bad_records_are_counted() {
        let source = tempfile::tempdir().unwrap();
        let products = r#"[
            {"id":"p1","title":"Ok","price":100,"stock":1,
             "created_at":"2024-05-01T10:00:00Z","updated_at":"2024-05-01T10:00:00Z"},
            {"id":"p2","title":"Broken","price":100,"stock":-4,
             "created_at":"2024-05-01T10:00:00Z","updated_at":"2024-05-01T10:00:00Z"}
        ]"#;
        tokio::fs::write(source.path().join(PRODUCTS_FILE), products).await.unwrap();
        let (_target_dir, target) = temp_json_store().await;
        let summary = migrate_store(source.path(), &target).await.unwrap();
        assert_eq!(summary.products, CollectionSummary { migrated: 1, failed: 1 });
        assert_eq!(summary.failures(), 1);
    }
}
