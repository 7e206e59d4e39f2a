use log::*;
use tempfile::TempDir;

use crate::{
    db::traits::{CardSecretManagement, ProductManagement},
    db_types::{Cents, NewCardSecret, NewProduct, Product},
    JsonFileStore,
};
#[cfg(feature = "postgres")]
use crate::PostgresDatabase;

/// Points the Postgres tests at a scratch database. They are skipped when it is unset.
pub const TEST_DATABASE_URL_VAR: &str = "SHOP_TEST_DATABASE_URL";

pub fn prepare_test_env() {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
}

/// A JSON store in a fresh temporary directory. Keep the `TempDir` alive for as long as the store is used.
pub async fn temp_json_store() -> (TempDir, JsonFileStore) {
    let dir = tempfile::tempdir().expect("Error creating temporary directory");
    let store = JsonFileStore::new(dir.path()).await.expect("Error creating JSON store");
    info!("🚀️ Test JSON store created in {}", dir.path().display());
    (dir, store)
}

/// A migrated Postgres store at `SHOP_TEST_DATABASE_URL`, or `None` if the variable is not set.
///
/// Tests share the database. Every record they create has a fresh id, so no cleanup is done between runs.
#[cfg(feature = "postgres")]
pub async fn test_postgres_store() -> Option<PostgresDatabase> {
    let url = std::env::var(TEST_DATABASE_URL_VAR).ok().filter(|u| !u.trim().is_empty())?;
    let db = PostgresDatabase::new_with_url(&url, 10).await.expect("Error connecting to the test database");
    db.run_migrations().await.expect("Error running DB migrations");
    info!("🚀️ Test Postgres store ready");
    Some(db)
}

/// Adds an active product with `secrets` card secrets, and a matching stock level.
pub async fn seed_product<B>(db: &B, title: &str, price: i64, secrets: usize) -> Product
where B: ProductManagement + CardSecretManagement {
    let product = NewProduct::new(title, Cents::from(price))
        .with_category("Games", "Accounts")
        .with_stock(i64::try_from(secrets).expect("too many secrets"));
    let product = db.insert_product(product).await.expect("Error inserting product");
    for i in 0..secrets {
        let secret = NewCardSecret::new(product.id.clone(), format!("user{i}"), format!("pass{i}"));
        db.insert_card_secret(secret).await.expect("Error inserting card secret");
    }
    debug!("🚀️ Seeded product {} with {secrets} card secrets", product.id);
    product
}

/// Expands each `check` (an `async fn(AnyStore)`) into a module holding one test per backend. The Postgres test does
/// nothing when `SHOP_TEST_DATABASE_URL` is unset.
#[macro_export]
macro_rules! backend_tests {
    ($($check:ident),+ $(,)?) => {$(
        mod $check {
            #[test]
            fn json_store() {
                $crate::test_utils::prepare_test_env();
                let sys = ::tokio::runtime::Runtime::new().expect("Error creating runtime");
                sys.block_on(async {
                    let (_dir, db) = $crate::test_utils::temp_json_store().await;
                    super::$check($crate::test_utils::AnyStore::from(db)).await;
                });
            }

            #[test]
            fn postgres() {
                $crate::test_utils::prepare_test_env();
                let sys = ::tokio::runtime::Runtime::new().expect("Error creating runtime");
                sys.block_on(async {
                    let Some(db) = $crate::test_utils::test_postgres_store().await else {
                        ::log::warn!("🚀️ {} is not set. Skipping.", $crate::test_utils::TEST_DATABASE_URL_VAR);
                        return;
                    };
                    super::$check($crate::test_utils::AnyStore::from(db)).await;
                });
            }
        }
    )+};
}
