//! Postgres backend.
//!
//! Queries live in one module per table as free functions over a `PgConnection`, so that they can be composed inside
//! a transaction by passing `&mut tx`. [`PostgresDatabase`] implements the store traits on top of them.
pub mod db;

pub mod card_secrets;
pub mod orders;
pub mod products;

pub use db::PostgresDatabase;
use log::info;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::db::StoreError;

pub async fn new_pool(url: &str, max_connections: u32) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new().max_connections(max_connections).connect(url).await?;
    info!("🗃️ Connected to Postgres");
    Ok(pool)
}
