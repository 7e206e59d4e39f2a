use chrono::{DateTime, Utc};
use log::*;
use sqlx::{types::Json, FromRow, PgConnection};

use crate::{
    db::StoreError,
    db_types::{Cents, Product, ProductStatus, ProductUpdate},
};

const PRODUCT_COLUMNS: &str = "id, title, description, category, subcategory, price, currency, stock, sold_count, \
                               quality_guarantee, attributes, status, created_at, updated_at";

#[derive(Debug, FromRow)]
pub(crate) struct ProductRow {
    id: String,
    title: String,
    description: String,
    category: String,
    subcategory: String,
    price: i64,
    currency: String,
    stock: i64,
    sold_count: i64,
    quality_guarantee: String,
    attributes: Json<Vec<String>>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let status = row.status.parse::<ProductStatus>().map_err(|e| StoreError::DataError(e.to_string()))?;
        Ok(Product {
            id: row.id,
            title: row.title,
            description: row.description,
            category: row.category,
            subcategory: row.subcategory,
            price: Cents::from(row.price),
            currency: row.currency,
            stock: row.stock,
            sold_count: row.sold_count,
            quality_guarantee: row.quality_guarantee,
            attributes: row.attributes.0,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn convert(rows: Vec<ProductRow>) -> Result<Vec<Product>, StoreError> {
    rows.into_iter().map(Product::try_from).collect()
}

pub async fn fetch_products(conn: &mut PgConnection) -> Result<Vec<Product>, StoreError> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at DESC");
    let rows = sqlx::query_as::<_, ProductRow>(&sql).fetch_all(conn).await?;
    convert(rows)
}

pub async fn fetch_product(id: &str, conn: &mut PgConnection) -> Result<Option<Product>, StoreError> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
    let row = sqlx::query_as::<_, ProductRow>(&sql).bind(id).fetch_optional(conn).await?;
    row.map(Product::try_from).transpose()
}

/// Inserts the product, or overwrites every mutable column if the id exists. `created_at` of an existing row is
/// never changed, and a row whose `sold_count` is higher than the submitted one is left alone and reported as an
/// invalid record.
pub async fn upsert_product(product: &Product, conn: &mut PgConnection) -> Result<Product, StoreError> {
    let sql = format!(
        r#"
        INSERT INTO products ({PRODUCT_COLUMNS})
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        ON CONFLICT (id) DO UPDATE SET
            title = EXCLUDED.title,
            description = EXCLUDED.description,
            category = EXCLUDED.category,
            subcategory = EXCLUDED.subcategory,
            price = EXCLUDED.price,
            currency = EXCLUDED.currency,
            stock = EXCLUDED.stock,
            sold_count = EXCLUDED.sold_count,
            quality_guarantee = EXCLUDED.quality_guarantee,
            attributes = EXCLUDED.attributes,
            status = EXCLUDED.status,
            updated_at = EXCLUDED.updated_at
        WHERE products.sold_count <= EXCLUDED.sold_count
        RETURNING {PRODUCT_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, ProductRow>(&sql)
        .bind(&product.id)
        .bind(&product.title)
        .bind(&product.description)
        .bind(&product.category)
        .bind(&product.subcategory)
        .bind(product.price.value())
        .bind(&product.currency)
        .bind(product.stock)
        .bind(product.sold_count)
        .bind(&product.quality_guarantee)
        .bind(Json(&product.attributes))
        .bind(product.status.to_string())
        .bind(product.created_at)
        .bind(product.updated_at)
        .fetch_optional(conn)
        .await?;
    let row = row.ok_or_else(|| {
        StoreError::InvalidRecord(format!("Product {} would lower its stored sold count", product.id))
    })?;
    trace!("🗃️ Product {} upserted", product.id);
    Product::try_from(row)
}

pub async fn is_product_referenced(id: &str, conn: &mut PgConnection) -> Result<bool, StoreError> {
    let (referenced,): (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM orders WHERE product_id = $1)")
        .bind(id)
        .fetch_one(conn)
        .await?;
    Ok(referenced)
}

pub async fn delete_product(id: &str, conn: &mut PgConnection) -> Result<bool, StoreError> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1").bind(id).execute(conn).await?;
    Ok(result.rows_affected() > 0)
}

pub async fn set_product_status(
    id: &str,
    status: ProductStatus,
    conn: &mut PgConnection,
) -> Result<Option<Product>, StoreError> {
    let sql = format!("UPDATE products SET status = $2, updated_at = now() WHERE id = $1 RETURNING {PRODUCT_COLUMNS}");
    let row =
        sqlx::query_as::<_, ProductRow>(&sql).bind(id).bind(status.to_string()).fetch_optional(conn).await?;
    row.map(Product::try_from).transpose()
}

/// Applies the fields present in `update` in a single statement. `sold_count` is not touched.
pub async fn update_product_fields(
    id: &str,
    update: ProductUpdate,
    conn: &mut PgConnection,
) -> Result<Option<Product>, StoreError> {
    let sql = format!(
        r#"
        UPDATE products SET
            title = COALESCE($2, title),
            description = COALESCE($3, description),
            category = COALESCE($4, category),
            subcategory = COALESCE($5, subcategory),
            price = COALESCE($6, price),
            currency = COALESCE($7, currency),
            stock = COALESCE($8, stock),
            quality_guarantee = COALESCE($9, quality_guarantee),
            attributes = COALESCE($10, attributes),
            status = COALESCE($11, status),
            updated_at = now()
        WHERE id = $1
        RETURNING {PRODUCT_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, ProductRow>(&sql)
        .bind(id)
        .bind(update.title)
        .bind(update.description)
        .bind(update.category)
        .bind(update.subcategory)
        .bind(update.price.map(|p| p.value()))
        .bind(update.currency)
        .bind(update.stock)
        .bind(update.quality_guarantee)
        .bind(update.attributes.map(Json))
        .bind(update.status.map(|s| s.to_string()))
        .fetch_optional(conn)
        .await?;
    row.map(Product::try_from).transpose()
}

/// Moves stock by `delta`, flooring at zero.
pub async fn adjust_product_stock(
    id: &str,
    delta: i64,
    conn: &mut PgConnection,
) -> Result<Option<Product>, StoreError> {
    let sql = format!(
        "UPDATE products SET stock = GREATEST(stock + $2, 0), updated_at = now() WHERE id = $1 RETURNING \
         {PRODUCT_COLUMNS}"
    );
    let row = sqlx::query_as::<_, ProductRow>(&sql).bind(id).bind(delta).fetch_optional(conn).await?;
    row.map(Product::try_from).transpose()
}

pub async fn set_product_stock(id: &str, stock: i64, conn: &mut PgConnection) -> Result<Option<Product>, StoreError> {
    let sql = format!("UPDATE products SET stock = $2, updated_at = now() WHERE id = $1 RETURNING {PRODUCT_COLUMNS}");
    let row = sqlx::query_as::<_, ProductRow>(&sql).bind(id).bind(stock).fetch_optional(conn).await?;
    row.map(Product::try_from).transpose()
}

/// Adds `quantity` to the sold count and removes it from stock, flooring stock at zero.
pub async fn record_sale(id: &str, quantity: i64, conn: &mut PgConnection) -> Result<Option<Product>, StoreError> {
    let sql = format!(
        "UPDATE products SET stock = GREATEST(stock - $2, 0), sold_count = sold_count + $2, updated_at = now() WHERE \
         id = $1 RETURNING {PRODUCT_COLUMNS}"
    );
    let row = sqlx::query_as::<_, ProductRow>(&sql).bind(id).bind(quantity).fetch_optional(conn).await?;
    row.map(Product::try_from).transpose()
}
