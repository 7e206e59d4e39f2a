use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};

use crate::{
    db::StoreError,
    db_types::{CardSecret, CardSecretStatus},
};

const CARD_SECRET_COLUMNS: &str = "id, product_id, account, password, additional_info, quality_guarantee, status, \
                                   sold_at, order_id, created_at, updated_at";

#[derive(Debug, FromRow)]
pub(crate) struct CardSecretRow {
    id: String,
    product_id: String,
    account: String,
    password: String,
    additional_info: Option<String>,
    quality_guarantee: String,
    status: String,
    sold_at: Option<DateTime<Utc>>,
    order_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CardSecretRow> for CardSecret {
    type Error = StoreError;

    fn try_from(row: CardSecretRow) -> Result<Self, Self::Error> {
        let status = row.status.parse::<CardSecretStatus>().map_err(|e| StoreError::DataError(e.to_string()))?;
        Ok(CardSecret {
            id: row.id,
            product_id: row.product_id,
            account: row.account,
            password: row.password,
            additional_info: row.additional_info,
            quality_guarantee: row.quality_guarantee,
            status,
            sold_at: row.sold_at,
            order_id: row.order_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn convert(rows: Vec<CardSecretRow>) -> Result<Vec<CardSecret>, StoreError> {
    rows.into_iter().map(CardSecret::try_from).collect()
}

pub async fn fetch_card_secrets(conn: &mut PgConnection) -> Result<Vec<CardSecret>, StoreError> {
    let sql = format!("SELECT {CARD_SECRET_COLUMNS} FROM card_secrets ORDER BY created_at DESC");
    let rows = sqlx::query_as::<_, CardSecretRow>(&sql).fetch_all(conn).await?;
    convert(rows)
}

pub async fn fetch_card_secret(id: &str, conn: &mut PgConnection) -> Result<Option<CardSecret>, StoreError> {
    let sql = format!("SELECT {CARD_SECRET_COLUMNS} FROM card_secrets WHERE id = $1");
    let row = sqlx::query_as::<_, CardSecretRow>(&sql).bind(id).fetch_optional(conn).await?;
    row.map(CardSecret::try_from).transpose()
}

pub async fn fetch_for_product(
    product_id: &str,
    status: Option<CardSecretStatus>,
    conn: &mut PgConnection,
) -> Result<Vec<CardSecret>, StoreError> {
    let sql = format!(
        "SELECT {CARD_SECRET_COLUMNS} FROM card_secrets WHERE product_id = $1 AND ($2::TEXT IS NULL OR status = $2) \
         ORDER BY created_at DESC"
    );
    let rows = sqlx::query_as::<_, CardSecretRow>(&sql)
        .bind(product_id)
        .bind(status.map(|s| s.to_string()))
        .fetch_all(conn)
        .await?;
    convert(rows)
}

/// Inserts or overwrites a card secret. A secret that is already linked to an order keeps that link: the update
/// only applies when the stored `order_id` is null or equal to the incoming one.
pub async fn upsert_card_secret(secret: &CardSecret, conn: &mut PgConnection) -> Result<Option<CardSecret>, StoreError> {
    let sql = format!(
        r#"
        INSERT INTO card_secrets ({CARD_SECRET_COLUMNS})
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ON CONFLICT (id) DO UPDATE SET
            product_id = EXCLUDED.product_id,
            account = EXCLUDED.account,
            password = EXCLUDED.password,
            additional_info = EXCLUDED.additional_info,
            quality_guarantee = EXCLUDED.quality_guarantee,
            status = EXCLUDED.status,
            sold_at = EXCLUDED.sold_at,
            order_id = EXCLUDED.order_id,
            updated_at = EXCLUDED.updated_at
        WHERE card_secrets.order_id IS NULL OR card_secrets.order_id = EXCLUDED.order_id
        RETURNING {CARD_SECRET_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, CardSecretRow>(&sql)
        .bind(&secret.id)
        .bind(&secret.product_id)
        .bind(&secret.account)
        .bind(&secret.password)
        .bind(&secret.additional_info)
        .bind(&secret.quality_guarantee)
        .bind(secret.status.to_string())
        .bind(secret.sold_at)
        .bind(&secret.order_id)
        .bind(secret.created_at)
        .bind(secret.updated_at)
        .fetch_optional(conn)
        .await?;
    row.map(CardSecret::try_from).transpose()
}

/// Deletes the secret only while it is available. Returns the number of deleted rows.
pub async fn delete_available(id: &str, conn: &mut PgConnection) -> Result<u64, StoreError> {
    let result = sqlx::query("DELETE FROM card_secrets WHERE id = $1 AND status = 'available'")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

/// Locks the oldest available secret for `product_id`. Rows locked by a concurrent allocation are skipped rather than
/// waited on.
pub async fn lock_next_available(product_id: &str, conn: &mut PgConnection) -> Result<Option<CardSecret>, StoreError> {
    let sql = format!(
        "SELECT {CARD_SECRET_COLUMNS} FROM card_secrets WHERE product_id = $1 AND status = 'available' AND order_id IS \
         NULL ORDER BY created_at ASC, id ASC LIMIT 1 FOR UPDATE SKIP LOCKED"
    );
    let row = sqlx::query_as::<_, CardSecretRow>(&sql).bind(product_id).fetch_optional(conn).await?;
    row.map(CardSecret::try_from).transpose()
}

/// The write-once assignment. Only succeeds if the secret is still available.
pub async fn mark_sold(
    id: &str,
    order_id: &str,
    now: DateTime<Utc>,
    conn: &mut PgConnection,
) -> Result<Option<CardSecret>, StoreError> {
    let sql = format!(
        "UPDATE card_secrets SET status = 'sold', order_id = $2, sold_at = $3, updated_at = $3 WHERE id = $1 AND \
         status = 'available' AND order_id IS NULL RETURNING {CARD_SECRET_COLUMNS}"
    );
    let row = sqlx::query_as::<_, CardSecretRow>(&sql).bind(id).bind(order_id).bind(now).fetch_optional(conn).await?;
    row.map(CardSecret::try_from).transpose()
}
