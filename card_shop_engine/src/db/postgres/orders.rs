use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, PgConnection};

use crate::{
    db::StoreError,
    db_types::{Cents, DeliveredCardSecret, Order, PaymentMethod, PaymentStatus},
};

const ORDER_COLUMNS: &str = "id, order_number, product_id, product_title, quantity, unit_price, total_amount, \
                             currency, contact_info, payment_method, payment_status, payment_transaction_id, \
                             paid_at, card_secret_delivered_at, expires_at, card_secret, created_at, updated_at";

#[derive(Debug, FromRow)]
pub(crate) struct OrderRow {
    id: String,
    order_number: String,
    product_id: String,
    product_title: String,
    quantity: i64,
    unit_price: i64,
    total_amount: i64,
    currency: String,
    contact_info: String,
    payment_method: Option<String>,
    payment_status: String,
    payment_transaction_id: Option<String>,
    paid_at: Option<DateTime<Utc>>,
    card_secret_delivered_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
    card_secret: Option<Json<DeliveredCardSecret>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let data_err = |e: crate::db_types::ConversionError| StoreError::DataError(e.to_string());
        let payment_method = row.payment_method.map(|m| m.parse::<PaymentMethod>()).transpose().map_err(data_err)?;
        let payment_status = row.payment_status.parse::<PaymentStatus>().map_err(data_err)?;
        Ok(Order {
            id: row.id,
            order_number: row.order_number,
            product_id: row.product_id,
            product_title: row.product_title,
            quantity: row.quantity,
            unit_price: Cents::from(row.unit_price),
            total_amount: Cents::from(row.total_amount),
            currency: row.currency,
            contact_info: row.contact_info,
            payment_method,
            payment_status,
            payment_transaction_id: row.payment_transaction_id,
            paid_at: row.paid_at,
            card_secret_delivered_at: row.card_secret_delivered_at,
            expires_at: row.expires_at,
            card_secret: row.card_secret.map(|j| j.0),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn convert(rows: Vec<OrderRow>) -> Result<Vec<Order>, StoreError> {
    rows.into_iter().map(Order::try_from).collect()
}

pub async fn fetch_orders(conn: &mut PgConnection) -> Result<Vec<Order>, StoreError> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC");
    let rows = sqlx::query_as::<_, OrderRow>(&sql).fetch_all(conn).await?;
    convert(rows)
}

pub async fn fetch_order(id: &str, conn: &mut PgConnection) -> Result<Option<Order>, StoreError> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
    let row = sqlx::query_as::<_, OrderRow>(&sql).bind(id).fetch_optional(conn).await?;
    row.map(Order::try_from).transpose()
}

/// Same as [`fetch_order`], but takes a row lock that is held until the surrounding transaction ends.
pub async fn fetch_order_for_update(id: &str, conn: &mut PgConnection) -> Result<Option<Order>, StoreError> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE");
    let row = sqlx::query_as::<_, OrderRow>(&sql).bind(id).fetch_optional(conn).await?;
    row.map(Order::try_from).transpose()
}

pub async fn fetch_order_by_number(order_number: &str, conn: &mut PgConnection) -> Result<Option<Order>, StoreError> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_number = $1");
    let row = sqlx::query_as::<_, OrderRow>(&sql).bind(order_number).fetch_optional(conn).await?;
    row.map(Order::try_from).transpose()
}

pub async fn fetch_orders_by_contact(contact_info: &str, conn: &mut PgConnection) -> Result<Vec<Order>, StoreError> {
    let sql = format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE lower(trim(contact_info)) = lower(trim($1)) ORDER BY created_at DESC"
    );
    let rows = sqlx::query_as::<_, OrderRow>(&sql).bind(contact_info).fetch_all(conn).await?;
    convert(rows)
}

/// Inserts or replaces an order. `created_at` and `total_amount` of an existing row never change.
pub async fn upsert_order(order: &Order, conn: &mut PgConnection) -> Result<Option<Order>, StoreError> {
    let sql = format!(
        r#"
        INSERT INTO orders ({ORDER_COLUMNS})
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
        ON CONFLICT (id) DO UPDATE SET
            order_number = EXCLUDED.order_number,
            product_id = EXCLUDED.product_id,
            product_title = EXCLUDED.product_title,
            quantity = EXCLUDED.quantity,
            unit_price = EXCLUDED.unit_price,
            currency = EXCLUDED.currency,
            contact_info = EXCLUDED.contact_info,
            payment_method = EXCLUDED.payment_method,
            payment_status = EXCLUDED.payment_status,
            payment_transaction_id = EXCLUDED.payment_transaction_id,
            paid_at = EXCLUDED.paid_at,
            card_secret_delivered_at = EXCLUDED.card_secret_delivered_at,
            expires_at = EXCLUDED.expires_at,
            card_secret = EXCLUDED.card_secret,
            updated_at = EXCLUDED.updated_at
        WHERE orders.total_amount = EXCLUDED.total_amount
        RETURNING {ORDER_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, OrderRow>(&sql)
        .bind(&order.id)
        .bind(&order.order_number)
        .bind(&order.product_id)
        .bind(&order.product_title)
        .bind(order.quantity)
        .bind(order.unit_price.value())
        .bind(order.total_amount.value())
        .bind(&order.currency)
        .bind(&order.contact_info)
        .bind(order.payment_method.map(|m| m.to_string()))
        .bind(order.payment_status.to_string())
        .bind(&order.payment_transaction_id)
        .bind(order.paid_at)
        .bind(order.card_secret_delivered_at)
        .bind(order.expires_at)
        .bind(order.card_secret.as_ref().map(Json))
        .bind(order.created_at)
        .bind(order.updated_at)
        .fetch_optional(conn)
        .await?;
    row.map(Order::try_from).transpose()
}

pub async fn set_gateway_order_id(
    id: &str,
    gateway_order_id: &str,
    conn: &mut PgConnection,
) -> Result<Option<Order>, StoreError> {
    let sql = format!(
        "UPDATE orders SET payment_transaction_id = $2, updated_at = now() WHERE id = $1 AND payment_status = \
         'pending' RETURNING {ORDER_COLUMNS}"
    );
    let row = sqlx::query_as::<_, OrderRow>(&sql).bind(id).bind(gateway_order_id).fetch_optional(conn).await?;
    row.map(Order::try_from).transpose()
}

/// Conditional transition. Nothing changes unless the current status is `from` and no payment has been recorded.
pub async fn transition_status(
    id: &str,
    from: PaymentStatus,
    to: PaymentStatus,
    conn: &mut PgConnection,
) -> Result<Option<Order>, StoreError> {
    let sql = format!(
        "UPDATE orders SET payment_status = $3, updated_at = now() WHERE id = $1 AND payment_status = $2 AND paid_at \
         IS NULL RETURNING {ORDER_COLUMNS}"
    );
    let row = sqlx::query_as::<_, OrderRow>(&sql)
        .bind(id)
        .bind(from.to_string())
        .bind(to.to_string())
        .fetch_optional(conn)
        .await?;
    row.map(Order::try_from).transpose()
}

/// The `pending → paid` step of fulfillment. Returns `None` if the order was not pending.
pub async fn mark_paid(
    id: &str,
    snapshot: &DeliveredCardSecret,
    now: DateTime<Utc>,
    conn: &mut PgConnection,
) -> Result<Option<Order>, StoreError> {
    let sql = format!(
        "UPDATE orders SET payment_status = 'paid', paid_at = COALESCE(paid_at, $3), card_secret = $2, \
         card_secret_delivered_at = $3, updated_at = $3 WHERE id = $1 AND payment_status = 'pending' RETURNING \
         {ORDER_COLUMNS}"
    );
    let row = sqlx::query_as::<_, OrderRow>(&sql).bind(id).bind(Json(snapshot)).bind(now).fetch_optional(conn).await?;
    row.map(Order::try_from).transpose()
}

/// Records the payment time on a pending order. An earlier receipt is never overwritten.
pub async fn record_payment(
    id: &str,
    now: DateTime<Utc>,
    conn: &mut PgConnection,
) -> Result<Option<Order>, StoreError> {
    let sql = format!(
        "UPDATE orders SET paid_at = COALESCE(paid_at, $2), updated_at = $2 WHERE id = $1 AND payment_status = \
         'pending' RETURNING {ORDER_COLUMNS}"
    );
    let row = sqlx::query_as::<_, OrderRow>(&sql).bind(id).bind(now).fetch_optional(conn).await?;
    row.map(Order::try_from).transpose()
}
