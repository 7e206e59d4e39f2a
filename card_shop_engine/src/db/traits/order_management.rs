use crate::{
    db::StoreError,
    db_types::{EmailStats, NewOrder, Order},
};

#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// All orders, newest first.
    async fn fetch_orders(&self) -> Result<Vec<Order>, StoreError>;

    async fn fetch_order(&self, id: &str) -> Result<Option<Order>, StoreError>;

    async fn fetch_order_by_number(&self, order_number: &str) -> Result<Option<Order>, StoreError>;

    async fn insert_order(&self, order: NewOrder) -> Result<Order, StoreError>;

    /// Inserts or replaces an order record verbatim, apart from `updated_at`. Status changes in normal operation go
    /// through the guarded transitions on [`crate::ShopDatabase`] instead.
    async fn upsert_order(&self, order: Order) -> Result<Order, StoreError>;

    /// Orders are never deleted. Returns [`StoreError::OrderDeletionForbidden`] for existing orders and `Ok(false)`
    /// for unknown ids.
    async fn delete_order(&self, id: &str) -> Result<bool, StoreError> {
        match self.fetch_order(id).await? {
            Some(_) => Err(StoreError::OrderDeletionForbidden(id.to_string())),
            None => Ok(false),
        }
    }

    /// Orders whose contact info matches `contact_info` (case-insensitive), newest first.
    async fn fetch_orders_by_contact_info(&self, contact_info: &str) -> Result<Vec<Order>, StoreError>;

    /// Aggregates the live order set by contact info.
    async fn email_stats(&self) -> Result<EmailStats, StoreError> {
        let orders = self.fetch_orders().await?;
        Ok(crate::db::common::aggregate_email_stats(orders))
    }
}
