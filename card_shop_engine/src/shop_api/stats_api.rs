use std::fmt::Debug;

use chrono::{DateTime, Utc};

use crate::{
    db::{common::dashboard_stats, traits::ShopDatabase, StoreError},
    db_types::{DashboardStats, EmailStats, Order},
};

/// Read-only statistics for the admin dashboard. Everything is recomputed from the live order set.
pub struct StatsApi<B> {
    db: B,
}

impl<B> Debug for StatsApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StatsApi")
    }
}

impl<B> StatsApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> StatsApi<B>
where B: ShopDatabase
{
    pub async fn email_stats(&self) -> Result<EmailStats, StoreError> {
        self.db.email_stats().await
    }

    pub async fn dashboard_stats(&self, now: DateTime<Utc>) -> Result<DashboardStats, StoreError> {
        let orders = self.db.fetch_orders().await?;
        Ok(dashboard_stats(&orders, now))
    }

    /// All orders, newest first, for the admin order list.
    pub async fn orders(&self) -> Result<Vec<Order>, StoreError> {
        self.db.fetch_orders().await
    }

    pub fn backend_name(&self) -> &'static str {
        self.db.backend_name()
    }

    pub async fn health_check(&self) -> Result<(), StoreError> {
        self.db.health_check().await
    }
}
