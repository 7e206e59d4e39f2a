use chrono::Utc;
use log::*;

use super::{JsonFileStore, CARD_SECRETS_FILE, ORDERS_FILE, PRODUCTS_FILE};
use crate::{
    db::{
        common::newest_first,
        traits::{CardSecretManagement, OrderManagement, ProductManagement, ShopDatabase},
        StoreError,
    },
    db_types::*,
};

impl ProductManagement for JsonFileStore {
    async fn fetch_products(&self) -> Result<Vec<Product>, StoreError> {
        let _guard = self.lock().await;
        let mut products = self.read_collection::<Product>(PRODUCTS_FILE).await?;
        newest_first(&mut products, |p| p.created_at);
        Ok(products)
    }

    async fn fetch_product(&self, id: &str) -> Result<Option<Product>, StoreError> {
        let _guard = self.lock().await;
        let products = self.read_collection::<Product>(PRODUCTS_FILE).await?;
        Ok(products.into_iter().find(|p| p.id == id))
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product, StoreError> {
        let _guard = self.lock().await;
        let mut products = self.read_collection::<Product>(PRODUCTS_FILE).await?;
        let product = product.into_product(new_record_id(), Utc::now());
        products.push(product.clone());
        self.write_collection(PRODUCTS_FILE, &products).await?;
        debug!("🗃️ Product {} ({}) created", product.id, product.title);
        Ok(product)
    }

    async fn upsert_product(&self, mut product: Product) -> Result<Product, StoreError> {
        if product.stock < 0 || product.sold_count < 0 {
            return Err(StoreError::InvalidRecord(format!("Product {} has negative stock or sold count", product.id)));
        }
        let _guard = self.lock().await;
        let mut products = self.read_collection::<Product>(PRODUCTS_FILE).await?;
        product.updated_at = Utc::now();
        match products.iter_mut().find(|p| p.id == product.id) {
            Some(existing) => {
                if existing.sold_count > product.sold_count {
                    return Err(StoreError::InvalidRecord(format!(
                        "Product {} would lower its sold count from {} to {}",
                        product.id, existing.sold_count, product.sold_count
                    )));
                }
                product.created_at = existing.created_at;
                *existing = product.clone();
            },
            None => products.push(product.clone()),
        }
        self.write_collection(PRODUCTS_FILE, &products).await?;
        debug!("🗃️ Product {} saved", product.id);
        Ok(product)
    }

    async fn delete_product(&self, id: &str) -> Result<Option<ProductDeletion>, StoreError> {
        let _guard = self.lock().await;
        let mut products = self.read_collection::<Product>(PRODUCTS_FILE).await?;
        let Some(pos) = products.iter().position(|p| p.id == id) else {
            return Ok(None);
        };
        let orders = self.read_collection::<Order>(ORDERS_FILE).await?;
        let result = if orders.iter().any(|o| o.product_id == id) {
            let product = &mut products[pos];
            product.status = ProductStatus::Inactive;
            product.updated_at = Utc::now();
            info!("🗃️ Product {id} is referenced by orders. It has been deactivated instead of deleted.");
            ProductDeletion::Deactivated
        } else {
            products.remove(pos);
            let mut secrets = self.read_collection::<CardSecret>(CARD_SECRETS_FILE).await?;
            let before = secrets.len();
            secrets.retain(|s| s.product_id != id);
            if secrets.len() != before {
                self.write_collection(CARD_SECRETS_FILE, &secrets).await?;
            }
            info!("🗃️ Product {id} deleted with {} card secrets", before - secrets.len());
            ProductDeletion::Deleted
        };
        self.write_collection(PRODUCTS_FILE, &products).await?;
        Ok(Some(result))
    }

    async fn update_product_stock(&self, id: &str, stock: i64) -> Result<Option<Product>, StoreError> {
        if stock < 0 {
            return Err(StoreError::InvalidRecord(format!("Stock cannot be negative ({stock})")));
        }
        self.modify_product(id, |p| p.stock = stock).await
    }

    async fn update_product_fields(&self, id: &str, update: ProductUpdate) -> Result<Option<Product>, StoreError> {
        self.modify_product(id, |p| update.apply(p)).await
    }

    async fn adjust_product_stock(&self, id: &str, delta: i64) -> Result<Option<Product>, StoreError> {
        self.modify_product(id, |p| p.stock = (p.stock + delta).max(0)).await
    }
}

impl JsonFileStore {
    async fn modify_product<F: FnOnce(&mut Product)>(&self, id: &str, f: F) -> Result<Option<Product>, StoreError> {
        let _guard = self.lock().await;
        let mut products = self.read_collection::<Product>(PRODUCTS_FILE).await?;
        let Some(product) = products.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        f(product);
        product.updated_at = Utc::now();
        let updated = product.clone();
        self.write_collection(PRODUCTS_FILE, &products).await?;
        Ok(Some(updated))
    }

    async fn modify_pending_order<F: FnOnce(&mut Order)>(&self, id: &str, f: F) -> Result<Option<Order>, StoreError> {
        let _guard = self.lock().await;
        let mut orders = self.read_collection::<Order>(ORDERS_FILE).await?;
        let Some(order) = orders.iter_mut().find(|o| o.id == id && o.is_pending()) else {
            return Ok(None);
        };
        f(order);
        order.updated_at = Utc::now();
        let updated = order.clone();
        self.write_collection(ORDERS_FILE, &orders).await?;
        Ok(Some(updated))
    }
}

impl CardSecretManagement for JsonFileStore {
    async fn fetch_card_secrets(&self) -> Result<Vec<CardSecret>, StoreError> {
        let _guard = self.lock().await;
        let mut secrets = self.read_collection::<CardSecret>(CARD_SECRETS_FILE).await?;
        newest_first(&mut secrets, |s| s.created_at);
        Ok(secrets)
    }

    async fn fetch_card_secret(&self, id: &str) -> Result<Option<CardSecret>, StoreError> {
        let _guard = self.lock().await;
        let secrets = self.read_collection::<CardSecret>(CARD_SECRETS_FILE).await?;
        Ok(secrets.into_iter().find(|s| s.id == id))
    }

    async fn fetch_card_secrets_for_product(
        &self,
        product_id: &str,
        status: Option<CardSecretStatus>,
    ) -> Result<Vec<CardSecret>, StoreError> {
        let _guard = self.lock().await;
        let mut secrets = self
            .read_collection::<CardSecret>(CARD_SECRETS_FILE)
            .await?
            .into_iter()
            .filter(|s| s.product_id == product_id && status.map_or(true, |st| s.status == st))
            .collect::<Vec<_>>();
        newest_first(&mut secrets, |s| s.created_at);
        Ok(secrets)
    }

    async fn insert_card_secret(&self, secret: NewCardSecret) -> Result<CardSecret, StoreError> {
        let _guard = self.lock().await;
        let mut secrets = self.read_collection::<CardSecret>(CARD_SECRETS_FILE).await?;
        let secret = secret.into_card_secret(new_record_id(), Utc::now());
        secrets.push(secret.clone());
        self.write_collection(CARD_SECRETS_FILE, &secrets).await?;
        trace!("🗃️ Card secret {} added to product {}", secret.id, secret.product_id);
        Ok(secret)
    }

    async fn upsert_card_secret(&self, mut secret: CardSecret) -> Result<CardSecret, StoreError> {
        let _guard = self.lock().await;
        let mut secrets = self.read_collection::<CardSecret>(CARD_SECRETS_FILE).await?;
        secret.updated_at = Utc::now();
        match secrets.iter_mut().find(|s| s.id == secret.id) {
            Some(existing) => {
                if existing.order_id.is_some() && existing.order_id != secret.order_id {
                    return Err(StoreError::InvalidRecord(format!(
                        "Card secret {} is already assigned to order {:?}",
                        secret.id, existing.order_id
                    )));
                }
                secret.created_at = existing.created_at;
                *existing = secret.clone();
            },
            None => secrets.push(secret.clone()),
        }
        self.write_collection(CARD_SECRETS_FILE, &secrets).await?;
        Ok(secret)
    }

    async fn delete_card_secret(&self, id: &str) -> Result<bool, StoreError> {
        let _guard = self.lock().await;
        let mut secrets = self.read_collection::<CardSecret>(CARD_SECRETS_FILE).await?;
        let Some(pos) = secrets.iter().position(|s| s.id == id) else {
            return Ok(false);
        };
        if !secrets[pos].is_available() {
            return Err(StoreError::CardSecretSold(id.to_string()));
        }
        secrets.remove(pos);
        self.write_collection(CARD_SECRETS_FILE, &secrets).await?;
        debug!("🗃️ Card secret {id} deleted");
        Ok(true)
    }
}

impl OrderManagement for JsonFileStore {
    async fn fetch_orders(&self) -> Result<Vec<Order>, StoreError> {
        let _guard = self.lock().await;
        let mut orders = self.read_collection::<Order>(ORDERS_FILE).await?;
        newest_first(&mut orders, |o| o.created_at);
        Ok(orders)
    }

    async fn fetch_order(&self, id: &str) -> Result<Option<Order>, StoreError> {
        let _guard = self.lock().await;
        let orders = self.read_collection::<Order>(ORDERS_FILE).await?;
        Ok(orders.into_iter().find(|o| o.id == id))
    }

    async fn fetch_order_by_number(&self, order_number: &str) -> Result<Option<Order>, StoreError> {
        let _guard = self.lock().await;
        let orders = self.read_collection::<Order>(ORDERS_FILE).await?;
        Ok(orders.into_iter().find(|o| o.order_number == order_number))
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, StoreError> {
        let _guard = self.lock().await;
        let mut orders = self.read_collection::<Order>(ORDERS_FILE).await?;
        if orders.iter().any(|o| o.order_number == order.order_number) {
            return Err(StoreError::Duplicate(format!("Order number {}", order.order_number)));
        }
        let order = order.into_order(new_record_id(), Utc::now());
        orders.push(order.clone());
        self.write_collection(ORDERS_FILE, &orders).await?;
        debug!("🗃️ Order {} ({}) created for {}", order.order_number, order.id, order.total_amount);
        Ok(order)
    }

    async fn upsert_order(&self, mut order: Order) -> Result<Order, StoreError> {
        let _guard = self.lock().await;
        let mut orders = self.read_collection::<Order>(ORDERS_FILE).await?;
        order.updated_at = Utc::now();
        match orders.iter_mut().find(|o| o.id == order.id) {
            Some(existing) => {
                if existing.total_amount != order.total_amount {
                    return Err(StoreError::InvalidRecord(format!("The total of order {} cannot change", order.id)));
                }
                order.created_at = existing.created_at;
                *existing = order.clone();
            },
            None => orders.push(order.clone()),
        }
        self.write_collection(ORDERS_FILE, &orders).await?;
        Ok(order)
    }

    async fn fetch_orders_by_contact_info(&self, contact_info: &str) -> Result<Vec<Order>, StoreError> {
        let _guard = self.lock().await;
        let mut orders = self
            .read_collection::<Order>(ORDERS_FILE)
            .await?
            .into_iter()
            .filter(|o| o.belongs_to(contact_info))
            .collect::<Vec<_>>();
        newest_first(&mut orders, |o| o.created_at);
        Ok(orders)
    }
}

impl ShopDatabase for JsonFileStore {
    fn backend_name(&self) -> &'static str {
        "json-file"
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        let _guard = self.lock().await;
        let _ = self.read_collection::<Product>(PRODUCTS_FILE).await?;
        let _ = self.read_collection::<CardSecret>(CARD_SECRETS_FILE).await?;
        let _ = self.read_collection::<Order>(ORDERS_FILE).await?;
        let marker = self.path_for(".health");
        tokio::fs::write(&marker, b"ok").await?;
        tokio::fs::remove_file(&marker).await?;
        Ok(())
    }

    async fn record_gateway_order(&self, order_id: &str, gateway_order_id: &str) -> Result<Option<Order>, StoreError> {
        self.modify_pending_order(order_id, |o| o.payment_transaction_id = Some(gateway_order_id.to_string())).await
    }

    async fn set_order_status(
        &self,
        order_id: &str,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> Result<Option<Order>, StoreError> {
        if to == PaymentStatus::Paid {
            return Err(StoreError::InvalidRecord("Orders can only be marked paid by fulfillment".into()));
        }
        let _guard = self.lock().await;
        let mut orders = self.read_collection::<Order>(ORDERS_FILE).await?;
        let found = orders.iter_mut().find(|o| o.id == order_id && o.payment_status == from && o.paid_at.is_none());
        let Some(order) = found else {
            return Ok(None);
        };
        order.payment_status = to;
        order.updated_at = Utc::now();
        let updated = order.clone();
        self.write_collection(ORDERS_FILE, &orders).await?;
        debug!("🗃️ Order {order_id} moved from {from} to {to}");
        Ok(Some(updated))
    }

    async fn fulfill_order(
        &self,
        order_id: &str,
        trigger: FulfillmentTrigger,
    ) -> Result<FulfillmentResult, StoreError> {
        let _guard = self.lock().await;
        let mut orders = self.read_collection::<Order>(ORDERS_FILE).await?;
        let Some(order) = orders.iter_mut().find(|o| o.id == order_id) else {
            return Ok(FulfillmentResult::OrderNotFound);
        };
        match order.payment_status {
            PaymentStatus::Paid => return Ok(FulfillmentResult::AlreadyFulfilled(order.clone())),
            PaymentStatus::Failed | PaymentStatus::Cancelled => return Ok(FulfillmentResult::NotPayable(order.clone())),
            PaymentStatus::Pending => {},
        }
        let now = Utc::now();
        match trigger {
            FulfillmentTrigger::PaymentConfirmed if order.paid_at.is_none() => order.paid_at = Some(now),
            FulfillmentTrigger::Retry if order.paid_at.is_none() => {
                return Ok(FulfillmentResult::AwaitingPayment(order.clone()));
            },
            _ => {},
        }
        let mut secrets = self.read_collection::<CardSecret>(CARD_SECRETS_FILE).await?;
        let claimed = secrets
            .iter_mut()
            .filter(|s| s.product_id == order.product_id && s.is_available())
            .min_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        let Some(secret) = claimed else {
            warn!("🗃️ Order {order_id} is paid, but product {} has no card secrets left", order.product_id);
            order.updated_at = now;
            let waiting = order.clone();
            self.write_collection(ORDERS_FILE, &orders).await?;
            return Ok(FulfillmentResult::OutOfStock(waiting));
        };
        if !secret.assign_to(&order.id, now) {
            return Err(StoreError::InvalidRecord(format!("Card secret {} could not be assigned", secret.id)));
        }
        order.payment_status = PaymentStatus::Paid;
        order.card_secret = Some(secret.snapshot());
        order.card_secret_delivered_at = Some(now);
        order.updated_at = now;
        let secret_id = secret.id.clone();
        let fulfilled = order.clone();

        let mut products = self.read_collection::<Product>(PRODUCTS_FILE).await?;
        if let Some(product) = products.iter_mut().find(|p| p.id == fulfilled.product_id) {
            product.stock = (product.stock - fulfilled.quantity).max(0);
            product.sold_count += fulfilled.quantity;
            product.updated_at = now;
        } else {
            warn!("🗃️ Product {} for order {order_id} no longer exists. Counters not updated.", fulfilled.product_id);
        }
        // Secrets are written first. An interrupted write may strand a sold secret, but never hands one out twice.
        self.write_collection(CARD_SECRETS_FILE, &secrets).await?;
        self.write_collection(ORDERS_FILE, &orders).await?;
        self.write_collection(PRODUCTS_FILE, &products).await?;
        info!("🗃️ Order {order_id} paid. Card secret {secret_id} delivered.");
        Ok(FulfillmentResult::Fulfilled(fulfilled))
    }
}
