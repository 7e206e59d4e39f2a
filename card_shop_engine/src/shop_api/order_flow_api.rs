use std::fmt::Debug;

use chrono::{DateTime, Duration, Utc};
use log::*;

use crate::{
    db::{traits::ShopDatabase, StoreError},
    db_types::{
        CardSecretStatus,
        DeliveredCardSecret,
        FulfillmentResult,
        FulfillmentTrigger,
        NewOrder,
        Order,
        PaymentStatus,
        ProductStatus,
    },
    helpers::{is_valid_contact_info, new_order_number},
    shop_api::{
        errors::OrderFlowError,
        order_objects::{CheckoutRequest, PaymentConfirmation},
    },
};

pub const DEFAULT_ORDER_TTL_MINUTES: i64 = 30;
/// Attempts at finding an unused order number before checkout gives up.
pub const ORDER_NUMBER_ATTEMPTS: usize = 3;

/// `OrderFlowApi` runs the life of an order: checkout, hand-off to the payment gateway, and the payment confirmation
/// that delivers a card secret.
pub struct OrderFlowApi<B> {
    db: B,
    order_ttl: Duration,
    order_numbers: fn(DateTime<Utc>) -> String,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B) -> Self {
        Self { db, order_ttl: Duration::minutes(DEFAULT_ORDER_TTL_MINUTES), order_numbers: new_order_number }
    }

    pub fn with_order_ttl(mut self, ttl: Duration) -> Self {
        self.order_ttl = ttl;
        self
    }

    /// Replaces the order number generator.
    pub fn with_order_numbers(mut self, generator: fn(DateTime<Utc>) -> String) -> Self {
        self.order_numbers = generator;
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> OrderFlowApi<B>
where B: ShopDatabase
{
    /// Creates a `pending` order for a single item of an active, in-stock product.
    ///
    /// The unit price and product title are copied from the stored product at this moment.
    pub async fn checkout(&self, request: CheckoutRequest) -> Result<Order, OrderFlowError> {
        if request.quantity != 1 {
            return Err(OrderFlowError::InvalidQuantity(request.quantity));
        }
        if !is_valid_contact_info(&request.contact_info) {
            return Err(OrderFlowError::InvalidContactInfo);
        }
        let product = self
            .db
            .fetch_product(&request.product_id)
            .await?
            .ok_or_else(|| OrderFlowError::ProductNotFound(request.product_id.clone()))?;
        if product.status != ProductStatus::Active {
            return Err(OrderFlowError::ProductUnavailable(product.id));
        }
        let available =
            self.db.fetch_card_secrets_for_product(&product.id, Some(CardSecretStatus::Available)).await?;
        if product.stock <= 0 || available.is_empty() {
            debug!(
                "🔄️📦️ Checkout refused. Product {} has stock {} and {} card secrets",
                product.id,
                product.stock,
                available.len()
            );
            return Err(OrderFlowError::OutOfStock(product.id));
        }
        let now = Utc::now();
        let mut order = NewOrder {
            order_number: (self.order_numbers)(now),
            product_id: product.id.clone(),
            product_title: product.title.clone(),
            quantity: request.quantity,
            unit_price: product.price,
            currency: product.currency.clone(),
            contact_info: request.contact_info.trim().to_string(),
            payment_method: Some(request.payment_method),
            expires_at: Some(now + self.order_ttl),
        };
        let mut attempt = 1;
        let order = loop {
            match self.db.insert_order(order.clone()).await {
                Err(StoreError::Duplicate(e)) if attempt < ORDER_NUMBER_ATTEMPTS => {
                    debug!("🔄️📦️ Order number {} is taken ({e}). Trying another.", order.order_number);
                    order.order_number = (self.order_numbers)(Utc::now());
                    attempt += 1;
                },
                result => break result?,
            }
        };
        info!(
            "🔄️📦️ Order {} ({}) created for {} at {}",
            order.order_number, order.id, order.product_title, order.total_amount
        );
        Ok(order)
    }

    /// Links the gateway's order id to a pending order.
    pub async fn record_gateway_order(&self, order_id: &str, gateway_order_id: &str) -> Result<Order, OrderFlowError> {
        match self.db.record_gateway_order(order_id, gateway_order_id).await? {
            Some(order) => {
                debug!("🔄️📦️ Order {order_id} is gateway order {gateway_order_id}");
                Ok(order)
            },
            None => Err(self.missing_or_invalid(order_id).await),
        }
    }

    /// Marks a pending order as failed, e.g. because the gateway would not accept it. Orders that already left the
    /// pending state are returned unchanged.
    pub async fn mark_failed(&self, order_id: &str) -> Result<Order, OrderFlowError> {
        self.transition(order_id, PaymentStatus::Pending, PaymentStatus::Failed).await
    }

    /// Cancels a pending order. Paid orders, including those paid while out of stock, cannot be cancelled.
    pub async fn cancel_order(&self, order_id: &str) -> Result<Order, OrderFlowError> {
        let order = self.fetch_order(order_id).await?;
        if order.payment_status != PaymentStatus::Pending || order.is_payment_received() {
            return Err(OrderFlowError::InvalidOrderState(order_id.to_string()));
        }
        let order = self.transition(order_id, PaymentStatus::Pending, PaymentStatus::Cancelled).await?;
        if order.payment_status == PaymentStatus::Cancelled {
            Ok(order)
        } else {
            Err(OrderFlowError::InvalidOrderState(order_id.to_string()))
        }
    }

    async fn transition(&self, order_id: &str, from: PaymentStatus, to: PaymentStatus) -> Result<Order, OrderFlowError> {
        match self.db.set_order_status(order_id, from, to).await? {
            Some(order) => {
                info!("🔄️📦️ Order {order_id} is now {to}");
                Ok(order)
            },
            None => {
                let order = self.fetch_order(order_id).await?;
                debug!("🔄️📦️ Order {order_id} is {}, not {from}. Left unchanged.", order.payment_status);
                Ok(order)
            },
        }
    }

    /// Applies an authenticated payment notification.
    ///
    /// This is idempotent: a repeated confirmation for an order that is already paid returns
    /// [`FulfillmentResult::AlreadyFulfilled`] and delivers nothing new.
    pub async fn confirm_payment(&self, payment: PaymentConfirmation) -> Result<FulfillmentResult, OrderFlowError> {
        let order = self.fetch_order(&payment.order_id).await?;
        if order.product_id != payment.product_id {
            warn!(
                "🔄️💰️ Payment for order {} names product {}, but the order is for {}",
                order.id, payment.product_id, order.product_id
            );
            return Err(OrderFlowError::PaymentMismatch(order.id));
        }
        if let Some(paid) = payment.amount_paid {
            if paid != order.total_amount {
                info!("🔄️💰️ Order {} was paid {paid}, order total is {}", order.id, order.total_amount);
            }
        }
        self.run_fulfillment(&order.id, FulfillmentTrigger::PaymentConfirmed).await
    }

    /// Retries the card-secret allocator for an order that was paid while the product was out of stock. Orders with
    /// no confirmed payment are left alone and reported as [`FulfillmentResult::AwaitingPayment`].
    pub async fn fulfill(&self, order_id: &str) -> Result<FulfillmentResult, OrderFlowError> {
        self.run_fulfillment(order_id, FulfillmentTrigger::Retry).await
    }

    async fn run_fulfillment(
        &self,
        order_id: &str,
        trigger: FulfillmentTrigger,
    ) -> Result<FulfillmentResult, OrderFlowError> {
        let result = self.db.fulfill_order(order_id, trigger).await?;
        match &result {
            FulfillmentResult::Fulfilled(o) => info!("🔄️💰️ Order {} fulfilled", o.order_number),
            FulfillmentResult::AlreadyFulfilled(o) => debug!("🔄️💰️ Order {} was already fulfilled", o.order_number),
            FulfillmentResult::NotPayable(o) => {
                warn!("🔄️💰️ Payment received for order {}, which is {}", o.order_number, o.payment_status)
            },
            FulfillmentResult::OutOfStock(o) => {
                warn!("🔄️💰️ Order {} is paid but could not be fulfilled. Inventory is empty.", o.order_number)
            },
            FulfillmentResult::AwaitingPayment(o) => {
                info!("🔄️💰️ Order {} has no confirmed payment. Not fulfilled.", o.order_number)
            },
            FulfillmentResult::OrderNotFound => warn!("🔄️💰️ Cannot fulfill unknown order {order_id}"),
        }
        Ok(result)
    }

    /// The customer's orders, without delivered card secrets.
    pub async fn orders_for_contact(&self, contact_info: &str) -> Result<Vec<Order>, OrderFlowError> {
        let orders = self.db.fetch_orders_by_contact_info(contact_info).await?;
        Ok(orders.iter().map(Order::without_secret).collect())
    }

    /// The delivered card secret of a paid order. The caller must prove ownership with the order's contact info;
    /// a mismatch is reported exactly like an unknown order.
    pub async fn card_secret_for_order(
        &self,
        order_id: &str,
        contact_info: &str,
    ) -> Result<Option<DeliveredCardSecret>, OrderFlowError> {
        let order = self.fetch_order(order_id).await?;
        if !order.belongs_to(contact_info) {
            return Err(OrderFlowError::OrderNotFound(order_id.to_string()));
        }
        Ok(if order.is_paid() { order.card_secret } else { None })
    }

    pub async fn order_by_number(&self, order_number: &str) -> Result<Option<Order>, OrderFlowError> {
        Ok(self.db.fetch_order_by_number(order_number).await?)
    }

    pub async fn fetch_order(&self, order_id: &str) -> Result<Order, OrderFlowError> {
        self.db.fetch_order(order_id).await?.ok_or_else(|| OrderFlowError::OrderNotFound(order_id.to_string()))
    }

    async fn missing_or_invalid(&self, order_id: &str) -> OrderFlowError {
        match self.db.fetch_order(order_id).await {
            Ok(Some(_)) => OrderFlowError::InvalidOrderState(order_id.to_string()),
            Ok(None) => OrderFlowError::OrderNotFound(order_id.to_string()),
            Err(e) => e.into(),
        }
    }
}
