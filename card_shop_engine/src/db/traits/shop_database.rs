use crate::{
    db::{traits::CardSecretManagement, traits::OrderManagement, traits::ProductManagement, StoreError},
    db_types::{FulfillmentResult, FulfillmentTrigger, Order, PaymentStatus},
};

/// The full backend contract. The HTTP server is generic over this trait and is instantiated once, with whichever
/// backend was selected at startup.
#[allow(async_fn_in_trait)]
pub trait ShopDatabase: ProductManagement + CardSecretManagement + OrderManagement + Clone {
    /// A short human-readable backend name, e.g. `json-file` or `postgres`.
    fn backend_name(&self) -> &'static str;

    async fn health_check(&self) -> Result<(), StoreError>;

    /// Stores the gateway's order id against a pending order. Returns the updated order, or `None` if the order does
    /// not exist or is no longer pending.
    async fn record_gateway_order(&self, order_id: &str, gateway_order_id: &str)
        -> Result<Option<Order>, StoreError>;

    /// Conditional status transition: the order moves to `to` only if its current status is `from`. Returns the
    /// updated order, or `None` when the order is missing, was not in `from`, or has a recorded payment.
    ///
    /// Not for `paid`. Use [`Self::fulfill_order`].
    async fn set_order_status(
        &self,
        order_id: &str,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> Result<Option<Order>, StoreError>;

    /// Atomically moves a pending order to `paid` and allocates exactly one available card secret to it.
    ///
    /// In a single transaction this:
    /// 1. checks that the order is `pending`. With [`FulfillmentTrigger::PaymentConfirmed`] the payment time is
    ///    recorded here and kept even when step 2 finds nothing. With [`FulfillmentTrigger::Retry`] an order without a
    ///    recorded payment stops with [`FulfillmentResult::AwaitingPayment`],
    /// 2. claims the oldest `available` secret for the order's product,
    /// 3. marks the secret `sold` and links it to the order,
    /// 4. marks the order `paid` and embeds a snapshot of the secret,
    /// 5. decrements the product's stock (never below zero) and increments its sold count.
    ///
    /// Calling it again for an order that is already paid returns [`FulfillmentResult::AlreadyFulfilled`] and
    /// touches nothing, which makes duplicate gateway notifications harmless.
    async fn fulfill_order(
        &self,
        order_id: &str,
        trigger: FulfillmentTrigger,
    ) -> Result<FulfillmentResult, StoreError>;
}
