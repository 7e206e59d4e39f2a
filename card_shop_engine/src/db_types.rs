//! Data types shared by every storage backend.
//!
//! The serialized field names follow the on-disk JSON layout (`snake_case`), with the exception of the card-secret
//! snapshot embedded in an order, which has always been stored in `camelCase`.
use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
pub use shop_common::Cents;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid value for {kind}: {value}")]
pub struct ConversionError {
    kind: &'static str,
    value: String,
}

impl ConversionError {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self { kind, value: value.to_string() }
    }
}

/// Implements `Display` and `FromStr` for a unit-only enum using its lowercase wire names.
macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $s:literal),+ $(,)? }) => {
        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => write!(f, $s),)+
                }
            }
        }

        impl FromStr for $name {
            type Err = ConversionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant),)+
                    other => Err(ConversionError::new($kind, other)),
                }
            }
        }
    };
}

pub fn new_record_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

//--------------------------------------    ProductStatus    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    #[default]
    Active,
    Inactive,
    Draft,
}

string_enum!(ProductStatus, "product status", { Active => "active", Inactive => "inactive", Draft => "draft" });

//--------------------------------------       Product       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub subcategory: String,
    pub price: Cents,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub sold_count: i64,
    #[serde(default)]
    pub quality_guarantee: String,
    #[serde(default)]
    pub attributes: Vec<String>,
    #[serde(default)]
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_currency() -> String {
    shop_common::DEFAULT_CURRENCY_CODE.to_string()
}

impl Product {
    pub fn is_purchasable(&self) -> bool {
        self.status == ProductStatus::Active && self.stock > 0
    }
}

/// A partial update of a product. Absent fields are left untouched. The sales counter is not editable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub price: Option<Cents>,
    pub currency: Option<String>,
    pub stock: Option<i64>,
    pub quality_guarantee: Option<String>,
    pub attributes: Option<Vec<String>>,
    pub status: Option<ProductStatus>,
}

impl ProductUpdate {
    pub fn apply(self, product: &mut Product) {
        if let Some(v) = self.title {
            product.title = v;
        }
        if let Some(v) = self.description {
            product.description = v;
        }
        if let Some(v) = self.category {
            product.category = v;
        }
        if let Some(v) = self.subcategory {
            product.subcategory = v;
        }
        if let Some(v) = self.price {
            product.price = v;
        }
        if let Some(v) = self.currency {
            product.currency = v;
        }
        if let Some(v) = self.stock {
            product.stock = v;
        }
        if let Some(v) = self.quality_guarantee {
            product.quality_guarantee = v;
        }
        if let Some(v) = self.attributes {
            product.attributes = v;
        }
        if let Some(v) = self.status {
            product.status = v;
        }
    }
}

/// A product as submitted by an admin. Everything the store assigns (id, counters, timestamps) is absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub subcategory: String,
    pub price: Cents,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub quality_guarantee: String,
    #[serde(default)]
    pub attributes: Vec<String>,
    #[serde(default)]
    pub status: ProductStatus,
}

impl NewProduct {
    pub fn new<S: Into<String>>(title: S, price: Cents) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            category: String::new(),
            subcategory: String::new(),
            price,
            currency: default_currency(),
            stock: 0,
            quality_guarantee: String::new(),
            attributes: vec![],
            status: ProductStatus::Active,
        }
    }

    pub fn with_category<S: Into<String>>(mut self, category: S, subcategory: S) -> Self {
        self.category = category.into();
        self.subcategory = subcategory.into();
        self
    }

    pub fn with_stock(mut self, stock: i64) -> Self {
        self.stock = stock;
        self
    }

    pub fn with_status(mut self, status: ProductStatus) -> Self {
        self.status = status;
        self
    }

    pub fn into_product(self, id: String, now: DateTime<Utc>) -> Product {
        Product {
            id,
            title: self.title,
            description: self.description,
            category: self.category,
            subcategory: self.subcategory,
            price: self.price,
            currency: self.currency,
            stock: self.stock.max(0),
            sold_count: 0,
            quality_guarantee: self.quality_guarantee,
            attributes: self.attributes,
            status: self.status,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Result of asking the store to delete a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductDeletion {
    /// No order ever referenced the product, so it was removed.
    Deleted,
    /// The product is referenced by at least one order. It was marked `inactive` instead.
    Deactivated,
}

//--------------------------------------  CardSecretStatus   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardSecretStatus {
    #[default]
    Available,
    Sold,
}

string_enum!(CardSecretStatus, "card secret status", { Available => "available", Sold => "sold" });

//--------------------------------------     CardSecret      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardSecret {
    pub id: String,
    pub product_id: String,
    pub account: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<String>,
    #[serde(default)]
    pub quality_guarantee: String,
    #[serde(default)]
    pub status: CardSecretStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sold_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CardSecret {
    pub fn is_available(&self) -> bool {
        self.status == CardSecretStatus::Available && self.order_id.is_none()
    }

    /// Assigns this secret to an order. Assignment is write-once: a secret that is already sold is left untouched and
    /// `false` is returned.
    pub fn assign_to(&mut self, order_id: &str, now: DateTime<Utc>) -> bool {
        if !self.is_available() {
            return false;
        }
        self.status = CardSecretStatus::Sold;
        self.order_id = Some(order_id.to_string());
        self.sold_at = Some(now);
        self.updated_at = now;
        true
    }

    pub fn snapshot(&self) -> DeliveredCardSecret {
        DeliveredCardSecret {
            account: self.account.clone(),
            password: self.password.clone(),
            additional_info: self.additional_info.clone(),
            quality_guarantee: self.quality_guarantee.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCardSecret {
    pub product_id: String,
    pub account: String,
    pub password: String,
    #[serde(default)]
    pub additional_info: Option<String>,
    #[serde(default)]
    pub quality_guarantee: String,
}

impl NewCardSecret {
    pub fn new<S: Into<String>>(product_id: S, account: S, password: S) -> Self {
        Self {
            product_id: product_id.into(),
            account: account.into(),
            password: password.into(),
            additional_info: None,
            quality_guarantee: String::new(),
        }
    }

    pub fn into_card_secret(self, id: String, now: DateTime<Utc>) -> CardSecret {
        CardSecret {
            id,
            product_id: self.product_id,
            account: self.account,
            password: self.password,
            additional_info: self.additional_info,
            quality_guarantee: self.quality_guarantee,
            status: CardSecretStatus::Available,
            sold_at: None,
            order_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// The copy of a card secret that is embedded in a paid order, so customers can retrieve it without a join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveredCardSecret {
    pub account: String,
    pub password: String,
    #[serde(default, alias = "additional_info", skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<String>,
    #[serde(default, alias = "quality_guarantee")]
    pub quality_guarantee: String,
}

//--------------------------------------    PaymentStatus    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Cancelled,
}

string_enum!(PaymentStatus, "payment status", {
    Pending => "pending", Paid => "paid", Failed => "failed", Cancelled => "cancelled"
});

//--------------------------------------    PaymentMethod    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Wechat,
    Alipay,
}

string_enum!(PaymentMethod, "payment method", { Wechat => "wechat", Alipay => "alipay" });

//--------------------------------------        Order        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub order_number: String,
    pub product_id: String,
    pub product_title: String,
    pub quantity: i64,
    pub unit_price: Cents,
    pub total_amount: Cents,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub contact_info: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_transaction_id: Option<String>,
    /// When the gateway confirmed the payment. Set even if no card secret could be delivered at the time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_secret_delivered_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_secret: Option<DeliveredCardSecret>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_pending(&self) -> bool {
        self.payment_status == PaymentStatus::Pending
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }

    /// True once a payment has been confirmed, whether or not the order could be fulfilled yet.
    pub fn is_payment_received(&self) -> bool {
        self.paid_at.is_some()
    }

    /// Contact info is compared case-insensitively and ignoring surrounding whitespace.
    pub fn belongs_to(&self, contact_info: &str) -> bool {
        normalize_contact(&self.contact_info) == normalize_contact(contact_info)
    }

    /// A copy of the order with the delivered secret stripped, for listings that must not leak it.
    pub fn without_secret(&self) -> Self {
        Self { card_secret: None, ..self.clone() }
    }
}

pub fn normalize_contact(contact: &str) -> String {
    contact.trim().to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub order_number: String,
    pub product_id: String,
    pub product_title: String,
    pub quantity: i64,
    pub unit_price: Cents,
    pub currency: String,
    pub contact_info: String,
    pub payment_method: Option<PaymentMethod>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl NewOrder {
    pub fn total_amount(&self) -> Cents {
        self.unit_price * self.quantity
    }

    pub fn into_order(self, id: String, now: DateTime<Utc>) -> Order {
        let total_amount = self.total_amount();
        Order {
            id,
            order_number: self.order_number,
            product_id: self.product_id,
            product_title: self.product_title,
            quantity: self.quantity,
            unit_price: self.unit_price,
            total_amount,
            currency: self.currency,
            contact_info: self.contact_info,
            payment_method: self.payment_method,
            payment_status: PaymentStatus::Pending,
            payment_transaction_id: None,
            paid_at: None,
            card_secret_delivered_at: None,
            expires_at: self.expires_at,
            card_secret: None,
            created_at: now,
            updated_at: now,
        }
    }
}

//--------------------------------------  FulfillmentResult  ---------------------------------------------------------
/// Why fulfillment is being attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FulfillmentTrigger {
    /// The gateway confirmed the payment. The receipt is recorded even if there is nothing to deliver.
    PaymentConfirmed,
    /// A manual retry. Only orders with a recorded payment are fulfilled.
    Retry,
}

/// Outcome of the guarded `pending → paid` transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FulfillmentResult {
    /// This call moved the order to `paid` and attached a card secret.
    Fulfilled(Order),
    /// The order was already paid. Nothing was changed.
    AlreadyFulfilled(Order),
    /// The order is `failed` or `cancelled` and can no longer be paid.
    NotPayable(Order),
    /// The order is still pending, but no card secret is available for its product.
    OutOfStock(Order),
    /// A retry was requested for a pending order whose payment was never confirmed.
    AwaitingPayment(Order),
    OrderNotFound,
}

impl FulfillmentResult {
    pub fn order(&self) -> Option<&Order> {
        match self {
            Self::Fulfilled(o) |
            Self::AlreadyFulfilled(o) |
            Self::NotPayable(o) |
            Self::OutOfStock(o) |
            Self::AwaitingPayment(o) => Some(o),
            Self::OrderNotFound => None,
        }
    }
}

//--------------------------------------     EmailStats      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailStats {
    /// Number of orders included in the aggregation.
    pub total_emails: usize,
    /// Number of distinct contacts.
    pub unique_emails: usize,
    pub email_list: Vec<EmailStatsEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailStatsEntry {
    pub email: String,
    pub order_count: usize,
    pub total_amount: Cents,
    pub first_order_date: DateTime<Utc>,
    pub last_order_date: DateTime<Utc>,
    pub orders: Vec<Order>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub today_sales: usize,
    pub today_revenue: Cents,
    pub yesterday_sales: usize,
    pub yesterday_revenue: Cents,
    pub month_sales: usize,
    pub month_revenue: Cents,
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn card_secret_assignment_is_write_once() {
        let mut secret = NewCardSecret::new("p1", "acc", "pw").into_card_secret("c1".into(), now());
        assert!(secret.assign_to("o1", now()));
        assert_eq!(secret.status, CardSecretStatus::Sold);
        assert_eq!(secret.order_id.as_deref(), Some("o1"));
        assert!(secret.sold_at.is_some());
        assert!(!secret.assign_to("o2", now()));
        assert_eq!(secret.order_id.as_deref(), Some("o1"));
    }

    #[test]
    fn order_total_is_unit_price_times_quantity() {
        let order = NewOrder {
            order_number: "ORD1".into(),
            product_id: "p1".into(),
            product_title: "Thing".into(),
            quantity: 2,
            unit_price: Cents::from(1250),
            currency: "CNY".into(),
            contact_info: "a@b.cn".into(),
            payment_method: Some(PaymentMethod::Alipay),
            expires_at: None,
        }
        .into_order("o1".into(), now());
        assert_eq!(order.total_amount, Cents::from(2500));
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert!(order.belongs_to(" A@B.CN "));
    }

    #[test]
    fn timestamps_are_iso_8601() {
        let product = NewProduct::new("Widget", Cents::from(100)).into_product("p1".into(), now());
        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["created_at"], "2024-05-01T12:00:00Z");
        assert_eq!(json["status"], "active");
        assert_eq!(json["price"], 100);
    }

    #[test]
    fn snapshot_reads_both_spellings() {
        let camel: DeliveredCardSecret =
            serde_json::from_str(r#"{"account":"a","password":"p","additionalInfo":"x","qualityGuarantee":"7d"}"#)
                .unwrap();
        let snake: DeliveredCardSecret =
            serde_json::from_str(r#"{"account":"a","password":"p","additional_info":"x","quality_guarantee":"7d"}"#)
                .unwrap();
        assert_eq!(camel, snake);
        let out = serde_json::to_value(&camel).unwrap();
        assert_eq!(out["qualityGuarantee"], "7d");
    }

    #[test]
    fn status_strings() {
        assert_eq!("cancelled".parse::<PaymentStatus>().unwrap(), PaymentStatus::Cancelled);
        assert_eq!(ProductStatus::Draft.to_string(), "draft");
        assert!("Sold".parse::<CardSecretStatus>().is_err());
    }
}
