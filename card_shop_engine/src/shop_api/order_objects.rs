use serde::{Deserialize, Serialize};

pub use crate::db_types::ProductUpdate;
use crate::db_types::{CardSecret, Cents, NewCardSecret, PaymentMethod};

/// A customer's purchase intent. The price is deliberately absent: it is always taken from the stored product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub product_id: String,
    pub quantity: i64,
    pub contact_info: String,
    pub payment_method: PaymentMethod,
}

/// An authenticated payment notification, already stripped of gateway specifics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    pub order_id: String,
    pub product_id: String,
    /// The amount the customer actually paid, if the gateway reported one.
    pub amount_paid: Option<Cents>,
}

//--------------------------------------   Catalogue queries  --------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    /// Best sellers first.
    Sales,
    PriceAsc,
    PriceDesc,
    #[default]
    Newest,
}

impl std::str::FromStr for ProductSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sales" => Ok(Self::Sales),
            "price_asc" | "price-asc" => Ok(Self::PriceAsc),
            "price_desc" | "price-desc" => Ok(Self::PriceDesc),
            "newest" | "" => Ok(Self::Newest),
            other => Err(format!("Unknown sort order: {other}")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub subcategory: Option<String>,
    #[serde(default)]
    pub sort: ProductSort,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub subcategories: Vec<String>,
    pub product_count: usize,
}

//--------------------------------------   Card secret upload  -------------------------------------------------------
/// One row of a bulk upload. Either the structured `account`/`password` pair, or a single `card_secret` string in
/// the form `account----password` or `account:password`. A bare code without a separator is stored as the account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardSecretUploadRow {
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default, alias = "cardSecret")]
    pub card_secret: Option<String>,
    #[serde(default, alias = "remark")]
    pub additional_info: Option<String>,
    #[serde(default)]
    pub quality_guarantee: Option<String>,
}

impl CardSecretUploadRow {
    pub fn into_new_card_secret(self, product_id: &str, default_guarantee: &str) -> Result<NewCardSecret, String> {
        let (account, password) = match (self.account, self.password, self.card_secret) {
            (Some(account), password, _) if !account.trim().is_empty() => {
                (account.trim().to_string(), password.unwrap_or_default().trim().to_string())
            },
            (_, _, Some(secret)) if !secret.trim().is_empty() => split_card_secret(secret.trim()),
            _ => return Err("Row has neither an account nor a card secret".to_string()),
        };
        if account.is_empty() {
            return Err("Account is empty".to_string());
        }
        let quality_guarantee = self
            .quality_guarantee
            .filter(|g| !g.trim().is_empty())
            .unwrap_or_else(|| default_guarantee.to_string());
        Ok(NewCardSecret {
            product_id: product_id.to_string(),
            account,
            password,
            additional_info: self.additional_info.filter(|s| !s.trim().is_empty()),
            quality_guarantee,
        })
    }
}

fn split_card_secret(secret: &str) -> (String, String) {
    let split = secret.split_once("----").or_else(|| secret.split_once(':'));
    match split {
        Some((account, password)) => (account.trim().to_string(), password.trim().to_string()),
        None => (secret.to_string(), String::new()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRowError {
    /// 1-based row number within the upload.
    pub row: usize,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResults {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub errors: Vec<UploadRowError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardSecretInventory {
    pub total: usize,
    pub available: usize,
    pub sold: usize,
    pub card_secrets: Vec<CardSecret>,
}
