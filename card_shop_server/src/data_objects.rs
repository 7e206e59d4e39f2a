use std::fmt::Display;

use card_shop_engine::{
    db_types::{CardSecretStatus, Cents, PaymentMethod, PaymentStatus},
    order_objects::{CardSecretUploadRow, CheckoutRequest, ProductQuery, ProductSort},
};
use serde::{Deserialize, Serialize};

use crate::errors::ServerError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

//--------------------------------------------   Storefront   ---------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductListParams {
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub sort: Option<String>,
}

impl TryFrom<ProductListParams> for ProductQuery {
    type Error = ServerError;

    fn try_from(params: ProductListParams) -> Result<Self, Self::Error> {
        let sort = match params.sort.as_deref() {
            None | Some("") => ProductSort::default(),
            Some(s) => s.parse::<ProductSort>().map_err(ServerError::ValidationError)?,
        };
        Ok(ProductQuery { category: params.category, subcategory: params.subcategory, sort })
    }
}

/// The storefront's purchase form. Any price the client sends is ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderParams {
    pub product_id: String,
    pub contact_info: String,
    #[serde(default = "one")]
    pub quantity: i64,
    #[serde(alias = "paymentMethod")]
    pub payment_type: PaymentMethod,
}

fn one() -> i64 {
    1
}

impl From<CreateOrderParams> for CheckoutRequest {
    fn from(params: CreateOrderParams) -> Self {
        CheckoutRequest {
            product_id: params.product_id,
            quantity: params.quantity,
            contact_info: params.contact_info,
            payment_method: params.payment_type,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub success: bool,
    pub order_id: String,
    pub order_number: String,
    pub pay_url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderQueryParams {
    pub contact_info: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CardSecretQuery {
    #[serde(alias = "contactInfo")]
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusResponse {
    pub success: bool,
    pub order_id: String,
    pub order_number: String,
    pub payment_status: PaymentStatus,
    pub total_amount: Cents,
}

//--------------------------------------------      Admin      ---------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockUpdate {
    pub stock: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CardSecretFilter {
    pub status: Option<CardSecretStatus>,
}

/// Rows arrive already parsed. Spreadsheet handling happens in the browser.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardSecretUpload {
    #[serde(alias = "card_secrets", alias = "rows")]
    pub card_secrets: Vec<CardSecretUploadRow>,
}
