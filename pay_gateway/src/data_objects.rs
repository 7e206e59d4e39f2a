use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use shop_common::Cents;

use crate::GatewayError;

//--------------------------------------     PaymentType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentType {
    Wechat,
    Alipay,
}

impl PaymentType {
    /// The numeric `type` field used on the wire.
    pub fn gateway_code(&self) -> &'static str {
        match self {
            PaymentType::Wechat => "1",
            PaymentType::Alipay => "2",
        }
    }

    pub fn from_gateway_code(code: &str) -> Option<Self> {
        match code.trim() {
            "1" => Some(PaymentType::Wechat),
            "2" => Some(PaymentType::Alipay),
            _ => None,
        }
    }
}

impl Display for PaymentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentType::Wechat => write!(f, "wechat"),
            PaymentType::Alipay => write!(f, "alipay"),
        }
    }
}

impl FromStr for PaymentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wechat" | "wxpay" => Ok(PaymentType::Wechat),
            "alipay" => Ok(PaymentType::Alipay),
            _ => Err(format!("Unsupported payment type: {s}")),
        }
    }
}

//--------------------------------------      OrderParam     ---------------------------------------------------------
/// The business payload carried through the gateway in the `param` field. It is serialized with the keys in this
/// order, and read back from the callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderParam {
    pub product_id: String,
    pub contact_info: String,
    pub order_id: String,
}

impl OrderParam {
    pub fn to_param_string(&self) -> Result<String, GatewayError> {
        serde_json::to_string(self).map_err(|_| GatewayError::InvalidParam)
    }

    pub fn from_param_string(param: &str) -> Result<Self, GatewayError> {
        serde_json::from_str(param).map_err(|_| GatewayError::InvalidParam)
    }
}

//--------------------------------------  CreateOrderRequest ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct CreateOrderRequest {
    /// Our order id. Sent as `payId` and echoed back in the callback.
    pub order_id: String,
    pub product_id: String,
    pub payment_type: PaymentType,
    pub amount: Cents,
    pub contact_info: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedPayment {
    pub pay_url: String,
    /// The gateway's own order id. The HTML redirect response does not always carry one.
    pub gateway_order_id: Option<String>,
}

//--------------------------------------   PaymentCallback   ---------------------------------------------------------
/// The asynchronous notification posted by the gateway. Every field is kept exactly as received, since the signature
/// covers the raw strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCallback {
    pub pay_id: String,
    pub param: String,
    #[serde(rename = "type")]
    pub payment_type: String,
    pub price: String,
    pub really_price: String,
    pub sign: String,
}

impl PaymentCallback {
    /// Builds a correctly signed callback. Used by tooling and tests to play the part of the gateway.
    pub fn new_signed(
        pay_id: &str,
        param: &OrderParam,
        payment_type: PaymentType,
        price: Cents,
        really_price: Cents,
        secret: &str,
    ) -> Result<Self, GatewayError> {
        let param = param.to_param_string()?;
        let price = price.to_major_units_string();
        let really_price = really_price.to_major_units_string();
        let payment_type = payment_type.gateway_code().to_string();
        let sign =
            crate::signature::callback_signature(pay_id, &param, &payment_type, &price, &really_price, secret);
        Ok(Self { pay_id: pay_id.to_string(), param, payment_type, price, really_price, sign })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedCallback {
    pub order_id: String,
    pub product_id: String,
    pub contact_info: String,
    /// The amount actually paid, when the gateway reported a parseable one.
    pub really_price: Option<Cents>,
}
