//! Integration with the third-party wechat/alipay payment aggregator.
//!
//! The aggregator speaks form-encoded POSTs authenticated with an MD5 digest over a fixed concatenation of request
//! fields and a shared secret (see [`signature`]). Outbound, [`PaymentGatewayApi`] creates and closes gateway orders.
//! Inbound, [`CallbackVerifier`] authenticates the asynchronous payment notification and recovers the business
//! payload that was round-tripped through the gateway.
mod api;
mod callback;
mod config;
mod data_objects;
mod error;

pub mod response;
pub mod signature;

pub use api::PaymentGatewayApi;
pub use callback::{CallbackVerifier, SignatureMode, MOCK_SIGNATURE};
pub use config::GatewayConfig;
pub use data_objects::{CreateOrderRequest, CreatedPayment, OrderParam, PaymentCallback, PaymentType, VerifiedCallback};
pub use error::GatewayError;
