use thiserror::Error;

use crate::db::StoreError;

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] StoreError),
    #[error("Product {0} does not exist")]
    ProductNotFound(String),
    #[error("Product {0} is not available for purchase")]
    ProductUnavailable(String),
    #[error("Product {0} is out of stock")]
    OutOfStock(String),
    #[error("Only one item can be purchased per order (requested {0})")]
    InvalidQuantity(i64),
    #[error("Contact info must be an email address or a mobile number")]
    InvalidContactInfo,
    #[error("Order {0} does not exist")]
    OrderNotFound(String),
    #[error("The payment does not match order {0}")]
    PaymentMismatch(String),
    #[error("Order {0} is not in a state that allows this operation")]
    InvalidOrderState(String),
}

#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] StoreError),
    #[error("Product {0} does not exist")]
    ProductNotFound(String),
    #[error("Card secret {0} does not exist")]
    CardSecretNotFound(String),
    #[error("Invalid product: {0}")]
    InvalidProduct(String),
}
