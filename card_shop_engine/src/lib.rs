//! Card Shop Engine
//!
//! The core of a small virtual-goods shop. Customers buy a product, pay through an external payment gateway, and
//! receive a card secret (an account/password pair or a redemption code) drawn from the product's inventory.
//!
//! The library is divided into two main sections:
//! 1. Storage ([`mod@db`]). A JSON file store and Postgres are the two supported backends. Both implement the
//!    traits in [`db::traits`], and the shop only ever talks to those traits. The data types they store are defined
//!    in [`db_types`].
//! 2. The shop API ([`mod@shop_api`]). [`OrderFlowApi`] owns the order lifecycle, from checkout to fulfillment;
//!    [`CatalogApi`] manages products and card-secret inventory; [`StatsApi`] serves the admin dashboard.
//!
//! The engine knows nothing about HTTP or the payment gateway's wire format. Callers hand it verified payment
//! confirmations and it hands back orders.
pub mod db;
pub mod db_types;
pub mod helpers;
pub mod shop_api;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "postgres")]
pub use db::postgres::PostgresDatabase;
pub use db::{
    traits::{CardSecretManagement, OrderManagement, ProductManagement, ShopDatabase},
    BackendSelection,
    JsonFileStore,
    StoreError,
};
pub use shop_api::{
    catalog_api::CatalogApi,
    errors::{CatalogError, OrderFlowError},
    order_flow_api::OrderFlowApi,
    order_objects,
    stats_api::StatsApi,
};
