//! # Shop engine public API
//!
//! Callers never talk to a backend directly. Each API is created by handing it a backend that implements the traits
//! it needs, and exposes the business operations on top:
//!
//! * [`order_flow_api`] runs checkout and the payment lifecycle of an order, including card-secret delivery.
//! * [`catalog_api`] is the storefront catalogue plus the admin product and inventory operations.
//! * [`stats_api`] answers the admin dashboard and email statistics queries.
//!
//! ```rust,ignore
//! let db = JsonFileStore::new("./data").await?;
//! let api = OrderFlowApi::new(db);
//! let order = api.checkout(request).await?;
//! ```
pub mod catalog_api;
pub mod errors;
pub mod order_flow_api;
pub mod order_objects;
pub mod stats_api;
