//! # Card shop server
//! The HTTP face of the card shop. It is responsible for:
//! * Serving the storefront API: the product catalogue, checkout and order lookup.
//! * Creating payments with the wechat/alipay aggregator and receiving its payment notifications.
//! * The admin back-office API, guarded by an admin token.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/...`: The storefront and payment routes. See [routes](routes/index.html).
//! * `/api/admin/...`: Back-office routes. They require the `X-Admin-Token` header when `SHOP_ADMIN_TOKEN` is set.
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod middleware;
pub mod payments;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
