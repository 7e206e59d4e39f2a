//! # Storage contracts
//!
//! These traits are everything the shop needs from a persistence backend. Two backends implement them: a JSON file
//! store for single-machine installs, and Postgres.
//!
//! * [`ProductManagement`] is catalogue CRUD.
//! * [`CardSecretManagement`] manages the card-secret inventory.
//! * [`OrderManagement`] stores orders and answers the read-side queries (orders by contact, email statistics).
//! * [`ShopDatabase`] ties them together and adds the guarded state transitions that must be atomic, most
//!   importantly [`ShopDatabase::fulfill_order`].
//!
//! Every method returns `Ok(None)` (or `Ok(false)`) for "not found" and `Err(StoreError)` for a backend failure, so
//! callers can always tell the two apart.
mod card_secret_management;
mod order_management;
mod product_management;
mod shop_database;

pub use card_secret_management::CardSecretManagement;
pub use order_management::OrderManagement;
pub use product_management::ProductManagement;
pub use shop_database::ShopDatabase;
