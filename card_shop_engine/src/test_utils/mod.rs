pub mod any_store;
pub mod prepare_env;

pub use any_store::AnyStore;
pub use prepare_env::*;
