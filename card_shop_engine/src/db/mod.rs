//! # Database management
//!
//! [`traits`] defines the contract every backend must meet. Two backends are provided:
//! * [`JsonFileStore`], which keeps each collection in a JSON file (`products.json`, `card-secrets.json`,
//!   `orders.json`) in a data directory, and
//! * `PostgresDatabase` (behind the `postgres` feature).
//!
//! The backend is chosen once, at startup, via [`BackendSelection`].
pub mod common;
mod errors;
pub mod json_store;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod traits;

use std::path::PathBuf;

pub use errors::StoreError;
pub use json_store::JsonFileStore;
use log::*;

pub const DEFAULT_DATA_DIR: &str = "./data";

/// Which persistence backend to run with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendSelection {
    Postgres { url: String },
    JsonFile { data_dir: PathBuf },
}

impl BackendSelection {
    /// A database URL selects Postgres. Without one, the JSON store in `data_dir` is used.
    pub fn resolve(database_url: Option<String>, data_dir: Option<PathBuf>) -> Self {
        match database_url.filter(|u| !u.trim().is_empty()) {
            Some(url) => Self::Postgres { url },
            None => {
                let data_dir = data_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
                Self::JsonFile { data_dir }
            },
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Postgres { .. } => "postgres".to_string(),
            Self::JsonFile { data_dir } => format!("json-file ({})", data_dir.display()),
        }
    }

    pub fn log_choice(&self) {
        info!("🗃️ Persistence backend: {}", self.describe());
    }
}
