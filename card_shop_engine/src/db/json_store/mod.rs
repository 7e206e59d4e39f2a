//! A backend that keeps each collection in its own JSON file inside a data directory.
//!
//! Every operation reads the whole collection, modifies it in memory, and writes it back via a temporary file and a
//! rename. A single async mutex is held for the duration of each operation, so read-modify-write cycles never
//! interleave within a process. Running two processes against the same directory is not supported.
mod db;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use log::*;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::{Mutex, MutexGuard};

use crate::db::StoreError;

pub const PRODUCTS_FILE: &str = "products.json";
pub const CARD_SECRETS_FILE: &str = "card-secrets.json";
pub const ORDERS_FILE: &str = "orders.json";

#[derive(Clone)]
pub struct JsonFileStore {
    inner: Arc<Inner>,
}

struct Inner {
    data_dir: PathBuf,
    lock: Mutex<()>,
}

impl std::fmt::Debug for JsonFileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JsonFileStore ({})", self.inner.data_dir.display())
    }
}

impl JsonFileStore {
    /// Opens (and creates, if necessary) a store in `data_dir`. Missing collection files are treated as empty.
    pub async fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self, StoreError> {
        let data_dir = data_dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&data_dir).await?;
        info!("🗃️ JSON file store opened in {}", data_dir.display());
        Ok(Self { inner: Arc::new(Inner { data_dir, lock: Mutex::new(()) }) })
    }

    pub fn data_dir(&self) -> &Path {
        &self.inner.data_dir
    }

    async fn lock(&self) -> MutexGuard<'_, ()> {
        self.inner.lock.lock().await
    }

    fn path_for(&self, file: &str) -> PathBuf {
        self.inner.data_dir.join(file)
    }

    async fn read_collection<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<T>, StoreError> {
        read_collection(&self.path_for(file)).await
    }

    async fn write_collection<T: Serialize>(&self, file: &str, records: &[T]) -> Result<(), StoreError> {
        let path = self.path_for(file);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(records)?;
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;
        trace!("🗃️ Wrote {} records to {}", records.len(), path.display());
        Ok(())
    }
}

/// Reads a JSON array from `path`. A missing or empty file is an empty collection.
pub async fn read_collection<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StoreError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
        Err(e) => return Err(e.into()),
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(vec![]);
    }
    serde_json::from_slice(&bytes).map_err(|e| {
        error!("🗃️ Could not parse {}. {e}", path.display());
        StoreError::DataError(format!("{}: {e}", path.display()))
    })
}
