use thiserror::Error;

/// Backend failures. Driver, filesystem and serialization errors are flattened into strings here so that nothing
/// backend-specific leaks past the store traits.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Database driver error: {0}")]
    DriverError(String),
    #[error("Storage I/O error: {0}")]
    IoError(String),
    #[error("Stored data is corrupt or could not be serialized: {0}")]
    DataError(String),
    #[error("Cannot delete card secret {0}. It has already been sold.")]
    CardSecretSold(String),
    #[error("Orders are never deleted (order {0})")]
    OrderDeletionForbidden(String),
    #[error("Duplicate record: {0}")]
    Duplicate(String),
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        Self::IoError(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::DataError(e.to_string())
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => Self::Duplicate(db.to_string()),
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => Self::DataError(e.to_string()),
            e => Self::DriverError(e.to_string()),
        }
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        Self::DriverError(format!("Migration failed. {e}"))
    }
}
