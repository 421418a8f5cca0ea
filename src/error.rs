//! Error types
//!
//! `StoreError` never crosses the gateway boundary: gateway operations log it
//! and hand callers a `None`/`false` result instead. `ApiError` is returned by
//! setup paths (opening the database, loading config, starting logging) and
//! by admin commands.

use thiserror::Error;

/// Failures raised while talking to the backing store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("record in table {table} has no id")]
    MissingId { table: String },

    #[error("record kind {table} declares no fields")]
    NoFields { table: String },

    #[error("table {table} exists with a different column layout")]
    TableConflict { table: String },
}

impl StoreError {
    /// Short class name used in log lines next to the failed statement
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::Sqlite(rusqlite::Error::SqliteFailure(_, _)) => "SqliteFailure",
            StoreError::Sqlite(rusqlite::Error::InvalidColumnType(..)) => "InvalidColumnType",
            StoreError::Sqlite(rusqlite::Error::InvalidParameterCount(..)) => {
                "InvalidParameterCount"
            }
            StoreError::Sqlite(_) => "Sqlite",
            StoreError::MissingId { .. } => "MissingId",
            StoreError::NoFields { .. } => "NoFields",
            StoreError::TableConflict { .. } => "TableConflict",
        }
    }
}

/// Errors surfaced to the embedding application
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("storage error: {0}")]
    StorageError(#[from] StoreError),

    #[error("{0}")]
    CommandFailed(String),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
