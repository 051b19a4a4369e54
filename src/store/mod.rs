//! Quotation persistence behind one interface, with the backend picked from
//! the connection URL.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::deadline::{Deadline, Expiry};
use crate::models::{Quotation, QuotationRecord};

pub mod mysql;
pub mod sqlite;
pub(crate) mod sql;

pub use mysql::MySqlQuotationStore;
pub use sqlite::SqliteQuotationStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unsupported database url scheme: {0}")]
    UnsupportedBackend(String),

    #[error("failed to connect database: {0}")]
    Connection(sqlx::Error),

    #[error("failed to migrate database: {0}")]
    Migration(sqlx::Error),

    #[error("failed to save data: {0}")]
    Write(sqlx::Error),

    #[error("failed to read data: {0}")]
    Read(sqlx::Error),

    #[error("database write deadline exceeded")]
    DeadlineExceeded,

    #[error("database write cancelled")]
    Cancelled,
}

impl From<Expiry> for StoreError {
    fn from(value: Expiry) -> Self {
        match value {
            Expiry::DeadlineExceeded => StoreError::DeadlineExceeded,
            Expiry::Cancelled => StoreError::Cancelled,
        }
    }
}

#[async_trait]
pub trait QuotationStore: Send + Sync {
    /// Creates the table when missing. Safe to call repeatedly; meant to run
    /// once at startup rather than per request.
    async fn ensure_schema(&self) -> Result<(), StoreError>;

    /// Inserts one record and returns its id. The insert is a single
    /// transaction bound to `deadline`: if the deadline fires first the
    /// transaction is dropped and nothing is kept.
    ///
    /// The deadline is checked once more before COMMIT. A deadline that fires
    /// while COMMIT is already in flight can still leave a durable row behind
    /// an error result.
    async fn save(&self, deadline: &Deadline, quotation: &Quotation) -> Result<i64, StoreError>;

    async fn fetch_all(&self) -> Result<Vec<QuotationRecord>, StoreError>;

    async fn count(&self) -> Result<i64, StoreError>;

    fn backend(&self) -> &'static str;
}

/// Connects to the backend named by `config.url` and makes sure the schema exists.
pub async fn connect(config: &DatabaseConfig) -> Result<Arc<dyn QuotationStore>, StoreError> {
    let scheme = config.url.split(':').next().unwrap_or_default();

    let store: Arc<dyn QuotationStore> = match scheme {
        "sqlite" => Arc::new(SqliteQuotationStore::connect(config).await?),
        "mysql" | "mariadb" => Arc::new(MySqlQuotationStore::connect(config).await?),
        other => return Err(StoreError::UnsupportedBackend(other.to_string())),
    };

    store.ensure_schema().await?;
    info!(backend = store.backend(), "Quotation store ready");

    Ok(store)
}
