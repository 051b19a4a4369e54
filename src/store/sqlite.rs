use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{debug, error};

use crate::config::DatabaseConfig;
use crate::deadline::Deadline;
use crate::models::{Quotation, QuotationRecord};
use crate::store::sql::{bind_quotation, COUNT_QUOTATIONS, INSERT_QUOTATION, SELECT_QUOTATIONS};
use crate::store::{QuotationStore, StoreError};

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS cotacoes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        code TEXT NOT NULL,
        codein TEXT NOT NULL,
        name TEXT NOT NULL,
        high TEXT NOT NULL,
        low TEXT NOT NULL,
        var_bid TEXT NOT NULL,
        pct_change TEXT NOT NULL,
        bid TEXT NOT NULL,
        ask TEXT NOT NULL,
        timestamp TEXT NOT NULL,
        create_date TEXT NOT NULL
    )
"#;

#[derive(Clone)]
pub struct SqliteQuotationStore {
    pool: SqlitePool,
}

impl SqliteQuotationStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(StoreError::Connection)?
            .create_if_missing(true);

        if let Some(dir) = database_dir(&config.url) {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| StoreError::Connection(sqlx::Error::Io(e)))?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(StoreError::Connection)?;

        Ok(Self::new(pool))
    }

    async fn insert(&self, deadline: &Deadline, q: &Quotation) -> Result<i64, StoreError> {
        let mut tx = self.pool.begin().await.map_err(StoreError::Connection)?;

        let result = bind_quotation(sqlx::query(INSERT_QUOTATION), q)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::Write)?;

        // Last point where giving up still discards the row.
        deadline.check()?;
        tx.commit().await.map_err(StoreError::Write)?;
        Ok(result.last_insert_rowid())
    }
}

/// Directory holding the database file, if the url names one.
fn database_dir(url: &str) -> Option<PathBuf> {
    let rest = url.strip_prefix("sqlite:")?;
    let rest = rest.strip_prefix("//").unwrap_or(rest);
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() || path == ":memory:" {
        return None;
    }
    Path::new(path)
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

#[async_trait]
impl QuotationStore for SqliteQuotationStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_TABLE)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to create cotacoes table: {}", e);
                StoreError::Migration(e)
            })?;
        Ok(())
    }

    async fn save(&self, deadline: &Deadline, quotation: &Quotation) -> Result<i64, StoreError> {
        let id = deadline.run(self.insert(deadline, quotation)).await??;
        debug!(id, "Inserted quotation into sqlite");
        Ok(id)
    }

    async fn fetch_all(&self) -> Result<Vec<QuotationRecord>, StoreError> {
        sqlx::query_as::<_, QuotationRecord>(SELECT_QUOTATIONS)
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::Read)
    }

    async fn count(&self) -> Result<i64, StoreError> {
        sqlx::query_scalar::<_, i64>(COUNT_QUOTATIONS)
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::Read)
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}
