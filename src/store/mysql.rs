use async_trait::async_trait;
use sqlx::mysql::MySqlPoolOptions;
use sqlx::MySqlPool;
use tracing::{debug, error};

use crate::config::DatabaseConfig;
use crate::deadline::Deadline;
use crate::models::{Quotation, QuotationRecord};
use crate::store::sql::{bind_quotation, COUNT_QUOTATIONS, INSERT_QUOTATION, SELECT_QUOTATIONS};
use crate::store::{QuotationStore, StoreError};

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS cotacoes (
        id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
        code VARCHAR(16) NOT NULL,
        codein VARCHAR(16) NOT NULL,
        name VARCHAR(255) NOT NULL,
        high VARCHAR(32) NOT NULL,
        low VARCHAR(32) NOT NULL,
        var_bid VARCHAR(32) NOT NULL,
        pct_change VARCHAR(32) NOT NULL,
        bid VARCHAR(32) NOT NULL,
        ask VARCHAR(32) NOT NULL,
        `timestamp` VARCHAR(32) NOT NULL,
        create_date VARCHAR(32) NOT NULL
    )
"#;

#[derive(Clone)]
pub struct MySqlQuotationStore {
    pool: MySqlPool,
}

impl MySqlQuotationStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
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
        Ok(result.last_insert_id() as i64)
    }
}

#[async_trait]
impl QuotationStore for MySqlQuotationStore {
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
        debug!(id, "Inserted quotation into mysql");
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
        "mysql"
    }
}
