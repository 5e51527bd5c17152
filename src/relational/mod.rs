//! Relational store adapter over SQLite
//!
//! One table per kind with the primary key, foreign keys and CHECK constraints
//! from [`schema`]. A sub-batch is written inside one transaction; a statement
//! that violates a constraint is rolled back on its own and reported as a
//! [`RecordFault`] while the rest of the sub-batch commits.

pub mod schema;

use async_trait::async_trait;
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
};
use sqlx::Arguments;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::model::{EntityKind, FieldValue, Record, DATE_FORMAT, TIMESTAMP_FORMAT};
use crate::persistence::{RecordFault, StoreAdapter, StoreError, StoreResult};
use schema::TableSpec;

/// How long a sub-batch waits for another one's write lock
const WRITER_WAIT: Duration = Duration::from_secs(30);

/// Relational half of the dual store
pub struct RelationalStoreAdapter {
    pool: SqlitePool,
    tables: HashMap<EntityKind, TableSpec>,
    upserts: HashMap<EntityKind, String>,
}

impl RelationalStoreAdapter {
    /// Open a pool for `config.database_url`
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        Self::connect_url(
            &config.database_url,
            config.max_connections,
            Duration::from_millis(config.acquire_timeout_ms),
        )
        .await
    }

    pub async fn connect_url(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> StoreResult<Self> {
        let mut options = SqliteConnectOptions::from_str(url)
            .map_err(classify)?
            .foreign_keys(true)
            .create_if_missing(true)
            .busy_timeout(WRITER_WAIT);
        if !is_in_memory(url) {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        // An in-memory database lives exactly as long as its only connection
        let pool = if is_in_memory(url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections.max(1))
        }
        .acquire_timeout(acquire_timeout)
        .connect_with(options)
        .await
        .map_err(classify)?;

        info!("Connected relational store at {}", url);
        Ok(Self::with_pool(pool))
    }

    /// Private in-memory database, mainly for tests
    pub async fn in_memory() -> StoreResult<Self> {
        Self::connect_url("sqlite::memory:", 1, Duration::from_secs(10)).await
    }

    pub fn with_pool(pool: SqlitePool) -> Self {
        let tables: HashMap<EntityKind, TableSpec> = schema::tables()
            .into_iter()
            .map(|table| (table.kind, table))
            .collect();
        let upserts = tables
            .iter()
            .map(|(kind, table)| (*kind, table.upsert_sql()))
            .collect();
        RelationalStoreAdapter {
            pool,
            tables,
            upserts,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create every table and index that does not exist yet
    pub async fn create_schema(&self) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(classify)?;
        for kind in EntityKind::WRITE_ORDER {
            let table = self.table(kind)?;
            sqlx::query(&table.create_table_sql())
                .execute(&mut *tx)
                .await
                .map_err(schema_error)?;
            for index in table.create_index_sql() {
                sqlx::query(&index)
                    .execute(&mut *tx)
                    .await
                    .map_err(schema_error)?;
            }
        }
        tx.commit().await.map_err(classify)?;
        info!("Relational schema ready ({} tables)", self.tables.len());
        Ok(())
    }

    /// Check that every table exists with every expected column
    pub async fn validate_schema(&self) -> StoreResult<()> {
        for kind in EntityKind::WRITE_ORDER {
            let table = self.table(kind)?;
            let present: Vec<String> =
                sqlx::query_scalar::<_, String>("SELECT name FROM pragma_table_info(?)")
                    .bind(table.table)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(classify)?;
            if present.is_empty() {
                return Err(StoreError::Schema(format!("missing table {}", table.table)));
            }
            let missing: Vec<&str> = table
                .column_names()
                .filter(|column| !present.iter().any(|p| p == column))
                .collect();
            if !missing.is_empty() {
                return Err(StoreError::Schema(format!(
                    "table {} lacks column(s) {}",
                    table.table,
                    missing.join(", ")
                )));
            }
        }
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn table(&self, kind: EntityKind) -> StoreResult<&TableSpec> {
        self.tables
            .get(&kind)
            .ok_or_else(|| StoreError::Schema(format!("no table for {}", kind)))
    }
}

#[async_trait]
impl StoreAdapter for RelationalStoreAdapter {
    fn name(&self) -> &str {
        "relational"
    }

    async fn healthcheck(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(classify)?;
        self.validate_schema().await
    }

    async fn upsert_batch(
        &self,
        kind: EntityKind,
        records: &[Record],
    ) -> StoreResult<Vec<RecordFault>> {
        let table = self.table(kind)?;
        let sql = self
            .upserts
            .get(&kind)
            .ok_or_else(|| StoreError::Schema(format!("no upsert for {}", kind)))?;

        let mut faults = Vec::new();
        let mut tx = self.pool.begin().await.map_err(classify)?;
        for (index, record) in records.iter().enumerate() {
            let row = record.to_row();
            let mut args = SqliteArguments::default();
            for column in table.column_names() {
                bind_value(&mut args, row.value(column));
            }
            match sqlx::query_with(sql.as_str(), args).execute(&mut *tx).await {
                Ok(_) => {}
                Err(e) => {
                    let error = classify(e);
                    if error.is_fatal() {
                        return Err(error);
                    }
                    debug!("{} #{} rejected by {}: {}", kind, index, table.table, error);
                    faults.push(RecordFault::new(index, error.to_string()));
                }
            }
        }
        tx.commit().await.map_err(classify)?;
        Ok(faults)
    }

    async fn count(&self, kind: EntityKind) -> StoreResult<u64> {
        let table = self.table(kind)?;
        let count: i64 = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", table.table))
            .fetch_one(&self.pool)
            .await
            .map_err(classify)?;
        Ok(count.max(0) as u64)
    }

    async fn wipe_clean(&self) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(classify)?;
        for kind in EntityKind::WRITE_ORDER.iter().rev() {
            let table = self.table(*kind)?;
            sqlx::query(&format!("DELETE FROM {}", table.table))
                .execute(&mut *tx)
                .await
                .map_err(classify)?;
        }
        tx.commit().await.map_err(classify)?;
        info!("Wiped relational store");
        Ok(())
    }
}

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

fn bind_value(args: &mut SqliteArguments<'_>, value: &FieldValue) {
    match value {
        FieldValue::Null => args.add(Option::<String>::None),
        FieldValue::Text(s) => args.add(s.clone()),
        FieldValue::Integer(i) => args.add(*i),
        FieldValue::Real(f) => args.add(*f),
        FieldValue::Bool(b) => args.add(*b),
        FieldValue::Date(d) => args.add(d.format(DATE_FORMAT).to_string()),
        FieldValue::Timestamp(ts) => args.add(ts.format(TIMESTAMP_FORMAT).to_string()),
        FieldValue::Json(v) => args.add(v.to_string()),
    }
}

/// Map a driver error onto the store error taxonomy
fn classify(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Configuration(_) => StoreError::Connection(err.to_string()),
        sqlx::Error::Database(db) => {
            let message = db.message();
            if message.contains("no such table") || message.contains("has no column") {
                StoreError::Schema(message.to_string())
            } else {
                StoreError::Batch(message.to_string())
            }
        }
        _ => StoreError::Batch(err.to_string()),
    }
}

fn schema_error(err: sqlx::Error) -> StoreError {
    match classify(err) {
        StoreError::Batch(message) => StoreError::Schema(message),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CountRange, GeneratorConfig};
    use crate::generator::{EntityGraphGenerator, GeneratedBatch};

    fn batch(seed: u64) -> GeneratedBatch {
        let config = GeneratorConfig {
            num_institutions: 1,
            subsidiaries_per_institution: CountRange::new(1, 1),
            transactions_per_account: CountRange::new(2, 3),
            seed: Some(seed),
            ..GeneratorConfig::default()
        };
        EntityGraphGenerator::from_config(config).generate()
    }

    async fn store() -> RelationalStoreAdapter {
        let store = RelationalStoreAdapter::in_memory().await.unwrap();
        store.create_schema().await.unwrap();
        store
    }

    async fn write_all(store: &RelationalStoreAdapter, batch: &GeneratedBatch) {
        for (kind, records) in batch.iter() {
            let faults = store.upsert_batch(kind, records).await.unwrap();
            assert!(faults.is_empty(), "{}: {:?}", kind, faults);
        }
    }

    #[tokio::test]
    async fn test_healthcheck_requires_schema() {
        let store = RelationalStoreAdapter::in_memory().await.unwrap();
        let err = store.healthcheck().await.unwrap_err();
        assert!(matches!(err, StoreError::Schema(_)));
        assert!(err.is_fatal());

        store.create_schema().await.unwrap();
        store.create_schema().await.unwrap();
        store.healthcheck().await.unwrap();
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let store = store().await;
        let batch = batch(11);
        write_all(&store, &batch).await;
        write_all(&store, &batch).await;

        for (kind, records) in batch.iter() {
            assert_eq!(store.count(kind).await.unwrap(), records.len() as u64, "{}", kind);
        }
    }

    #[tokio::test]
    async fn test_constraint_violation_is_a_record_fault() {
        let store = store().await;
        let mut batch = batch(12);
        if let Some(Record::Transaction(tx)) = batch.records_mut(EntityKind::Transaction).get_mut(0) {
            tx.amount = -1.0;
        }
        let expected = batch.count(EntityKind::Transaction) as u64 - 1;

        for (kind, records) in batch.iter() {
            let faults = store.upsert_batch(kind, records).await.unwrap();
            if kind == EntityKind::Transaction {
                assert_eq!(faults.len(), 1);
                assert_eq!(faults[0].index, 0);
                assert!(faults[0].reason.contains("CHECK"), "{}", faults[0].reason);
            } else {
                assert!(faults.is_empty());
            }
        }
        assert_eq!(store.count(EntityKind::Transaction).await.unwrap(), expected);
    }

    #[tokio::test]
    async fn test_dangling_foreign_key_is_a_record_fault() {
        let store = store().await;
        let batch = batch(13);
        let faults = store
            .upsert_batch(EntityKind::Account, batch.records(EntityKind::Account))
            .await
            .unwrap();
        assert_eq!(faults.len(), batch.count(EntityKind::Account));
        assert!(faults[0].reason.contains("FOREIGN KEY"));
        assert_eq!(store.count(EntityKind::Account).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_wipe_clean_keeps_schema() {
        let store = store().await;
        write_all(&store, &batch(14)).await;
        store.wipe_clean().await.unwrap();

        for kind in EntityKind::WRITE_ORDER {
            assert_eq!(store.count(kind).await.unwrap(), 0);
        }
        store.healthcheck().await.unwrap();
    }

    #[tokio::test]
    async fn test_closed_pool_is_a_connection_error() {
        let store = store().await;
        store.close().await;
        let err = store.count(EntityKind::Entity).await.unwrap_err();
        assert!(matches!(err, StoreError::Connection(_)));
    }
}
