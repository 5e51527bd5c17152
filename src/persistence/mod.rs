//! Dual-store persistence
//!
//! - [`StoreAdapter`]: the contract both stores implement
//! - [`BatchPersistenceCoordinator`]: writes kinds in parent-before-child order,
//!   fanning each kind out to every store concurrently
//! - [`RunReport`]: per-kind, per-store tallies plus every failed item

pub mod coordinator;
pub mod report;

pub use coordinator::BatchPersistenceCoordinator;
pub use report::{RejectedRecord, RunReport, StoreTally};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::model::{EntityKind, Record};

/// Store errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The store cannot be reached; fatal for the rest of the run
    #[error("Connection error: {0}")]
    Connection(String),

    /// Schema missing or incompatible; fatal for the rest of the run
    #[error("Schema error: {0}")]
    Schema(String),

    /// A whole sub-batch failed; its records become failed items
    #[error("Batch error: {0}")]
    Batch(String),
}

impl StoreError {
    /// Whether the error stops all further writes to the store
    pub fn is_fatal(&self) -> bool {
        matches!(self, StoreError::Connection(_) | StoreError::Schema(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A record-level write failure reported by an adapter
#[derive(Debug, Clone, PartialEq)]
pub struct RecordFault {
    /// Index into the slice passed to `upsert_batch`
    pub index: usize,
    pub reason: String,
}

impl RecordFault {
    pub fn new(index: usize, reason: impl Into<String>) -> Self {
        RecordFault {
            index,
            reason: reason.into(),
        }
    }
}

/// A record that one store failed to persist
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedItem {
    pub store: String,
    pub kind: EntityKind,
    pub record_id: Uuid,
    /// Index of the record within its kind's batch
    pub index: usize,
    pub reason: String,
}

/// One or more records failed during a store write
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{} record(s) failed to persist", .failed_items.len())]
pub struct BatchError {
    pub failed_items: Vec<FailedItem>,
}

/// Backend-neutral store contract
///
/// `upsert_batch` is idempotent by primary key. Record-level failures are
/// returned as [`RecordFault`]s while the rest of the slice is still written;
/// an `Err` means nothing in the slice can be trusted to have been written.
#[async_trait]
pub trait StoreAdapter: Send + Sync {
    /// Short name used in logs and reports
    fn name(&self) -> &str;

    async fn healthcheck(&self) -> StoreResult<()>;

    async fn upsert_batch(&self, kind: EntityKind, records: &[Record])
        -> StoreResult<Vec<RecordFault>>;

    /// Number of stored records of `kind`
    async fn count(&self, kind: EntityKind) -> StoreResult<u64>;

    /// Remove all data, keeping schema and constraints
    async fn wipe_clean(&self) -> StoreResult<()>;

    /// Make everything written so far durable
    async fn flush(&self) -> StoreResult<()> {
        Ok(())
    }
}
