//! Batch persistence coordinator
//!
//! For each kind in [`EntityKind::WRITE_ORDER`] every store gets its own tokio
//! task, and the coordinator joins all of them before moving to the next kind,
//! so a child kind is never written before its parent kind has been attempted
//! in every store. Within a store, a kind is cut into sub-batches that run on a
//! semaphore-bounded pool of tasks, each call under a deadline.
//!
//! A connection or schema error marks the store fatal for the rest of the run;
//! its remaining records are counted as skipped. Other failures become failed
//! items in the [`RunReport`] and never stop the run.

use futures::future::join_all;
use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tracing::{error, info, warn};

use super::{FailedItem, RecordFault, RunReport, StoreAdapter, StoreError, StoreResult, StoreTally};
use crate::config::BatchSettings;
use crate::generator::GeneratedBatch;
use crate::model::{EntityKind, Record};

#[derive(Clone)]
struct StoreSlot {
    adapter: Arc<dyn StoreAdapter>,
    /// First fatal error seen for this store
    fatal: Arc<Mutex<Option<StoreError>>>,
}

impl StoreSlot {
    fn name(&self) -> String {
        self.adapter.name().to_string()
    }

    async fn is_fatal(&self) -> bool {
        self.fatal.lock().await.is_some()
    }

    async fn mark_fatal(&self, err: StoreError) {
        let mut fatal = self.fatal.lock().await;
        if fatal.is_none() {
            error!("Store {} disabled for this run: {}", self.adapter.name(), err);
            *fatal = Some(err);
        }
    }
}

/// Result of one kind in one store
struct KindOutcome {
    store: String,
    tally: StoreTally,
    failed_items: Vec<FailedItem>,
}

impl KindOutcome {
    fn new(store: String, attempted: usize) -> Self {
        KindOutcome {
            store,
            tally: StoreTally {
                attempted,
                ..StoreTally::default()
            },
            failed_items: Vec::new(),
        }
    }

    fn fail_range(&mut self, kind: EntityKind, records: &[Record], range: Range<usize>, reason: &str) {
        for index in range {
            if let Some(record) = records.get(index) {
                self.failed_items.push(FailedItem {
                    store: self.store.clone(),
                    kind,
                    record_id: record.id(),
                    index,
                    reason: reason.to_string(),
                });
            }
        }
    }

    fn finish(mut self) -> Self {
        self.tally.failed = self.failed_items.len();
        self.tally.succeeded = self
            .tally
            .attempted
            .saturating_sub(self.tally.failed + self.tally.skipped);
        self
    }
}

enum SubBatch {
    Written(Vec<RecordFault>),
    Failed(String),
    Skipped,
}

/// Writes generated batches to every registered store
pub struct BatchPersistenceCoordinator {
    stores: Vec<StoreSlot>,
    settings: BatchSettings,
}

impl BatchPersistenceCoordinator {
    pub fn new(settings: BatchSettings) -> Self {
        BatchPersistenceCoordinator {
            stores: Vec::new(),
            settings,
        }
    }

    /// Relational and graph store side by side
    pub fn dual(
        relational: Arc<dyn StoreAdapter>,
        graph: Arc<dyn StoreAdapter>,
        settings: BatchSettings,
    ) -> Self {
        Self::new(settings).with_store(relational).with_store(graph)
    }

    pub fn with_store(mut self, adapter: Arc<dyn StoreAdapter>) -> Self {
        self.stores.push(StoreSlot {
            adapter,
            fatal: Arc::new(Mutex::new(None)),
        });
        self
    }

    pub fn store_names(&self) -> Vec<String> {
        self.stores.iter().map(StoreSlot::name).collect()
    }

    pub fn settings(&self) -> &BatchSettings {
        &self.settings
    }

    /// Fatal error recorded for `store`, if any
    pub async fn fatal_error(&self, store: &str) -> Option<StoreError> {
        for slot in &self.stores {
            if slot.adapter.name() == store {
                return slot.fatal.lock().await.clone();
            }
        }
        None
    }

    /// Check every store; a fatal result disables the store for the run
    pub async fn healthcheck(&self) -> Vec<(String, StoreResult<()>)> {
        let deadline = self.settings.call_timeout();
        let checks = self.stores.iter().map(|slot| async move {
            let result = tokio::time::timeout(deadline, slot.adapter.healthcheck())
                .await
                .unwrap_or_else(|_| {
                    Err(StoreError::Connection(format!(
                        "healthcheck timed out after {:?}",
                        deadline
                    )))
                });
            if let Err(e) = &result {
                if e.is_fatal() {
                    slot.mark_fatal(e.clone()).await;
                }
            }
            (slot.name(), result)
        });
        join_all(checks).await
    }

    /// Wipe every store concurrently
    pub async fn wipe_clean(&self) -> Vec<(String, StoreResult<()>)> {
        let wipes = self.stores.iter().map(|slot| async move {
            let result = slot.adapter.wipe_clean().await;
            match &result {
                Ok(()) => info!("Wiped store {}", slot.name()),
                Err(e) => error!("Failed to wipe store {}: {}", slot.name(), e),
            }
            (slot.name(), result)
        });
        join_all(wipes).await
    }

    /// Stored record count of `kind` in every store
    pub async fn counts(&self, kind: EntityKind) -> Vec<(String, StoreResult<u64>)> {
        let counts = self
            .stores
            .iter()
            .map(|slot| async move { (slot.name(), slot.adapter.count(kind).await) });
        join_all(counts).await
    }

    /// Persist a validated batch; never fails, everything lands in the report
    pub async fn persist(&self, batch: GeneratedBatch) -> RunReport {
        let mut report = RunReport::new();
        let mut by_kind: HashMap<EntityKind, Vec<Record>> = batch.into_kinds().collect();

        for kind in EntityKind::WRITE_ORDER {
            let Some(records) = by_kind.remove(&kind) else {
                continue;
            };
            let records = Arc::new(records);

            let (names, tasks): (Vec<String>, Vec<_>) = self
                .stores
                .iter()
                .map(|slot| {
                    let task = tokio::spawn(persist_kind(
                        slot.clone(),
                        kind,
                        Arc::clone(&records),
                        self.settings.clone(),
                    ));
                    (slot.name(), task)
                })
                .unzip();

            // Barrier: every store finishes this kind before the next one starts
            let results = join_all(tasks).await;

            for (store, result) in names.into_iter().zip(results) {
                let outcome = match result {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        let mut outcome = KindOutcome::new(store, records.len());
                        let reason = format!("worker task failed: {}", e);
                        outcome.fail_range(kind, &records, 0..records.len(), &reason);
                        outcome.finish()
                    }
                };

                let tally = outcome.tally;
                if tally.failed > 0 || tally.skipped > 0 {
                    warn!(
                        "{} {} records in {}: {} failed, {} skipped",
                        tally.attempted, kind, outcome.store, tally.failed, tally.skipped
                    );
                } else {
                    info!("Persisted {} {} records in {}", tally.succeeded, kind, outcome.store);
                }
                report.tally_mut(kind, &outcome.store).add(tally);
                report.failed_items.extend(outcome.failed_items);
            }
        }

        let flushes = self.stores.iter().map(|slot| async move {
            if slot.is_fatal().await {
                return;
            }
            if let Err(e) = slot.adapter.flush().await {
                slot.mark_fatal(e).await;
            }
        });
        join_all(flushes).await;

        for slot in &self.stores {
            if let Some(err) = slot.fatal.lock().await.as_ref() {
                report.fatal.insert(slot.name(), err.to_string());
            }
        }
        report
    }
}

async fn persist_kind(
    slot: StoreSlot,
    kind: EntityKind,
    records: Arc<Vec<Record>>,
    settings: BatchSettings,
) -> KindOutcome {
    let mut outcome = KindOutcome::new(slot.name(), records.len());
    if slot.is_fatal().await {
        outcome.tally.skipped = records.len();
        return outcome.finish();
    }

    let size = settings.size_for(kind);
    let deadline = settings.call_timeout();
    let pool = Arc::new(Semaphore::new(settings.max_parallel_sub_batches.max(1)));

    let mut handles = Vec::new();
    for start in (0..records.len()).step_by(size) {
        let range = start..(start + size).min(records.len());
        let Ok(permit) = Arc::clone(&pool).acquire_owned().await else {
            break;
        };
        let slot = slot.clone();
        let records = Arc::clone(&records);
        let task_range = range.clone();
        let handle = tokio::spawn(async move {
            let _permit = permit;
            run_sub_batch(&slot, kind, &records[task_range], deadline).await
        });
        handles.push((range, handle));
    }

    for (range, handle) in handles {
        let result = handle
            .await
            .unwrap_or_else(|e| SubBatch::Failed(format!("worker task failed: {}", e)));
        match result {
            SubBatch::Written(faults) => {
                for fault in faults {
                    let index = range.start + fault.index;
                    outcome.fail_range(kind, &records, index..index + 1, &fault.reason);
                }
            }
            SubBatch::Failed(reason) => outcome.fail_range(kind, &records, range, &reason),
            SubBatch::Skipped => outcome.tally.skipped += range.len(),
        }
    }
    outcome.finish()
}

async fn run_sub_batch(
    slot: &StoreSlot,
    kind: EntityKind,
    records: &[Record],
    deadline: Duration,
) -> SubBatch {
    if slot.is_fatal().await {
        return SubBatch::Skipped;
    }

    match tokio::time::timeout(deadline, slot.adapter.upsert_batch(kind, records)).await {
        Err(_) => {
            warn!(
                "{} sub-batch of {} {} records timed out after {:?}",
                slot.name(),
                records.len(),
                kind,
                deadline
            );
            SubBatch::Failed(format!("timed out after {:?}", deadline))
        }
        Ok(Ok(faults)) => SubBatch::Written(faults),
        Ok(Err(e)) if e.is_fatal() => {
            slot.mark_fatal(e).await;
            SubBatch::Skipped
        }
        Ok(Err(e)) => SubBatch::Failed(e.to_string()),
    }
}
