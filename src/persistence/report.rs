//! Run report

use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use super::{BatchError, FailedItem};
use crate::model::EntityKind;
use crate::validation::ValidationError;

/// Outcome counts of one kind in one store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreTally {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Not attempted because the store had already failed fatally
    pub skipped: usize,
}

impl StoreTally {
    pub fn add(&mut self, other: StoreTally) {
        self.attempted += other.attempted;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.skipped += other.skipped;
    }
}

/// A record rejected by validation before any write
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedRecord {
    pub kind: EntityKind,
    pub index: usize,
    pub record_id: Uuid,
    pub reason: String,
}

/// Everything a run did, per kind and per store
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    /// Records generated per kind, including rejected rounds
    pub generated: BTreeMap<EntityKind, usize>,
    pub kinds: BTreeMap<EntityKind, BTreeMap<String, StoreTally>>,
    pub failed_items: Vec<FailedItem>,
    pub rejected: Vec<RejectedRecord>,
    /// Rounds dropped by validation
    pub rejected_rounds: usize,
    /// Fatal error per store
    pub fatal: BTreeMap<String, String>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tally_mut(&mut self, kind: EntityKind, store: &str) -> &mut StoreTally {
        self.kinds
            .entry(kind)
            .or_default()
            .entry(store.to_string())
            .or_default()
    }

    pub fn tally(&self, kind: EntityKind, store: &str) -> StoreTally {
        self.kinds
            .get(&kind)
            .and_then(|stores| stores.get(store))
            .copied()
            .unwrap_or_default()
    }

    /// Totals of one store across all kinds
    pub fn store_total(&self, store: &str) -> StoreTally {
        let mut total = StoreTally::default();
        for stores in self.kinds.values() {
            if let Some(tally) = stores.get(store) {
                total.add(*tally);
            }
        }
        total
    }

    pub fn stores(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .kinds
            .values()
            .flat_map(|stores| stores.keys().cloned())
            .chain(self.fatal.keys().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn record_generated(&mut self, counts: &BTreeMap<EntityKind, usize>) {
        for (kind, n) in counts {
            *self.generated.entry(*kind).or_default() += n;
        }
    }

    pub fn record_rejections(&mut self, errors: &[ValidationError]) {
        if errors.is_empty() {
            return;
        }
        self.rejected_rounds += 1;
        for error in errors {
            self.rejected.extend(error.failures.iter().map(|f| RejectedRecord {
                kind: error.kind,
                index: f.index,
                record_id: f.record_id,
                reason: f.reason.clone(),
            }));
        }
    }

    /// Fold another round's report into this one
    pub fn merge(&mut self, other: RunReport) {
        self.record_generated(&other.generated);
        for (kind, stores) in other.kinds {
            for (store, tally) in stores {
                self.tally_mut(kind, &store).add(tally);
            }
        }
        self.failed_items.extend(other.failed_items);
        self.rejected.extend(other.rejected);
        self.rejected_rounds += other.rejected_rounds;
        for (store, error) in other.fatal {
            self.fatal.entry(store).or_insert(error);
        }
    }

    /// Any store hit a connection or schema error
    pub fn is_fatal(&self) -> bool {
        !self.fatal.is_empty()
    }

    pub fn has_failures(&self) -> bool {
        !self.failed_items.is_empty()
    }

    /// `Err(BatchError)` when any record failed to persist
    pub fn into_result(self) -> Result<RunReport, BatchError> {
        if self.failed_items.is_empty() {
            Ok(self)
        } else {
            Err(BatchError {
                failed_items: self.failed_items,
            })
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tally(attempted: usize, failed: usize) -> StoreTally {
        StoreTally {
            attempted,
            succeeded: attempted - failed,
            failed,
            skipped: 0,
        }
    }

    #[test]
    fn test_merge_adds_tallies() {
        let mut a = RunReport::new();
        *a.tally_mut(EntityKind::Account, "relational") = tally(10, 1);
        let mut b = RunReport::new();
        *b.tally_mut(EntityKind::Account, "relational") = tally(5, 0);
        *b.tally_mut(EntityKind::Account, "graph") = tally(5, 0);
        b.fatal.insert("graph".to_string(), "Connection error: refused".to_string());

        a.merge(b);
        assert_eq!(a.tally(EntityKind::Account, "relational"), tally(15, 1));
        assert_eq!(a.store_total("graph").attempted, 5);
        assert!(a.is_fatal());
        assert_eq!(a.stores(), vec!["graph".to_string(), "relational".to_string()]);
    }

    #[test]
    fn test_into_result() {
        let report = RunReport::new();
        assert!(report.into_result().is_ok());

        let mut report = RunReport::new();
        report.failed_items.push(FailedItem {
            store: "relational".to_string(),
            kind: EntityKind::Transaction,
            record_id: Uuid::nil(),
            index: 4,
            reason: "CHECK constraint failed".to_string(),
        });
        let err = report.into_result().unwrap_err();
        assert_eq!(err.failed_items.len(), 1);
        assert_eq!(err.to_string(), "1 record(s) failed to persist");
    }

    #[test]
    fn test_json_uses_kind_names() {
        let mut report = RunReport::new();
        *report.tally_mut(EntityKind::BeneficialOwner, "graph") = tally(3, 0);
        let json = report.to_json().unwrap();
        assert!(json.contains("\"beneficial_owner\""));
    }
}
