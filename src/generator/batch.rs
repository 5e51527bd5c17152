//! Per-kind record collections

use std::collections::BTreeMap;

use crate::model::{EntityKind, Record};

/// Generated records grouped by kind.
///
/// Keys iterate in [`EntityKind`] order, which is the write order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratedBatch {
    records: BTreeMap<EntityKind, Vec<Record>>,
}

impl GeneratedBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: Record) {
        self.records.entry(record.kind()).or_default().push(record);
    }

    /// Append every record of `other`, kind by kind
    pub fn merge(&mut self, other: GeneratedBatch) {
        for (kind, mut records) in other.records {
            self.records.entry(kind).or_default().append(&mut records);
        }
    }

    pub fn records(&self, kind: EntityKind) -> &[Record] {
        self.records.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn records_mut(&mut self, kind: EntityKind) -> &mut Vec<Record> {
        self.records.entry(kind).or_default()
    }

    pub fn count(&self, kind: EntityKind) -> usize {
        self.records.get(&kind).map_or(0, Vec::len)
    }

    pub fn len(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Non-empty kinds with their records, in write order
    pub fn iter(&self) -> impl Iterator<Item = (EntityKind, &[Record])> {
        self.records
            .iter()
            .filter(|(_, records)| !records.is_empty())
            .map(|(kind, records)| (*kind, records.as_slice()))
    }

    /// Record count per kind, in write order
    pub fn counts(&self) -> BTreeMap<EntityKind, usize> {
        self.iter().map(|(kind, records)| (kind, records.len())).collect()
    }

    pub fn into_kinds(self) -> impl Iterator<Item = (EntityKind, Vec<Record>)> {
        self.records.into_iter().filter(|(_, records)| !records.is_empty())
    }
}

impl FromIterator<Record> for GeneratedBatch {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        let mut batch = GeneratedBatch::new();
        for record in iter {
            batch.push(record);
        }
        batch
    }
}
