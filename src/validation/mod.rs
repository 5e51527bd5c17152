//! Pre-dispatch validation
//!
//! Every record is checked against its kind's rule table before any store sees
//! it. Validation never performs I/O. A batch with any invalid record is
//! rejected whole, with every `(index, reason)` pair listed.

pub mod rules;

use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::config::{DateRange, GeneratorConfig};
use crate::generator::GeneratedBatch;
use crate::model::{EntityKind, Record};
use rules::{rule_table, Rule};

/// One rejected record
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RecordFailure {
    /// Position of the record inside its kind's batch
    pub index: usize,
    pub record_id: Uuid,
    pub reason: String,
}

/// A batch of one kind was rejected
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind} batch rejected: {} invalid record(s)", .failures.len())]
pub struct ValidationError {
    pub kind: EntityKind,
    pub failures: Vec<RecordFailure>,
}

pub type ValidationResult<T> = Result<T, ValidationError>;

/// Per-kind rule gate in front of the persistence coordinator
pub struct ValidationLayer {
    rules: HashMap<EntityKind, Vec<Rule>>,
    /// Upper bound for dates that cannot lie in the future
    as_of: NaiveDate,
}

impl Default for ValidationLayer {
    fn default() -> Self {
        Self::new(DateRange::default().end)
    }
}

impl ValidationLayer {
    pub fn new(as_of: NaiveDate) -> Self {
        ValidationLayer {
            rules: rule_table(),
            as_of,
        }
    }

    /// Layer whose "today" is the end of the generator's date range
    pub fn for_config(config: &GeneratorConfig) -> Self {
        Self::new(config.date_range.end)
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    /// Validate a single record
    pub fn validate(&self, kind: EntityKind, record: &Record) -> ValidationResult<()> {
        match self.check_record(kind, record) {
            Ok(()) => Ok(()),
            Err(reason) => Err(ValidationError {
                kind,
                failures: vec![RecordFailure {
                    index: 0,
                    record_id: record.id(),
                    reason,
                }],
            }),
        }
    }

    /// Validate every record of one kind, plus the per-entity ownership sums
    pub fn validate_records(&self, kind: EntityKind, records: &[Record]) -> ValidationResult<()> {
        let mut failures: Vec<RecordFailure> = records
            .iter()
            .enumerate()
            .filter_map(|(index, record)| {
                self.check_record(kind, record)
                    .err()
                    .map(|reason| RecordFailure {
                        index,
                        record_id: record.id(),
                        reason,
                    })
            })
            .collect();

        if kind == EntityKind::BeneficialOwner {
            failures.extend(ownership_sums(records));
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { kind, failures })
        }
    }

    /// Validate every kind of a batch, including references between kinds.
    ///
    /// Returns every rejected kind; an empty list means the batch may be persisted.
    pub fn validate_batch(&self, batch: &GeneratedBatch) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        for (kind, records) in batch.iter() {
            if let Err(e) = self.validate_records(kind, records) {
                errors.push(e);
            }
        }
        errors.extend(references(batch, self.as_of));

        for error in &errors {
            for failure in &error.failures {
                warn!(
                    "Rejected {} #{} ({}): {}",
                    error.kind, failure.index, failure.record_id, failure.reason
                );
            }
        }
        errors
    }

    fn check_record(&self, kind: EntityKind, record: &Record) -> Result<(), String> {
        if record.kind() != kind {
            return Err(format!("expected a {} record, got {}", kind, record.kind()));
        }
        let row = record.to_row();
        let mut reasons = Vec::new();
        for rule in self.rules.get(&kind).map(Vec::as_slice).unwrap_or(&[]) {
            if let Err(reason) = rule.check(&row) {
                reasons.push(reason);
            }
        }
        if reasons.is_empty() {
            Ok(())
        } else {
            Err(reasons.join("; "))
        }
    }
}

/// Beneficial-owner shares must add up to exactly 100% per entity
fn ownership_sums(records: &[Record]) -> Vec<RecordFailure> {
    let mut totals: HashMap<Uuid, (usize, Uuid, u32)> = HashMap::new();
    for (index, record) in records.iter().enumerate() {
        if let Record::BeneficialOwner(owner) = record {
            let entry = totals
                .entry(owner.entity.id)
                .or_insert((index, owner.owner_id, 0));
            entry.2 += owner.ownership_percentage.hundredths();
        }
    }

    let mut failures: Vec<RecordFailure> = totals
        .into_iter()
        .filter(|(_, (_, _, total))| *total != 10_000)
        .map(|(entity, (index, record_id, total))| RecordFailure {
            index,
            record_id,
            reason: format!(
                "ownership of entity {} sums to {}.{:02}%, expected 100%",
                entity,
                total / 100,
                total % 100
            ),
        })
        .collect();
    failures.sort_by_key(|f| f.index);
    failures
}

/// Every reference inside the batch must resolve to a record of the same batch,
/// and records that depend on an account must agree with it
fn references(batch: &GeneratedBatch, as_of: NaiveDate) -> Vec<ValidationError> {
    let ids = |kind: EntityKind| -> HashSet<Uuid> {
        batch.records(kind).iter().map(Record::id).collect()
    };
    let entities = ids(EntityKind::Entity);
    let institutions = ids(EntityKind::Institution);
    let accounts: HashMap<Uuid, (&str, NaiveDate)> = batch
        .records(EntityKind::Account)
        .iter()
        .filter_map(|record| match record {
            Record::Account(a) => Some((a.account_id, (a.currency.as_str(), a.opening_date))),
            _ => None,
        })
        .collect();

    let unknown_owner = |record: &Record| {
        record
            .owner()
            .filter(|owner| !entities.contains(&owner.id))
            .map(|owner| format!("unknown owning entity {}", owner.id))
    };

    let mut errors = Vec::new();
    for (kind, records) in batch.iter() {
        let failures: Vec<RecordFailure> = records
            .iter()
            .enumerate()
            .filter_map(|(index, record)| {
                let dangling = match record {
                    Record::Institution(r) if !entities.contains(&r.institution_id) => {
                        Some(format!("no entity for institution {}", r.institution_id))
                    }
                    Record::Subsidiary(r) if !entities.contains(&r.subsidiary_id) => {
                        Some(format!("no entity for subsidiary {}", r.subsidiary_id))
                    }
                    Record::Subsidiary(r) if !institutions.contains(&r.parent_institution_id) => {
                        Some(format!("unknown parent institution {}", r.parent_institution_id))
                    }
                    Record::Account(r) if r.opening_date > as_of => Some(format!(
                        "opening_date ({}) is after today ({})",
                        r.opening_date, as_of
                    )),
                    Record::Transaction(r) => match accounts.get(&r.account_id) {
                        None => Some(format!("unknown account {}", r.account_id)),
                        Some((currency, _)) if *currency != r.currency => Some(format!(
                            "currency {} does not match account currency {}",
                            r.currency, currency
                        )),
                        Some((_, opened)) if r.transaction_date < *opened => Some(format!(
                            "transaction_date ({}) is before account opening_date ({})",
                            r.transaction_date, opened
                        )),
                        Some(_) if r.transaction_date > as_of => Some(format!(
                            "transaction_date ({}) is after today ({})",
                            r.transaction_date, as_of
                        )),
                        Some(_) => unknown_owner(record),
                    },
                    Record::ComplianceEvent(r) if !accounts.contains_key(&r.related_account_id) => {
                        Some(format!("unknown account {}", r.related_account_id))
                    }
                    Record::ComplianceEvent(r)
                        if r.decision_date.map_or(false, |decided| decided > as_of) =>
                    {
                        Some(format!("decision_date is after today ({})", as_of))
                    }
                    _ => unknown_owner(record),
                };
                dangling.map(|reason| RecordFailure {
                    index,
                    record_id: record.id(),
                    reason,
                })
            })
            .collect();
        if !failures.is_empty() {
            errors.push(ValidationError { kind, failures });
        }
    }
    errors
}
