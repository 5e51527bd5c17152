//! Entity graph generation
//!
//! [`EntityGraphGenerator`] drives the [`RecordFactory`] in dependency order and
//! yields one [`InstitutionFragment`] per institution. A fragment is closed under
//! references: every satellite, account, transaction and compliance event in it
//! points at an entity or account produced in the same fragment.

pub mod batch;

pub use batch::GeneratedBatch;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{CountRange, GeneratorConfig};
use crate::factory::{FactorySettings, OwnerContext, ProduceContext, RecordFactory};
use crate::model::{EntityKind, Record};

/// All records generated for one institution and its subsidiaries
#[derive(Debug, Clone, PartialEq)]
pub struct InstitutionFragment {
    pub institution_id: Uuid,
    pub subsidiary_ids: Vec<Uuid>,
    pub batch: GeneratedBatch,
}

/// Drives the record factory over the configured entity graph
pub struct EntityGraphGenerator<R: Rng> {
    config: GeneratorConfig,
    factory: RecordFactory<R>,
}

impl EntityGraphGenerator<StdRng> {
    /// Seeded from `config.seed`, or from entropy when no seed is set
    pub fn from_config(config: GeneratorConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::new(config, rng)
    }

    /// Rewind to the start of the sequence.
    ///
    /// Only a seeded generator replays the same records; an unseeded one draws fresh entropy.
    pub fn restart(&mut self) {
        *self = Self::from_config(self.config.clone());
    }
}

impl<R: Rng> EntityGraphGenerator<R> {
    pub fn new(config: GeneratorConfig, rng: R) -> Self {
        let settings = FactorySettings::from_config(&config);
        EntityGraphGenerator {
            config,
            factory: RecordFactory::new(rng, settings),
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Lazy sequence of up to `num_institutions` fragments
    pub fn fragments(&mut self) -> Fragments<'_, R> {
        Fragments {
            remaining: self.config.num_institutions,
            generator: self,
        }
    }

    /// Every fragment merged into one batch
    pub fn generate(&mut self) -> GeneratedBatch {
        let mut batch = GeneratedBatch::new();
        let mut institutions = 0;
        for fragment in self.fragments() {
            institutions += 1;
            batch.merge(fragment.batch);
        }
        info!(
            "Generated {} records for {} institutions",
            batch.len(),
            institutions
        );
        batch
    }

    /// Generate one institution with everything that hangs off it.
    ///
    /// Returns `None` when the institution itself could not be produced.
    pub fn next_fragment(&mut self) -> Option<InstitutionFragment> {
        let institution = match self.factory.institution() {
            Ok(institution) => institution,
            Err(e) => {
                warn!("Skipping institution: {}", e);
                return None;
            }
        };

        let mut batch = GeneratedBatch::new();
        batch.push(Record::Entity(self.factory.institution_entity(&institution)));

        let mut subsidiaries = Vec::new();
        let wanted = self.factory.count(self.config.subsidiaries_per_institution);
        for _ in 0..wanted {
            match self.factory.subsidiary(&institution) {
                Ok(subsidiary) => subsidiaries.push(subsidiary),
                Err(e) => warn!(
                    "Skipping subsidiary of {}: {}",
                    institution.institution_id, e
                ),
            }
        }

        let mut owners = vec![OwnerContext::for_institution(&institution)];
        for subsidiary in &subsidiaries {
            batch.push(Record::Entity(self.factory.subsidiary_entity(subsidiary)));
            if self.config.satellites_for_subsidiaries {
                owners.push(OwnerContext::for_subsidiary(subsidiary));
            }
        }

        let institution_id = institution.institution_id;
        let subsidiary_ids = subsidiaries.iter().map(|s| s.subsidiary_id).collect();
        batch.push(Record::Institution(institution));
        for subsidiary in subsidiaries {
            batch.push(Record::Subsidiary(subsidiary));
        }

        for owner in &owners {
            self.satellites(owner, &mut batch);
            self.accounts(owner, &mut batch);
        }

        debug!(
            "Generated fragment for institution {}: {} records",
            institution_id,
            batch.len()
        );
        Some(InstitutionFragment {
            institution_id,
            subsidiary_ids,
            batch,
        })
    }

    fn satellites(&mut self, owner: &OwnerContext, batch: &mut GeneratedBatch) {
        let plain: [(EntityKind, CountRange); 5] = [
            (EntityKind::Address, self.config.addresses_per_entity),
            (EntityKind::RiskAssessment, self.config.risk_assessments_per_entity),
            (EntityKind::AuthorizedPerson, self.config.authorized_persons_per_entity),
            (EntityKind::Document, self.config.documents_per_entity),
            (EntityKind::JurisdictionPresence, self.config.jurisdictions_per_entity),
        ];

        for (kind, range) in plain {
            let n = self.factory.count(range);
            for i in 0..n {
                let ctx = ProduceContext {
                    primary: i == 0,
                    ..ProduceContext::for_owner(owner)
                };
                match self.factory.produce(kind, &ctx) {
                    Ok(record) => batch.push(record),
                    Err(e) => warn!("Skipping {} of {}: {}", kind, owner.entity.id, e),
                }
            }
        }

        let n = self.factory.count(self.config.beneficial_owners_per_entity);
        match self.factory.beneficial_owners(owner, n) {
            Ok(owners) => {
                for beneficial_owner in owners {
                    batch.push(Record::BeneficialOwner(beneficial_owner));
                }
            }
            Err(e) => warn!("Skipping beneficial owners of {}: {}", owner.entity.id, e),
        }
    }

    fn accounts(&mut self, owner: &OwnerContext, batch: &mut GeneratedBatch) {
        let n = self.factory.count(self.config.accounts_per_entity);
        for _ in 0..n {
            let account = match self.factory.account(owner) {
                Ok(account) => account,
                Err(e) => {
                    warn!("Skipping account of {}: {}", owner.entity.id, e);
                    continue;
                }
            };

            let transactions = self.factory.count(self.config.transactions_per_account);
            for _ in 0..transactions {
                match self.factory.transaction(owner, &account) {
                    Ok(tx) => batch.push(Record::Transaction(tx)),
                    Err(e) => {
                        // The window is fixed per account, so every further draw fails too
                        warn!("No transactions for account {}: {}", account.account_id, e);
                        break;
                    }
                }
            }

            let events = self.factory.count(self.config.compliance_events_per_account);
            for _ in 0..events {
                match self.factory.compliance_event(owner, &account) {
                    Ok(event) => batch.push(Record::ComplianceEvent(event)),
                    Err(e) => {
                        warn!("Skipping compliance event for {}: {}", account.account_id, e);
                    }
                }
            }

            batch.push(Record::Account(account));
        }
    }
}

/// Iterator over institution fragments
pub struct Fragments<'a, R: Rng> {
    generator: &'a mut EntityGraphGenerator<R>,
    remaining: usize,
}

impl<R: Rng> Iterator for Fragments<'_, R> {
    type Item = InstitutionFragment;

    fn next(&mut self) -> Option<Self::Item> {
        while self.remaining > 0 {
            self.remaining -= 1;
            if let Some(fragment) = self.generator.next_fragment() {
                return Some(fragment);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OwnerType;
    use std::collections::HashSet;

    fn small_config(seed: u64) -> GeneratorConfig {
        GeneratorConfig {
            num_institutions: 2,
            subsidiaries_per_institution: CountRange::new(1, 2),
            transactions_per_account: CountRange::new(3, 6),
            accounts_per_entity: CountRange::new(1, 2),
            seed: Some(seed),
            ..GeneratorConfig::default()
        }
    }

    #[test]
    fn test_fragment_is_reference_closed() {
        let mut generator = EntityGraphGenerator::from_config(small_config(11));
        for fragment in generator.fragments() {
            let batch = &fragment.batch;
            let entity_ids: HashSet<Uuid> = batch
                .records(EntityKind::Entity)
                .iter()
                .map(Record::id)
                .collect();
            assert_eq!(entity_ids.len(), 1 + fragment.subsidiary_ids.len());
            assert!(entity_ids.contains(&fragment.institution_id));

            let account_ids: HashSet<Uuid> = batch
                .records(EntityKind::Account)
                .iter()
                .map(Record::id)
                .collect();

            for (_, records) in batch.iter() {
                for record in records {
                    if let Some(owner) = record.owner() {
                        assert!(entity_ids.contains(&owner.id));
                    }
                    match record {
                        Record::Transaction(tx) => assert!(account_ids.contains(&tx.account_id)),
                        Record::ComplianceEvent(ev) => {
                            assert!(account_ids.contains(&ev.related_account_id))
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    #[test]
    fn test_subsidiary_satellites_can_be_disabled() {
        let mut config = small_config(5);
        config.satellites_for_subsidiaries = false;
        let batch = EntityGraphGenerator::from_config(config).generate();
        for kind in EntityKind::WRITE_ORDER.iter().filter(|k| k.is_satellite()) {
            for record in batch.records(*kind) {
                if let Some(owner) = record.owner() {
                    assert_eq!(owner.owner_type, OwnerType::Institution);
                }
            }
        }
    }

    #[test]
    fn test_restart_replays_seeded_sequence() {
        let mut generator = EntityGraphGenerator::from_config(small_config(21));
        let first: Vec<_> = generator.fragments().collect();
        generator.restart();
        let second: Vec<_> = generator.fragments().collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_zero_institutions_yields_nothing() {
        let mut config = small_config(1);
        config.num_institutions = 0;
        let batch = EntityGraphGenerator::from_config(config).generate();
        assert!(batch.is_empty());
    }
}
