use finsynth::model::{OwnerType, Record};
use finsynth::{CountRange, EntityGraphGenerator, EntityKind, GeneratedBatch, GeneratorConfig, ValidationLayer};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

fn config(seed: u64) -> GeneratorConfig {
    GeneratorConfig {
        num_institutions: 4,
        subsidiaries_per_institution: CountRange::new(1, 3),
        transactions_per_account: CountRange::new(5, 15),
        seed: Some(seed),
        ..GeneratorConfig::default()
    }
}

fn generate(seed: u64) -> (GeneratorConfig, GeneratedBatch) {
    let config = config(seed);
    let batch = EntityGraphGenerator::from_config(config.clone()).generate();
    (config, batch)
}

fn owner_ids(batch: &GeneratedBatch) -> HashSet<Uuid> {
    batch
        .records(EntityKind::Institution)
        .iter()
        .chain(batch.records(EntityKind::Subsidiary))
        .map(Record::id)
        .collect()
}

#[test]
fn test_ownership_sums_to_exactly_one_hundred() {
    for seed in [1, 2, 3, 42] {
        let (_, batch) = generate(seed);
        let mut sums: HashMap<Uuid, u32> = HashMap::new();
        for record in batch.records(EntityKind::BeneficialOwner) {
            let Record::BeneficialOwner(owner) = record else {
                panic!("unexpected record {:?}", record.kind());
            };
            *sums.entry(owner.entity.id).or_default() += owner.ownership_percentage.hundredths();
        }
        assert!(!sums.is_empty());
        for (entity, sum) in sums {
            assert_eq!(sum, 10_000, "entity {} owners sum to {}", entity, sum);
        }
    }
}

#[test]
fn test_date_orders_hold() {
    let (config, batch) = generate(11);
    let today = config.date_range.end;

    for record in batch.records(EntityKind::Institution) {
        let Record::Institution(institution) = record else { unreachable!() };
        assert!(institution.incorporation_date <= institution.onboarding_date);
    }
    for record in batch.records(EntityKind::Subsidiary) {
        let Record::Subsidiary(subsidiary) = record else { unreachable!() };
        assert!(subsidiary.incorporation_date <= subsidiary.acquisition_date);
        let pct = subsidiary.parent_ownership_percentage.as_f64();
        assert!(pct > 0.0 && pct <= 100.0);
    }

    let openings: HashMap<Uuid, _> = batch
        .records(EntityKind::Account)
        .iter()
        .map(|record| match record {
            Record::Account(account) => (account.account_id, account.opening_date),
            other => panic!("unexpected record {:?}", other.kind()),
        })
        .collect();
    assert!(!openings.is_empty());
    for record in batch.records(EntityKind::Transaction) {
        let Record::Transaction(tx) = record else { unreachable!() };
        let opened = openings[&tx.account_id];
        assert!(opened <= tx.transaction_date, "{} before opening {}", tx.transaction_date, opened);
        assert!(tx.transaction_date <= today);
        assert!(tx.amount > 0.0);
        assert!(tx.account_id == tx.debit_account_id || tx.account_id == tx.credit_account_id);
    }
}

#[test]
fn test_references_point_at_generated_records() {
    let (_, batch) = generate(21);
    let owners = owner_ids(&batch);

    let entities: HashSet<Uuid> = batch.records(EntityKind::Entity).iter().map(Record::id).collect();
    assert_eq!(entities, owners, "one entity per institution and subsidiary");

    for record in batch.records(EntityKind::Entity) {
        let Record::Entity(entity) = record else { unreachable!() };
        assert_eq!(
            entity.parent_entity_id.is_none(),
            entity.entity_type == OwnerType::Institution
        );
        assert!(entity.deleted_at.is_none());
    }

    let institutions: HashSet<Uuid> = batch
        .records(EntityKind::Institution)
        .iter()
        .map(Record::id)
        .collect();
    for record in batch.records(EntityKind::Subsidiary) {
        let Record::Subsidiary(subsidiary) = record else { unreachable!() };
        assert!(institutions.contains(&subsidiary.parent_institution_id));
    }

    for (kind, records) in batch.iter() {
        if !kind.is_satellite() {
            continue;
        }
        for record in records {
            let owner = record.owner().expect("satellite records have an owner");
            assert!(owners.contains(&owner.id), "{} {} has a dangling owner", kind, record.id());
        }
    }

    let accounts: HashSet<Uuid> = batch.records(EntityKind::Account).iter().map(Record::id).collect();
    for record in batch.records(EntityKind::Transaction) {
        let Record::Transaction(tx) = record else { unreachable!() };
        assert!(accounts.contains(&tx.account_id));
    }
    for record in batch.records(EntityKind::ComplianceEvent) {
        let Record::ComplianceEvent(event) = record else { unreachable!() };
        assert!(accounts.contains(&event.related_account_id));
    }
}

#[test]
fn test_same_seed_same_dataset() {
    let (_, first) = generate(99);
    let (_, second) = generate(99);
    assert_eq!(first, second);

    let (_, other) = generate(100);
    assert_ne!(first, other);
}

#[test]
fn test_restart_replays_seeded_sequence() {
    let mut generator = EntityGraphGenerator::from_config(config(5));
    let first = generator.generate();
    generator.restart();
    assert_eq!(generator.generate(), first);
}

#[test]
fn test_generated_batches_pass_validation() {
    for seed in [7, 8, 9] {
        let (config, batch) = generate(seed);
        let errors = ValidationLayer::for_config(&config).validate_batch(&batch);
        assert!(errors.is_empty(), "seed {}: {:?}", seed, errors);
    }
}

#[test]
fn test_default_size_rounds_pass_validation_across_seeds() {
    for seed in 0..20 {
        let config = GeneratorConfig {
            num_institutions: 100,
            transactions_per_account: CountRange::new(1, 5),
            seed: Some(seed),
            ..GeneratorConfig::default()
        };
        let layer = ValidationLayer::for_config(&config);
        let batch = EntityGraphGenerator::from_config(config).generate();
        let errors = layer.validate_batch(&batch);
        assert!(errors.is_empty(), "seed {}: {:?}", seed, errors.first());
    }
}

#[test]
fn test_transaction_must_agree_with_its_account() {
    let (config, mut batch) = generate(42);
    let layer = ValidationLayer::for_config(&config);
    let openings: HashMap<Uuid, _> = batch
        .records(EntityKind::Account)
        .iter()
        .filter_map(|record| match record {
            Record::Account(account) => Some((account.account_id, account.opening_date)),
            _ => None,
        })
        .collect();

    let transactions = batch.records_mut(EntityKind::Transaction);
    if let Some(Record::Transaction(tx)) = transactions.get_mut(0) {
        tx.currency = "XXX".to_string();
    }
    if let Some(Record::Transaction(tx)) = transactions.get_mut(1) {
        tx.transaction_date = openings[&tx.account_id] - chrono::Duration::days(400);
        tx.value_date = tx.transaction_date;
    }
    if let Some(Record::Transaction(tx)) = transactions.get_mut(2) {
        tx.transaction_date = config.date_range.end + chrono::Duration::days(3);
        tx.value_date = tx.transaction_date;
    }

    let errors = layer.validate_batch(&batch);
    assert_eq!(errors.len(), 1, "{:?}", errors);
    assert_eq!(errors[0].kind, EntityKind::Transaction);
    let reasons: Vec<(usize, &str)> = errors[0]
        .failures
        .iter()
        .map(|f| (f.index, f.reason.as_str()))
        .collect();
    assert_eq!(reasons.len(), 3, "{:?}", reasons);
    assert!(reasons[0].1.contains("does not match account currency"));
    assert!(reasons[1].1.contains("before account opening_date"));
    assert!(reasons[2].1.contains("after today"));
}

#[test]
fn test_tampered_batch_is_rejected_whole() {
    let (_, mut batch) = generate(12);
    if let Some(Record::Transaction(tx)) = batch.records_mut(EntityKind::Transaction).get_mut(3) {
        tx.amount = -10.0;
    }
    let errors = ValidationLayer::default().validate_batch(&batch);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, EntityKind::Transaction);
    assert_eq!(errors[0].failures.len(), 1);
    assert_eq!(errors[0].failures[0].index, 3);
}
