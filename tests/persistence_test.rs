use finsynth::graph::mapping::rel;
use finsynth::graph::{EmbeddedGraph, GraphBackend, Label, PropertyValue};
use finsynth::model::Record;
use finsynth::{
    BatchPersistenceCoordinator, BatchSettings, Config, CountRange, DatasetPipeline,
    EntityGraphGenerator, EntityKind, GeneratedBatch, GeneratorConfig, GraphStoreAdapter,
    RelationalStoreAdapter, RunOptions, StoreAdapter,
};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

async fn relational() -> Arc<RelationalStoreAdapter> {
    let store = RelationalStoreAdapter::in_memory().await.unwrap();
    store.create_schema().await.unwrap();
    Arc::new(store)
}

async fn graph() -> (Arc<EmbeddedGraph>, Arc<GraphStoreAdapter>) {
    let embedded = Arc::new(EmbeddedGraph::new());
    let adapter = GraphStoreAdapter::new(Arc::clone(&embedded) as Arc<dyn GraphBackend>);
    adapter.ensure_schema().await.unwrap();
    (embedded, Arc::new(adapter))
}

fn batch(config: GeneratorConfig) -> GeneratedBatch {
    EntityGraphGenerator::from_config(config).generate()
}

fn small_config(seed: u64) -> GeneratorConfig {
    GeneratorConfig {
        num_institutions: 2,
        subsidiaries_per_institution: CountRange::new(1, 2),
        transactions_per_account: CountRange::new(2, 6),
        seed: Some(seed),
        ..GeneratorConfig::default()
    }
}

#[tokio::test]
async fn test_persisting_twice_does_not_duplicate() {
    let relational = relational().await;
    let (_, graph) = graph().await;
    let coordinator = BatchPersistenceCoordinator::dual(
        Arc::clone(&relational) as Arc<dyn StoreAdapter>,
        Arc::clone(&graph) as Arc<dyn StoreAdapter>,
        BatchSettings::default(),
    );
    let batch = batch(small_config(17));

    let first = coordinator.persist(batch.clone()).await;
    assert!(first.failed_items.is_empty(), "{:?}", first.failed_items);
    let mut once = Vec::new();
    for kind in EntityKind::WRITE_ORDER {
        once.push((
            relational.count(kind).await.unwrap(),
            graph.count(kind).await.unwrap(),
        ));
    }
    let edges_once = graph.count_relationships(rel::HAS_ACCOUNT).await.unwrap();

    let second = coordinator.persist(batch.clone()).await;
    assert!(second.failed_items.is_empty(), "{:?}", second.failed_items);
    for (kind, expected) in EntityKind::WRITE_ORDER.into_iter().zip(once) {
        let now = (
            relational.count(kind).await.unwrap(),
            graph.count(kind).await.unwrap(),
        );
        assert_eq!(now, expected, "{} count changed on re-persist", kind);
        assert_eq!(now.0, batch.count(kind) as u64);
    }
    assert_eq!(graph.count_relationships(rel::HAS_ACCOUNT).await.unwrap(), edges_once);
}

#[tokio::test]
async fn test_one_bad_record_in_a_hundred() {
    let relational = relational().await;
    let settings = BatchSettings {
        default_size: 100,
        ..BatchSettings::default()
    };
    let coordinator = BatchPersistenceCoordinator::new(settings)
        .with_store(Arc::clone(&relational) as Arc<dyn StoreAdapter>);

    let config = GeneratorConfig {
        num_institutions: 1,
        subsidiaries_per_institution: CountRange::new(0, 0),
        accounts_per_entity: CountRange::new(3, 3),
        transactions_per_account: CountRange::new(50, 60),
        seed: Some(100),
        ..GeneratorConfig::default()
    };
    let mut generated = batch(config);
    let mut transactions: Vec<Record> = std::mem::take(generated.records_mut(EntityKind::Transaction))
        .into_iter()
        .take(100)
        .collect();
    assert_eq!(transactions.len(), 100);
    generated.records_mut(EntityKind::ComplianceEvent).clear();

    let parents = coordinator.persist(generated).await;
    assert!(parents.failed_items.is_empty(), "{:?}", parents.failed_items);

    let bad_id = match &mut transactions[42] {
        Record::Transaction(tx) => {
            tx.amount = -250.0;
            tx.transaction_id
        }
        other => panic!("unexpected record {:?}", other.kind()),
    };
    let mut sub_batch = GeneratedBatch::new();
    for record in transactions {
        sub_batch.push(record);
    }

    let report = coordinator.persist(sub_batch).await;
    let tally = report.tally(EntityKind::Transaction, "relational");
    assert_eq!(tally.attempted, 100);
    assert_eq!(tally.succeeded, 99);
    assert_eq!(tally.failed, 1);
    assert_eq!(report.failed_items.len(), 1);
    assert_eq!(report.failed_items[0].record_id, bad_id);
    assert_eq!(report.failed_items[0].index, 42);
    assert!(!report.is_fatal());
    assert_eq!(relational.count(EntityKind::Transaction).await.unwrap(), 99);

    let err = report.into_result().unwrap_err();
    assert_eq!(err.failed_items.len(), 1);
}

#[tokio::test]
async fn test_seed_42_scenario() {
    let mut config = Config::default();
    config.store.database_url = "sqlite::memory:".to_string();
    config.generator.num_institutions = 3;
    config.generator.subsidiaries_per_institution = CountRange::new(1, 2);
    config.generator.transactions_per_account = CountRange::new(1, 5);
    config.generator.seed = Some(42);

    let relational = RelationalStoreAdapter::in_memory().await.unwrap();
    relational.create_schema().await.unwrap();
    let embedded = Arc::new(EmbeddedGraph::new());
    let graph = GraphStoreAdapter::new(Arc::clone(&embedded) as Arc<dyn GraphBackend>);
    graph.ensure_schema().await.unwrap();

    let pipeline = DatasetPipeline::with_stores(config, relational, graph);
    let report = pipeline.run(&RunOptions::default()).await.unwrap();
    assert!(!report.is_fatal());
    assert!(report.failed_items.is_empty(), "{:?}", report.failed_items);

    let subsidiaries = report.generated[&EntityKind::Subsidiary];
    assert!((3..=6).contains(&subsidiaries), "{} subsidiaries", subsidiaries);
    assert_eq!(pipeline.relational().count(EntityKind::Institution).await.unwrap(), 3);
    assert_eq!(
        pipeline.relational().count(EntityKind::Subsidiary).await.unwrap(),
        subsidiaries as u64
    );

    let parents: HashSet<String> = sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT parent_institution_id FROM subsidiaries",
    )
    .fetch_all(pipeline.relational().pool())
    .await
    .unwrap()
    .into_iter()
    .collect();

    let store = embedded.store();
    let store = store.read().await;
    let institutions = store.get_nodes_by_label(&Label::new("Institution"));
    assert_eq!(institutions.len(), 3);
    for node in institutions {
        let Some(PropertyValue::String(id)) = node.get_property("institution_id") else {
            panic!("institution node without key");
        };
        let owns = store
            .get_outgoing_edges(node.id)
            .iter()
            .filter(|e| e.edge_type.as_str() == rel::OWNS_SUBSIDIARY)
            .count();
        assert_eq!(owns > 0, parents.contains(id), "institution {}", id);
        Uuid::parse_str(id).unwrap();
    }
    assert_eq!(
        store.count_edge_type(&rel::OWNS_SUBSIDIARY.into()),
        subsidiaries
    );
}

#[tokio::test]
async fn test_dangling_reference_fails_per_record_in_both_stores() {
    let relational = relational().await;
    let (_, graph) = graph().await;
    let coordinator = BatchPersistenceCoordinator::dual(
        Arc::clone(&relational) as Arc<dyn StoreAdapter>,
        Arc::clone(&graph) as Arc<dyn StoreAdapter>,
        BatchSettings::default(),
    );

    let mut generated = batch(small_config(23));
    let orphan = match generated.records_mut(EntityKind::Account).first_mut() {
        Some(Record::Account(account)) => {
            account.entity.id = Uuid::new_v4();
            account.account_id
        }
        _ => panic!("no accounts generated"),
    };
    generated
        .records_mut(EntityKind::Transaction)
        .retain(|r| !matches!(r, Record::Transaction(tx) if tx.account_id == orphan));
    generated
        .records_mut(EntityKind::ComplianceEvent)
        .retain(|r| !matches!(r, Record::ComplianceEvent(ev) if ev.related_account_id == orphan));

    let report = coordinator.persist(generated.clone()).await;
    assert!(!report.is_fatal());
    let failed: Vec<_> = report
        .failed_items
        .iter()
        .map(|item| (item.store.as_str(), item.kind, item.record_id))
        .collect();
    assert_eq!(failed.len(), 2, "{:?}", report.failed_items);
    assert!(failed.contains(&("relational", EntityKind::Account, orphan)));
    assert!(failed.contains(&("graph", EntityKind::Account, orphan)));

    let accounts = generated.count(EntityKind::Account) as u64;
    assert_eq!(relational.count(EntityKind::Account).await.unwrap(), accounts - 1);
    assert_eq!(graph.count(EntityKind::Account).await.unwrap(), accounts - 1);
}

#[tokio::test]
async fn test_cleanup_keeps_schema_and_constraints() {
    let relational = relational().await;
    let (_, graph) = graph().await;
    let coordinator = BatchPersistenceCoordinator::dual(
        Arc::clone(&relational) as Arc<dyn StoreAdapter>,
        Arc::clone(&graph) as Arc<dyn StoreAdapter>,
        BatchSettings::default(),
    );
    coordinator.persist(batch(small_config(31))).await;

    for (store, result) in coordinator.wipe_clean().await {
        result.unwrap_or_else(|e| panic!("{}: {}", store, e));
    }
    for kind in EntityKind::WRITE_ORDER {
        assert_eq!(relational.count(kind).await.unwrap(), 0);
        assert_eq!(graph.count(kind).await.unwrap(), 0);
    }
    for (store, result) in coordinator.healthcheck().await {
        result.unwrap_or_else(|e| panic!("{}: {}", store, e));
    }

    let report = coordinator.persist(batch(small_config(31))).await;
    assert!(report.failed_items.is_empty());
}

#[tokio::test]
async fn test_graph_snapshot_survives_between_runs() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.store.database_url = "sqlite::memory:".to_string();
    config.store.graph_snapshot = Some(dir.path().join("graph.json"));
    config.generator = small_config(3);

    let pipeline = DatasetPipeline::connect(config.clone()).await.unwrap();
    let report = pipeline.run(&RunOptions::default()).await.unwrap();
    let institutions = report.generated[&EntityKind::Institution] as u64;
    drop(pipeline);

    let graph = GraphStoreAdapter::connect(&config.store).await.unwrap();
    assert_eq!(graph.count(EntityKind::Institution).await.unwrap(), institutions);
    graph.healthcheck().await.unwrap();
}
