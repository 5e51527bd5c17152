//! End-to-end run: generate, validate, persist, export
//!
//! The generator yields one fragment per institution. Fragments are grouped
//! into rounds of `institutions_per_round`; each round is validated as a whole
//! and either persisted to both stores or recorded as rejected.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::DatagenResult;
use crate::export::CsvExporter;
use crate::generator::{EntityGraphGenerator, GeneratedBatch};
use crate::graph::GraphStoreAdapter;
use crate::persistence::{BatchPersistenceCoordinator, RunReport, StoreAdapter, StoreError};
use crate::relational::RelationalStoreAdapter;
use crate::validation::ValidationLayer;

/// Per-run switches that are not part of [`Config`]
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Wipe both stores before generating
    pub wipe_first: bool,
    /// Also write every accepted round as CSV
    pub output_dir: Option<PathBuf>,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            wipe_first: true,
            output_dir: None,
        }
    }
}

pub struct DatasetPipeline {
    config: Config,
    relational: Arc<RelationalStoreAdapter>,
    graph: Arc<GraphStoreAdapter>,
    coordinator: BatchPersistenceCoordinator,
    validation: ValidationLayer,
}

impl DatasetPipeline {
    /// Validate `config`, connect both stores and make sure their schemas exist
    pub async fn connect(config: Config) -> DatagenResult<Self> {
        config.validate()?;
        let relational = RelationalStoreAdapter::connect(&config.store).await?;
        relational.create_schema().await?;
        let graph = GraphStoreAdapter::connect(&config.store).await?;
        graph.ensure_schema().await?;
        Ok(Self::with_stores(config, relational, graph))
    }

    /// Pipeline over stores whose schemas are already in place
    pub fn with_stores(
        config: Config,
        relational: RelationalStoreAdapter,
        graph: GraphStoreAdapter,
    ) -> Self {
        let relational = Arc::new(relational);
        let graph = Arc::new(graph);
        let coordinator = BatchPersistenceCoordinator::dual(
            Arc::clone(&relational) as Arc<dyn StoreAdapter>,
            Arc::clone(&graph) as Arc<dyn StoreAdapter>,
            config.batch.clone(),
        );
        let validation = ValidationLayer::for_config(&config.generator);
        DatasetPipeline {
            config,
            relational,
            graph,
            coordinator,
            validation,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn relational(&self) -> &RelationalStoreAdapter {
        &self.relational
    }

    pub fn graph(&self) -> &GraphStoreAdapter {
        &self.graph
    }

    pub fn coordinator(&self) -> &BatchPersistenceCoordinator {
        &self.coordinator
    }

    /// Fail on the first store that is unreachable or has no schema
    pub async fn healthcheck(&self) -> DatagenResult<()> {
        for (store, result) in self.coordinator.healthcheck().await {
            if let Err(e) = result {
                error!("Store {} failed healthcheck: {}", store, e);
                return Err(e.into());
            }
        }
        Ok(())
    }

    /// Remove all data from both stores, keeping their schemas
    pub async fn cleanup(&self) -> DatagenResult<()> {
        let mut first: Option<StoreError> = None;
        for (store, result) in self.coordinator.wipe_clean().await {
            match result {
                Ok(()) => debug!("Cleaned {}", store),
                Err(e) => {
                    first.get_or_insert(e);
                }
            }
        }
        match first {
            Some(e) => Err(e.into()),
            None => {
                info!("Cleanup complete");
                Ok(())
            }
        }
    }

    /// Generate the configured dataset and persist it round by round
    pub async fn run(&self, options: &RunOptions) -> DatagenResult<RunReport> {
        self.healthcheck().await?;
        if options.wipe_first {
            self.cleanup().await?;
        }

        let mut exporter = match &options.output_dir {
            Some(dir) => Some(CsvExporter::create(dir)?),
            None => None,
        };

        let mut report = RunReport::new();
        let per_round = self.config.generator.institutions_per_round.max(1);
        let mut generator = EntityGraphGenerator::from_config(self.config.generator.clone());
        let mut fragments = generator.fragments();
        let mut round = 0usize;

        loop {
            let mut batch = GeneratedBatch::new();
            let mut institutions = 0;
            for fragment in fragments.by_ref().take(per_round) {
                debug!(
                    "Fragment for institution {} with {} subsidiaries",
                    fragment.institution_id,
                    fragment.subsidiary_ids.len()
                );
                institutions += 1;
                batch.merge(fragment.batch);
            }
            if institutions == 0 {
                break;
            }
            round += 1;
            report.record_generated(&batch.counts());

            let rejections = self.validation.validate_batch(&batch);
            if !rejections.is_empty() {
                warn!(
                    "Round {} rejected: {} kind(s) failed validation",
                    round,
                    rejections.len()
                );
                report.record_rejections(&rejections);
                continue;
            }

            if let Some(exporter) = exporter.as_mut() {
                exporter.write_batch(&batch)?;
            }
            info!(
                "Round {}: persisting {} records for {} institutions",
                round,
                batch.len(),
                institutions
            );
            report.merge(self.coordinator.persist(batch).await);
        }

        if let Some(exporter) = exporter {
            exporter.finish()?;
        }
        for (store, reason) in &report.fatal {
            error!("Store {} failed fatally: {}", store, reason);
        }
        info!(
            "Run finished: {} rounds, {} failed items, {} rejected records",
            round,
            report.failed_items.len(),
            report.rejected.len()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CountRange;
    use crate::graph::mapping::rel;
    use crate::model::EntityKind;

    fn config(seed: u64) -> Config {
        let mut config = Config::default();
        config.store.database_url = "sqlite::memory:".to_string();
        config.generator.num_institutions = 3;
        config.generator.subsidiaries_per_institution = CountRange::new(1, 2);
        config.generator.transactions_per_account = CountRange::new(1, 4);
        config.generator.institutions_per_round = 2;
        config.generator.seed = Some(seed);
        config
    }

    #[tokio::test]
    async fn test_run_persists_every_round_in_both_stores() {
        let pipeline = DatasetPipeline::connect(config(42)).await.unwrap();
        let report = pipeline.run(&RunOptions::default()).await.unwrap();

        assert!(!report.is_fatal());
        assert!(report.failed_items.is_empty(), "{:?}", report.failed_items);
        assert_eq!(report.rejected_rounds, 0);
        for (kind, generated) in &report.generated {
            for store in ["relational", "graph"] {
                assert_eq!(report.tally(*kind, store).succeeded, *generated);
            }
            assert_eq!(pipeline.relational().count(*kind).await.unwrap(), *generated as u64);
        }
        assert_eq!(report.generated[&EntityKind::Institution], 3);
        assert_eq!(
            pipeline.graph().count_relationships(rel::OWNS_SUBSIDIARY).await.unwrap(),
            report.generated[&EntityKind::Subsidiary] as u64
        );
    }

    #[tokio::test]
    async fn test_rerun_with_same_seed_is_idempotent() {
        let pipeline = DatasetPipeline::connect(config(7)).await.unwrap();
        let options = RunOptions {
            wipe_first: false,
            output_dir: None,
        };
        let first = pipeline.run(&options).await.unwrap();
        let second = pipeline.run(&options).await.unwrap();
        assert_eq!(first.generated, second.generated);
        for (kind, generated) in &first.generated {
            assert_eq!(pipeline.relational().count(*kind).await.unwrap(), *generated as u64);
            assert_eq!(pipeline.graph().count(*kind).await.unwrap(), *generated as u64);
        }
    }

    #[tokio::test]
    async fn test_cleanup_empties_both_stores() {
        let pipeline = DatasetPipeline::connect(config(5)).await.unwrap();
        pipeline.run(&RunOptions::default()).await.unwrap();
        pipeline.cleanup().await.unwrap();
        for kind in EntityKind::WRITE_ORDER {
            assert_eq!(pipeline.relational().count(kind).await.unwrap(), 0);
            assert_eq!(pipeline.graph().count(kind).await.unwrap(), 0);
        }
        pipeline.healthcheck().await.unwrap();
    }

    #[tokio::test]
    async fn test_export_writes_accepted_rounds() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = DatasetPipeline::connect(config(6)).await.unwrap();
        let options = RunOptions {
            wipe_first: true,
            output_dir: Some(dir.path().to_path_buf()),
        };
        let report = pipeline.run(&options).await.unwrap();
        assert!(report.generated.keys().all(|kind| dir
            .path()
            .join(format!("{}.csv", kind.table_name()))
            .exists()));
    }

    #[tokio::test]
    async fn test_missing_schema_fails_healthcheck() {
        let relational = RelationalStoreAdapter::in_memory().await.unwrap();
        let graph = GraphStoreAdapter::embedded();
        graph.ensure_schema().await.unwrap();
        let pipeline = DatasetPipeline::with_stores(config(1), relational, graph);
        let err = pipeline.run(&RunOptions::default()).await.unwrap_err();
        assert!(err.is_fatal());
    }
}
