//! Graph half of the dual store

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use super::backend::{EmbeddedGraph, GraphBackend};
use super::mapping::{self, RecordWrite};
use super::store::GraphError;
use super::types::{EdgeType, Label};
use crate::config::{GraphBackendKind, StoreConfig};
use crate::model::{EntityKind, Record};
use crate::persistence::{RecordFault, StoreAdapter, StoreError, StoreResult};

/// Writes records as nodes and relationships through a [`GraphBackend`]
pub struct GraphStoreAdapter {
    backend: Arc<dyn GraphBackend>,
}

impl GraphStoreAdapter {
    pub fn new(backend: Arc<dyn GraphBackend>) -> Self {
        GraphStoreAdapter { backend }
    }

    /// Memory-only embedded graph
    pub fn embedded() -> Self {
        Self::new(Arc::new(EmbeddedGraph::new()))
    }

    /// Backend selected by `config.graph_backend`
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        let backend: Arc<dyn GraphBackend> = match config.graph_backend {
            GraphBackendKind::Embedded => match &config.graph_snapshot {
                Some(path) => Arc::new(EmbeddedGraph::open(path).await.map_err(store_error)?),
                None => Arc::new(EmbeddedGraph::new()),
            },
            GraphBackendKind::Neo4j => neo4j_backend(config).await?,
        };
        info!("Graph store using {} backend", backend.name());
        Ok(Self::new(backend))
    }

    pub fn backend(&self) -> &Arc<dyn GraphBackend> {
        &self.backend
    }

    /// Create the uniqueness constraint of every label
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        self.backend
            .ensure_constraints(&mapping::constraints())
            .await
            .map_err(|e| match e {
                GraphError::Connection(msg) => StoreError::Connection(msg),
                other => StoreError::Schema(other.to_string()),
            })
    }

    pub async fn count_relationships(&self, rel_type: &str) -> StoreResult<u64> {
        self.backend
            .count_relationships(&EdgeType::new(rel_type))
            .await
            .map_err(store_error)
    }
}

#[cfg(feature = "neo4j")]
async fn neo4j_backend(config: &StoreConfig) -> StoreResult<Arc<dyn GraphBackend>> {
    let graph = super::neo4j::Neo4jGraph::connect(
        &config.neo4j_uri,
        &config.neo4j_user,
        &config.neo4j_password,
    )
    .await
    .map_err(store_error)?;
    Ok(Arc::new(graph))
}

#[cfg(not(feature = "neo4j"))]
async fn neo4j_backend(_config: &StoreConfig) -> StoreResult<Arc<dyn GraphBackend>> {
    Err(StoreError::Connection(
        "neo4j backend requested but finsynth was built without the `neo4j` feature".to_string(),
    ))
}

/// Map a graph error onto the store error taxonomy
fn store_error(err: GraphError) -> StoreError {
    match err {
        GraphError::Connection(msg) => StoreError::Connection(msg),
        GraphError::Snapshot(msg) => StoreError::Connection(format!("snapshot: {}", msg)),
        GraphError::Unconstrained(label) => {
            StoreError::Schema(format!("no uniqueness constraint on {}", label))
        }
        other => StoreError::Batch(other.to_string()),
    }
}

#[async_trait]
impl StoreAdapter for GraphStoreAdapter {
    fn name(&self) -> &str {
        "graph"
    }

    async fn healthcheck(&self) -> StoreResult<()> {
        self.backend.ping().await.map_err(store_error)?;
        let missing = self
            .backend
            .missing_constraints(&mapping::constraints())
            .await
            .map_err(store_error)?;
        if missing.is_empty() {
            Ok(())
        } else {
            let labels: Vec<&str> = missing.iter().map(Label::as_str).collect();
            Err(StoreError::Schema(format!(
                "missing uniqueness constraint(s) on {}",
                labels.join(", ")
            )))
        }
    }

    async fn upsert_batch(
        &self,
        kind: EntityKind,
        records: &[Record],
    ) -> StoreResult<Vec<RecordFault>> {
        let mut faults = Vec::new();
        let mut writes: Vec<RecordWrite> = Vec::with_capacity(records.len());
        let mut positions = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            if record.kind() == kind {
                writes.push(mapping::record_write(record));
                positions.push(index);
            } else {
                faults.push(RecordFault::new(
                    index,
                    format!("expected a {} record, got {}", kind, record.kind()),
                ));
            }
        }

        let failed = self.backend.write(&writes).await.map_err(store_error)?;
        faults.extend(
            failed
                .into_iter()
                .filter_map(|(i, e)| positions.get(i).map(|index| RecordFault::new(*index, e.to_string()))),
        );
        faults.sort_by_key(|f| f.index);
        Ok(faults)
    }

    async fn count(&self, kind: EntityKind) -> StoreResult<u64> {
        self.backend
            .count_nodes(&Label::new(kind.label()))
            .await
            .map_err(store_error)
    }

    async fn wipe_clean(&self) -> StoreResult<()> {
        self.backend.clear().await.map_err(store_error)?;
        info!("Wiped graph store");
        Ok(())
    }

    async fn flush(&self) -> StoreResult<()> {
        self.backend.flush().await.map_err(store_error)
    }
}
