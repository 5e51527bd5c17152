//! Graph backends
//!
//! [`GraphBackend`] is the seam between the graph store adapter and a concrete
//! graph engine. [`EmbeddedGraph`] keeps a [`GraphStore`] in process and can
//! mirror it to a JSON snapshot file between runs.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::mapping::{Direction, EndpointMode, RecordWrite};
use super::store::{GraphError, GraphResult, GraphSnapshot, GraphStore};
use super::types::{EdgeType, Label, NodeId};

/// A per-record write failure: index into the written slice and its cause
pub type WriteFault = (usize, GraphError);

#[async_trait]
pub trait GraphBackend: Send + Sync {
    fn name(&self) -> &str;

    async fn ping(&self) -> GraphResult<()>;

    /// Create the uniqueness constraints that are missing
    async fn ensure_constraints(&self, constraints: &[(Label, &'static str)]) -> GraphResult<()>;

    /// Labels among `constraints` that have no uniqueness constraint yet
    async fn missing_constraints(
        &self,
        constraints: &[(Label, &'static str)],
    ) -> GraphResult<Vec<Label>>;

    /// Write each record atomically; failed records are returned, the rest are kept
    async fn write(&self, writes: &[RecordWrite]) -> GraphResult<Vec<WriteFault>>;

    async fn count_nodes(&self, label: &Label) -> GraphResult<u64>;

    async fn count_relationships(&self, rel_type: &EdgeType) -> GraphResult<u64>;

    /// Delete every node and relationship; constraints stay
    async fn clear(&self) -> GraphResult<()>;

    async fn flush(&self) -> GraphResult<()> {
        Ok(())
    }
}

/// In-process graph with optional snapshot file
pub struct EmbeddedGraph {
    store: Arc<RwLock<GraphStore>>,
    snapshot: Option<PathBuf>,
}

impl Default for EmbeddedGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddedGraph {
    /// Empty, memory-only graph
    pub fn new() -> Self {
        EmbeddedGraph {
            store: Arc::new(RwLock::new(GraphStore::new())),
            snapshot: None,
        }
    }

    /// Graph backed by `path`, loaded from it when the file exists
    pub async fn open(path: impl AsRef<Path>) -> GraphResult<Self> {
        let path = path.as_ref().to_path_buf();
        let store = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let snapshot: GraphSnapshot = serde_json::from_slice(&bytes)
                    .map_err(|e| GraphError::Snapshot(format!("{}: {}", path.display(), e)))?;
                let store = GraphStore::from_snapshot(snapshot)?;
                info!(
                    "Loaded graph snapshot {} ({} nodes, {} edges)",
                    path.display(),
                    store.node_count(),
                    store.edge_count()
                );
                store
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => GraphStore::new(),
            Err(e) => return Err(GraphError::Snapshot(format!("{}: {}", path.display(), e))),
        };
        Ok(EmbeddedGraph {
            store: Arc::new(RwLock::new(store)),
            snapshot: Some(path),
        })
    }

    /// Shared handle to the underlying store
    pub fn store(&self) -> Arc<RwLock<GraphStore>> {
        Arc::clone(&self.store)
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot.as_deref()
    }
}

/// Apply one record write, all or nothing
fn apply(store: &mut GraphStore, write: &RecordWrite) -> GraphResult<()> {
    // Resolve required endpoints before touching the graph
    let mut existing: Vec<Option<NodeId>> = Vec::with_capacity(write.relationships.len());
    for rel in &write.relationships {
        match rel.mode {
            EndpointMode::Existing => {
                let id = store
                    .find_node(&rel.other.label, &rel.other.value)
                    .ok_or_else(|| GraphError::MissingEndpoint {
                        label: rel.other.label.clone(),
                        key: rel.other.key.to_string(),
                        value: rel.other.value.clone(),
                    })?;
                existing.push(Some(id));
            }
            EndpointMode::Merge => {
                if store.constraint(&rel.other.label).is_none() {
                    return Err(GraphError::Unconstrained(rel.other.label.clone()));
                }
                existing.push(None);
            }
        }
    }
    if store.constraint(&write.node.label).is_none() {
        return Err(GraphError::Unconstrained(write.node.label.clone()));
    }

    let node = store.merge_node(write.node.label.clone(), write.properties.clone())?;
    for (rel, found) in write.relationships.iter().zip(existing) {
        let other = match found {
            Some(id) => id,
            None => store.merge_node(rel.other.label.clone(), rel.endpoint_properties())?,
        };
        let (source, target) = match rel.direction {
            Direction::Outgoing => (node, other),
            Direction::Incoming => (other, node),
        };
        store.merge_edge(source, target, rel.rel_type.clone(), rel.properties.clone())?;
    }
    Ok(())
}

#[async_trait]
impl GraphBackend for EmbeddedGraph {
    fn name(&self) -> &str {
        "embedded"
    }

    async fn ping(&self) -> GraphResult<()> {
        Ok(())
    }

    async fn ensure_constraints(&self, constraints: &[(Label, &'static str)]) -> GraphResult<()> {
        let mut store = self.store.write().await;
        for (label, key) in constraints {
            store.create_unique_constraint(label.clone(), *key)?;
        }
        Ok(())
    }

    async fn missing_constraints(
        &self,
        constraints: &[(Label, &'static str)],
    ) -> GraphResult<Vec<Label>> {
        let store = self.store.read().await;
        Ok(constraints
            .iter()
            .filter(|(label, key)| store.constraint(label) != Some(*key))
            .map(|(label, _)| label.clone())
            .collect())
    }

    async fn write(&self, writes: &[RecordWrite]) -> GraphResult<Vec<WriteFault>> {
        let mut store = self.store.write().await;
        let mut faults = Vec::new();
        for (index, write) in writes.iter().enumerate() {
            if let Err(e) = apply(&mut store, write) {
                if matches!(e, GraphError::Unconstrained(_)) || e.is_fatal() {
                    return Err(e);
                }
                debug!("{} {} not written: {}", write.node.label, write.node.value, e);
                faults.push((index, e));
            }
        }
        Ok(faults)
    }

    async fn count_nodes(&self, label: &Label) -> GraphResult<u64> {
        Ok(self.store.read().await.count_label(label) as u64)
    }

    async fn count_relationships(&self, rel_type: &EdgeType) -> GraphResult<u64> {
        Ok(self.store.read().await.count_edge_type(rel_type) as u64)
    }

    async fn clear(&self) -> GraphResult<()> {
        self.store.write().await.clear();
        self.flush().await
    }

    async fn flush(&self) -> GraphResult<()> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };
        let snapshot = self.store.read().await.snapshot();
        let bytes = serde_json::to_vec(&snapshot)
            .map_err(|e| GraphError::Snapshot(e.to_string()))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| GraphError::Snapshot(format!("{}: {}", parent.display(), e)))?;
        }
        tokio::fs::write(path, bytes)
            .await
            .map_err(|e| GraphError::Snapshot(format!("{}: {}", path.display(), e)))?;
        debug!("Wrote graph snapshot {}", path.display());
        Ok(())
    }
}
