//! In-memory property graph
//!
//! Hash maps hold nodes and edges, with adjacency lists, a label index and an
//! edge-type index. Labels can carry a uniqueness constraint on one key
//! property; constrained nodes are looked up and merged by that key, and
//! relationships are merged by `(source, target, type)`.

use super::edge::Edge;
use super::node::Node;
use super::property::{PropertyMap, PropertyValue};
use super::types::{EdgeId, EdgeType, Label, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Errors that can occur during graph operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Node {0} not found")]
    NodeNotFound(NodeId),

    #[error("Edge {0} not found")]
    EdgeNotFound(EdgeId),

    #[error("Invalid edge: source node {0} does not exist")]
    InvalidEdgeSource(NodeId),

    #[error("Invalid edge: target node {0} does not exist")]
    InvalidEdgeTarget(NodeId),

    #[error("Unique constraint violation: {label}.{key} = {value} already exists")]
    UniqueConstraintViolation {
        label: Label,
        key: String,
        value: String,
    },

    #[error("Node {label} has no value for key property {key}")]
    MissingKey { label: Label, key: String },

    #[error("No unique constraint on label {0}")]
    Unconstrained(Label),

    #[error("Missing endpoint: no {label} with {key} = {value}")]
    MissingEndpoint {
        label: Label,
        key: String,
        value: String,
    },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// A statement failed inside the graph engine
    #[error("Backend error: {0}")]
    Backend(String),
}

impl GraphError {
    /// Errors after which no further write can succeed
    pub fn is_fatal(&self) -> bool {
        matches!(self, GraphError::Connection(_) | GraphError::Snapshot(_))
    }
}

pub type GraphResult<T> = Result<T, GraphError>;

/// Serializable copy of a whole graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub constraints: Vec<(Label, String)>,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

#[derive(Debug, Default)]
pub struct GraphStore {
    nodes: HashMap<NodeId, Node>,

    edges: HashMap<EdgeId, Edge>,

    outgoing: HashMap<NodeId, Vec<EdgeId>>,

    incoming: HashMap<NodeId, Vec<EdgeId>>,

    label_index: HashMap<Label, HashSet<NodeId>>,

    edge_type_index: HashMap<EdgeType, HashSet<EdgeId>>,

    /// Unique key property per constrained label
    constraints: HashMap<Label, String>,

    /// (label, key text) -> node, for constrained labels
    key_index: HashMap<(Label, String), NodeId>,

    /// (source, target, type) -> edge
    edge_key_index: HashMap<(NodeId, NodeId, EdgeType), EdgeId>,

    next_node_id: u64,

    next_edge_id: u64,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ============================================================
    // Constraints
    // ============================================================

    /// Declare `key` unique for `label`; a no-op when already declared.
    ///
    /// Existing nodes of the label are indexed; duplicates among them fail.
    pub fn create_unique_constraint(
        &mut self,
        label: impl Into<Label>,
        key: impl Into<String>,
    ) -> GraphResult<()> {
        let label = label.into();
        let key = key.into();
        if self.constraints.get(&label) == Some(&key) {
            return Ok(());
        }

        let mut index = Vec::new();
        for node in self.get_nodes_by_label(&label) {
            let value = node
                .get_property(&key)
                .filter(|v| !v.is_null())
                .ok_or_else(|| GraphError::MissingKey {
                    label: label.clone(),
                    key: key.clone(),
                })?
                .key_text();
            if index.iter().any(|(v, _)| *v == value) {
                return Err(GraphError::UniqueConstraintViolation {
                    label: label.clone(),
                    key: key.clone(),
                    value,
                });
            }
            index.push((value, node.id));
        }

        for (value, id) in index {
            self.key_index.insert((label.clone(), value), id);
        }
        self.constraints.insert(label, key);
        Ok(())
    }

    pub fn constraint(&self, label: &Label) -> Option<&str> {
        self.constraints.get(label).map(String::as_str)
    }

    pub fn constraints(&self) -> impl Iterator<Item = (&Label, &str)> {
        self.constraints.iter().map(|(l, k)| (l, k.as_str()))
    }

    // ============================================================
    // Nodes
    // ============================================================

    /// Node of a constrained label by its key value
    pub fn find_node(&self, label: &Label, key_value: &str) -> Option<NodeId> {
        self.key_index
            .get(&(label.clone(), key_value.to_string()))
            .copied()
    }

    /// Create a node; constrained labels must not repeat a key value
    pub fn create_node(&mut self, labels: Vec<Label>, properties: PropertyMap) -> GraphResult<NodeId> {
        let keys = self.constrained_keys(&labels, &properties)?;
        for (label, value) in &keys {
            if self.key_index.contains_key(&(label.clone(), value.clone())) {
                return Err(GraphError::UniqueConstraintViolation {
                    label: label.clone(),
                    key: self.constraints.get(label).cloned().unwrap_or_default(),
                    value: value.clone(),
                });
            }
        }

        self.next_node_id += 1;
        let node_id = NodeId::new(self.next_node_id);
        for label in &labels {
            self.label_index.entry(label.clone()).or_default().insert(node_id);
        }
        for key in keys {
            self.key_index.insert(key, node_id);
        }
        self.nodes
            .insert(node_id, Node::new_with_properties(node_id, labels, properties));
        Ok(node_id)
    }

    /// Create or update the node of `label` whose key property matches
    pub fn merge_node(&mut self, label: impl Into<Label>, properties: PropertyMap) -> GraphResult<NodeId> {
        let label = label.into();
        let key = self
            .constraints
            .get(&label)
            .ok_or_else(|| GraphError::Unconstrained(label.clone()))?;
        let value = properties
            .get(key)
            .filter(|v| !v.is_null())
            .map(PropertyValue::key_text)
            .ok_or_else(|| GraphError::MissingKey {
                label: label.clone(),
                key: key.clone(),
            })?;

        match self.find_node(&label, &value) {
            Some(id) => {
                if let Some(node) = self.nodes.get_mut(&id) {
                    node.merge_properties(properties);
                }
                Ok(id)
            }
            None => self.create_node(vec![label], properties),
        }
    }

    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn has_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn get_nodes_by_label(&self, label: &Label) -> Vec<&Node> {
        self.label_index
            .get(label)
            .map(|ids| ids.iter().filter_map(|id| self.nodes.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn count_label(&self, label: &Label) -> usize {
        self.label_index.get(label).map_or(0, HashSet::len)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn constrained_keys(
        &self,
        labels: &[Label],
        properties: &PropertyMap,
    ) -> GraphResult<Vec<(Label, String)>> {
        let mut keys = Vec::new();
        for label in labels {
            if let Some(key) = self.constraints.get(label) {
                let value = properties
                    .get(key)
                    .filter(|v| !v.is_null())
                    .ok_or_else(|| GraphError::MissingKey {
                        label: label.clone(),
                        key: key.clone(),
                    })?;
                keys.push((label.clone(), value.key_text()));
            }
        }
        Ok(keys)
    }

    // ============================================================
    // Edges
    // ============================================================

    pub fn create_edge(
        &mut self,
        source: NodeId,
        target: NodeId,
        edge_type: impl Into<EdgeType>,
        properties: PropertyMap,
    ) -> GraphResult<EdgeId> {
        if !self.has_node(source) {
            return Err(GraphError::InvalidEdgeSource(source));
        }
        if !self.has_node(target) {
            return Err(GraphError::InvalidEdgeTarget(target));
        }

        self.next_edge_id += 1;
        let edge_id = EdgeId::new(self.next_edge_id);
        let edge_type = edge_type.into();

        self.outgoing.entry(source).or_default().push(edge_id);
        self.incoming.entry(target).or_default().push(edge_id);
        self.edge_type_index
            .entry(edge_type.clone())
            .or_default()
            .insert(edge_id);
        self.edge_key_index
            .entry((source, target, edge_type.clone()))
            .or_insert(edge_id);
        self.edges.insert(
            edge_id,
            Edge::new_with_properties(edge_id, source, target, edge_type, properties),
        );
        Ok(edge_id)
    }

    /// Create the `(source)-[type]->(target)` edge, or update its properties if present
    pub fn merge_edge(
        &mut self,
        source: NodeId,
        target: NodeId,
        edge_type: impl Into<EdgeType>,
        properties: PropertyMap,
    ) -> GraphResult<EdgeId> {
        let edge_type = edge_type.into();
        let existing = self
            .edge_key_index
            .get(&(source, target, edge_type.clone()))
            .copied();
        match existing {
            Some(id) => {
                let edge = self.edges.get_mut(&id).ok_or(GraphError::EdgeNotFound(id))?;
                edge.merge_properties(properties);
                Ok(id)
            }
            None => self.create_edge(source, target, edge_type, properties),
        }
    }

    pub fn get_edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    pub fn get_outgoing_edges(&self, node_id: NodeId) -> Vec<&Edge> {
        self.outgoing
            .get(&node_id)
            .map(|ids| ids.iter().filter_map(|id| self.edges.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn get_incoming_edges(&self, node_id: NodeId) -> Vec<&Edge> {
        self.incoming
            .get(&node_id)
            .map(|ids| ids.iter().filter_map(|id| self.edges.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn get_edges_by_type(&self, edge_type: &EdgeType) -> Vec<&Edge> {
        self.edge_type_index
            .get(edge_type)
            .map(|ids| ids.iter().filter_map(|id| self.edges.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn count_edge_type(&self, edge_type: &EdgeType) -> usize {
        self.edge_type_index.get(edge_type).map_or(0, HashSet::len)
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    // ============================================================
    // Whole-graph operations
    // ============================================================

    /// Remove every node and edge; constraints stay declared
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.outgoing.clear();
        self.incoming.clear();
        self.label_index.clear();
        self.edge_type_index.clear();
        self.key_index.clear();
        self.edge_key_index.clear();
        self.next_node_id = 0;
        self.next_edge_id = 0;
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        let mut nodes: Vec<Node> = self.nodes.values().cloned().collect();
        nodes.sort_by_key(|n| n.id);
        let mut edges: Vec<Edge> = self.edges.values().cloned().collect();
        edges.sort_by_key(|e| e.id);
        let mut constraints: Vec<(Label, String)> = self
            .constraints
            .iter()
            .map(|(l, k)| (l.clone(), k.clone()))
            .collect();
        constraints.sort();
        GraphSnapshot {
            constraints,
            nodes,
            edges,
        }
    }

    /// Rebuild a store, indices included, from a snapshot
    pub fn from_snapshot(snapshot: GraphSnapshot) -> GraphResult<Self> {
        let mut store = GraphStore::new();
        for (label, key) in snapshot.constraints {
            store.constraints.insert(label, key);
        }
        for node in snapshot.nodes {
            let keys = store.constrained_keys(&node.labels.iter().cloned().collect::<Vec<_>>(), &node.properties)?;
            for key in keys {
                if store.key_index.insert(key.clone(), node.id).is_some() {
                    return Err(GraphError::UniqueConstraintViolation {
                        key: store.constraints.get(&key.0).cloned().unwrap_or_default(),
                        label: key.0,
                        value: key.1,
                    });
                }
            }
            for label in &node.labels {
                store.label_index.entry(label.clone()).or_default().insert(node.id);
            }
            store.next_node_id = store.next_node_id.max(node.id.as_u64());
            store.nodes.insert(node.id, node);
        }
        for edge in snapshot.edges {
            if !store.has_node(edge.source) {
                return Err(GraphError::InvalidEdgeSource(edge.source));
            }
            if !store.has_node(edge.target) {
                return Err(GraphError::InvalidEdgeTarget(edge.target));
            }
            store.outgoing.entry(edge.source).or_default().push(edge.id);
            store.incoming.entry(edge.target).or_default().push(edge.id);
            store
                .edge_type_index
                .entry(edge.edge_type.clone())
                .or_default()
                .insert(edge.id);
            store
                .edge_key_index
                .entry((edge.source, edge.target, edge.edge_type.clone()))
                .or_insert(edge.id);
            store.next_edge_id = store.next_edge_id.max(edge.id.as_u64());
            store.edges.insert(edge.id, edge);
        }
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(pairs: &[(&str, PropertyValue)]) -> PropertyMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn constrained() -> GraphStore {
        let mut store = GraphStore::new();
        store.create_unique_constraint("Account", "account_id").unwrap();
        store.create_unique_constraint("Country", "code").unwrap();
        store
    }

    #[test]
    fn test_create_and_get_edge() {
        let mut store = GraphStore::new();
        let a = store.create_node(vec![Label::new("Institution")], PropertyMap::new()).unwrap();
        let b = store.create_node(vec![Label::new("Account")], PropertyMap::new()).unwrap();

        let edge_id = store.create_edge(a, b, "HAS_ACCOUNT", PropertyMap::new()).unwrap();
        let edge = store.get_edge(edge_id).unwrap();
        assert_eq!(edge.source, a);
        assert_eq!(edge.target, b);
        assert_eq!(store.get_outgoing_edges(a).len(), 1);
        assert_eq!(store.get_incoming_edges(b).len(), 1);
        assert_eq!(store.count_edge_type(&EdgeType::new("HAS_ACCOUNT")), 1);
    }

    #[test]
    fn test_edge_validation() {
        let mut store = GraphStore::new();
        let a = store.create_node(vec![Label::new("Account")], PropertyMap::new()).unwrap();
        let missing = NodeId::new(999);
        assert_eq!(
            store.create_edge(missing, a, "SENT", PropertyMap::new()),
            Err(GraphError::InvalidEdgeSource(missing))
        );
        assert_eq!(
            store.create_edge(a, missing, "SENT", PropertyMap::new()),
            Err(GraphError::InvalidEdgeTarget(missing))
        );
    }

    #[test]
    fn test_merge_node_by_key() {
        let mut store = constrained();
        let first = store
            .merge_node("Account", props(&[("account_id", "a1".into()), ("balance", 10.0.into())]))
            .unwrap();
        let second = store
            .merge_node("Account", props(&[("account_id", "a1".into()), ("balance", 20.0.into())]))
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(store.count_label(&Label::new("Account")), 1);
        let node = store.get_node(first).unwrap();
        assert_eq!(node.get_property("balance").and_then(|v| v.as_float()), Some(20.0));
        assert_eq!(store.find_node(&Label::new("Account"), "a1"), Some(first));
    }

    #[test]
    fn test_merge_requires_constraint_and_key() {
        let mut store = constrained();
        assert!(matches!(
            store.merge_node("Document", PropertyMap::new()),
            Err(GraphError::Unconstrained(_))
        ));
        assert!(matches!(
            store.merge_node("Account", props(&[("balance", 1.0.into())])),
            Err(GraphError::MissingKey { .. })
        ));
    }

    #[test]
    fn test_create_node_respects_constraint() {
        let mut store = constrained();
        store
            .create_node(vec![Label::new("Country")], props(&[("code", "US".into())]))
            .unwrap();
        let err = store
            .create_node(vec![Label::new("Country")], props(&[("code", "US".into())]))
            .unwrap_err();
        assert!(matches!(err, GraphError::UniqueConstraintViolation { .. }));
    }

    #[test]
    fn test_merge_edge_is_idempotent() {
        let mut store = constrained();
        let a = store.merge_node("Account", props(&[("account_id", "a".into())])).unwrap();
        let c = store.merge_node("Country", props(&[("code", "DE".into())])).unwrap();

        let e1 = store.merge_edge(a, c, "IN", props(&[("since", 1i64.into())])).unwrap();
        let e2 = store.merge_edge(a, c, "IN", props(&[("since", 2i64.into())])).unwrap();
        assert_eq!(e1, e2);
        assert_eq!(store.edge_count(), 1);
        assert_eq!(
            store.get_edge(e1).and_then(|e| e.get_property("since")).and_then(|v| v.as_integer()),
            Some(2)
        );
    }

    #[test]
    fn test_clear_keeps_constraints() {
        let mut store = constrained();
        store.merge_node("Country", props(&[("code", "FR".into())])).unwrap();
        store.clear();
        assert_eq!(store.node_count(), 0);
        assert_eq!(store.constraint(&Label::new("Country")), Some("code"));
        assert!(store.find_node(&Label::new("Country"), "FR").is_none());
    }

    #[test]
    fn test_snapshot_round_trip_keeps_indices() {
        let mut store = constrained();
        let a = store.merge_node("Account", props(&[("account_id", "x".into())])).unwrap();
        let c = store.merge_node("Country", props(&[("code", "JP".into())])).unwrap();
        store.merge_edge(a, c, "IN", PropertyMap::new()).unwrap();

        let json = serde_json::to_string(&store.snapshot()).unwrap();
        let snapshot: GraphSnapshot = serde_json::from_str(&json).unwrap();
        let mut restored = GraphStore::from_snapshot(snapshot).unwrap();

        assert_eq!(restored.find_node(&Label::new("Country"), "JP"), Some(c));
        restored.merge_edge(a, c, "IN", PropertyMap::new()).unwrap();
        assert_eq!(restored.edge_count(), 1);
        let fresh = restored.merge_node("Country", props(&[("code", "IT".into())])).unwrap();
        assert!(fresh.as_u64() > c.as_u64());
    }

    #[test]
    fn test_constraint_over_existing_duplicates_fails() {
        let mut store = GraphStore::new();
        for _ in 0..2 {
            store
                .create_node(vec![Label::new("Country")], props(&[("code", "US".into())]))
                .unwrap();
        }
        assert!(matches!(
            store.create_unique_constraint("Country", "code"),
            Err(GraphError::UniqueConstraintViolation { .. })
        ));
    }
}
