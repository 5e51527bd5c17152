//! Directed, typed relationships

use super::property::{PropertyMap, PropertyValue};
use super::types::{EdgeId, EdgeType, NodeId};
use serde::{Deserialize, Serialize};

/// A directed edge from `source` to `target`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    pub edge_type: EdgeType,
    pub properties: PropertyMap,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,
}

impl Edge {
    pub fn new(id: EdgeId, source: NodeId, target: NodeId, edge_type: impl Into<EdgeType>) -> Self {
        Self::new_with_properties(id, source, target, edge_type, PropertyMap::new())
    }

    pub fn new_with_properties(
        id: EdgeId,
        source: NodeId,
        target: NodeId,
        edge_type: impl Into<EdgeType>,
        properties: PropertyMap,
    ) -> Self {
        Edge {
            id,
            source,
            target,
            edge_type: edge_type.into(),
            properties,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn get_property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    pub fn merge_properties(&mut self, properties: PropertyMap) {
        self.properties.extend(properties);
    }

    pub fn starts_from(&self, node: NodeId) -> bool {
        self.source == node
    }

    pub fn ends_at(&self, node: NodeId) -> bool {
        self.target == node
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_direction() {
        let edge = Edge::new(EdgeId::new(1), NodeId::new(10), NodeId::new(20), "HAS_ACCOUNT");
        assert!(edge.starts_from(NodeId::new(10)));
        assert!(edge.ends_at(NodeId::new(20)));
        assert!(!edge.starts_from(NodeId::new(20)));
        assert_eq!(edge.edge_type, EdgeType::new("HAS_ACCOUNT"));
    }

    #[test]
    fn test_edge_property_merge() {
        let mut props = PropertyMap::new();
        props.insert("ownership_percentage".to_string(), 60.0.into());
        let mut edge = Edge::new_with_properties(
            EdgeId::new(2),
            NodeId::new(1),
            NodeId::new(2),
            "OWNS_SUBSIDIARY",
            props,
        );

        let mut update = PropertyMap::new();
        update.insert("ownership_percentage".to_string(), 75.0.into());
        edge.merge_properties(update);
        assert_eq!(
            edge.get_property("ownership_percentage").and_then(|v| v.as_float()),
            Some(75.0)
        );
    }
}
