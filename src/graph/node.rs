//! Graph nodes

use super::property::{PropertyMap, PropertyValue};
use super::types::{Label, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A node with one or more labels and a property map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,

    pub labels: HashSet<Label>,

    pub properties: PropertyMap,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Last update timestamp (Unix milliseconds)
    pub updated_at: i64,
}

impl Node {
    pub fn new(id: NodeId, label: impl Into<Label>) -> Self {
        Self::new_with_properties(id, vec![label.into()], PropertyMap::new())
    }

    pub fn new_with_properties(id: NodeId, labels: Vec<Label>, properties: PropertyMap) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Node {
            id,
            labels: labels.into_iter().collect(),
            properties,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_label(&self, label: &Label) -> bool {
        self.labels.contains(label)
    }

    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    pub fn set_property(
        &mut self,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Option<PropertyValue> {
        let old = self.properties.insert(key.into(), value.into());
        self.touch();
        old
    }

    pub fn get_property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Overwrite with every property of `properties`; properties absent from it are kept
    pub fn merge_properties(&mut self, properties: PropertyMap) {
        if properties.is_empty() {
            return;
        }
        self.properties.extend(properties);
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().timestamp_millis();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_labels_and_properties() {
        let mut node = Node::new(NodeId::new(1), "Institution");
        assert!(node.has_label(&Label::new("Institution")));
        assert_eq!(node.label_count(), 1);

        assert!(node.set_property("legal_name", "Acme Bank").is_none());
        let old = node.set_property("legal_name", "Acme Bank plc");
        assert_eq!(old.and_then(|v| v.as_string().map(String::from)), Some("Acme Bank".to_string()));
    }

    #[test]
    fn test_merge_keeps_absent_properties() {
        let mut node = Node::new(NodeId::new(2), "Account");
        node.set_property("balance", 10.0);
        node.set_property("currency", "USD");

        let mut update = PropertyMap::new();
        update.insert("balance".to_string(), 25.0.into());
        node.merge_properties(update);

        assert_eq!(node.get_property("balance").and_then(|v| v.as_float()), Some(25.0));
        assert_eq!(node.get_property("currency").and_then(|v| v.as_string()), Some("USD"));
        assert!(node.updated_at >= node.created_at);
    }
}
