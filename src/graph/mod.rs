//! Graph store
//!
//! - [`GraphStore`]: in-memory property graph with uniqueness constraints and
//!   merge-by-key for nodes and relationships
//! - [`mapping`]: how each record kind becomes a node and its relationships
//! - [`GraphBackend`]: embedded engine, or Neo4j with the `neo4j` feature
//! - [`GraphStoreAdapter`]: the store adapter the coordinator writes through

pub mod adapter;
pub mod backend;
pub mod edge;
pub mod mapping;
#[cfg(feature = "neo4j")]
pub mod neo4j;
pub mod node;
pub mod property;
pub mod store;
pub mod types;

pub use adapter::GraphStoreAdapter;
pub use backend::{EmbeddedGraph, GraphBackend};
pub use edge::Edge;
pub use node::Node;
pub use property::{PropertyMap, PropertyValue};
pub use store::{GraphError, GraphResult, GraphSnapshot, GraphStore};
pub use types::{EdgeId, EdgeType, Label, NodeId};
