//! finsynth: synthetic financial-institution datasets
//!
//! Generates a referentially consistent graph of institutions, subsidiaries
//! and their satellite records (addresses, beneficial owners, risk
//! assessments, authorized persons, documents, jurisdiction presences,
//! accounts, transactions and compliance events) and persists it to two stores
//! at once: a relational database and a property graph.
//!
//! # Architecture
//!
//! - [`factory`]: produces one record of a kind, honoring date and ownership constraints
//! - [`generator`]: drives the factory in dependency order, one fragment per institution
//! - [`validation`]: per-kind rule tables checked before any write
//! - [`persistence`]: the store contract and the batch coordinator
//! - [`relational`]: SQLite store through `sqlx`
//! - [`graph`]: embedded property graph, or Neo4j with the `neo4j` feature
//! - [`pipeline`]: the end-to-end run
//!
//! ## Example Usage
//!
//! ```rust
//! use finsynth::{CountRange, EntityGraphGenerator, EntityKind, GeneratorConfig, ValidationLayer};
//!
//! let config = GeneratorConfig {
//!     num_institutions: 1,
//!     transactions_per_account: CountRange::new(1, 3),
//!     seed: Some(42),
//!     ..GeneratorConfig::default()
//! };
//! let layer = ValidationLayer::for_config(&config);
//! let batch = EntityGraphGenerator::from_config(config).generate();
//! assert_eq!(batch.count(EntityKind::Institution), 1);
//! assert!(layer.validate_batch(&batch).is_empty());
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod export;
pub mod factory;
pub mod generator;
pub mod graph;
pub mod model;
pub mod persistence;
pub mod pipeline;
pub mod relational;
pub mod validation;

pub use config::{
    BatchSettings, Config, ConfigError, ConfigResult, CountRange, DateRange, GeneratorConfig,
    GraphBackendKind, StoreConfig,
};
pub use error::{DatagenError, DatagenResult};
pub use export::{CsvExporter, ExportError};
pub use factory::{ConstraintError, RecordFactory};
pub use generator::{EntityGraphGenerator, GeneratedBatch, InstitutionFragment};
pub use graph::{GraphBackend, GraphError, GraphStore, GraphStoreAdapter};
pub use model::{EntityKind, Record};
pub use persistence::{
    BatchError, BatchPersistenceCoordinator, FailedItem, RunReport, StoreAdapter, StoreError,
    StoreResult, StoreTally,
};
pub use pipeline::{DatasetPipeline, RunOptions};
pub use relational::RelationalStoreAdapter;
pub use validation::{ValidationError, ValidationLayer};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
        assert_eq!(version(), env!("CARGO_PKG_VERSION"));
    }
}
