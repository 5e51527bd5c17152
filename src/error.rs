//! Crate-level error

use thiserror::Error;

use crate::config::ConfigError;
use crate::export::ExportError;
use crate::factory::ConstraintError;
use crate::graph::GraphError;
use crate::persistence::{BatchError, StoreError};
use crate::validation::ValidationError;

#[derive(Error, Debug)]
pub enum DatagenError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Constraint(#[from] ConstraintError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Batch(#[from] BatchError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),
}

impl DatagenError {
    /// Connection and schema failures end the run with a non-zero exit
    pub fn is_fatal(&self) -> bool {
        match self {
            DatagenError::Store(e) => e.is_fatal(),
            DatagenError::Graph(e) => e.is_fatal(),
            DatagenError::Config(_) | DatagenError::Export(_) => true,
            DatagenError::Constraint(_)
            | DatagenError::Validation(_)
            | DatagenError::Batch(_) => false,
        }
    }
}

pub type DatagenResult<T> = Result<T, DatagenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatality_follows_store_error() {
        let err: DatagenError = StoreError::Connection("refused".to_string()).into();
        assert!(err.is_fatal());
        assert_eq!(err.to_string(), "Connection error: refused");

        let err: DatagenError = StoreError::Batch("timeout".to_string()).into();
        assert!(!err.is_fatal());

        let err: DatagenError = BatchError { failed_items: Vec::new() }.into();
        assert!(!err.is_fatal());
    }
}
