//! CSV export of generated records
//!
//! One file per kind, `<dir>/<table>.csv`, with the record's row columns as the
//! header. Rounds are appended to the same files as they are generated.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::generator::GeneratedBatch;
use crate::model::EntityKind;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type ExportResult<T> = Result<T, ExportError>;

/// Streams batches into per-kind CSV files
pub struct CsvExporter {
    dir: PathBuf,
    writers: HashMap<EntityKind, csv::Writer<File>>,
    written: HashMap<EntityKind, usize>,
}

impl CsvExporter {
    /// Create `dir` if needed; files are created lazily per kind
    pub fn create(dir: impl AsRef<Path>) -> ExportResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(CsvExporter {
            dir,
            writers: HashMap::new(),
            written: HashMap::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, kind: EntityKind) -> PathBuf {
        self.dir.join(format!("{}.csv", kind.table_name()))
    }

    pub fn write_batch(&mut self, batch: &GeneratedBatch) -> ExportResult<()> {
        for (kind, records) in batch.iter() {
            let Some(first) = records.first() else {
                continue;
            };
            if !self.writers.contains_key(&kind) {
                let path = self.path_for(kind);
                let mut writer = csv::Writer::from_path(&path)?;
                writer.write_record(first.to_row().columns())?;
                debug!("Opened {}", path.display());
                self.writers.insert(kind, writer);
            }
            let Some(writer) = self.writers.get_mut(&kind) else {
                continue;
            };
            for record in records {
                let row = record.to_row();
                writer.write_record(row.iter().map(|(_, value)| value.to_string()))?;
            }
            *self.written.entry(kind).or_default() += records.len();
        }
        Ok(())
    }

    /// Rows written per kind so far
    pub fn written(&self, kind: EntityKind) -> usize {
        self.written.get(&kind).copied().unwrap_or(0)
    }

    /// Flush every file
    pub fn finish(mut self) -> ExportResult<()> {
        for writer in self.writers.values_mut() {
            writer.flush()?;
        }
        let total: usize = self.written.values().sum();
        info!(
            "Exported {} records in {} files to {}",
            total,
            self.writers.len(),
            self.dir.display()
        );
        Ok(())
    }
}
