//! Persistence sinks for the completed record collection.

use seqfeed_core::Record;
use std::future::Future;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for persist operations.
#[derive(Debug, Error)]
pub enum PersistError {
    /// Serialization failed.
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Writing the sink failed.
    #[error("failed to write {path}: {source}")]
    Io {
        /// Destination path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Destination for the ordered record collection.
pub trait RecordSink: Send {
    /// Returns a human-readable sink identifier.
    fn name(&self) -> String;

    /// Writes the collection. `None` entries are absent sequences.
    ///
    /// # Errors
    /// Returns `PersistError` if the collection cannot be written.
    fn persist(
        &mut self,
        records: &[Option<Record>],
    ) -> impl Future<Output = Result<(), PersistError>> + Send;
}

/// Writes the collection as a pretty-printed JSON array.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    /// Default output file name.
    pub const DEFAULT_PATH: &'static str = "stockData.json";

    /// Creates a sink writing to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the output path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for JsonFileSink {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PATH)
    }
}

impl RecordSink for JsonFileSink {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    async fn persist(&mut self, records: &[Option<Record>]) -> Result<(), PersistError> {
        let json = serde_json::to_vec_pretty(records)?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|source| PersistError::Io {
                path: self.path.clone(),
                source,
            })?;
        tracing::info!("Data written to {}", self.path.display());
        Ok(())
    }
}

/// Keeps persisted collections in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    batches: Vec<Vec<Option<Record>>>,
}

impl MemorySink {
    /// Creates an empty memory sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every collection persisted so far.
    #[must_use]
    pub fn batches(&self) -> &[Vec<Option<Record>>] {
        &self.batches
    }

    /// Returns the most recent collection.
    #[must_use]
    pub fn last(&self) -> Option<&[Option<Record>]> {
        self.batches.last().map(Vec::as_slice)
    }
}

impl RecordSink for MemorySink {
    fn name(&self) -> String {
        "memory".to_string()
    }

    async fn persist(&mut self, records: &[Option<Record>]) -> Result<(), PersistError> {
        self.batches.push(records.to_vec());
        Ok(())
    }
}
