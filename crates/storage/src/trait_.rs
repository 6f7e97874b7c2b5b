//! Report store abstraction.

use async_trait::async_trait;
use osintmaster_core::ResultBundle;
use std::path::Path;

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur while persisting a report.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Tabular export error
    #[cfg(feature = "csv")]
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// A destination for a finished run's report.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Where the report is written.
    fn location(&self) -> &Path;

    /// Write the bundle, replacing any previous report.
    async fn save(&self, bundle: &ResultBundle) -> Result<()>;
}
