//! JSON report file.

use super::{ReportStore, Result};
use async_trait::async_trait;
use osintmaster_core::ResultBundle;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Writes the bundle as a single pretty-printed JSON document.
pub struct JsonReportStore {
    path: PathBuf,
}

impl JsonReportStore {
    /// Store writing to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read a previously written report, if any.
    pub async fn load(&self) -> Result<Option<ResultBundle>> {
        match fs::read_to_string(&self.path).await {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ReportStore for JsonReportStore {
    fn location(&self) -> &Path {
        &self.path
    }

    async fn save(&self, bundle: &ResultBundle) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(bundle)?;
        fs::write(&self.path, json.as_bytes()).await?;
        debug!("Wrote {} bytes to {}", json.len(), self.path.display());
        Ok(())
    }
}
