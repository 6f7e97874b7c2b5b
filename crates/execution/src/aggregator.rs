//! Single writer for the result bundle.

use osintmaster_core::{ResultBundle, ToolName, ToolOutcome};
use tokio::sync::mpsc;
use tracing::debug;

/// Fold outcomes into `bundle` until every sender is dropped.
pub async fn aggregate(
    mut rx: mpsc::Receiver<(ToolName, ToolOutcome)>,
    mut bundle: ResultBundle,
) -> ResultBundle {
    while let Some((tool, outcome)) = rx.recv().await {
        debug!("[{}] recorded as {}", tool, outcome.state);
        bundle.record(tool, outcome);
    }
    bundle
}
