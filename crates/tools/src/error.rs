//! Per-tool errors.

use osintmaster_core::{IdentifierKind, ToolName, ToolOutcome};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Why a command or tool run did not succeed.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The tool's checkout is missing
    #[error("tool not installed at {}", .0.display())]
    NotInstalled(PathBuf),

    /// The identifier lacks the part this tool consumes
    #[error("no {0:?} identifier available")]
    MissingIdentifier(IdentifierKind),

    /// The tool needs an API key and none is configured
    #[error("API key is not configured")]
    MissingApiKey,

    /// The process exited with a non-zero status
    #[error("exited with status {code}")]
    NonZeroExit {
        /// Exit code
        code: i32,
        /// Captured output
        output: serde_json::Value,
    },

    /// The deadline elapsed
    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The process could not be started
    #[error("failed to start {program}: {source}")]
    Spawn {
        /// Program name
        program: String,
        /// Underlying error
        source: std::io::Error,
    },

    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("HTTP status {status}: {body}")]
    HttpStatus {
        /// Status code
        status: u16,
        /// Response body (truncated)
        body: String,
    },

    /// No runner is registered for the tool
    #[error("no runner registered for {0}")]
    UnknownTool(ToolName),

    /// The runner task panicked or was cancelled
    #[error("runner task failed: {0}")]
    Join(String),
}

impl ToolError {
    /// Convert into the outcome recorded for the tool.
    pub fn into_outcome(self, elapsed: Duration) -> ToolOutcome {
        let message = self.to_string();
        match self {
            ToolError::Timeout(_) => ToolOutcome::timed_out(message, elapsed),
            ToolError::MissingIdentifier(_) => ToolOutcome::skipped(message),
            ToolError::NonZeroExit { output, .. } => ToolOutcome::failed(message, Some(output), elapsed),
            _ => ToolOutcome::failed(message, None, elapsed),
        }
    }
}
