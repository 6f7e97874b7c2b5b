//! Aggregated results of one lookup run.

use crate::identifier::Identifier;
use crate::tool::ToolName;
use crate::Time;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use ulid::Ulid;

/// Final state of one tool in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeState {
    /// The tool finished and reported success
    Succeeded,
    /// The tool could not run or reported failure
    Failed,
    /// The tool exceeded its deadline
    TimedOut,
    /// The tool was enabled but had nothing to look up
    Skipped,
}

impl std::fmt::Display for OutcomeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            OutcomeState::Succeeded => "succeeded",
            OutcomeState::Failed => "failed",
            OutcomeState::TimedOut => "timed_out",
            OutcomeState::Skipped => "skipped",
        })
    }
}

/// What a runner hands back to the aggregator.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    /// Final state
    pub state: OutcomeState,

    /// Raw tool output, stored under the tool's key in `results`
    pub output: Option<serde_json::Value>,

    /// Error description for non-successful states
    pub error: Option<String>,

    /// Wall-clock time spent
    pub duration: Duration,
}

impl ToolOutcome {
    /// Successful run with output.
    pub fn succeeded(output: serde_json::Value, duration: Duration) -> Self {
        Self {
            state: OutcomeState::Succeeded,
            output: Some(output),
            error: None,
            duration,
        }
    }

    /// Failed run; `output` keeps whatever the tool produced.
    pub fn failed(error: impl Into<String>, output: Option<serde_json::Value>, duration: Duration) -> Self {
        Self {
            state: OutcomeState::Failed,
            output,
            error: Some(error.into()),
            duration,
        }
    }

    /// Run killed at its deadline.
    pub fn timed_out(error: impl Into<String>, duration: Duration) -> Self {
        Self {
            state: OutcomeState::TimedOut,
            output: None,
            error: Some(error.into()),
            duration,
        }
    }

    /// Tool not run.
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            state: OutcomeState::Skipped,
            output: None,
            error: Some(reason.into()),
            duration: Duration::ZERO,
        }
    }
}

/// Recorded status of one tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolStatus {
    /// Final state
    pub state: OutcomeState,

    /// Error description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Wall-clock time in milliseconds
    #[serde(default)]
    pub duration_ms: u64,
}

/// Run metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMeta {
    /// Unique run id
    pub run_id: Ulid,

    /// Email looked up
    pub email: Option<String>,

    /// Username looked up
    pub username: String,

    /// When the run started
    pub timestamp: Time,

    /// Tools enabled at dispatch time, in catalog order
    pub tools_used: Vec<ToolName>,

    /// Outcome per tool
    #[serde(default)]
    pub tool_status: BTreeMap<ToolName, ToolStatus>,
}

/// Everything a run produced, persisted as `{"meta": ..., "results": ...}`.
///
/// Only the aggregator mutates a bundle; runners send [`ToolOutcome`]s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultBundle {
    /// Run metadata
    pub meta: RunMeta,

    /// Raw output keyed by tool
    #[serde(default)]
    pub results: BTreeMap<ToolName, serde_json::Value>,
}

impl ResultBundle {
    /// Start an empty bundle for `identifier`.
    pub fn new(identifier: &Identifier) -> Self {
        Self {
            meta: RunMeta {
                run_id: Ulid::new(),
                email: identifier.email().map(str::to_string),
                username: identifier.username().to_string(),
                timestamp: chrono::Utc::now(),
                tools_used: Vec::new(),
                tool_status: BTreeMap::new(),
            },
            results: BTreeMap::new(),
        }
    }

    /// Record the set of tools about to be dispatched.
    ///
    /// Every dispatched tool stays in `tools_used` whatever its outcome.
    pub fn mark_dispatched(&mut self, tools: &[ToolName]) {
        for tool in tools {
            if !self.meta.tools_used.contains(tool) {
                self.meta.tools_used.push(*tool);
            }
        }
        self.meta.tools_used.sort();
    }

    /// Fold one tool's outcome into the bundle.
    pub fn record(&mut self, tool: ToolName, outcome: ToolOutcome) {
        self.meta.tool_status.insert(
            tool,
            ToolStatus {
                state: outcome.state,
                error: outcome.error,
                duration_ms: u64::try_from(outcome.duration.as_millis()).unwrap_or(u64::MAX),
            },
        );
        if let Some(output) = outcome.output {
            self.results.insert(tool, output);
        }
    }

    /// Number of tools in each state.
    pub fn summary(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for status in self.meta.tool_status.values() {
            *counts.entry(status.state.to_string()).or_insert(0) += 1;
        }
        counts
    }
}
