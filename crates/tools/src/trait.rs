//! Command and tool runner abstractions.

use crate::ToolError;
use async_trait::async_trait;
use osintmaster_core::{Identifier, Layout, RunConfig, ToolName, ToolSettings};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Runs external commands.
///
/// Provisioning and process-based tools go through this seam so they can be
/// exercised without spawning real processes.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a command to completion (or until its timeout).
    async fn run(&self, input: &CommandInput) -> Result<CommandOutput, ToolError>;
}

/// A single command invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandInput {
    /// Program to execute
    pub program: String,

    /// Command arguments
    pub args: Vec<String>,

    /// Environment variables added to the child's environment
    pub env: HashMap<String, String>,

    /// Working directory
    pub cwd: Option<PathBuf>,

    /// Timeout
    pub timeout: Option<Duration>,
}

impl CommandInput {
    /// Start building an invocation of `program`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: HashMap::new(),
            cwd: None,
            timeout: None,
        }
    }

    /// Add an argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Merge environment variables.
    pub fn envs(mut self, env: &HashMap<String, String>) -> Self {
        self.env.extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// Set one environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Set the timeout.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Human-readable command line for logs.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Output from a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    /// Exit code
    pub exit_code: i32,

    /// Standard output
    pub stdout: String,

    /// Standard error
    pub stderr: String,

    /// Execution duration
    pub duration: Duration,
}

impl CommandOutput {
    /// Whether the command exited with status 0.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Report value stored for a process-based tool.
    pub fn to_report(&self) -> serde_json::Value {
        serde_json::json!({
            "exit_code": self.exit_code,
            "stdout": self.stdout,
            "stderr": self.stderr,
        })
    }
}

/// Shared, read-only state for every tool in a run.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Lookup subject
    pub identifier: Identifier,

    /// Run configuration
    pub config: Arc<RunConfig>,

    /// Working directory layout
    pub layout: Layout,

    /// Environment that activates the virtualenv for child processes
    pub env: HashMap<String, String>,
}

/// One tool invocation prepared by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    /// Tool being run
    pub tool: ToolName,

    /// Identifier value the tool consumes
    pub target: String,

    /// Tool settings from the run configuration
    pub settings: ToolSettings,

    /// Deadline
    pub timeout: Option<Duration>,

    /// Proxy assigned to this call
    pub proxy: Option<String>,
}

/// Launch procedure for one tool.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Tool this runner launches.
    fn name(&self) -> ToolName;

    /// Run the tool and return its raw report value.
    async fn run(&self, ctx: &RunContext, call: &ToolCall) -> Result<serde_json::Value, ToolError>;
}
