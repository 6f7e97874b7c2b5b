//! Scripted command runner for tests.

use crate::r#trait::{CommandInput, CommandOutput, CommandRunner};
use crate::ToolError;
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

type Matcher = Box<dyn Fn(&CommandInput) -> bool + Send + Sync>;

/// Canned reply for a matching command.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Exit with this code and stdout
    Exit(i32, String),
    /// Behave as if the deadline elapsed
    Timeout,
}

/// Records every command and answers from a list of rules.
///
/// Commands matching no rule exit 0 with empty output.
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Vec<(Matcher, Reply)>,
    calls: Mutex<Vec<CommandInput>>,
}

impl ScriptedRunner {
    /// Runner where every command succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `reply` to commands matching `matcher`. Earlier rules win.
    pub fn on(
        mut self,
        matcher: impl Fn(&CommandInput) -> bool + Send + Sync + 'static,
        reply: Reply,
    ) -> Self {
        self.rules.push((Box::new(matcher), reply));
        self
    }

    /// Commands run so far, in order.
    pub fn calls(&self) -> Vec<CommandInput> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Command lines run so far.
    pub fn command_lines(&self) -> Vec<String> {
        self.calls().iter().map(CommandInput::command_line).collect()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, input: &CommandInput) -> Result<CommandOutput, ToolError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(input.clone());
        }

        let reply = self
            .rules
            .iter()
            .find(|(matcher, _)| matcher(input))
            .map(|(_, reply)| reply.clone())
            .unwrap_or(Reply::Exit(0, String::new()));

        match reply {
            Reply::Exit(exit_code, stdout) => Ok(CommandOutput {
                exit_code,
                stdout,
                stderr: String::new(),
                duration: Duration::ZERO,
            }),
            Reply::Timeout => Err(ToolError::Timeout(input.timeout.unwrap_or_default())),
        }
    }
}
