//! Process-backed command runner.

use crate::r#trait::{CommandInput, CommandOutput, CommandRunner};
use crate::ToolError;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Runs commands as child processes.
///
/// The child inherits this process's environment plus the variables in
/// [`CommandInput::env`]. It is killed if its timeout elapses.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, input: &CommandInput) -> Result<CommandOutput, ToolError> {
        let start = std::time::Instant::now();
        debug!("Running: {}", input.command_line());

        let mut cmd = Command::new(&input.program);
        cmd.args(&input.args)
            .envs(&input.env)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        if let Some(dir) = &input.cwd {
            cmd.current_dir(dir);
        }

        let result = match input.timeout {
            Some(limit) => match tokio::time::timeout(limit, cmd.output()).await {
                Ok(result) => result,
                Err(_) => return Err(ToolError::Timeout(limit)),
            },
            None => cmd.output().await,
        };

        let output = result.map_err(|source| ToolError::Spawn {
            program: input.program.clone(),
            source,
        })?;

        Ok(CommandOutput {
            exit_code: normalize_exit(output.status),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration: start.elapsed(),
        })
    }
}

/// Exit code of a finished child; signals map to `128 + signal`.
pub fn normalize_exit(status: std::process::ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(code) = status.code() {
            code
        } else if let Some(sig) = status.signal() {
            128 + sig
        } else {
            1
        }
    }
    #[cfg(not(unix))]
    {
        status.code().unwrap_or(1)
    }
}
