//! Launch procedures for process-based tools.

use crate::r#trait::{CommandInput, CommandRunner, RunContext, ToolCall, ToolRunner};
use crate::ToolError;
use async_trait::async_trait;
use osintmaster_core::{ContainerLaunch, Launch, Program, ToolDescriptor, ToolName};
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::{debug, error, info};

/// Runs a catalogued tool from its checkout, or from its container image
/// when the tool is configured with `docker_required`.
pub struct ProcessToolRunner {
    descriptor: &'static ToolDescriptor,
    commands: Arc<dyn CommandRunner>,
}

impl ProcessToolRunner {
    /// Runner for `tool` using `commands` to spawn processes.
    pub fn new(tool: ToolName, commands: Arc<dyn CommandRunner>) -> Self {
        Self {
            descriptor: tool.descriptor(),
            commands,
        }
    }

    fn container_input(&self, container: &ContainerLaunch, ctx: &RunContext, call: &ToolCall) -> CommandInput {
        let vars = variables(ctx, call, None);
        let mut input = CommandInput::new("docker").args(["run", "--rm"]);
        if let Some(proxy) = &call.proxy {
            for key in PROXY_VARS {
                input = input.arg("-e").arg(format!("{}={}", key, proxy));
            }
        }
        input
            .arg(container.image)
            .args(container.args.iter().map(|a| substitute(a, &vars)))
            .timeout(call.timeout)
    }

    fn local_input(
        &self,
        program: Program,
        args: &[&str],
        ctx: &RunContext,
        call: &ToolCall,
    ) -> CommandInput {
        let tool_dir = ctx.layout.tool_dir(call.tool);
        let vars = variables(ctx, call, Some(&tool_dir.display().to_string()));
        let program = match program {
            Program::VenvPython => ctx.layout.venv_python().display().to_string(),
            Program::Named(name) => name.to_string(),
        };

        let mut input = CommandInput::new(program)
            .args(args.iter().map(|a| substitute(a, &vars)))
            .envs(&ctx.env)
            .cwd(tool_dir)
            .timeout(call.timeout);
        if let Some(proxy) = &call.proxy {
            for key in PROXY_VARS {
                input = input.env(key, proxy.clone());
            }
        }
        input
    }
}

const PROXY_VARS: [&str; 2] = ["HTTP_PROXY", "HTTPS_PROXY"];

#[async_trait]
impl ToolRunner for ProcessToolRunner {
    fn name(&self) -> ToolName {
        self.descriptor.name
    }

    async fn run(&self, ctx: &RunContext, call: &ToolCall) -> Result<serde_json::Value, ToolError> {
        let input = match (self.descriptor.container, &self.descriptor.launch) {
            (Some(container), _) if call.settings.docker_required => {
                info!("[{}] running in container {}", call.tool, container.image);
                self.container_input(&container, ctx, call)
            }
            (_, Launch::Process { program, args }) => {
                let tool_dir = ctx.layout.tool_dir(call.tool);
                if !tokio::fs::try_exists(&tool_dir).await.unwrap_or(false) {
                    error!("[{}] not installed at {}", call.tool, tool_dir.display());
                    return Err(ToolError::NotInstalled(tool_dir));
                }
                self.local_input(*program, args, ctx, call)
            }
            (_, Launch::HttpSearch) => return Err(ToolError::UnknownTool(call.tool)),
        };

        debug!("[{}] {}", call.tool, input.command_line());
        let output = self.commands.run(&input).await?;

        if output.success() {
            Ok(output.to_report())
        } else {
            Err(ToolError::NonZeroExit {
                code: output.exit_code,
                output: output.to_report(),
            })
        }
    }
}

fn variables(ctx: &RunContext, call: &ToolCall, tool_dir: Option<&str>) -> HashMap<&'static str, String> {
    let mut vars = HashMap::new();
    vars.insert("target", call.target.clone());
    if let Some(email) = ctx.identifier.email() {
        vars.insert("email", email.to_string());
    }
    vars.insert("username", ctx.identifier.username().to_string());
    if let Some(limit) = call.timeout {
        vars.insert("timeout", limit.as_secs().to_string());
    }
    if let Some(dir) = tool_dir {
        vars.insert("tool_dir", dir.to_string());
    }
    vars
}

fn placeholder() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{(\w+)\}").expect("valid placeholder regex"))
}

/// Replace `{name}` placeholders in a template argument.
///
/// Single pass: substituted values are never expanded again. Unknown
/// placeholders are left as written.
fn substitute(template: &str, vars: &HashMap<&'static str, String>) -> String {
    placeholder()
        .replace_all(template, |caps: &Captures<'_>| match vars.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}
