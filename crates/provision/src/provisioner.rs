//! Idempotent setup of the local environment.

use osintmaster_core::{Layout, RunConfig, ToolName};
use osintmaster_tools::{CommandInput, CommandOutput, CommandRunner, ToolError};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

/// System packages installed with apt.
pub const SYSTEM_PACKAGES: &[&str] = &[
    "git",
    "python3",
    "python3-pip",
    "docker.io",
    "libcurl4-openssl-dev",
];

/// Python packages installed into the virtualenv.
pub const PYTHON_PACKAGES: &[&str] = &[
    "requests",
    "beautifulsoup4",
    "selenium",
    "lxml",
    "python-whois",
    "dnspython",
    "pandas",
    "tqdm",
    "pycurl",
    "urllib3",
];

/// Default number of concurrent tool installs.
pub const DEFAULT_INSTALL_WORKERS: usize = 4;

/// Errors that abort provisioning.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    /// Filesystem operation failed
    #[error("failed to prepare {}: {source}", .path.display())]
    Io {
        /// Path involved
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// A setup command could not be run
    #[error("`{command}` could not run: {source}")]
    Command {
        /// Command line
        command: String,
        /// Underlying error
        source: ToolError,
    },

    /// A setup command exited with a non-zero status
    #[error("`{command}` exited with status {code}: {stderr}")]
    CommandFailed {
        /// Command line
        command: String,
        /// Exit code
        code: i32,
        /// Captured standard error
        stderr: String,
    },

    /// System packages need root privileges
    #[error("installing system packages requires root (run with sudo or pass --skip-system-packages)")]
    NotRoot,

    /// An install task panicked
    #[error("install task failed: {0}")]
    Join(String),
}

/// Provisioner settings.
#[derive(Debug, Clone)]
pub struct ProvisionConfig {
    /// Install OS packages with apt
    pub system_packages: bool,

    /// Max concurrent tool installs
    pub workers: NonZeroUsize,

    /// Interpreter used to create the virtualenv
    pub python: String,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            system_packages: cfg!(target_os = "linux"),
            workers: NonZeroUsize::new(DEFAULT_INSTALL_WORKERS).unwrap_or(NonZeroUsize::MIN),
            python: "python3".to_string(),
        }
    }
}

/// What provisioning did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionReport {
    /// Whether the virtualenv was created in this run
    pub created_venv: bool,

    /// Tools cloned in this run
    pub cloned: Vec<ToolName>,

    /// Tools whose requirements were installed
    pub installed: Vec<ToolName>,
}

/// Sets up directories, the virtualenv and tool checkouts.
///
/// Every step is skipped when its result already exists. Any failing
/// command aborts provisioning; there are no retries.
pub struct Provisioner {
    layout: Layout,
    commands: Arc<dyn CommandRunner>,
    config: ProvisionConfig,
    env: HashMap<String, String>,
}

impl Provisioner {
    /// Create a provisioner.
    ///
    /// `env` is passed to every command run inside the virtualenv.
    pub fn new(
        layout: Layout,
        commands: Arc<dyn CommandRunner>,
        config: ProvisionConfig,
        env: HashMap<String, String>,
    ) -> Self {
        Self {
            layout,
            commands,
            config,
            env,
        }
    }

    /// Provision everything the enabled tools in `run_config` need.
    pub async fn provision(&self, run_config: &RunConfig) -> Result<ProvisionReport, ProvisionError> {
        info!("Preparing environment in {}", self.layout.base().display());
        let mut report = ProvisionReport::default();

        create_dir(self.layout.tools_dir()).await?;
        create_dir(self.layout.results_dir()).await?;

        report.created_venv = self.ensure_venv().await?;

        if self.config.system_packages {
            self.install_system_packages().await?;
        } else {
            info!("Skipping system packages");
        }

        self.install_base_requirements().await?;

        let tools: Vec<ToolName> = run_config
            .enabled_tools()
            .into_iter()
            .filter(|t| t.descriptor().repo_url.is_some())
            .collect();
        let installs = self.install_tools(&tools).await?;
        for (tool, install) in installs {
            if install.cloned {
                report.cloned.push(tool);
            }
            if install.requirements {
                report.installed.push(tool);
            }
        }
        report.cloned.sort();
        report.installed.sort();

        info!("Environment ready");
        Ok(report)
    }

    async fn ensure_venv(&self) -> Result<bool, ProvisionError> {
        let venv = self.layout.venv_dir();
        if exists(&venv).await {
            debug!("Virtualenv present at {}", venv.display());
            return Ok(false);
        }

        info!("Creating virtualenv at {}", venv.display());
        let input = CommandInput::new(self.config.python.clone())
            .args(["-m", "venv"])
            .arg(venv.display().to_string());
        check(self.commands.as_ref(), &input).await?;
        Ok(true)
    }

    async fn install_system_packages(&self) -> Result<(), ProvisionError> {
        let id = check(self.commands.as_ref(), &CommandInput::new("id").arg("-u")).await?;
        if id.stdout.trim() != "0" {
            error!("System package installation requires root");
            return Err(ProvisionError::NotRoot);
        }

        info!("Installing system packages");
        check(self.commands.as_ref(), &CommandInput::new("apt").arg("update")).await?;
        let install = CommandInput::new("apt")
            .args(["install", "-y"])
            .args(SYSTEM_PACKAGES.iter().copied());
        check(self.commands.as_ref(), &install).await?;
        Ok(())
    }

    async fn install_base_requirements(&self) -> Result<(), ProvisionError> {
        info!("Installing base Python packages");
        let pip = self.layout.venv_pip().display().to_string();

        let upgrade = CommandInput::new(pip.clone())
            .args(["install", "--upgrade", "pip"])
            .envs(&self.env);
        check(self.commands.as_ref(), &upgrade).await?;

        let install = CommandInput::new(pip)
            .arg("install")
            .args(PYTHON_PACKAGES.iter().copied())
            .envs(&self.env);
        check(self.commands.as_ref(), &install).await?;
        Ok(())
    }

    async fn install_tools(&self, tools: &[ToolName]) -> Result<Vec<(ToolName, ToolInstall)>, ProvisionError> {
        let semaphore = Arc::new(Semaphore::new(self.config.workers.get()));
        let mut set = JoinSet::new();

        for tool in tools.iter().copied() {
            let semaphore = semaphore.clone();
            let commands = self.commands.clone();
            let layout = self.layout.clone();
            let env = self.env.clone();
            set.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| ProvisionError::Join(e.to_string()))?;
                let install = install_tool(commands.as_ref(), &layout, &env, tool).await?;
                Ok::<_, ProvisionError>((tool, install))
            });
        }

        // Join everything before reporting, so no install is left running.
        let mut installs = Vec::new();
        let mut first_error = None;
        while let Some(joined) = set.join_next().await {
            let result = joined.map_err(|e| ProvisionError::Join(e.to_string())).and_then(|r| r);
            match result {
                Ok(install) => installs.push(install),
                Err(e) => {
                    error!("Tool installation failed: {}", e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(installs),
        }
    }
}

/// What happened while installing one tool.
#[derive(Debug, Clone, Copy, Default)]
struct ToolInstall {
    cloned: bool,
    requirements: bool,
}

async fn install_tool(
    commands: &dyn CommandRunner,
    layout: &Layout,
    env: &HashMap<String, String>,
    tool: ToolName,
) -> Result<ToolInstall, ProvisionError> {
    let mut install = ToolInstall::default();
    let tool_dir = layout.tool_dir(tool);

    if !exists(&tool_dir).await {
        let Some(url) = tool.descriptor().repo_url else {
            return Ok(install);
        };
        info!("[{}] cloning {}", tool, url);
        let clone = CommandInput::new("git")
            .args(["clone", url])
            .arg(tool_dir.display().to_string())
            .env("GIT_TERMINAL_PROMPT", "0");
        check(commands, &clone).await?;
        install.cloned = true;
    }

    let requirements = tool_dir.join("requirements.txt");
    if exists(&requirements).await {
        info!("[{}] installing requirements", tool);
        let pip = CommandInput::new(layout.venv_pip().display().to_string())
            .args(["install", "-r", "requirements.txt"])
            .envs(env)
            .cwd(tool_dir);
        check(commands, &pip).await?;
        install.requirements = true;
    }

    Ok(install)
}

/// Run a command and require exit status 0.
async fn check(commands: &dyn CommandRunner, input: &CommandInput) -> Result<CommandOutput, ProvisionError> {
    let command = input.command_line();
    debug!("Running: {}", command);

    let output = commands
        .run(input)
        .await
        .map_err(|source| ProvisionError::Command {
            command: command.clone(),
            source,
        })?;

    if !output.success() {
        return Err(ProvisionError::CommandFailed {
            command,
            code: output.exit_code,
            stderr: output.stderr.trim().to_string(),
        });
    }
    Ok(output)
}

async fn create_dir(path: PathBuf) -> Result<(), ProvisionError> {
    fs::create_dir_all(&path)
        .await
        .map_err(|source| ProvisionError::Io { path, source })
}

async fn exists(path: &std::path::Path) -> bool {
    fs::try_exists(path).await.unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use osintmaster_core::ToolSettings;
    use osintmaster_tools::scripted::{Reply, ScriptedRunner};

    fn run_config(enabled: &[ToolName]) -> RunConfig {
        let tools = enabled
            .iter()
            .map(|t| {
                (
                    t.as_str().to_string(),
                    ToolSettings {
                        enabled: true,
                        ..Default::default()
                    },
                )
            })
            .collect();
        RunConfig {
            tools,
            proxy: Default::default(),
        }
    }

    fn provisioner(base: &std::path::Path, commands: Arc<ScriptedRunner>, system_packages: bool) -> Provisioner {
        let layout = Layout::new(base);
        let env = layout.venv_env(Some("/usr/bin"));
        Provisioner::new(
            layout,
            commands,
            ProvisionConfig {
                system_packages,
                ..Default::default()
            },
            env,
        )
    }

    #[tokio::test]
    async fn test_fresh_provision_runs_every_step() {
        let dir = tempfile::tempdir().unwrap();
        let commands = Arc::new(ScriptedRunner::new().on(|c| c.program == "id", Reply::Exit(0, "0\n".to_string())));
        let p = provisioner(dir.path(), commands.clone(), true);

        let report = p
            .provision(&run_config(&[ToolName::Sherlock, ToolName::DarkSearch]))
            .await
            .unwrap();

        assert!(report.created_venv);
        assert_eq!(report.cloned, vec![ToolName::Sherlock]);
        assert!(report.installed.is_empty());
        assert!(dir.path().join("osintmaster_tools").is_dir());
        assert!(dir.path().join("osintmaster_results").is_dir());

        let lines = commands.command_lines();
        assert!(lines[0].starts_with("python3 -m venv"));
        assert_eq!(lines[1], "id -u");
        assert_eq!(lines[2], "apt update");
        assert!(lines[3].starts_with("apt install -y git"));
        assert!(lines[4].ends_with("install --upgrade pip"));
        assert!(lines[5].contains("install requests"));
        assert!(lines[6].starts_with("git clone https://github.com/sherlock-project/sherlock.git"));
        assert_eq!(lines.len(), 7);
    }

    #[tokio::test]
    async fn test_pip_runs_with_venv_env() {
        let dir = tempfile::tempdir().unwrap();
        let commands = Arc::new(ScriptedRunner::new());
        let p = provisioner(dir.path(), commands.clone(), false);

        p.provision(&run_config(&[])).await.unwrap();

        let pip_calls: Vec<_> = commands
            .calls()
            .into_iter()
            .filter(|c| c.args.first().map(String::as_str) == Some("install"))
            .collect();
        assert_eq!(pip_calls.len(), 2);
        for call in pip_calls {
            assert!(call.env.contains_key("VIRTUAL_ENV"));
            assert!(call.env["PATH"].ends_with("/usr/bin"));
        }
    }

    #[tokio::test]
    async fn test_existing_checkout_is_not_recloned() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path());
        std::fs::create_dir_all(layout.venv_dir()).unwrap();
        std::fs::create_dir_all(layout.tool_dir(ToolName::Maigret)).unwrap();
        std::fs::write(layout.tool_dir(ToolName::Maigret).join("requirements.txt"), "requests\n").unwrap();

        let commands = Arc::new(ScriptedRunner::new());
        let p = provisioner(dir.path(), commands.clone(), false);
        let report = p.provision(&run_config(&[ToolName::Maigret])).await.unwrap();

        assert!(!report.created_venv);
        assert!(report.cloned.is_empty());
        assert_eq!(report.installed, vec![ToolName::Maigret]);

        let calls = commands.calls();
        assert!(calls.iter().all(|c| c.program != "git"));
        let req = calls.iter().find(|c| c.args.contains(&"-r".to_string())).unwrap();
        assert_eq!(req.cwd, Some(layout.tool_dir(ToolName::Maigret)));
    }

    #[tokio::test]
    async fn test_not_root_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let commands = Arc::new(ScriptedRunner::new().on(|c| c.program == "id", Reply::Exit(0, "1000\n".to_string())));
        let p = provisioner(dir.path(), commands.clone(), true);

        let err = p.provision(&run_config(&[])).await.unwrap_err();
        assert!(matches!(err, ProvisionError::NotRoot));
        assert!(commands.command_lines().iter().all(|l| !l.starts_with("apt")));
    }

    #[tokio::test]
    async fn test_failed_clone_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let commands = Arc::new(ScriptedRunner::new().on(
            |c| c.program == "git" && c.args.iter().any(|a| a.contains("holehe")),
            Reply::Exit(128, String::new()),
        ));
        let p = provisioner(dir.path(), commands.clone(), false);

        let err = p
            .provision(&run_config(&[ToolName::Sherlock, ToolName::Holehe, ToolName::Blackbird]))
            .await
            .unwrap_err();

        match err {
            ProvisionError::CommandFailed { command, code, .. } => {
                assert!(command.contains("holehe"));
                assert_eq!(code, 128);
            }
            other => panic!("unexpected error: {}", other),
        }
        // Sibling installs were still joined.
        let clones = commands.command_lines().into_iter().filter(|l| l.starts_with("git clone")).count();
        assert_eq!(clones, 3);
    }

    #[tokio::test]
    async fn test_venv_creation_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let commands = Arc::new(ScriptedRunner::new().on(|c| c.program == "python3", Reply::Exit(1, String::new())));
        let p = provisioner(dir.path(), commands.clone(), false);

        let err = p.provision(&run_config(&[ToolName::Sherlock])).await.unwrap_err();
        assert!(matches!(err, ProvisionError::CommandFailed { code: 1, .. }));
        assert_eq!(commands.calls().len(), 1);
    }
}
