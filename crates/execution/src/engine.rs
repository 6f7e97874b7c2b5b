//! The lookup pipeline.

use crate::aggregate;
use anyhow::Context;
use osintmaster_core::{Identifier, Layout, ResultBundle, RunConfig};
use osintmaster_provision::{ProvisionConfig, Provisioner};
use osintmaster_storage::{JsonReportStore, ReportStore};
use osintmaster_tools::darksearch::DEFAULT_BASE_URL;
use osintmaster_tools::{
    CommandRunner, DispatchConfig, Dispatcher, ProcessRunner, RunContext, ToolRegistry, DEFAULT_WORKERS,
};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Directory holding the config file, tools, venv and results
    pub base_dir: PathBuf,
    /// Config file (None = `<base_dir>/config.json`)
    pub config_path: Option<PathBuf>,
    /// Max tools running concurrently
    pub workers: NonZeroUsize,
    /// Skip environment provisioning
    pub skip_setup: bool,
    /// Install OS packages during provisioning
    pub system_packages: bool,
    /// Also write the flattened CSV report
    pub csv: bool,
    /// Base URL of the search API
    pub search_base_url: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            config_path: None,
            workers: NonZeroUsize::new(DEFAULT_WORKERS).unwrap_or(NonZeroUsize::MIN),
            skip_setup: false,
            system_packages: ProvisionConfig::default().system_packages,
            csv: true,
            search_base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Aggregated results
    pub bundle: ResultBundle,
    /// Where the JSON report was written
    pub report_path: PathBuf,
    /// Where the CSV report was written, if it was
    pub csv_path: Option<PathBuf>,
}

/// Runs the pipeline:
/// ```text
/// Load config → Provision → Dispatch → Aggregate → Persist
/// ```
pub struct Orchestrator {
    config: EngineConfig,
    layout: Layout,
    commands: Arc<dyn CommandRunner>,
    registry: Arc<ToolRegistry>,
}

impl Orchestrator {
    /// Orchestrator that spawns real processes.
    pub fn new(config: EngineConfig) -> Self {
        let commands: Arc<dyn CommandRunner> = Arc::new(ProcessRunner);
        let registry = ToolRegistry::with_defaults(commands.clone(), config.search_base_url.clone());
        Self::with_parts(config, commands, registry)
    }

    /// Orchestrator with an explicit command runner and tool registry.
    pub fn with_parts(config: EngineConfig, commands: Arc<dyn CommandRunner>, registry: ToolRegistry) -> Self {
        Self {
            layout: Layout::new(&config.base_dir),
            config,
            commands,
            registry: Arc::new(registry),
        }
    }

    /// Working directory layout.
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Load configuration, applying environment overrides.
    pub fn load_config(&self) -> anyhow::Result<RunConfig> {
        let path = self
            .config
            .config_path
            .clone()
            .unwrap_or_else(|| self.layout.config_path());
        let config = RunConfig::load(&path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?
            .with_env_overrides(|key| std::env::var(key).ok());
        debug!("Enabled tools: {:?}", config.enabled_tools());
        Ok(config)
    }

    /// Run a full lookup for `identifier`.
    pub async fn run(&self, identifier: Identifier) -> anyhow::Result<RunReport> {
        let config = Arc::new(self.load_config()?);
        let env = self.layout.venv_env(std::env::var("PATH").ok().as_deref());

        if self.config.skip_setup {
            info!("Skipping environment setup");
        } else {
            let provisioner = Provisioner::new(
                self.layout.clone(),
                self.commands.clone(),
                ProvisionConfig {
                    system_packages: self.config.system_packages,
                    ..Default::default()
                },
                env.clone(),
            );
            provisioner
                .provision(&config)
                .await
                .context("Environment setup failed")?;
        }

        let tools = config.enabled_tools();
        info!("Looking up {} with {} tool(s)", identifier, tools.len());

        let ctx = Arc::new(RunContext {
            identifier: identifier.clone(),
            config: config.clone(),
            layout: self.layout.clone(),
            env,
        });
        let dispatcher = Dispatcher::new(
            self.registry.clone(),
            DispatchConfig {
                workers: self.config.workers,
            },
        );

        let (tx, rx) = mpsc::channel(self.config.workers.get() * 2);
        let (dispatched, mut bundle) = tokio::join!(
            dispatcher.dispatch(ctx, &tools, tx),
            aggregate(rx, ResultBundle::new(&identifier)),
        );
        bundle.mark_dispatched(&dispatched);

        let store = JsonReportStore::new(self.layout.report_path());
        store
            .save(&bundle)
            .await
            .with_context(|| format!("Failed to write {}", store.location().display()))?;
        info!("Results saved to {}", store.location().display());

        let csv_path = self.export_csv(&bundle).await;

        Ok(RunReport {
            bundle,
            report_path: store.location().to_path_buf(),
            csv_path,
        })
    }

    #[cfg(feature = "csv")]
    async fn export_csv(&self, bundle: &ResultBundle) -> Option<PathBuf> {
        if !self.config.csv {
            return None;
        }
        let store = osintmaster_storage::CsvReportStore::new(self.layout.csv_report_path());
        match store.save(bundle).await {
            Ok(()) => {
                info!("Table saved to {}", store.location().display());
                Some(store.location().to_path_buf())
            }
            Err(e) => {
                error!("Failed to write {}: {}", store.location().display(), e);
                None
            }
        }
    }

    #[cfg(not(feature = "csv"))]
    async fn export_csv(&self, _bundle: &ResultBundle) -> Option<PathBuf> {
        debug!("CSV export not compiled in");
        None
    }
}
