//! OSINTMaster CLI - run OSINT tools against an email or username.

use anyhow::Result;
use clap::{CommandFactory, Parser};
use osintmaster_core::{Identifier, IdentifierError};
use osintmaster_execution::{EngineConfig, Orchestrator, RunReport};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "osintmaster")]
#[command(about = "Look up an email or username with a set of OSINT tools", long_about = None)]
struct Cli {
    /// Target email address
    #[arg(short, long)]
    email: Option<String>,

    /// Target username (defaults to the email's local part)
    #[arg(short, long)]
    username: Option<String>,

    /// Configuration file (defaults to <base-dir>/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for tools, virtualenv and results
    #[arg(long, default_value = ".")]
    base_dir: PathBuf,

    /// Number of tools run at once
    #[arg(long, default_value = "5")]
    workers: NonZeroUsize,

    /// Do not install or update anything before running
    #[arg(long)]
    skip_setup: bool,

    /// Do not install OS packages with apt
    #[arg(long)]
    skip_system_packages: bool,

    /// Only write the JSON report
    #[arg(long)]
    no_csv: bool,
}

impl Cli {
    fn engine_config(&self) -> EngineConfig {
        let defaults = EngineConfig::default();
        EngineConfig {
            base_dir: self.base_dir.clone(),
            config_path: self.config.clone(),
            workers: self.workers,
            skip_setup: self.skip_setup,
            system_packages: defaults.system_packages && !self.skip_system_packages,
            csv: !self.no_csv,
            ..defaults
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let identifier = match identifier_or_exit(&cli) {
        Ok(identifier) => identifier,
        Err(code) => return ExitCode::from(code),
    };

    let orchestrator = Orchestrator::new(cli.engine_config());

    tokio::select! {
        result = orchestrator.run(identifier) => match result {
            Ok(report) => {
                print_summary(&report);
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("{:#}", e);
                ExitCode::FAILURE
            }
        },
        _ = interrupted() => {
            error!("Interrupted, stopping");
            ExitCode::FAILURE
        }
    }
}

/// Status for a missing or invalid identifier.
const USAGE_EXIT: u8 = 1;

/// Build the lookup identifier, printing help when none was given.
fn identifier_or_exit(cli: &Cli) -> Result<Identifier, u8> {
    match Identifier::new(cli.email.clone(), cli.username.clone()) {
        Ok(identifier) => Ok(identifier),
        Err(IdentifierError::Missing) => {
            let _ = Cli::command().print_help();
            println!();
            Err(USAGE_EXIT)
        }
        Err(e) => {
            error!("{}", e);
            Err(USAGE_EXIT)
        }
    }
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
async fn interrupted() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {}
        Err(e) => {
            warn!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

fn print_summary(report: &RunReport) {
    let meta = &report.bundle.meta;
    info!("Run {} finished", meta.run_id);

    println!("Results: {}", report.report_path.display());
    if let Some(csv) = &report.csv_path {
        println!("Table:   {}", csv.display());
    }
    for (tool, status) in &meta.tool_status {
        match &status.error {
            Some(reason) => println!("  {:<12} {:<10} {}", tool.as_str(), status.state, reason),
            None => println!("  {:<12} {:<10} {}ms", tool.as_str(), status.state, status.duration_ms),
        }
    }
}
