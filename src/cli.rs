//! Command-line surface.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use tracing::{error, info};

use crate::config::ChurnConfig;
use crate::core::{
    run, AppResult, ChurnResult, Connector, Discovery, LabelSelector, PolicyCompiler,
};
use crate::infra::InMemoryCluster;
use crate::runtime::shutdown_token;
use crate::util::telemetry::LogFormat;

/// Exit status for command-line usage errors (`EX_USAGE` from sysexits).
pub const EX_USAGE: u8 = 64;

/// Managed objects created per resource type for a dry run.
pub const DRY_RUN_OBJECTS_PER_TYPE: usize = 10;

/// Namespace holding dry-run objects.
pub const DRY_RUN_NAMESPACE: &str = "churn";

/// Churn a set of Kubernetes objects in a cluster.
#[derive(Debug, Clone, Parser)]
#[command(name = "churn", version)]
pub struct Cli {
    /// Policies of the form OPERATION[:RESOURCE|PARAM=VALUE[,RESOURCE|PARAM=VALUE]...]
    #[arg(value_name = "POLICY")]
    pub policies: Vec<String>,

    /// Run against an in-memory cluster seeded with managed objects instead of a live one.
    #[arg(long)]
    pub dry_run: bool,

    /// Stop after this long (e.g. `10m`); runs until interrupted when unset.
    #[arg(long, value_parser = humantime::parse_duration)]
    pub duration: Option<Duration>,

    /// Seed for candidate shuffling.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Label selector restricting deletion candidates.
    #[arg(long)]
    pub selector: Option<String>,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Cli {
    /// One-line usage text.
    pub fn usage() -> String {
        Self::command().render_usage().to_string()
    }

    /// Configuration from the environment with command-line overrides applied.
    pub fn config(&self) -> AppResult<ChurnConfig> {
        let config = self.apply(ChurnConfig::from_env().map_err(anyhow::Error::msg)?);
        config.validate().map_err(anyhow::Error::msg)?;
        Ok(config)
    }

    /// Apply command-line overrides on top of `config`.
    #[must_use]
    pub fn apply(&self, mut config: ChurnConfig) -> ChurnConfig {
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(selector) = &self.selector {
            config.label_selector.clone_from(selector);
        }
        config
    }
}

/// Run the command line to completion and map the outcome to an exit status.
///
/// Prints usage and returns [`EX_USAGE`] when no policy is given. Any error, whether
/// from compiling policies or from a failed task, is printed as `churn: <error>` and
/// returns failure.
pub async fn execute(cli: Cli) -> ExitCode {
    if cli.policies.is_empty() {
        eprintln!("{}", Cli::usage());
        return ExitCode::from(EX_USAGE);
    }

    match churn(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("churn: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn churn(cli: &Cli) -> AppResult<()> {
    let config = cli.config()?;
    let (discovery, connector) = backend(cli, &config).await?;
    churn_with(cli, config, discovery, connector).await
}

/// Compile every policy against the given collaborators and run until stopped.
///
/// Nothing runs unless every policy compiles.
pub async fn churn_with(
    cli: &Cli,
    config: ChurnConfig,
    discovery: Arc<dyn Discovery>,
    connector: Arc<dyn Connector>,
) -> AppResult<()> {
    let compiler = PolicyCompiler::new(config, discovery, connector)?;
    let tasks = compiler.compile_all(&cli.policies)?;
    info!(tasks = tasks.len(), "starting churn");

    let report = run(shutdown_token(cli.duration), tasks).await;
    for outcome in report.failures() {
        error!(task = %outcome.name, ticks = outcome.ticks, exit = ?outcome.exit, "task failed");
    }
    report.into_result().context("churn task failed")
}

/// In-memory cluster holding [`DRY_RUN_OBJECTS_PER_TYPE`] objects of every default type,
/// each labelled to match the configured selector.
pub fn dry_run_cluster(config: &ChurnConfig) -> ChurnResult<InMemoryCluster> {
    let selector: LabelSelector = config.label_selector.parse()?;
    let cluster = InMemoryCluster::with_default_types();
    cluster.populate(DRY_RUN_NAMESPACE, DRY_RUN_OBJECTS_PER_TYPE, &selector);
    Ok(cluster)
}

async fn backend(
    cli: &Cli,
    config: &ChurnConfig,
) -> AppResult<(Arc<dyn Discovery>, Arc<dyn Connector>)> {
    if cli.dry_run {
        let cluster = Arc::new(dry_run_cluster(config)?);
        let discovery: Arc<dyn Discovery> = cluster.clone();
        let connector: Arc<dyn Connector> = cluster;
        return Ok((discovery, connector));
    }
    connect().await
}

#[cfg(feature = "cluster")]
async fn connect() -> AppResult<(Arc<dyn Discovery>, Arc<dyn Connector>)> {
    let cluster = Arc::new(crate::infra::KubeCluster::connect().await?);
    let discovery: Arc<dyn Discovery> = cluster.clone();
    let connector: Arc<dyn Connector> = cluster;
    Ok((discovery, connector))
}

#[cfg(not(feature = "cluster"))]
async fn connect() -> AppResult<(Arc<dyn Discovery>, Arc<dyn Connector>)> {
    anyhow::bail!("built without the `cluster` feature; rerun with --dry-run")
}
