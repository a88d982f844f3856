mod logging;
mod stages;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use rawseed_core::config::ProjectConfig;
use rawseed_provision::{DbtProvisioner, Provisioner};
use tracing::{info, warn};

use crate::logging::LogSession;

const DEFAULT_CONFIG: &str = "config/rawseed.json";

#[derive(Parser, Debug)]
#[command(author, version, about = "Resolve CSV column types and provision raw warehouse tables", long_about = None)]
struct Cli {
    /// Project configuration (JSON, or TOML by extension). Defaults to config/rawseed.json
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase stderr verbosity (-v debug, -vv trace). RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create warehouse schemas and one model folder per schema
    CreateSchemas(ProvisionArgs),
    /// Infer column types for every CSV and write the registry
    Analyse(AnalyseArgs),
    /// Create raw tables from the registry and scaffold staging models
    CreateTables(CreateTablesArgs),
    /// Run create-schemas, analyse and create-tables in order
    Run(RunArgs),
}

#[derive(Args, Debug, Clone)]
struct ProvisionArgs {
    /// Backend used to run DDL and loads
    #[arg(long, value_enum, default_value_t = ProvisionerKind::Dbt)]
    provisioner: ProvisionerKind,
}

#[derive(Args, Debug, Default)]
struct AnalyseArgs {
    /// Skip HTML profiling reports
    #[arg(long)]
    no_profile: bool,
}

#[derive(Args, Debug)]
struct CreateTablesArgs {
    #[command(flatten)]
    provision: ProvisionArgs,

    /// Load each CSV into its table after creating it
    #[arg(long)]
    insert: bool,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    provision: ProvisionArgs,

    /// Load each CSV into its table after creating it
    #[arg(long)]
    insert: bool,

    /// Skip HTML profiling reports
    #[arg(long)]
    no_profile: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum ProvisionerKind {
    Dbt,
    Postgres,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<bool> {
    let (mut config, config_source) = load_config(cli.config.as_deref())?;
    config.apply_env();

    let session = LogSession::start(&config.log_directory(), cli.verbose)?;
    info!(log_dir = %session.directory().display(), "Logging initialised");
    match &config_source {
        Some(path) => info!(path = %path.display(), "Loaded configuration"),
        None => warn!(path = DEFAULT_CONFIG, "No configuration file found; using defaults"),
    }

    let succeeded = match cli.command {
        Command::CreateSchemas(args) => {
            let provisioner = build_provisioner(args.provisioner, &config)?;
            stages::create_schemas(&config, provisioner.as_ref())
        }
        Command::Analyse(args) => stages::analyse(&config, config.profile && !args.no_profile),
        Command::CreateTables(args) => {
            let provisioner = build_provisioner(args.provision.provisioner, &config)?;
            stages::create_tables(
                &config,
                provisioner.as_ref(),
                args.insert || config.insert_info,
            )
        }
        Command::Run(args) => {
            let provisioner = build_provisioner(args.provision.provisioner, &config)?;
            let started = Instant::now();
            let schemas = stages::create_schemas(&config, provisioner.as_ref());
            let analysed = stages::analyse(&config, config.profile && !args.no_profile);
            let tables = stages::create_tables(
                &config,
                provisioner.as_ref(),
                args.insert || config.insert_info,
            );
            info!(
                seconds = started.elapsed().as_secs_f64(),
                "Full run finished"
            );
            schemas && analysed && tables
        }
    };

    if !succeeded {
        warn!("One or more stages failed; see the log for details");
    }
    Ok(succeeded)
}

/// An explicit `--config` must exist. The default path is optional.
fn load_config(explicit: Option<&Path>) -> Result<(ProjectConfig, Option<PathBuf>)> {
    if let Some(path) = explicit {
        let config = ProjectConfig::load(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?;
        return Ok((config, Some(path.to_path_buf())));
    }

    let default = Path::new(DEFAULT_CONFIG);
    if default.is_file() {
        let config = ProjectConfig::load(default)
            .with_context(|| format!("failed to load configuration from {DEFAULT_CONFIG}"))?;
        Ok((config, Some(default.to_path_buf())))
    } else {
        Ok((ProjectConfig::default(), None))
    }
}

fn build_provisioner(kind: ProvisionerKind, config: &ProjectConfig) -> Result<Box<dyn Provisioner>> {
    match kind {
        ProvisionerKind::Dbt => Ok(Box::new(DbtProvisioner::from_config(&config.dbt))),
        ProvisionerKind::Postgres => postgres_provisioner(),
    }
}

#[cfg(feature = "postgres")]
fn postgres_provisioner() -> Result<Box<dyn Provisioner>> {
    let database_url = std::env::var("DATABASE_URL")
        .or_else(|_| std::env::var("RAWSEED_DATABASE_URL"))
        .context("DATABASE_URL (or RAWSEED_DATABASE_URL) must be set")?;
    let provisioner = rawseed_provision::PostgresProvisioner::connect(&database_url)
        .context("failed to connect to Postgres")?;
    Ok(Box::new(provisioner))
}

#[cfg(not(feature = "postgres"))]
fn postgres_provisioner() -> Result<Box<dyn Provisioner>> {
    anyhow::bail!("this build of rawseed was compiled without the `postgres` feature")
}
