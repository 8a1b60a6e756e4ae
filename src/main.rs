//! esdeploy CLI entrypoint.
//!
//! This is the main entrypoint for the esdeploy command-line tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use es_domain_deploy::cli::{Cli, Commands, OutputFormatter, StateCommands};
use es_domain_deploy::config::{
    find_config_file, set_input, ConfigParser, ConfigValidator, DeploymentFile, DomainConfig,
    StateBackend,
};
use es_domain_deploy::elasticsearch::AwsConnector;
use es_domain_deploy::error::{DeployError, Result};
use es_domain_deploy::reconciler::Reconciler;
use es_domain_deploy::state::{LocalStateStore, S3StateStore, StateStore, STATE_DIR};

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
///
/// `RUST_LOG` takes precedence over the verbosity flag.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);
    let config_path = cli.config.as_ref();

    match cli.command {
        Commands::Deploy { region, name } => {
            cmd_deploy(config_path, region, name, &formatter).await
        }
        Commands::Remove { yes } => cmd_remove(config_path, yes, &formatter).await,
        Commands::Plan { region, name } => cmd_plan(config_path, region, name, &formatter).await,
        Commands::Status => cmd_status(config_path, &formatter).await,
        Commands::Validate { warnings } => cmd_validate(config_path, warnings, &formatter),
        Commands::State { command } => cmd_state(config_path, command, &formatter).await,
    }
}

/// Deploy the domain.
async fn cmd_deploy(
    config_path: Option<&PathBuf>,
    region: Option<String>,
    name: Option<String>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (mut file, state_store) = load_config_and_state(config_path).await?;
    apply_cli_overrides(&mut file, region, name);

    let reconciler = Reconciler::new(AwsConnector);
    let outputs = reconciler
        .deploy_with_store(state_store.as_ref(), &file.inputs)
        .await?;

    println!("{}", formatter.format_deploy(&outputs));
    Ok(())
}

/// Remove the domain.
async fn cmd_remove(
    config_path: Option<&PathBuf>,
    auto_approve: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (_file, state_store) = load_config_and_state(config_path).await?;

    let state = state_store.load_or_default().await?;
    let name = state.name.clone();

    if let Some(name) = &name
        && !auto_approve
    {
        eprint!("This will DELETE domain {name} and all its data. Type 'remove' to confirm: ");
        std::io::stderr().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if input.trim() != "remove" {
            eprintln!("Removal cancelled.");
            return Ok(());
        }
    }

    let reconciler = Reconciler::new(AwsConnector);
    reconciler.remove_with_store(state_store.as_ref()).await?;

    println!("{}", formatter.format_remove(name.as_deref()));
    Ok(())
}

/// Show what a deploy would do.
async fn cmd_plan(
    config_path: Option<&PathBuf>,
    region: Option<String>,
    name: Option<String>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (mut file, state_store) = load_config_and_state(config_path).await?;
    apply_cli_overrides(&mut file, region, name);

    let state = state_store.load_or_default().await?;
    let plan = Reconciler::new(AwsConnector).plan(&file.inputs, &state).await?;

    println!("{}", formatter.format_plan(&plan));
    Ok(())
}

/// Show recorded state and live status.
async fn cmd_status(config_path: Option<&PathBuf>, formatter: &OutputFormatter) -> Result<()> {
    let (_file, state_store) = load_config_and_state(config_path).await?;

    let state = state_store.load_or_default().await?;
    let live = Reconciler::new(AwsConnector).observe(&state).await?;

    println!("{}", formatter.format_status(&state, live.as_ref()));
    Ok(())
}

/// Validate the deployment file.
fn cmd_validate(
    config_path: Option<&PathBuf>,
    show_warnings: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let config_file = resolve_config_path(config_path)?;
    info!("Validating configuration: {}", config_file.display());

    let parser = ConfigParser::new().with_base_path(config_dir(&config_file));
    parser.load_dotenv()?;

    let file = parser.load_with_env(&config_file)?;

    let validator = ConfigValidator::new();
    validator.validate_state(&file.state)?;
    let config = DomainConfig::from_inputs(&file.inputs)?;
    let result = validator.validate(&config)?;

    println!("{}", formatter.format_validation(&config, &result, show_warnings));
    Ok(())
}

/// State management commands.
async fn cmd_state(
    config_path: Option<&PathBuf>,
    command: StateCommands,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (_file, state_store) = load_config_and_state(config_path).await?;

    match command {
        StateCommands::Show => {
            if let Some(state) = state_store.load().await? {
                println!("{}", formatter.format_state(&state));
            } else {
                eprintln!("No state found.");
            }

            if let Some(lock) = state_store.get_lock_info().await?
                && !lock.is_expired()
            {
                eprintln!(
                    "State is locked by {} for {} since {} ({}s remaining)",
                    lock.holder,
                    lock.operation,
                    lock.acquired_at.to_rfc3339(),
                    lock.remaining_secs()
                );
            }
        }
        StateCommands::Unlock { lock_id, force } => {
            if force {
                if let Some(lock_info) = state_store.get_lock_info().await? {
                    state_store.release_lock(&lock_info.lock_id).await?;
                    eprintln!("State forcefully unlocked.");
                } else {
                    eprintln!("State is not locked.");
                }
            } else if let Some(id) = lock_id {
                state_store.release_lock(&id).await?;
                eprintln!("State unlocked.");
            } else {
                eprintln!("Please provide --lock-id or use --force");
            }
        }
    }

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Resolves the configuration file path.
fn resolve_config_path(config_path: Option<&PathBuf>) -> Result<PathBuf> {
    config_path.map_or_else(|| find_config_file("."), |path| Ok(path.clone()))
}

/// Returns the directory holding the configuration file.
fn config_dir(config_file: &Path) -> &Path {
    config_file.parent().unwrap_or_else(|| Path::new("."))
}

/// Applies `--region` and `--name` over the file's inputs.
fn apply_cli_overrides(file: &mut DeploymentFile, region: Option<String>, name: Option<String>) {
    if let Some(region) = region {
        debug!("Overriding inputs.region from command line");
        set_input(&mut file.inputs, "region", region);
    }
    if let Some(name) = name {
        debug!("Overriding inputs.name from command line");
        set_input(&mut file.inputs, "name", name);
    }
}

/// Loads the deployment file and creates the configured state store.
async fn load_config_and_state(
    config_path: Option<&PathBuf>,
) -> Result<(DeploymentFile, Box<dyn StateStore>)> {
    let config_file = resolve_config_path(config_path)?;
    debug!("Loading configuration from: {}", config_file.display());

    let parser = ConfigParser::new().with_base_path(config_dir(&config_file));
    parser.load_dotenv()?;

    let file = parser.load_with_env(&config_file)?;

    ConfigValidator::new().validate_state(&file.state)?;

    let state_store: Box<dyn StateStore> = match file.state.backend {
        StateBackend::Local => {
            let dir = file.state.local_dir(config_dir(&config_file), STATE_DIR);
            Box::new(LocalStateStore::with_base_dir(dir))
        }
        StateBackend::S3 => {
            let bucket = file
                .state
                .bucket
                .as_deref()
                .ok_or_else(|| DeployError::internal("S3 bucket not configured"))?;
            let prefix = file.state.prefix.as_deref();
            let region = file.state.region.as_deref();
            Box::new(S3StateStore::new(bucket, prefix, region).await?)
        }
    };

    debug!("Using {} state backend", state_store.backend_type());
    Ok((file, state_store))
}
