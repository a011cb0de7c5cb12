//! SessionGate - session/profile consistency coordinator
//!
//! CLI entry point for replaying sign-in scenarios.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use eyre::{Context, Result};
use tracing::info;

use sessiongate::cli::{Cli, Command, OutputFormat, get_log_path};
use sessiongate::config::Config;
use sessiongate::scenario::{Scenario, render_text, run_scenario};

fn setup_logging(verbose: bool) -> Result<()> {
    let log_path = get_log_path();
    let log_dir = log_path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Write to the log file, keep stdout for results
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!(
        customer_timeout_ms = config.customer.orphan_timeout_ms,
        admin_timeout_ms = config.admin.session.orphan_timeout_ms,
        "SessionGate loaded config"
    );

    match cli.command {
        Command::Run { scenario, format } => cmd_run(&config, &scenario, format).await,
        Command::Config => cmd_config(&config),
    }
}

async fn cmd_run(config: &Config, path: &Path, format: OutputFormat) -> Result<()> {
    let scenario = Scenario::load(path)?;
    let report = run_scenario(&scenario, config)
        .await
        .context(format!("Scenario {} failed", scenario.name))?;

    match format {
        OutputFormat::Text => print!("{}", render_text(&report)),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
            println!("{}", json);
        }
    }
    Ok(())
}

fn cmd_config(config: &Config) -> Result<()> {
    let yaml = serde_yaml::to_string(config).context("Failed to serialize config")?;
    print!("{}", yaml);
    Ok(())
}
