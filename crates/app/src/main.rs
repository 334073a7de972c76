//! Mailsync - pushes a relational contact source to Mailchimp audiences
//!
//! Main entry point for the command-line runner.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use mailsync_app::{run_all, AppContext};
use mailsync_infra::config;
use mailsync_infra::observability::{init_logging, level_from_verbosity, LoggingConfig};
use tracing::{debug, error, info, warn};

#[derive(Debug, Parser)]
#[command(name = "mailsync", version, about = "Push contact tables to Mailchimp audiences")]
struct Cli {
    /// Configuration file (TOML or JSON); probed when omitted
    #[arg(short, long, env = "MAILSYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Override the integrations directory from the configuration
    #[arg(long)]
    integrations_dir: Option<PathBuf>,

    /// Run only the named integration folder; repeatable
    #[arg(long = "only", value_name = "NAME")]
    only: Vec<String>,

    /// 0 debug, 1 info, 2 warn, 3-4 error
    #[arg(
        short = 'l',
        long,
        default_value_t = 1,
        value_parser = clap::value_parser!(u8).range(0..=4)
    )]
    log_level: u8,

    /// Directory for rolling log files
    #[arg(long, env = "MAILSYNC_LOG_DIR", default_value = "log")]
    log_dir: PathBuf,

    /// Emit JSON log lines on stdout
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env before clap reads env-backed flags; logged once tracing is up
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();

    let logging = LoggingConfig {
        level: level_from_verbosity(cli.log_level),
        log_dir: Some(cli.log_dir.clone()),
        json: cli.json_logs,
    };
    let _log_guard = match init_logging(&logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("mailsync: {e}");
            return ExitCode::FAILURE;
        }
    };

    match dotenv {
        Ok(path) => info!(path = %path.display(), "Loaded .env"),
        Err(e) if e.not_found() => debug!("No .env file found"),
        Err(e) => warn!(error = %e, "Could not load .env file"),
    }

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("mailsync aborted: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every integration succeeded.
async fn run(cli: Cli) -> anyhow::Result<bool> {
    let mut app_config = config::load(cli.config).context("failed to load configuration")?;
    if let Some(dir) = cli.integrations_dir {
        app_config.integrations_dir = dir;
    }

    let ctx = AppContext::new(app_config).context("failed to initialise application context")?;
    let outcomes = run_all(&ctx, &cli.only).await.context("failed to select integrations")?;

    let failed: Vec<&str> =
        outcomes.iter().filter(|o| !o.is_success()).map(|o| o.name.as_str()).collect();
    info!(total = outcomes.len(), failed = failed.len(), "Run complete");
    if !failed.is_empty() {
        error!(integrations = ?failed, "Some integrations failed");
    }
    Ok(failed.is_empty())
}
