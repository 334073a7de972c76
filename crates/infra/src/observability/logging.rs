//! Structured logging setup using tracing.
//!
//! Events go to stdout (plain or JSON) and, when a log directory is given, to
//! a daily-rolling `sync.log` file behind a non-blocking writer. `RUST_LOG`
//! overrides the configured level.

use std::path::PathBuf;

use mailsync_domain::{MailsyncError, Result};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

const LOG_FILE_PREFIX: &str = "sync.log";

/// Dependencies that are noisy below `warn`
const QUIET_TARGETS: &[&str] = &["hyper", "hyper_util", "reqwest", "rustls", "r2d2"];

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: Level,
    /// Directory for rolling log files; stdout only when `None`
    pub log_dir: Option<PathBuf>,
    /// JSON lines on stdout instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: Level::INFO, log_dir: None, json: false }
    }
}

/// Keeps the file writer flushing; hold it until the process exits.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Map the numeric CLI verbosity onto a level: 0 debug, 1 info, 2 warn,
/// anything higher error.
pub fn level_from_verbosity(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::DEBUG,
        1 => Level::INFO,
        2 => Level::WARN,
        _ => Level::ERROR,
    }
}

/// Install the global subscriber.
///
/// # Errors
/// Returns `MailsyncError::Config` for an unusable filter or log directory,
/// and `MailsyncError::Internal` if a subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingGuard> {
    let directive = default_directive(config.level);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&directive))
        .map_err(|e| MailsyncError::Config(format!("invalid log filter '{directive}': {e}")))?;

    let mut layers: Vec<BoxedLayer> = Vec::new();
    layers.push(if config.json {
        fmt::layer().json().with_target(true).flatten_event(true).boxed()
    } else {
        fmt::layer().with_target(false).boxed()
    });

    let mut file_guard = None;
    if let Some(dir) = &config.log_dir {
        std::fs::create_dir_all(dir).map_err(|e| {
            MailsyncError::Config(format!("cannot create log directory {}: {e}", dir.display()))
        })?;
        let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        layers.push(fmt::layer().with_ansi(false).with_writer(writer).boxed());
        file_guard = Some(guard);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| MailsyncError::Internal(format!("logging already initialised: {e}")))?;

    tracing::debug!(filter = %directive, log_dir = ?config.log_dir, "Logging initialized");
    Ok(LoggingGuard { _file_guard: file_guard })
}

fn default_directive(level: Level) -> String {
    let mut directive = level.as_str().to_ascii_lowercase();
    for target in QUIET_TARGETS {
        directive.push_str(&format!(",{target}=warn"));
    }
    directive
}
