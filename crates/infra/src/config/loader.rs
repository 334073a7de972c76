//! Configuration loader
//!
//! Loads the application configuration from a file or environment variables,
//! and per-integration configuration from the integrations directory.
//!
//! ## Loading Strategy
//! 1. An explicit path is loaded as-is
//! 2. Otherwise standard locations are probed for a config file
//! 3. Without a file, the configuration is read from environment variables
//! 4. Environment variables override file values
//! 5. JSON and TOML formats are detected by extension
//!
//! ## Environment Variables
//! - `MAILSYNC_API_KEY`: Mailchimp API key (`<key>-<dc>`)
//! - `MAILSYNC_SOURCE_DB`: Path of the SQLite contact source
//! - `MAILSYNC_CACHE_DB`: Path of the identifier cache database
//! - `MAILSYNC_API_BASE_URL`: Marketing API root override
//! - `MAILSYNC_EXPORT_BASE_URL`: Export API root override
//! - `MAILSYNC_INTEGRATIONS_DIR`: Directory holding one folder per integration
//! - `MAILSYNC_POLL_INTERVAL_SECS`: Seconds between batch status checks
//! - `MAILSYNC_MAX_POLL_ATTEMPTS`: Status checks before a run times out
//! - `MAILSYNC_REQUEST_TIMEOUT_SECS`: Upper bound on one API call
//!
//! ## File Locations
//! The loader probes, in order, `mailsync.{toml,json}` and
//! `config.{toml,json}` in the working directory, then next to the
//! executable.
//!
//! ## Integrations
//! Each integration lives in `<integrations_dir>/<name>/` with its settings
//! in `<name>.toml` or `<name>.json`. Folders starting with `_` are disabled.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use mailsync_domain::{AppConfig, IntegrationConfig, MailsyncError, Result};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::errors::InfraError;

const CONFIG_FILE_NAMES: &[&str] =
    &["mailsync.toml", "mailsync.json", "config.toml", "config.json"];

/// Load the application configuration with the fallback strategy described
/// in the module docs, then validate it.
///
/// # Errors
/// Returns `MailsyncError::Config` if no source yields a complete, valid
/// configuration.
pub fn load(path: Option<PathBuf>) -> Result<AppConfig> {
    let mut config = match path {
        Some(path) => load_from_file(&path)?,
        None => match probe_config_paths() {
            Some(path) => load_from_file(&path)?,
            None => {
                debug!("No config file found, reading environment");
                load_from_env()?
            }
        },
    };

    apply_env_overrides(&mut config)?;
    config.validate()?;
    Ok(config)
}

/// Load the application configuration from environment variables only.
///
/// # Errors
/// Returns `MailsyncError::Config` if `MAILSYNC_API_KEY` or
/// `MAILSYNC_SOURCE_DB` is missing, or a numeric variable does not parse.
pub fn load_from_env() -> Result<AppConfig> {
    let mut config: AppConfig = serde_json::from_value(serde_json::json!({
        "api_key": env_var("MAILSYNC_API_KEY")?,
        "source_db_path": env_var("MAILSYNC_SOURCE_DB")?,
    }))
    .map_err(|err| MailsyncError::from(InfraError::from(err)))?;

    apply_env_overrides(&mut config)?;
    info!("Configuration loaded from environment variables");
    Ok(config)
}

/// Load the application configuration from a file.
///
/// # Errors
/// Returns `MailsyncError::Config` if the file is missing, unreadable, or
/// malformed.
pub fn load_from_file(path: &Path) -> Result<AppConfig> {
    info!(path = %path.display(), "Loading configuration from file");
    read_document(path)
}

/// Probe standard locations for an application config file.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(CONFIG_FILE_NAMES.iter().map(|name| cwd.join(name)));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(CONFIG_FILE_NAMES.iter().map(|name| exe_dir.join(name)));
        }
    }

    candidates.into_iter().find(|path| path.is_file())
}

/// Enabled integration folders under `root`, sorted by name.
///
/// # Errors
/// Returns `MailsyncError::Config` if `root` cannot be listed.
pub fn discover_integrations(root: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(root).map_err(|err| {
        MailsyncError::Config(format!(
            "cannot read integrations directory {}: {err}",
            root.display()
        ))
    })?;

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| MailsyncError::from(InfraError::from(err)))?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !path.is_dir() || name.starts_with('.') {
            continue;
        }
        if name.starts_with('_') {
            debug!(integration = name, "Skipping disabled integration");
            continue;
        }
        dirs.push(path);
    }

    dirs.sort();
    Ok(dirs)
}

/// Load and validate the integration stored in `dir`.
///
/// # Errors
/// Returns `MailsyncError::Config` if no `<name>.{toml,json}` exists in the
/// folder, or it is malformed or invalid.
pub fn load_integration(dir: &Path) -> Result<IntegrationConfig> {
    let name = dir.file_name().and_then(|n| n.to_str()).ok_or_else(|| {
        MailsyncError::Config(format!("invalid integration folder: {}", dir.display()))
    })?;

    let path = ["toml", "json"]
        .iter()
        .map(|ext| dir.join(format!("{name}.{ext}")))
        .find(|path| path.is_file())
        .ok_or_else(|| {
            MailsyncError::Config(format!(
                "integration folder {} has no {name}.toml or {name}.json",
                dir.display()
            ))
        })?;

    let config: IntegrationConfig = read_document(&path)?;
    config.validate()?;
    Ok(config)
}

fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(MailsyncError::Config(format!("Config file not found: {}", path.display())));
    }

    let contents = std::fs::read_to_string(path).map_err(|e| {
        MailsyncError::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    parse_document(&contents, path)
}

/// Parse a document whose format is given by the file extension.
fn parse_document<T: DeserializeOwned>(contents: &str, path: &Path) -> Result<T> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    let parsed = match extension {
        "toml" => toml::from_str(contents).map_err(InfraError::from),
        "json" => serde_json::from_str(contents).map_err(InfraError::from),
        _ => {
            return Err(MailsyncError::Config(format!(
                "Unsupported config format: {extension}"
            )))
        }
    };
    parsed.map_err(|err| match err.0 {
        MailsyncError::Config(msg) => MailsyncError::Config(format!("{}: {msg}", path.display())),
        other => other,
    })
}

fn apply_env_overrides(config: &mut AppConfig) -> Result<()> {
    if let Some(key) = env_opt("MAILSYNC_API_KEY") {
        config.api_key = key;
    }
    if let Some(path) = env_opt("MAILSYNC_SOURCE_DB") {
        config.source_db_path = PathBuf::from(path);
    }
    if let Some(path) = env_opt("MAILSYNC_CACHE_DB") {
        config.cache_db_path = PathBuf::from(path);
    }
    if let Some(url) = env_opt("MAILSYNC_API_BASE_URL") {
        config.api_base_url = Some(url);
    }
    if let Some(url) = env_opt("MAILSYNC_EXPORT_BASE_URL") {
        config.export_base_url = Some(url);
    }
    if let Some(dir) = env_opt("MAILSYNC_INTEGRATIONS_DIR") {
        config.integrations_dir = PathBuf::from(dir);
    }
    if let Some(secs) = env_parse("MAILSYNC_POLL_INTERVAL_SECS")? {
        config.poll_interval_secs = secs;
    }
    if let Some(attempts) = env_parse("MAILSYNC_MAX_POLL_ATTEMPTS")? {
        config.max_poll_attempts = attempts;
    }
    if let Some(secs) = env_parse("MAILSYNC_REQUEST_TIMEOUT_SECS")? {
        config.request_timeout_secs = secs;
    }
    Ok(())
}

/// Get required environment variable
fn env_var(key: &str) -> Result<String> {
    env_opt(key).ok_or_else(|| {
        MailsyncError::Config(format!("Missing required environment variable: {}", key))
    })
}

/// Non-empty environment variable, if set
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_opt(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| MailsyncError::Config(format!("Invalid value for {key}: {e}")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Mutex;

    use once_cell::sync::Lazy;
    use tempfile::TempDir;

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    const ENV_KEYS: &[&str] = &[
        "MAILSYNC_API_KEY",
        "MAILSYNC_SOURCE_DB",
        "MAILSYNC_CACHE_DB",
        "MAILSYNC_API_BASE_URL",
        "MAILSYNC_EXPORT_BASE_URL",
        "MAILSYNC_INTEGRATIONS_DIR",
        "MAILSYNC_POLL_INTERVAL_SECS",
        "MAILSYNC_MAX_POLL_ATTEMPTS",
        "MAILSYNC_REQUEST_TIMEOUT_SECS",
    ];

    fn clear_env() {
        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
    }

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).expect("file written");
        path
    }

    #[test]
    fn loads_toml_file_with_defaults() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        let dir = TempDir::new().unwrap();
        let path = write(
            dir.path(),
            "mailsync.toml",
            "api_key = \"abc123-us6\"\nsource_db_path = \"crm.db\"\npoll_interval_secs = 5\n",
        );

        let config = load(Some(path)).unwrap();

        assert_eq!(config.api_key, "abc123-us6");
        assert_eq!(config.source_db_path, PathBuf::from("crm.db"));
        assert_eq!(config.poll_interval_secs, 5);
        assert_eq!(config.max_poll_attempts, 360);
        assert_eq!(config.cache_db_path, PathBuf::from("mailsync.db"));
    }

    #[test]
    fn loads_json_file() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        let dir = TempDir::new().unwrap();
        let path = write(
            dir.path(),
            "config.json",
            r#"{ "api_key": "abc123-us6", "source_db_path": "crm.db", "request_timeout_secs": 12 }"#,
        );

        let config = load(Some(path)).unwrap();

        assert_eq!(config.request_timeout_secs, 12);
    }

    #[test]
    fn environment_overrides_file_values() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        let dir = TempDir::new().unwrap();
        let path = write(
            dir.path(),
            "mailsync.toml",
            "api_key = \"from-file-us6\"\nsource_db_path = \"crm.db\"\n",
        );
        std::env::set_var("MAILSYNC_API_KEY", "from-env-us9");
        std::env::set_var("MAILSYNC_MAX_POLL_ATTEMPTS", "12");

        let config = load(Some(path)).unwrap();
        clear_env();

        assert_eq!(config.api_key, "from-env-us9");
        assert_eq!(config.data_center().unwrap(), "us9");
        assert_eq!(config.max_poll_attempts, 12);
    }

    #[test]
    fn load_from_env_requires_key_and_source() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        assert!(matches!(load_from_env(), Err(MailsyncError::Config(_))));

        std::env::set_var("MAILSYNC_API_KEY", "abc\"123-us6");
        std::env::set_var("MAILSYNC_SOURCE_DB", "/data/crm.db");
        std::env::set_var("MAILSYNC_POLL_INTERVAL_SECS", "3");
        let config = load_from_env();
        clear_env();

        let config = config.unwrap();
        assert_eq!(config.api_key, "abc\"123-us6");
        assert_eq!(config.source_db_path, PathBuf::from("/data/crm.db"));
        assert_eq!(config.poll_interval_secs, 3);
    }

    #[test]
    fn invalid_numbers_are_config_errors() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        std::env::set_var("MAILSYNC_API_KEY", "abc123-us6");
        std::env::set_var("MAILSYNC_SOURCE_DB", "crm.db");
        std::env::set_var("MAILSYNC_POLL_INTERVAL_SECS", "soon");

        let result = load_from_env();
        clear_env();

        assert!(matches!(result, Err(MailsyncError::Config(msg)) if msg.contains("POLL_INTERVAL")));
    }

    #[test]
    fn missing_and_unsupported_files_fail() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        let dir = TempDir::new().unwrap();

        assert!(matches!(
            load(Some(dir.path().join("absent.toml"))),
            Err(MailsyncError::Config(_))
        ));

        let yaml = write(dir.path(), "mailsync.yaml", "api_key: x");
        assert!(matches!(load(Some(yaml)), Err(MailsyncError::Config(msg)) if msg.contains("yaml")));
    }

    #[test]
    fn discovery_skips_disabled_and_plain_files() {
        let root = TempDir::new().unwrap();
        for name in ["members", "_retired", "alumni"] {
            fs::create_dir(root.path().join(name)).unwrap();
        }
        write(root.path(), "README.md", "notes");

        let dirs = discover_integrations(root.path()).unwrap();
        let names: Vec<_> =
            dirs.iter().filter_map(|d| d.file_name()?.to_str().map(str::to_string)).collect();

        assert_eq!(names, vec!["alumni", "members"]);
    }

    #[test]
    fn integration_config_is_read_from_its_folder() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("members");
        fs::create_dir(&dir).unwrap();
        write(
            &dir,
            "members.toml",
            r#"
name = "Members"
table = "v_members"
since = ["updated_at"]
field_exclusions = ["internal_notes"]

[audience_settings]
permission_reminder = "You signed up on our site"
"#,
        );

        let config = load_integration(&dir).unwrap();

        assert_eq!(config.name, "Members");
        assert_eq!(config.since, vec!["updated_at"]);
        assert!(config.field_exclusions.contains("internal_notes"));
    }

    #[test]
    fn invalid_integrations_are_rejected() {
        let root = TempDir::new().unwrap();
        let empty = root.path().join("empty");
        fs::create_dir(&empty).unwrap();
        assert!(matches!(load_integration(&empty), Err(MailsyncError::Config(_))));

        let broken = root.path().join("broken");
        fs::create_dir(&broken).unwrap();
        write(&broken, "broken.json", r#"{ "name": "", "table": "t" }"#);
        assert!(matches!(load_integration(&broken), Err(MailsyncError::Config(_))));
    }
}
