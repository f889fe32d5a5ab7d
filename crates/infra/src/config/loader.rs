//! Configuration loader
//!
//! Loads client configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If `RISKREG_API_BASE_URL` is unset, falls back to loading from file
//! 3. Searches the working directory and the executable's directory
//! 4. Supports JSON and TOML formats
//! 5. With no file either, uses the built-in defaults
//!
//! ## Environment Variables
//! - `RISKREG_API_BASE_URL`: Backend base URL (required for env loading)
//! - `RISKREG_REQUEST_TIMEOUT_SECS`: Bound on each request in seconds
//! - `RISKREG_REFRESH_LOOKAHEAD_SECS`: Proactive refresh window in seconds
//! - `RISKREG_STORAGE_BACKEND`: `keychain`, `file` or `memory`
//! - `RISKREG_STORAGE_PATH`: Session file path (file backend)
//! - `RISKREG_KEYCHAIN_SERVICE`: Keychain service name (keychain backend)

use std::path::{Path, PathBuf};
use std::str::FromStr;

use riskreg_domain::{ClientConfig, Result, RiskRegError, StorageBackend};

const CONFIG_FILE_NAMES: [&str; 2] = ["riskreg.toml", "riskreg.json"];

/// Load configuration with automatic fallback strategy
///
/// Environment first, then a config file found on disk, then defaults. The result
/// is validated before it is returned.
///
/// # Errors
/// Returns `RiskRegError::Config` if:
/// - An environment variable or file has an invalid value
/// - The resulting configuration fails validation
pub fn load() -> Result<ClientConfig> {
    let config = match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            config
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            match find_config_file() {
                Some(path) => load_from_file(Some(path))?,
                None => {
                    tracing::info!("No config file found, using defaults");
                    ClientConfig::default()
                }
            }
        }
    };

    config.validate()?;
    Ok(config)
}

/// Load configuration from environment variables
///
/// `RISKREG_API_BASE_URL` must be present; every other variable falls back
/// to its default.
///
/// # Errors
/// Returns `RiskRegError::Config` if the base URL is missing or a value is
/// invalid.
pub fn load_from_env() -> Result<ClientConfig> {
    let mut config =
        ClientConfig { base_url: env_var("RISKREG_API_BASE_URL")?, ..ClientConfig::default() };

    if let Some(timeout) = env_parse::<u64>("RISKREG_REQUEST_TIMEOUT_SECS")? {
        config.request_timeout_secs = timeout;
    }
    if let Some(lookahead) = env_parse::<u64>("RISKREG_REFRESH_LOOKAHEAD_SECS")? {
        config.refresh_lookahead_secs = lookahead;
    }
    if let Some(backend) = env_parse::<StorageBackend>("RISKREG_STORAGE_BACKEND")? {
        config.storage.backend = backend;
    }
    if let Ok(path) = std::env::var("RISKREG_STORAGE_PATH") {
        config.storage.path = Some(PathBuf::from(path));
    }
    if let Ok(service) = std::env::var("RISKREG_KEYCHAIN_SERVICE") {
        config.storage.service_name = service;
    }

    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, searches for `riskreg.toml` / `riskreg.json`.
/// Format is detected by file extension.
///
/// # Errors
/// Returns `RiskRegError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<ClientConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(RiskRegError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => find_config_file().ok_or_else(|| {
            RiskRegError::Config("No config file found in any of the standard locations".into())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| RiskRegError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

fn parse_config(contents: &str, path: &Path) -> Result<ClientConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| RiskRegError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| RiskRegError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(RiskRegError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Search for a configuration file
///
/// Looks for `riskreg.toml` then `riskreg.json` in the current working
/// directory, then next to the executable.
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn find_config_file() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }
    if let Some(exe_dir) =
        std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        dirs.push(exe_dir);
    }

    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| RiskRegError::Config(format!("Missing required environment variable: {key}")))
}

/// Parse an optional environment variable, `Ok(None)` when unset
fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| RiskRegError::Config(format!("Invalid value for {key}: {e}"))),
        Err(_) => Ok(None),
    }
}
