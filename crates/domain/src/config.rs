//! Client configuration structures
//!
//! Plain data only; loading from the environment or from disk lives in
//! `riskreg-infra::config`.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_API_BASE_URL, DEFAULT_KEYCHAIN_SERVICE, DEFAULT_REFRESH_LOOKAHEAD_SECS,
    DEFAULT_REQUEST_TIMEOUT_SECS, MAX_REFRESH_LOOKAHEAD_SECS,
};
use crate::errors::{Result, RiskRegError};

/// Top-level configuration for the API client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Backend base URL, e.g. `http://localhost:8000/api/v1`
    pub base_url: String,

    /// Bound on every outbound request, in seconds
    pub request_timeout_secs: u64,

    /// Refresh access tokens this many seconds before they expire
    pub refresh_lookahead_secs: u64,

    /// Where session credentials are persisted
    pub storage: StorageConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            refresh_lookahead_secs: DEFAULT_REFRESH_LOOKAHEAD_SECS,
            storage: StorageConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Request timeout as a `Duration`
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Refresh lookahead as a `Duration`
    #[must_use]
    pub const fn refresh_lookahead(&self) -> Duration {
        Duration::from_secs(self.refresh_lookahead_secs)
    }

    /// Check the configuration for values the client cannot work with
    ///
    /// # Errors
    /// Returns `RiskRegError::Config` if the base URL is empty or not
    /// http(s), the timeout is zero, or file storage has no path.
    pub fn validate(&self) -> Result<()> {
        let base = self.base_url.trim();
        if base.is_empty() {
            return Err(RiskRegError::Config("base_url must not be empty".into()));
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(RiskRegError::Config(format!(
                "base_url must be an http(s) URL, got {base}"
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(RiskRegError::Config("request_timeout_secs must be positive".into()));
        }
        if self.refresh_lookahead_secs > MAX_REFRESH_LOOKAHEAD_SECS {
            return Err(RiskRegError::Config(format!(
                "refresh_lookahead_secs must be at most {MAX_REFRESH_LOOKAHEAD_SECS}, got {}",
                self.refresh_lookahead_secs
            )));
        }
        if self.storage.backend == StorageBackend::File && self.storage.path.is_none() {
            return Err(RiskRegError::Config("file storage requires a path".into()));
        }
        Ok(())
    }
}

/// Persistence backend for session credentials and preferences
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Platform keychain (macOS Keychain, Windows Credential Manager, Secret
    /// Service)
    Keychain,
    /// JSON file on disk
    File,
    /// In-process only; nothing survives a restart
    #[default]
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = RiskRegError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keychain" => Ok(Self::Keychain),
            "file" => Ok(Self::File),
            "memory" => Ok(Self::Memory),
            other => Err(RiskRegError::Config(format!("Unknown storage backend: {other}"))),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,

    /// Keychain service name (keychain backend)
    pub service_name: String,

    /// JSON file location (file backend)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            service_name: DEFAULT_KEYCHAIN_SERVICE.to_string(),
            path: None,
        }
    }
}
