//! Tracing bootstrap for hosting applications
//!
//! The client crates only emit `tracing` events. Binaries and tests that
//! want them on stderr call [`init_tracing`] once at startup.
//!
//! ## Environment Variables
//! - `RUST_LOG`: Standard filter directives, take precedence when set
//! - `RISKREG_LOG_LEVEL`: Fallback filter (default `info`)
//! - `RISKREG_LOG_JSON`: Emit JSON lines instead of human-readable output

use riskreg_domain::RiskRegError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Subscriber settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// Filter used when `RUST_LOG` is not set
    pub level: String,
    /// JSON output instead of the pretty formatter
    pub json: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}

impl TracingConfig {
    /// Read settings from `RISKREG_LOG_LEVEL` / `RISKREG_LOG_JSON`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            level: std::env::var("RISKREG_LOG_LEVEL").unwrap_or(defaults.level),
            json: std::env::var("RISKREG_LOG_JSON")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
                .unwrap_or(defaults.json),
        }
    }
}

/// Install a global fmt subscriber
///
/// # Errors
/// Returns `RiskRegError::Config` if the filter is invalid or a global
/// subscriber is already installed.
pub fn init_tracing(config: &TracingConfig) -> Result<(), RiskRegError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| RiskRegError::Config(format!("Invalid log filter: {e}")))?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.json {
        registry.with(tracing_subscriber::fmt::layer().json().with_target(true)).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer().with_target(true)).try_init()
    };

    result.map_err(|e| RiskRegError::Config(format!("Failed to install subscriber: {e}")))
}
