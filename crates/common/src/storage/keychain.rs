//! Platform keychain storage backend
//!
//! Thin wrapper over the `keyring` crate: macOS Keychain, Windows Credential
//! Manager, or the Secret Service API on Linux. Each key becomes one keychain
//! entry under the configured service name.
//!
//! ```no_run
//! use riskreg_common::storage::{ClientStorage, KeychainStorage};
//!
//! let keychain = KeychainStorage::new("RiskRegister.session");
//! keychain.set("username", "analyst")?;
//! assert_eq!(keychain.get("username")?.as_deref(), Some("analyst"));
//! # Ok::<(), riskreg_common::storage::StorageError>(())
//! ```

use keyring::Entry;
use tracing::debug;

use super::{ClientStorage, StorageError, StorageResult};

/// Keychain-backed storage
#[derive(Debug, Clone)]
pub struct KeychainStorage {
    service_name: String,
}

impl KeychainStorage {
    /// Create a keychain backend for a specific service
    ///
    /// # Arguments
    /// * `service_name` - Service identifier (e.g., "RiskRegister.session")
    pub fn new(service_name: impl Into<String>) -> Self {
        Self { service_name: service_name.into() }
    }

    /// Service identifier entries are filed under
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    fn entry(&self, key: &str) -> StorageResult<Entry> {
        Entry::new(&self.service_name, key).map_err(|e| {
            StorageError::AccessFailed(format!("Failed to open keychain entry {key}: {e}"))
        })
    }
}

impl ClientStorage for KeychainStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        debug!(service = %self.service_name, key = %key, "Reading keychain entry");

        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(StorageError::AccessFailed(format!(
                "Failed to read keychain entry {key}: {e}"
            ))),
        }
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        debug!(service = %self.service_name, key = %key, "Writing keychain entry");

        self.entry(key)?.set_password(value).map_err(|e| {
            StorageError::AccessFailed(format!("Failed to write keychain entry {key}: {e}"))
        })
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        debug!(service = %self.service_name, key = %key, "Deleting keychain entry");

        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(StorageError::AccessFailed(format!(
                "Failed to delete keychain entry {key}: {e}"
            ))),
        }
    }
}
