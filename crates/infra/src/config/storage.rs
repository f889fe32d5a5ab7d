//! Storage backend selection

use std::sync::Arc;

use riskreg_common::storage::{ClientStorage, FileStorage, KeychainStorage, MemoryStorage};
use riskreg_domain::{Result, RiskRegError, StorageBackend, StorageConfig};

/// Open the credential storage named by the configuration
///
/// # Errors
/// Returns `RiskRegError::Config` if the file backend has no path.
pub fn open_storage(config: &StorageConfig) -> Result<Arc<dyn ClientStorage>> {
    let storage: Arc<dyn ClientStorage> = match config.backend {
        StorageBackend::Keychain => Arc::new(KeychainStorage::new(config.service_name.clone())),
        StorageBackend::File => {
            let path = config
                .path
                .clone()
                .ok_or_else(|| RiskRegError::Config("file storage requires a path".into()))?;
            Arc::new(FileStorage::new(path))
        }
        StorageBackend::Memory => Arc::new(MemoryStorage::new()),
    };

    tracing::debug!(backend = ?config.backend, "Credential storage opened");
    Ok(storage)
}
