//! Client-side persistence for session credentials and preferences
//!
//! Every value is a flat string under its own key. Backends:
//!
//! - [`MemoryStorage`]: in-process map, nothing survives a restart
//! - [`FileStorage`]: one JSON object on disk
//! - `KeychainStorage`: platform keychain (feature `platform`)
//!
//! Higher layers (see [`crate::auth::TokenStore`]) serialize access and
//! decide which keys belong together.

pub mod error;
pub mod file;
#[cfg(feature = "platform")]
pub mod keychain;
pub mod memory;

use std::sync::Arc;

pub use error::{StorageError, StorageResult};
pub use file::FileStorage;
#[cfg(feature = "platform")]
pub use keychain::KeychainStorage;
pub use memory::MemoryStorage;

/// Synchronous key-value storage for flat string values
pub trait ClientStorage: Send + Sync {
    /// Read a value, `Ok(None)` when the key is absent
    ///
    /// # Errors
    /// Returns error if the backend cannot be read
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Write a value, replacing any previous one
    ///
    /// # Errors
    /// Returns error if the backend cannot be written
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove a value (idempotent)
    ///
    /// # Errors
    /// Returns error if the backend cannot be written
    fn remove(&self, key: &str) -> StorageResult<()>;

    /// Remove several values
    ///
    /// Every key is attempted even if an earlier removal fails; the first
    /// error is returned. Backends that can drop all keys in one write
    /// override this.
    ///
    /// # Errors
    /// Returns the first removal error
    fn remove_all(&self, keys: &[&str]) -> StorageResult<()> {
        let mut first_error = None;
        for key in keys {
            if let Err(err) = self.remove(key) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl<T: ClientStorage + ?Sized> ClientStorage for Arc<T> {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        (**self).remove(key)
    }

    fn remove_all(&self, keys: &[&str]) -> StorageResult<()> {
        (**self).remove_all(keys)
    }
}
