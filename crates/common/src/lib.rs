//! Session primitives shared by the risk register client crates.
//!
//! # Feature Tiers
//!
//! - `runtime` (default): storage backends, token inspection, refresh
//!   coordination, session events
//! - `platform`: platform keychain storage via `keyring`
//! - `test-utils`: mocks and token fixtures for downstream tests

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

#[cfg(feature = "runtime")]
pub mod auth;
#[cfg(feature = "runtime")]
pub mod storage;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(any(feature = "test-utils", test))]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "runtime")]
pub use auth::{
    RefreshCoordinator, RefreshError, SessionCredentials, SessionEvent, Theme, TokenManager,
    TokenRefresher, TokenStore,
};
#[cfg(feature = "platform")]
pub use storage::KeychainStorage;
#[cfg(feature = "runtime")]
pub use storage::{ClientStorage, FileStorage, MemoryStorage, StorageError};
