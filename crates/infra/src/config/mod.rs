//! Configuration loading and management
//!
//! This module provides utilities for loading client configuration from
//! environment variables and files, and for opening the configured
//! credential storage.

pub mod loader;
pub mod storage;

// Re-export commonly used items
pub use loader::{load, load_from_env, load_from_file, find_config_file};
pub use storage::open_storage;
