//! Testing utilities and helpers
//!
//! - **[`fixtures`]**: Unsigned JWT builders for expiry scenarios
//! - **[`mocks`]**: Scripted [`crate::auth::TokenRefresher`] and a storage
//!   backend that fails on demand
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use riskreg_common::testing::{token_expiring_in, MockTokenRefresher};
//!
//! let refresher = Arc::new(MockTokenRefresher::returning(token_expiring_in(
//!     chrono::Duration::hours(1),
//! )));
//! assert_eq!(refresher.calls(), 0);
//! ```

pub mod fixtures;
pub mod mocks;

pub use fixtures::{token_expiring_in, token_for, unsigned_token};
pub use mocks::{MockStorage, MockTokenRefresher};
