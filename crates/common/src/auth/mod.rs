//! Session token infrastructure
//!
//! Everything the API client needs to keep a bearer session alive: durable
//! credentials, expiry inspection, and single-flight refresh.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  TokenManager   │  ensure_valid / session events / auto-refresh
//! └────────┬────────┘
//!          │
//!          ├──► TokenStore          (credentials over ClientStorage)
//!          ├──► inspector           (unverified JWT expiry check)
//!          └──► RefreshCoordinator  (one refresh in flight, shared result)
//!                    │
//!                    └──► TokenRefresher  (HTTP side, lives in infra)
//! ```
//!
//! # Usage Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use riskreg_common::auth::{TokenManager, TokenRefresher, TokenStore};
//! use riskreg_common::storage::MemoryStorage;
//!
//! async fn example(refresher: Arc<dyn TokenRefresher>) {
//!     let store = Arc::new(TokenStore::new(MemoryStorage::new()));
//!     let manager = TokenManager::new(store, refresher);
//!
//!     let mut events = manager.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("session event: {event:?}");
//!         }
//!     });
//!
//!     // Refreshes first if the stored token expires within five minutes
//!     if let Ok(Some(token)) = manager.ensure_valid().await {
//!         println!("bearer {token}");
//!     }
//! }
//! ```
//!
//! # Module Organization
//!
//! - **[`types`]**: Credentials, claims, wire formats, session events
//! - **[`store`]**: Credential persistence with atomic clear
//! - **[`inspector`]**: Expiry decoding without signature verification
//! - **[`coordinator`]**: Single-flight refresh
//! - **[`token_manager`]**: Token lifecycle and proactive refresh
//! - **[`traits`]**: The refresh exchange seam

pub mod coordinator;
pub mod inspector;
pub mod store;
pub mod token_manager;
pub mod traits;
pub mod types;

pub use coordinator::{RefreshCoordinator, RefreshError};
pub use inspector::{is_expiring_soon, InspectError, EXPIRY_LOOKAHEAD};
pub use store::TokenStore;
pub use token_manager::{Preflight, TokenManager};
pub use traits::TokenRefresher;
pub use types::{
    LoginResponse, LogoutResponse, RefreshRequest, RefreshResponse, SessionCredentials,
    SessionEvent, Theme, TokenClaims, VerifyResponse,
};
