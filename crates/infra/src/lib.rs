//! # Risk Register Infrastructure
//!
//! Outbound I/O for the risk register client.
//!
//! This crate contains:
//! - HTTP transport with a bounded per-request timeout
//! - The auth client and the authenticated API client
//! - Typed commands for the risk register resources
//! - Configuration loading and storage backend selection
//! - Tracing bootstrap
//!
//! ## Architecture
//! - Session state and refresh coordination come from `riskreg-common`
//! - Depends on `riskreg-domain` for configuration and the workspace error
//! - Contains all "impure" code (network, files, environment)

pub mod api;
pub mod config;
pub mod errors;
pub mod http;
pub mod observability;

// Re-export commonly used items
pub use api::{
    ApiClient, ApiClientBuilder, ApiCommands, ApiError, ApiErrorCategory, AuthClient, ChatRequest,
    ChatResponse,
};
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder};
pub use observability::{init_tracing, TracingConfig};
