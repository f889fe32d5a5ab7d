//! Risk register API client
//!
//! Authenticated access to the backend REST API.
//!
//! # Architecture
//!
//! - [`AuthClient`]: raw `/auth/*` calls, and the `TokenRefresher` the
//!   shared refresh coordinator drives
//! - [`ApiClient`]: request wrapper with bearer auth, proactive refresh, one
//!   reactive refresh-and-retry on 401 and a bounded timeout
//! - [`ApiCommands`]: typed risk, log entry, dashboard, dropdown and chat
//!   calls on top of the request wrapper
//! - Session state lives in `riskreg_common::auth::TokenManager`, shared by
//!   every clone of the client
//!
//! Tokens are never logged.

pub mod auth;
pub mod chat;
pub mod client;
pub mod commands;
pub mod errors;

pub use auth::AuthClient;
pub use chat::{ChatHealth, ChatRequest, ChatResponse};
pub use client::{ApiClient, ApiClientBuilder};
pub use commands::ApiCommands;
pub use errors::{ApiError, ApiErrorCategory};
