//! # Risk Register Domain
//!
//! Shared types for the risk register client crates.
//!
//! This crate contains:
//! - The workspace error type and `Result` alias
//! - Client configuration structures
//! - Constants shared by the session and transport layers
//! - Resource models for risks, log entries, the dashboard and dropdowns
//!
//! ## Architecture
//! - No dependencies on other workspace crates
//! - No I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
