//! Traits for the network side of token refresh
//!
//! The refresh coordinator only needs "exchange this refresh token for a new
//! access token"; the HTTP implementation lives in `riskreg-infra`, tests use
//! [`crate::testing::MockTokenRefresher`].

use async_trait::async_trait;

use super::coordinator::RefreshError;
use super::types::RefreshResponse;

/// Exchanges a refresh token for a new access token
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Refresh access token using refresh token
    ///
    /// # Arguments
    /// * `refresh_token` - Refresh token issued at login
    ///
    /// # Errors
    /// Returns `RefreshError::Rejected` if the server refuses the token
    /// (expired or revoked) and `RefreshError::Transport` if the exchange
    /// could not be completed.
    async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<RefreshResponse, RefreshError>;
}
