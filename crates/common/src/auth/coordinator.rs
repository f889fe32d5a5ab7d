//! Single-flight token refresh
//!
//! At most one refresh is in flight per coordinator. Callers that arrive
//! while one is running await the same shared result instead of issuing a
//! second network call, which keeps a burst of simultaneous 401s from
//! turning into a burst of refresh calls.
//!
//! The flight slot is emptied by the flight itself before its result is
//! published, so a refresh's completion happens-before the coordinator
//! accepts the next refresh request.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::store::TokenStore;
use super::traits::TokenRefresher;

/// Token refresh failure
///
/// Cloneable because every caller sharing a flight receives its own copy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    /// Nothing to refresh with; no network call was made
    #[error("Token refresh failed: no refresh token stored")]
    NoRefreshToken,

    /// The server refused the refresh token (expired or revoked)
    #[error("Token refresh failed: refresh token rejected: {0}")]
    Rejected(String),

    /// The exchange could not be completed
    #[error("Token refresh failed: {0}")]
    Transport(String),

    /// Credentials could not be read or written
    #[error("Token refresh failed: storage error: {0}")]
    Storage(String),

    /// The session was cleared or replaced while the refresh was running
    #[error("Token refresh failed: session changed during refresh")]
    Superseded,
}

type RefreshOutcome = Result<String, RefreshError>;
type RefreshFlight = Shared<BoxFuture<'static, RefreshOutcome>>;
type FlightSlot = Arc<Mutex<Option<RefreshFlight>>>;

/// Owns the refresh-in-flight slot for one session
pub struct RefreshCoordinator {
    store: Arc<TokenStore>,
    refresher: Arc<dyn TokenRefresher>,
    in_flight: FlightSlot,
}

impl RefreshCoordinator {
    #[must_use]
    pub fn new(store: Arc<TokenStore>, refresher: Arc<dyn TokenRefresher>) -> Self {
        Self { store, refresher, in_flight: Arc::new(Mutex::new(None)) }
    }

    /// Obtain a new access token, joining the in-flight refresh if any
    ///
    /// On success the new token is already stored when this returns. On
    /// failure the stored credentials have been cleared, except for
    /// [`RefreshError::Superseded`] where the current session is not ours to
    /// clear.
    ///
    /// # Errors
    /// Returns `RefreshError` if no refresh token is stored or the refresh
    /// fails.
    pub async fn refresh(&self) -> RefreshOutcome {
        let flight = {
            let mut slot = self.in_flight.lock();
            if let Some(flight) = slot.as_ref() {
                debug!("Joining in-flight token refresh");
                flight.clone()
            } else {
                let flight = self.start_flight();
                *slot = Some(flight.clone());
                flight
            }
        };

        flight.await
    }

    /// Whether a refresh is currently running
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.in_flight.lock().is_some()
    }

    fn start_flight(&self) -> RefreshFlight {
        let store = Arc::clone(&self.store);
        let refresher = Arc::clone(&self.refresher);
        let slot = Arc::clone(&self.in_flight);

        async move {
            let outcome = run_refresh(&store, refresher.as_ref()).await;

            match &outcome {
                Ok(_) => info!("Access token refreshed"),
                Err(RefreshError::Superseded) => {
                    debug!("Refresh result discarded, session changed");
                }
                Err(err) => {
                    warn!(error = %err, "Token refresh failed, clearing session");
                    if let Err(clear_err) = store.clear() {
                        warn!(error = %clear_err, "Failed to clear session after refresh failure");
                    }
                }
            }

            slot.lock().take();
            outcome
        }
        .boxed()
        .shared()
    }
}

async fn run_refresh(store: &TokenStore, refresher: &dyn TokenRefresher) -> RefreshOutcome {
    let refresh_token = store
        .refresh_token()
        .map_err(|e| RefreshError::Storage(e.to_string()))?
        .ok_or(RefreshError::NoRefreshToken)?;

    debug!("Exchanging refresh token");
    let response = refresher.refresh_access_token(&refresh_token).await?;

    let replaced = store
        .replace_access_token_if_current(&refresh_token, &response.access_token)
        .map_err(|e| RefreshError::Storage(e.to_string()))?;
    if !replaced {
        return Err(RefreshError::Superseded);
    }

    Ok(response.access_token)
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("refreshing", &self.is_refreshing())
            .finish_non_exhaustive()
    }
}
