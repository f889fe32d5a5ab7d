//! Token manager with proactive refresh
//!
//! Manages the session token lifecycle:
//! - Credential persistence through [`TokenStore`]
//! - Refresh before expiry (configurable lookahead, default 5 min)
//! - Single-flight refresh through [`RefreshCoordinator`]
//! - Session transition events for the hosting application
//! - Optional background refresh task

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::coordinator::{RefreshCoordinator, RefreshError};
use super::inspector::{self, EXPIRY_LOOKAHEAD};
use super::store::TokenStore;
use super::traits::TokenRefresher;
use super::types::{SessionCredentials, SessionEvent};
use crate::storage::StorageResult;

const EVENT_CHANNEL_CAPACITY: usize = 16;
const IDLE_RECHECK: Duration = Duration::from_secs(60);

/// Outcome of the check that runs before every outbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preflight {
    /// No access token stored; send without credentials
    Anonymous,
    /// Token to attach as bearer credential
    Token(String),
    /// A token was stored but could not be kept valid
    Expired,
    /// The session changed while refreshing; leave it alone
    Superseded,
}

/// Session token manager
///
/// 1. Stores credentials via [`TokenStore`]
/// 2. Refreshes access tokens before they expire
/// 3. Funnels every refresh through one [`RefreshCoordinator`]
/// 4. Broadcasts [`SessionEvent`]s
pub struct TokenManager {
    store: Arc<TokenStore>,
    coordinator: RefreshCoordinator,
    lookahead: Duration,
    events: broadcast::Sender<SessionEvent>,
}

impl TokenManager {
    /// Create a new token manager
    ///
    /// # Arguments
    /// * `store` - Credential storage shared with the rest of the client
    /// * `refresher` - Network side of the refresh exchange
    #[must_use]
    pub fn new(store: Arc<TokenStore>, refresher: Arc<dyn TokenRefresher>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            coordinator: RefreshCoordinator::new(Arc::clone(&store), refresher),
            store,
            lookahead: EXPIRY_LOOKAHEAD,
            events,
        }
    }

    /// Override the expiring-soon window
    #[must_use]
    pub fn with_lookahead(mut self, lookahead: Duration) -> Self {
        self.lookahead = lookahead;
        self
    }

    /// Get an access token that is safe to send, refreshing if needed
    ///
    /// # Returns
    /// - `None` if no access token is stored. No refresh is attempted even
    ///   when a refresh token exists.
    /// - The stored token if it is not expiring soon.
    /// - A freshly refreshed token otherwise, or `None` if the refresh
    ///   failed.
    ///
    /// # Errors
    /// Returns error if the store cannot be read
    pub async fn ensure_valid(&self) -> StorageResult<Option<String>> {
        Ok(match self.preflight().await? {
            Preflight::Token(token) => Some(token),
            Preflight::Anonymous | Preflight::Expired | Preflight::Superseded => None,
        })
    }

    /// [`Self::ensure_valid`], distinguishing "never had a token" from "lost
    /// it"
    ///
    /// # Errors
    /// Returns error if the store cannot be read
    pub async fn preflight(&self) -> StorageResult<Preflight> {
        let Some(token) = self.store.access_token()? else {
            return Ok(Preflight::Anonymous);
        };

        if !inspector::is_expiring_within(&token, self.lookahead, Utc::now()) {
            return Ok(Preflight::Token(token));
        }

        debug!("Access token expiring soon, refreshing");
        match self.coordinator.refresh().await {
            Ok(token) => Ok(Preflight::Token(token)),
            Err(RefreshError::Superseded) => {
                debug!("Proactive refresh superseded by a newer session");
                Ok(Preflight::Superseded)
            }
            Err(err) => {
                debug!(error = %err, "Proactive refresh failed");
                Ok(Preflight::Expired)
            }
        }
    }

    /// Refresh the access token now
    ///
    /// Joins an in-flight refresh if there is one.
    ///
    /// # Errors
    /// Returns `RefreshError` if no refresh token is stored or the refresh is
    /// rejected. Stored credentials are cleared in that case.
    pub async fn refresh(&self) -> Result<String, RefreshError> {
        self.coordinator.refresh().await
    }

    /// Whether a refresh is currently running
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.coordinator.is_refreshing()
    }

    /// Store credentials from a successful login
    ///
    /// # Errors
    /// Returns error if storage fails; nothing is left stored in that case
    pub fn start_session(&self, credentials: &SessionCredentials) -> StorageResult<()> {
        self.store.store_session(credentials)?;
        self.emit(SessionEvent::LoggedIn { username: credentials.username.clone() });
        Ok(())
    }

    /// Clear credentials after an unrecoverable auth failure and announce it
    ///
    /// Subscribers receive [`SessionEvent::Expired`] even if clearing fails.
    pub fn expire_session(&self) {
        if let Err(err) = self.store.clear() {
            error!(error = %err, "Failed to clear expired session");
        }
        info!("Session expired");
        self.emit(SessionEvent::Expired);
    }

    /// Clear credentials on explicit logout
    ///
    /// # Errors
    /// Returns error if the store cannot be cleared
    pub fn end_session(&self) -> StorageResult<()> {
        let cleared = self.store.clear();
        info!("Session ended (logged out)");
        self.emit(SessionEvent::LoggedOut);
        cleared
    }

    /// Subscribe to session transitions
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Whether an access token is stored
    ///
    /// # Errors
    /// Returns error if the store cannot be read
    pub fn is_authenticated(&self) -> StorageResult<bool> {
        self.store.has_access_token()
    }

    #[must_use]
    pub fn store(&self) -> &Arc<TokenStore> {
        &self.store
    }

    #[must_use]
    pub fn lookahead(&self) -> Duration {
        self.lookahead
    }

    /// Start background refresh task
    ///
    /// Sleeps until the stored token enters the lookahead window, then
    /// refreshes through the coordinator, so it never races a
    /// request-triggered refresh. A failed refresh expires the session.
    /// Runs until the handle is aborted.
    pub fn spawn_auto_refresh(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("Starting token auto-refresh background task");

            loop {
                let wake = self.next_refresh_in();
                if !wake.is_zero() {
                    debug!(seconds = wake.as_secs(), "Auto-refresh sleeping");
                    tokio::time::sleep(wake).await;
                }

                // The user may have logged out during the sleep.
                let token = match self.store.access_token() {
                    Ok(Some(token)) => token,
                    Ok(None) => continue,
                    Err(err) => {
                        warn!(error = %err, "Auto-refresh could not read token store");
                        tokio::time::sleep(IDLE_RECHECK).await;
                        continue;
                    }
                };
                if !inspector::is_expiring_within(&token, self.lookahead, Utc::now()) {
                    continue;
                }

                info!("Auto-refresh: token expiring soon, refreshing");
                match self.coordinator.refresh().await {
                    Ok(token) => {
                        // Avoid spinning on tokens issued inside the window.
                        if inspector::is_expiring_within(&token, self.lookahead, Utc::now()) {
                            warn!("Refreshed token is already expiring soon");
                            tokio::time::sleep(IDLE_RECHECK).await;
                        }
                    }
                    Err(RefreshError::Superseded) => {}
                    Err(err) => {
                        error!(error = %err, "Auto-refresh failed");
                        self.emit(SessionEvent::Expired);
                    }
                }
            }
        })
    }

    fn next_refresh_in(&self) -> Duration {
        let Ok(Some(token)) = self.store.access_token() else {
            return IDLE_RECHECK;
        };
        let Some(expires_at) = inspector::expires_at(&token) else {
            return Duration::ZERO;
        };
        let lookahead =
            chrono::Duration::from_std(self.lookahead).unwrap_or_else(|_| chrono::Duration::zero());
        let Some(refresh_at) = expires_at.checked_sub_signed(lookahead) else {
            return Duration::ZERO;
        };
        (refresh_at - Utc::now()).to_std().unwrap_or(Duration::ZERO)
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("lookahead", &self.lookahead)
            .field("coordinator", &self.coordinator)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for auth::token_manager.
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::testing::fixtures::{token_expiring_in, unsigned_token};
    use crate::testing::MockTokenRefresher;

    fn create_test_manager(refresher: Arc<MockTokenRefresher>) -> TokenManager {
        let store = Arc::new(TokenStore::new(MemoryStorage::new()));
        TokenManager::new(store, refresher)
    }

    fn session_with(access_token: String) -> SessionCredentials {
        SessionCredentials::new(access_token, "refresh", "analyst")
    }

    /// Validates that a fresh token is returned untouched.
    ///
    /// Assertions:
    /// - The stored token comes back.
    /// - No refresh call is made.
    #[tokio::test]
    async fn test_valid_token_is_returned_without_refresh() {
        let refresher = Arc::new(MockTokenRefresher::returning("unused"));
        let manager = create_test_manager(refresher.clone());
        let token = token_expiring_in(chrono::Duration::hours(1));
        manager.start_session(&session_with(token.clone())).unwrap();

        assert_eq!(manager.ensure_valid().await.unwrap(), Some(token));
        assert_eq!(refresher.calls(), 0);
    }

    #[tokio::test]
    async fn test_no_access_token_returns_none_even_with_refresh_token() {
        let refresher = Arc::new(MockTokenRefresher::returning("unused"));
        let manager = create_test_manager(refresher.clone());
        manager.store().set_refresh_token("refresh").unwrap();

        assert_eq!(manager.preflight().await.unwrap(), Preflight::Anonymous);
        assert_eq!(manager.ensure_valid().await.unwrap(), None);
        assert_eq!(refresher.calls(), 0);
    }

    /// Validates the proactive refresh scenario.
    ///
    /// Assertions:
    /// - A token expiring in one minute triggers exactly one refresh.
    /// - The refreshed token is stored and returned.
    #[tokio::test]
    async fn test_expiring_token_is_refreshed_once() {
        let fresh = token_expiring_in(chrono::Duration::hours(1));
        let refresher = Arc::new(MockTokenRefresher::returning(fresh.clone()));
        let manager = create_test_manager(refresher.clone());
        manager
            .start_session(&session_with(token_expiring_in(chrono::Duration::minutes(1))))
            .unwrap();

        assert_eq!(manager.ensure_valid().await.unwrap(), Some(fresh.clone()));
        assert_eq!(refresher.calls(), 1);
        assert_eq!(manager.store().access_token().unwrap(), Some(fresh));
    }

    #[tokio::test]
    async fn test_failed_refresh_reports_expired_and_clears() {
        let refresher = Arc::new(MockTokenRefresher::rejecting());
        let manager = create_test_manager(refresher.clone());
        manager.start_session(&session_with(unsigned_token(&serde_json::json!({})))).unwrap();

        assert_eq!(manager.preflight().await.unwrap(), Preflight::Expired);
        assert_eq!(refresher.calls(), 1);
        assert!(!manager.is_authenticated().unwrap());
        assert_eq!(manager.store().refresh_token().unwrap(), None);
    }

    #[tokio::test]
    async fn test_lookahead_is_configurable() {
        let refresher = Arc::new(MockTokenRefresher::returning("new"));
        let manager = create_test_manager(refresher.clone()).with_lookahead(Duration::from_secs(30));
        let token = token_expiring_in(chrono::Duration::minutes(1));
        manager.start_session(&session_with(token.clone())).unwrap();

        assert_eq!(manager.lookahead(), Duration::from_secs(30));
        assert_eq!(manager.ensure_valid().await.unwrap(), Some(token));
        assert_eq!(refresher.calls(), 0);
    }

    #[tokio::test]
    async fn test_session_events_are_broadcast() {
        let manager = create_test_manager(Arc::new(MockTokenRefresher::returning("x")));
        let mut events = manager.subscribe();

        manager.start_session(&session_with("access".into())).unwrap();
        manager.expire_session();
        manager.end_session().unwrap();

        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::LoggedIn { username: "analyst".into() }
        );
        assert_eq!(events.recv().await.unwrap(), SessionEvent::Expired);
        assert_eq!(events.recv().await.unwrap(), SessionEvent::LoggedOut);
        assert!(!manager.is_authenticated().unwrap());
    }

    /// Validates that a refresh overtaken by a new login leaves that login
    /// in place.
    ///
    /// Assertions:
    /// - Preflight reports `Superseded`, not `Expired`.
    /// - The newer session is still stored.
    #[tokio::test]
    async fn test_superseded_refresh_keeps_newer_session() {
        let refresher = Arc::new(
            MockTokenRefresher::returning(token_expiring_in(chrono::Duration::hours(1)))
                .with_delay(Duration::from_millis(200)),
        );
        let manager = Arc::new(create_test_manager(refresher.clone()));
        manager
            .start_session(&session_with(token_expiring_in(chrono::Duration::minutes(1))))
            .unwrap();

        let preflight = tokio::spawn({
            let manager = Arc::clone(&manager);
            async move { manager.preflight().await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        let newer = token_expiring_in(chrono::Duration::hours(2));
        manager.start_session(&SessionCredentials::new(newer.clone(), "refresh-2", "bob")).unwrap();

        assert_eq!(preflight.await.unwrap().unwrap(), Preflight::Superseded);
        assert_eq!(manager.store().access_token().unwrap(), Some(newer));
        assert_eq!(manager.store().refresh_token().unwrap().as_deref(), Some("refresh-2"));
    }

    #[test]
    fn test_lookahead_beyond_calendar_range_refreshes_now() {
        let manager = create_test_manager(Arc::new(MockTokenRefresher::returning("x")))
            .with_lookahead(Duration::from_secs(10_000_000_000_000));
        manager
            .start_session(&session_with(token_expiring_in(chrono::Duration::hours(1))))
            .unwrap();

        assert_eq!(manager.next_refresh_in(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_refresh_replaces_expiring_token() {
        let fresh = token_expiring_in(chrono::Duration::hours(1));
        let refresher = Arc::new(MockTokenRefresher::returning(fresh.clone()));
        let manager = Arc::new(create_test_manager(refresher.clone()));
        manager
            .start_session(&session_with(token_expiring_in(chrono::Duration::minutes(2))))
            .unwrap();

        let handle = Arc::clone(&manager).spawn_auto_refresh();
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        handle.abort();

        assert_eq!(refresher.calls(), 1);
        assert_eq!(manager.store().access_token().unwrap(), Some(fresh));
    }
}
