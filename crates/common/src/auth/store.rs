//! Token store: session credentials on top of a [`ClientStorage`] backend.
//!
//! Access token, refresh token and username share one lifecycle. Every
//! operation runs under a single lock, so a reader never observes a
//! half-written or half-cleared session.

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::types::{SessionCredentials, Theme};
use crate::storage::{ClientStorage, StorageResult};

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
pub const USERNAME_KEY: &str = "username";
pub const THEME_KEY: &str = "theme";

const SESSION_KEYS: [&str; 3] = [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USERNAME_KEY];

/// Durable storage for session credentials and the theme preference
pub struct TokenStore {
    backend: Box<dyn ClientStorage>,
    lock: Mutex<()>,
}

impl TokenStore {
    pub fn new(backend: impl ClientStorage + 'static) -> Self {
        Self { backend: Box::new(backend), lock: Mutex::new(()) }
    }

    /// Stored access token
    ///
    /// # Errors
    /// Returns error if the backend cannot be read
    pub fn access_token(&self) -> StorageResult<Option<String>> {
        self.read(ACCESS_TOKEN_KEY)
    }

    /// # Errors
    /// Returns error if the backend cannot be written
    pub fn set_access_token(&self, token: &str) -> StorageResult<()> {
        self.write(ACCESS_TOKEN_KEY, token)
    }

    /// Stored refresh token
    ///
    /// # Errors
    /// Returns error if the backend cannot be read
    pub fn refresh_token(&self) -> StorageResult<Option<String>> {
        self.read(REFRESH_TOKEN_KEY)
    }

    /// # Errors
    /// Returns error if the backend cannot be written
    pub fn set_refresh_token(&self, token: &str) -> StorageResult<()> {
        self.write(REFRESH_TOKEN_KEY, token)
    }

    /// Username the session belongs to
    ///
    /// # Errors
    /// Returns error if the backend cannot be read
    pub fn username(&self) -> StorageResult<Option<String>> {
        self.read(USERNAME_KEY)
    }

    /// # Errors
    /// Returns error if the backend cannot be written
    pub fn set_username(&self, username: &str) -> StorageResult<()> {
        self.write(USERNAME_KEY, username)
    }

    /// Replace the access token only if the session still holds
    /// `refresh_token`
    ///
    /// Returns `false` (and writes nothing) when the session was cleared or
    /// replaced in the meantime.
    ///
    /// # Errors
    /// Returns error if the backend cannot be read or written
    pub fn replace_access_token_if_current(
        &self,
        refresh_token: &str,
        access_token: &str,
    ) -> StorageResult<bool> {
        let _guard = self.lock.lock();
        if self.backend.get(REFRESH_TOKEN_KEY)?.as_deref() != Some(refresh_token) {
            return Ok(false);
        }
        self.backend.set(ACCESS_TOKEN_KEY, access_token)?;
        Ok(true)
    }

    /// Write all three credentials together
    ///
    /// If any write fails the partial session is removed again.
    ///
    /// # Errors
    /// Returns the first write error
    pub fn store_session(&self, credentials: &SessionCredentials) -> StorageResult<()> {
        let _guard = self.lock.lock();

        let written = self
            .backend
            .set(ACCESS_TOKEN_KEY, &credentials.access_token)
            .and_then(|()| self.backend.set(REFRESH_TOKEN_KEY, &credentials.refresh_token))
            .and_then(|()| self.backend.set(USERNAME_KEY, &credentials.username));

        if let Err(err) = written {
            warn!(error = %err, "Failed to store session, rolling back");
            if let Err(rollback) = self.backend.remove_all(&SESSION_KEYS) {
                warn!(error = %rollback, "Rollback of partial session failed");
            }
            return Err(err);
        }

        info!(username = %credentials.username, "Session stored");
        Ok(())
    }

    /// Full session, if all three values are present
    ///
    /// # Errors
    /// Returns error if the backend cannot be read
    pub fn session(&self) -> StorageResult<Option<SessionCredentials>> {
        let _guard = self.lock.lock();
        let access = self.backend.get(ACCESS_TOKEN_KEY)?;
        let refresh = self.backend.get(REFRESH_TOKEN_KEY)?;
        let username = self.backend.get(USERNAME_KEY)?;

        Ok(match (access, refresh, username) {
            (Some(access_token), Some(refresh_token), Some(username)) => {
                Some(SessionCredentials { access_token, refresh_token, username })
            }
            _ => None,
        })
    }

    /// Whether an access token is stored
    ///
    /// # Errors
    /// Returns error if the backend cannot be read
    pub fn has_access_token(&self) -> StorageResult<bool> {
        Ok(self.access_token()?.is_some())
    }

    /// Remove access token, refresh token and username as one step
    ///
    /// # Errors
    /// Returns the first removal error; removal of the other keys is still
    /// attempted
    pub fn clear(&self) -> StorageResult<()> {
        let _guard = self.lock.lock();
        self.backend.remove_all(&SESSION_KEYS)?;
        debug!("Session credentials cleared");
        Ok(())
    }

    /// Theme preference, default when unset or unreadable as a theme
    ///
    /// # Errors
    /// Returns error if the backend cannot be read
    pub fn theme(&self) -> StorageResult<Theme> {
        Ok(self
            .read(THEME_KEY)?
            .and_then(|value| value.parse().ok())
            .unwrap_or_default())
    }

    /// # Errors
    /// Returns error if the backend cannot be written
    pub fn set_theme(&self, theme: Theme) -> StorageResult<()> {
        self.write(THEME_KEY, theme.as_str())
    }

    fn read(&self, key: &str) -> StorageResult<Option<String>> {
        let _guard = self.lock.lock();
        self.backend.get(key)
    }

    fn write(&self, key: &str, value: &str) -> StorageResult<()> {
        let _guard = self.lock.lock();
        self.backend.set(key, value)
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore").finish_non_exhaustive()
    }
}
