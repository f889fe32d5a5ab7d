//! Mock implementations of session traits
//!
//! Provides mock objects for testing purposes.

// Test mocks favour simple signatures over documented error contracts
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::auth::{RefreshError, RefreshResponse, TokenRefresher};
use crate::storage::{ClientStorage, StorageError, StorageResult};

/// Mock refresh exchange with a scripted response
///
/// Counts calls, remembers the last refresh token presented, and can delay
/// its answer to hold a refresh in flight.
///
/// # Examples
///
/// ```
/// use riskreg_common::testing::MockTokenRefresher;
///
/// let refresher = MockTokenRefresher::returning("new-access-token");
/// assert_eq!(refresher.calls(), 0);
/// ```
#[derive(Debug)]
pub struct MockTokenRefresher {
    response: Mutex<Result<String, RefreshError>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    last_refresh_token: Mutex<Option<String>>,
}

impl MockTokenRefresher {
    /// Refresher that always issues `access_token`
    pub fn returning(access_token: impl Into<String>) -> Self {
        Self::with_response(Ok(access_token.into()))
    }

    /// Refresher whose server rejects every refresh token
    pub fn rejecting() -> Self {
        Self::with_response(Err(RefreshError::Rejected("refresh token expired".into())))
    }

    pub fn with_response(response: Result<String, RefreshError>) -> Self {
        Self {
            response: Mutex::new(response),
            delay: None,
            calls: AtomicUsize::new(0),
            last_refresh_token: Mutex::new(None),
        }
    }

    /// Hold every exchange for `delay` before answering
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Change the scripted response for subsequent calls
    pub fn set_response(&self, response: Result<String, RefreshError>) {
        // SAFETY: Mutex poisoning is acceptable in test mocks
        *self.response.lock().unwrap() = response;
    }

    /// Number of exchanges attempted
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Refresh token presented on the most recent exchange
    pub fn last_refresh_token(&self) -> Option<String> {
        self.last_refresh_token.lock().unwrap().clone()
    }
}

#[async_trait]
impl TokenRefresher for MockTokenRefresher {
    async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<RefreshResponse, RefreshError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_refresh_token.lock().unwrap() = Some(refresh_token.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let response = self.response.lock().unwrap().clone();
        response.map(|access_token| RefreshResponse { access_token, token_type: "bearer".into() })
    }
}

type StorageData = Arc<Mutex<HashMap<String, String>>>;

/// In-memory storage backend that can be told to fail
///
/// Clones share the same data, so a test can keep a handle while the store
/// owns another.
#[derive(Debug, Clone, Default)]
pub struct MockStorage {
    data: StorageData,
    fail_reads: Arc<Mutex<bool>>,
    fail_writes: Arc<Mutex<bool>>,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `get` fail
    pub fn fail_reads(&self, fail: bool) {
        *self.fail_reads.lock().unwrap() = fail;
    }

    /// Make every `set` and `remove` fail
    pub fn fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().unwrap() = fail;
    }

    /// Raw stored value, bypassing failure injection
    pub fn peek(&self, key: &str) -> Option<String> {
        self.data.lock().unwrap().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.data.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ClientStorage for MockStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        if *self.fail_reads.lock().unwrap() {
            return Err(StorageError::AccessFailed("mock read failure".into()));
        }
        Ok(self.data.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        if *self.fail_writes.lock().unwrap() {
            return Err(StorageError::AccessFailed("mock write failure".into()));
        }
        self.data.lock().unwrap().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        if *self.fail_writes.lock().unwrap() {
            return Err(StorageError::AccessFailed("mock write failure".into()));
        }
        self.data.lock().unwrap().remove(key);
        Ok(())
    }
}
