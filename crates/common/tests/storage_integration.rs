//! Integration tests for storage module
//!
//! These tests verify the token store over each persistent backend:
//! - Credentials written together and cleared together
//! - Theme preference independent of the session
//! - Behaviour of the file backend across instances and on bad input

use std::sync::Arc;

use riskreg_common::auth::store::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, THEME_KEY, USERNAME_KEY};
use riskreg_common::auth::{SessionCredentials, Theme, TokenStore};
use riskreg_common::storage::{ClientStorage, FileStorage, MemoryStorage, StorageError};

fn sample_session() -> SessionCredentials {
    SessionCredentials::new("access-1", "refresh-1", "analyst")
}

/// Validates the full credential lifecycle on the file backend.
///
/// # Test Steps
/// 1. Store a session and a theme
/// 2. Reopen the file and read them back
/// 3. Clear the session and verify only the theme remains on disk
#[test]
fn test_file_backed_session_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("session.json");

    let store = TokenStore::new(FileStorage::new(&path));
    store.store_session(&sample_session()).unwrap();
    store.set_theme(Theme::Dark).unwrap();

    let reopened = TokenStore::new(FileStorage::new(&path));
    assert_eq!(reopened.session().unwrap(), Some(sample_session()));
    assert_eq!(reopened.theme().unwrap(), Theme::Dark);

    reopened.clear().unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw, serde_json::json!({ THEME_KEY: "dark" }));
    assert_eq!(store.access_token().unwrap(), None);
}

#[test]
fn test_clear_is_idempotent() {
    let backend = Arc::new(MemoryStorage::new());
    let store = TokenStore::new(Arc::clone(&backend));

    store.clear().unwrap();
    store.store_session(&sample_session()).unwrap();
    store.clear().unwrap();
    store.clear().unwrap();

    assert!(backend.is_empty());
}

#[test]
fn test_partial_session_is_not_reported_as_session() {
    let backend = Arc::new(MemoryStorage::new());
    let store = TokenStore::new(Arc::clone(&backend));
    backend.set(ACCESS_TOKEN_KEY, "access").unwrap();
    backend.set(USERNAME_KEY, "analyst").unwrap();

    assert_eq!(store.session().unwrap(), None);
    assert!(store.has_access_token().unwrap());

    backend.set(REFRESH_TOKEN_KEY, "refresh").unwrap();
    assert!(store.session().unwrap().is_some());
}

#[test]
fn test_corrupt_file_surfaces_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(&path, "{not json").unwrap();

    let store = TokenStore::new(FileStorage::new(&path));
    assert!(matches!(store.access_token(), Err(StorageError::Corrupt(_))));
}

#[test]
fn test_concurrent_clear_and_read_never_see_half_session() {
    let store = Arc::new(TokenStore::new(MemoryStorage::new()));

    let writer = {
        let store = Arc::clone(&store);
        std::thread::spawn(move || {
            for _ in 0..500 {
                store.store_session(&sample_session()).unwrap();
                store.clear().unwrap();
            }
        })
    };

    for _ in 0..500 {
        if let Some(session) = store.session().unwrap() {
            assert_eq!(session, sample_session());
        }
    }
    writer.join().unwrap();
    assert_eq!(store.session().unwrap(), None);
}
