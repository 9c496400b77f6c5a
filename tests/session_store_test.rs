mod common;

use common::emily;
use tempfile::TempDir;
use todo_session_client::prelude::*;
use todo_session_client::session::{ACCESS_TOKEN_KEY, CURRENT_USER_KEY, REFRESH_TOKEN_KEY};

#[tokio::test]
async fn test_session_survives_restart_in_memory() {
    let storage = MemoryStorage::new();
    let store = SessionStore::new(storage.clone());
    store
        .set_session(emily(), TokenPair::new("access-1", "refresh-1"))
        .await
        .unwrap();
    assert_eq!(storage.len().await, 3);

    let restarted = SessionStore::new(storage);
    assert!(restarted.current_session().is_none());

    let restored = restarted.initialize().await.unwrap();
    assert_eq!(restored.user, emily());
    assert_eq!(restored.tokens, TokenPair::new("access-1", "refresh-1"));
    assert_eq!(restarted.access_token().as_deref(), Some("access-1"));
    assert_eq!(restarted.refresh_token().as_deref(), Some("refresh-1"));
}

#[tokio::test]
async fn test_session_survives_restart_on_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("session.json");

    let store = SessionStore::new(FileStorage::new(&path));
    store
        .set_session(emily(), TokenPair::new("access-1", "refresh-1"))
        .await
        .unwrap();
    store
        .update_tokens(TokenPair::new("access-2", "refresh-2"))
        .await
        .unwrap();

    let restarted = SessionStore::new(FileStorage::new(&path));
    let restored = restarted.initialize().await.unwrap();
    assert_eq!(restored.user, emily());
    assert_eq!(restored.tokens, TokenPair::new("access-2", "refresh-2"));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}

#[tokio::test]
async fn test_clear_session_erases_persisted_state() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("session.json");

    let store = SessionStore::new(FileStorage::new(&path));
    store
        .set_session(emily(), TokenPair::new("access-1", "refresh-1"))
        .await
        .unwrap();
    store.clear_session().await.unwrap();

    assert!(!store.is_authenticated());
    assert!(store.access_token().is_none());

    let restarted = SessionStore::new(FileStorage::new(&path));
    assert!(restarted.initialize().await.is_none());
}

#[tokio::test]
async fn test_malformed_user_starts_empty_and_is_erased() {
    let storage = MemoryStorage::new();
    storage
        .set(CURRENT_USER_KEY, "{not json".to_string())
        .await
        .unwrap();
    storage
        .set(ACCESS_TOKEN_KEY, "access-1".to_string())
        .await
        .unwrap();
    storage
        .set(REFRESH_TOKEN_KEY, "refresh-1".to_string())
        .await
        .unwrap();

    let store = SessionStore::new(storage.clone());
    assert!(store.initialize().await.is_none());
    assert!(storage.is_empty().await);
}

#[tokio::test]
async fn test_partial_session_is_not_restored() {
    let storage = MemoryStorage::new();
    storage
        .set(
            CURRENT_USER_KEY,
            serde_json::to_string(&emily()).unwrap(),
        )
        .await
        .unwrap();
    storage
        .set(ACCESS_TOKEN_KEY, "access-1".to_string())
        .await
        .unwrap();

    let store = SessionStore::new(storage.clone());
    assert!(store.initialize().await.is_none());
    assert!(store.access_token().is_none());
    assert!(storage.get(ACCESS_TOKEN_KEY).await.unwrap().is_none());
}

#[tokio::test]
async fn test_corrupt_session_file_is_replaced_on_write() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(&path, "garbage").unwrap();

    let store = SessionStore::new(FileStorage::new(&path));
    assert!(store.initialize().await.is_none());
    let erased: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(erased, serde_json::json!({}));

    store
        .set_session(emily(), TokenPair::new("access-1", "refresh-1"))
        .await
        .unwrap();

    let restarted = SessionStore::new(FileStorage::new(&path));
    assert!(restarted.initialize().await.is_some());
}

#[tokio::test]
async fn test_subscribers_see_changes_in_order() {
    let store = SessionStore::new(MemoryStorage::new());
    let mut receiver = store.subscribe();
    assert!(receiver.borrow_and_update().is_none());

    store
        .set_session(emily(), TokenPair::new("access-1", "refresh-1"))
        .await
        .unwrap();
    receiver.changed().await.unwrap();
    let seen = receiver.borrow_and_update().clone().unwrap();
    assert_eq!(seen.tokens.access_token, "access-1");

    store
        .update_tokens(TokenPair::new("access-2", "refresh-2"))
        .await
        .unwrap();
    receiver.changed().await.unwrap();
    let seen = receiver.borrow_and_update().clone().unwrap();
    assert_eq!(seen.tokens.access_token, "access-2");

    store.clear_session().await.unwrap();
    receiver.changed().await.unwrap();
    assert!(receiver.borrow_and_update().is_none());
}

#[tokio::test]
async fn test_lagging_subscriber_only_sees_latest() {
    let store = SessionStore::new(MemoryStorage::new());
    let mut receiver = store.subscribe();

    store
        .set_session(emily(), TokenPair::new("access-1", "refresh-1"))
        .await
        .unwrap();
    store
        .update_tokens(TokenPair::new("access-2", "refresh-2"))
        .await
        .unwrap();

    receiver.changed().await.unwrap();
    let seen = receiver.borrow_and_update().clone().unwrap();
    assert_eq!(seen.tokens.access_token, "access-2");
    assert!(!receiver.has_changed().unwrap());
}

#[tokio::test]
async fn test_update_tokens_requires_a_session() {
    let store = SessionStore::new(MemoryStorage::new());
    let err = store
        .update_tokens(TokenPair::new("access-1", "refresh-1"))
        .await
        .unwrap_err();
    assert!(err.is_authentication());
}

#[tokio::test]
async fn test_unsendable_access_token_is_not_restored() {
    let storage = MemoryStorage::new();
    storage
        .set(CURRENT_USER_KEY, serde_json::to_string(&emily()).unwrap())
        .await
        .unwrap();
    storage
        .set(ACCESS_TOKEN_KEY, "bad\ntoken".to_string())
        .await
        .unwrap();
    storage
        .set(REFRESH_TOKEN_KEY, "refresh-1".to_string())
        .await
        .unwrap();

    let store = SessionStore::new(storage.clone());
    assert!(store.initialize().await.is_none());
    assert!(!store.is_authenticated());
    assert!(storage.is_empty().await);
}
