mod common;

use std::sync::Arc;

use common::{FakeApi, emily, ok_json};
use reqwest::{Method, StatusCode};
use serde_json::json;
use todo_session_client::prelude::*;

fn gateway(
    api: &Arc<FakeApi>,
) -> (
    AuthGateway<FakeApi, MemoryStorage>,
    Arc<SessionStore<MemoryStorage>>,
) {
    let sessions = Arc::new(SessionStore::new(MemoryStorage::new()));
    let gateway = AuthGateway::new(&ClientConfig::default(), api.clone(), sessions.clone());
    (gateway, sessions)
}

#[tokio::test]
async fn test_login_requires_credentials() {
    let api = Arc::new(FakeApi::echo());
    let (gateway, sessions) = gateway(&api);

    let err = gateway.login("  ", "secret").await.unwrap_err();
    assert_eq!(err, ClientError::Validation("Username is required".into()));

    let err = gateway.login("emilys", "").await.unwrap_err();
    assert_eq!(err, ClientError::Validation("Password is required".into()));

    assert!(api.calls().is_empty());
    assert!(!sessions.is_authenticated());
}

#[tokio::test]
async fn test_login_posts_credentials_without_bearer() {
    let api = Arc::new(FakeApi::new(|_| {
        Ok(ok_json(json!({
            "id": 1,
            "username": "emilys",
            "email": "emily.johnson@x.dummyjson.com",
            "firstName": "Emily",
            "lastName": "Johnson",
            "gender": "female",
            "image": "https://dummyjson.com/icon/emilys/128",
            "accessToken": "access-1",
            "refreshToken": "refresh-1"
        })))
    }));
    let (gateway, sessions) = gateway(&api);

    let session = gateway.login("emilys", "emilyspass").await.unwrap();

    assert_eq!(session.user, emily());
    assert_eq!(session.tokens, TokenPair::new("access-1", "refresh-1"));
    assert_eq!(sessions.current_session(), Some(session));

    let calls = api.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].method, Method::POST);
    assert_eq!(calls[0].path, "/auth/login");
    assert_eq!(calls[0].bearer, None);
    assert_eq!(
        calls[0].body,
        Some(json!({ "username": "emilys", "password": "emilyspass", "expiresInMins": 30 }))
    );
}

#[tokio::test]
async fn test_refresh_rejection_is_authentication() {
    let api = Arc::new(FakeApi::new(|_| {
        Ok(ApiResponse::json_body(
            StatusCode::FORBIDDEN,
            &json!({ "message": "Invalid refresh token" }),
        ))
    }));
    let (gateway, sessions) = gateway(&api);

    let err = gateway.refresh_tokens("refresh-1").await.unwrap_err();

    assert_eq!(err, ClientError::Authentication("Invalid refresh token".into()));
    assert!(sessions.current_session().is_none());
    assert_eq!(
        api.calls()[0].body,
        Some(json!({ "refreshToken": "refresh-1", "expiresInMins": 30 }))
    );
}
