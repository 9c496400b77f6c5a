//! Shared fakes for the integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use reqwest::{Method, StatusCode, header};
use serde_json::{Value, json};
use todo_session_client::prelude::*;
use tokio::sync::Semaphore;

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub bearer: Option<String>,
    pub content_type: Option<String>,
    pub body: Option<Value>,
}

type Handler = Box<dyn Fn(&ApiRequest) -> Result<ApiResponse> + Send + Sync>;

/// In-process stand-in for the remote API. When a token is required, any
/// request without it gets a 401 before reaching the handler.
pub struct FakeApi {
    accepted_token: Mutex<Option<String>>,
    calls: Mutex<Vec<RecordedCall>>,
    handler: Handler,
}

impl FakeApi {
    pub fn new(
        handler: impl Fn(&ApiRequest) -> Result<ApiResponse> + Send + Sync + 'static,
    ) -> Self {
        Self {
            accepted_token: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            handler: Box::new(handler),
        }
    }

    /// Answers every request with `{"path": <path>}`.
    pub fn echo() -> Self {
        Self::new(|request| Ok(ok_json(json!({ "path": request.path }))))
    }

    pub fn requiring_token(self, token: &str) -> Self {
        self.accept_token(token);
        self
    }

    pub fn accept_token(&self, token: &str) {
        *self.accepted_token.lock().unwrap() = Some(token.to_string());
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.calls().into_iter().map(|call| call.path).collect()
    }
}

impl HttpTransport for FakeApi {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        self.calls.lock().unwrap().push(RecordedCall {
            method: request.method.clone(),
            path: request.path.clone(),
            query: request.query.clone(),
            bearer: request.bearer_token().map(str::to_string),
            content_type: request
                .headers
                .get(header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string),
            body: request.body.clone(),
        });

        let accepted = self.accepted_token.lock().unwrap().clone();
        if let Some(expected) = accepted {
            if request.bearer_token() != Some(expected.as_str()) {
                return Ok(ApiResponse::json_body(
                    StatusCode::UNAUTHORIZED,
                    &json!({ "message": "Token Expired!" }),
                ));
            }
        }

        (self.handler)(request)
    }
}

/// Refresher that counts calls and can hold the exchange open until the
/// test releases it.
pub struct GatedRefresher {
    outcome: Result<TokenPair>,
    gate: Semaphore,
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
    api: Option<Arc<FakeApi>>,
}

impl GatedRefresher {
    pub fn gated(outcome: Result<TokenPair>) -> Self {
        Self::with_permits(outcome, 0)
    }

    pub fn immediate(outcome: Result<TokenPair>) -> Self {
        Self::with_permits(outcome, Semaphore::MAX_PERMITS)
    }

    fn with_permits(outcome: Result<TokenPair>, permits: usize) -> Self {
        Self {
            outcome,
            gate: Semaphore::new(permits),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            api: None,
        }
    }

    /// Makes a successful refresh teach `api` to accept the new token.
    pub fn rotating(mut self, api: Arc<FakeApi>) -> Self {
        self.api = Some(api);
        self
    }

    pub fn release(&self) {
        self.gate.add_permits(16);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen_tokens(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

impl TokenRefresher for GatedRefresher {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(refresh_token.to_string());

        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| ClientError::Network("gate closed".into()))?;

        if let (Ok(tokens), Some(api)) = (&self.outcome, &self.api) {
            api.accept_token(&tokens.access_token);
        }
        self.outcome.clone()
    }
}

pub fn ok_json(body: Value) -> ApiResponse {
    ApiResponse::json_body(StatusCode::OK, &body)
}

pub fn emily() -> User {
    User {
        id: 1,
        username: "emilys".into(),
        email: Some("emily.johnson@x.dummyjson.com".into()),
        first_name: Some("Emily".into()),
        last_name: Some("Johnson".into()),
        gender: Some("female".into()),
        image: Some("https://dummyjson.com/icon/emilys/128".into()),
    }
}

pub async fn signed_in_store(
    access_token: &str,
    refresh_token: &str,
) -> Arc<SessionStore<MemoryStorage>> {
    let store = Arc::new(SessionStore::new(MemoryStorage::new()));
    store
        .set_session(emily(), TokenPair::new(access_token, refresh_token))
        .await
        .unwrap();
    store
}

pub fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}
