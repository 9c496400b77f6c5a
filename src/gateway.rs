use std::sync::Arc;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    config::ClientConfig,
    error::{ClientError, Result},
    refresher::TokenRefresher,
    session::{Session, SessionStore, User},
    storage::SessionStorage,
    token::TokenPair,
    transport::{ApiRequest, ApiResponse, HttpTransport},
};

pub const LOGIN_PATH: &str = "/auth/login";
pub const REFRESH_PATH: &str = "/auth/refresh";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub expires_in_mins: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(flatten)]
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
    pub expires_in_mins: i64,
}

/// Login, refresh and logout exchanges.
///
/// These calls go straight to the transport: they never carry a bearer token
/// and a 401 from them is an answer, not something to recover from.
pub struct AuthGateway<T: HttpTransport, S: SessionStorage> {
    transport: Arc<T>,
    sessions: Arc<SessionStore<S>>,
    expires_in_mins: i64,
}

impl<T: HttpTransport, S: SessionStorage> AuthGateway<T, S> {
    pub fn new(config: &ClientConfig, transport: Arc<T>, sessions: Arc<SessionStore<S>>) -> Self {
        Self {
            transport,
            sessions,
            expires_in_mins: config.expires_in_mins(),
        }
    }

    /// Exchanges credentials for a new session and stores it.
    ///
    /// Rejected credentials yield [`ClientError::Authentication`] with the
    /// server's message. The current session is left untouched on failure.
    pub async fn login(&self, username: &str, password: &str) -> Result<Arc<Session>> {
        if username.trim().is_empty() {
            return Err(ClientError::Validation("Username is required".into()));
        }
        if password.is_empty() {
            return Err(ClientError::Validation("Password is required".into()));
        }

        let request = Self::json_request(LOGIN_PATH, &LoginRequest {
            username,
            password,
            expires_in_mins: self.expires_in_mins,
        })?;

        let response = self.transport.send(&request).await.inspect_err(|e| {
            warn!(error = %e, "login request failed");
        })?;

        match response.status {
            status if status.is_success() => {
                let body: LoginResponse = response.json()?;
                let tokens = TokenPair::new(body.access_token, body.refresh_token);
                let session = self.sessions.set_session(body.user, tokens).await?;
                info!(
                    user_id = session.user.id,
                    expires_at = ?session.tokens.access_expires_at(),
                    "logged in"
                );
                Ok(session)
            }
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                let message = response.error_message();
                info!(%message, "login rejected");
                Err(ClientError::Authentication(message))
            }
            _ => Err(resource_error(response)),
        }
    }

    /// Exchanges a refresh token for a new pair. Does not touch the session.
    pub async fn refresh_tokens(&self, refresh_token: &str) -> Result<TokenPair> {
        let request = Self::json_request(REFRESH_PATH, &RefreshRequest {
            refresh_token,
            expires_in_mins: self.expires_in_mins,
        })?;

        let response = self.transport.send(&request).await?;
        if !response.is_success() {
            return Err(ClientError::Authentication(response.error_message()));
        }

        response.json()
    }

    pub async fn logout(&self) -> Result<()> {
        info!("logging out");
        self.sessions.clear_session().await
    }

    fn json_request<B: Serialize>(path: &str, body: &B) -> Result<ApiRequest> {
        let mut request = ApiRequest::post(path).with_json(body)?;
        request.authorize(None)?;
        Ok(request)
    }
}

impl<T: HttpTransport, S: SessionStorage> TokenRefresher for AuthGateway<T, S> {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        self.refresh_tokens(refresh_token).await
    }
}

fn resource_error(response: ApiResponse) -> ClientError {
    ClientError::Resource {
        status: response.status.as_u16(),
        message: response.error_message(),
    }
}
