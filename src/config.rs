use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use time::Duration;

use crate::error::{ClientError, Result};

pub const DEFAULT_BASE_URL: &str = "https://dummyjson.com";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    /// Lifetime requested for freshly minted tokens (`expiresInMins`).
    pub token_lifetime: Duration,
    pub request_timeout: Duration,
    pub session_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL.to_string())
    }
}

impl ClientConfig {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token_lifetime: Duration::minutes(30),
            request_timeout: Duration::seconds(30),
            session_file: None,
        }
    }

    /// Loads the configuration from environment variables, falling back to
    /// the defaults for anything unset.
    ///
    /// # Environment Variables
    /// - `TODO_API_BASE_URL`: API root (default: `https://dummyjson.com`)
    /// - `TODO_API_TOKEN_TTL_MINS`: requested token lifetime in minutes (default: 30)
    /// - `TODO_API_TIMEOUT_SECS`: per-request timeout in seconds (default: 30)
    /// - `TODO_SESSION_FILE`: path of the persisted session file (default: none)
    pub fn from_env() -> Result<Self> {
        let base_url =
            std::env::var("TODO_API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let mut config = Self::new(base_url);

        if let Ok(value) = std::env::var("TODO_API_TOKEN_TTL_MINS") {
            let minutes = value.parse::<i64>().map_err(|_| {
                ClientError::Config(format!("TODO_API_TOKEN_TTL_MINS is not a number: {value}"))
            })?;
            config = config.with_token_lifetime(Duration::minutes(minutes));
        }

        if let Ok(value) = std::env::var("TODO_API_TIMEOUT_SECS") {
            let seconds = value.parse::<i64>().map_err(|_| {
                ClientError::Config(format!("TODO_API_TIMEOUT_SECS is not a number: {value}"))
            })?;
            config = config.with_request_timeout(Duration::seconds(seconds));
        }

        if let Ok(path) = std::env::var("TODO_SESSION_FILE") {
            config = config.with_session_file(PathBuf::from(path));
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_token_lifetime(mut self, token_lifetime: Duration) -> Self {
        self.token_lifetime = token_lifetime;
        self
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn with_session_file(mut self, session_file: PathBuf) -> Self {
        self.session_file = Some(session_file);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ClientError::Config(format!(
                "base url must be http(s): {}",
                self.base_url
            )));
        }
        if self.token_lifetime.whole_minutes() < 1 {
            return Err(ClientError::Config(
                "token lifetime must be at least one minute".into(),
            ));
        }
        if !self.request_timeout.is_positive() {
            return Err(ClientError::Config(
                "request timeout must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Value sent as `expiresInMins` in login and refresh bodies.
    pub fn expires_in_mins(&self) -> i64 {
        self.token_lifetime.whole_minutes()
    }

    pub(crate) fn std_request_timeout(&self) -> Result<std::time::Duration> {
        std::time::Duration::try_from(self.request_timeout)
            .map_err(|e| ClientError::Config(format!("invalid request timeout: {e}")))
    }
}
