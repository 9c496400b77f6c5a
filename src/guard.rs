use std::sync::Arc;

use tracing::debug;

use crate::{session::SessionStore, storage::SessionStorage};

pub const LOGIN_LOCATION: &str = "/login";
pub const DEFAULT_LOCATION: &str = "/todos";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    /// Send the user to `to`, remembering where they were headed.
    Redirect {
        to: String,
        return_url: Option<String>,
    },
}

impl GuardDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GuardDecision::Allow)
    }
}

/// Gate in front of protected views. Only consults the session store.
pub struct AccessGuard<S: SessionStorage> {
    sessions: Arc<SessionStore<S>>,
}

impl<S: SessionStorage> Clone for AccessGuard<S> {
    fn clone(&self) -> Self {
        Self {
            sessions: self.sessions.clone(),
        }
    }
}

impl<S: SessionStorage> AccessGuard<S> {
    pub fn new(sessions: Arc<SessionStore<S>>) -> Self {
        Self { sessions }
    }

    pub fn check(&self, location: &str) -> GuardDecision {
        if self.sessions.current_session().is_some() {
            return GuardDecision::Allow;
        }

        debug!(%location, "no session, redirecting to login");
        GuardDecision::Redirect {
            to: LOGIN_LOCATION.to_string(),
            return_url: Some(location.to_string()).filter(|loc| is_local(loc)),
        }
    }

    /// Where to go after a successful login. Only local paths other than the
    /// login view itself are honoured.
    pub fn post_login_target(return_url: Option<&str>) -> String {
        return_url
            .filter(|url| is_local(url) && !is_login(url))
            .unwrap_or(DEFAULT_LOCATION)
            .to_string()
    }
}

fn is_login(location: &str) -> bool {
    location
        .strip_prefix(LOGIN_LOCATION)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(['?', '/', '#']))
}

fn is_local(location: &str) -> bool {
    location.starts_with('/') && !location.starts_with("//")
}
