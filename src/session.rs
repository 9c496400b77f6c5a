use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use crate::{
    error::{ClientError, Result},
    storage::SessionStorage,
    token::TokenPair,
    transport::bearer_header,
};

/// Storage key of the serialized [`User`].
pub const CURRENT_USER_KEY: &str = "currentUser";
/// Storage key of the access token.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";
/// Storage key of the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

const SESSION_KEYS: [&str; 3] = [CURRENT_USER_KEY, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY];

/// Profile of the signed-in user as returned by the login endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: u64,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl User {
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(first), None) => first.clone(),
            _ => self.username.clone(),
        }
    }
}

/// A signed-in user together with a complete token pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: User,
    pub tokens: TokenPair,
}

pub type SessionReceiver = watch::Receiver<Option<Arc<Session>>>;

/// Sole owner of the current [`Session`].
///
/// Every change is written to the backing [`SessionStorage`] and published
/// to subscribers. Mutations are serialized, so subscribers see
/// values in the order they were set; a subscriber that falls behind only
/// sees the latest value.
pub struct SessionStore<S: SessionStorage> {
    storage: S,
    sender: watch::Sender<Option<Arc<Session>>>,
    write_lock: Mutex<()>,
}

impl<S: SessionStorage> SessionStore<S> {
    /// Creates an empty store. Call [`SessionStore::initialize`] to restore
    /// a persisted session.
    pub fn new(storage: S) -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            storage,
            sender,
            write_lock: Mutex::new(()),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Restores the persisted session, if any.
    ///
    /// Missing, incomplete or unreadable state yields an empty session; the
    /// reason is logged and never surfaced as an error.
    pub async fn initialize(&self) -> Option<Arc<Session>> {
        let _guard = self.write_lock.lock().await;

        let restored = match self.load().await {
            Ok(session) => session.map(Arc::new),
            Err(ClientError::Decode(reason)) => {
                warn!(%reason, "discarding persisted session");
                if let Err(e) = self.storage.remove_many(&SESSION_KEYS).await {
                    warn!(error = %e, "failed to erase discarded session");
                }
                None
            }
            Err(e) => {
                warn!(error = %e, "failed to read persisted session");
                None
            }
        };

        match &restored {
            Some(session) => info!(user_id = session.user.id, "restored persisted session"),
            None => debug!("no persisted session"),
        }

        self.sender.send_replace(restored.clone());
        restored
    }

    async fn load(&self) -> Result<Option<Session>> {
        let user = self.storage.get(CURRENT_USER_KEY).await?;
        let access_token = self.storage.get(ACCESS_TOKEN_KEY).await?;
        let refresh_token = self.storage.get(REFRESH_TOKEN_KEY).await?;

        match (user, access_token, refresh_token) {
            (None, None, None) => Ok(None),
            (Some(user), Some(access_token), Some(refresh_token)) => {
                if bearer_header(&access_token).is_none() {
                    return Err(ClientError::Decode(
                        "persisted access token is not a valid header value".into(),
                    ));
                }
                let user: User = serde_json::from_str(&user)
                    .map_err(|e| ClientError::Decode(format!("malformed persisted user: {e}")))?;
                Ok(Some(Session {
                    user,
                    tokens: TokenPair::new(access_token, refresh_token),
                }))
            }
            _ => Err(ClientError::Decode("incomplete persisted session".into())),
        }
    }

    /// Replaces the whole session, persists it and notifies subscribers.
    ///
    /// If persisting fails the previous session stays in place.
    pub async fn set_session(&self, user: User, tokens: TokenPair) -> Result<Arc<Session>> {
        let _guard = self.write_lock.lock().await;

        let user_json = serde_json::to_string(&user)?;
        self.storage
            .set_many(vec![
                (CURRENT_USER_KEY, user_json),
                (ACCESS_TOKEN_KEY, tokens.access_token.clone()),
                (REFRESH_TOKEN_KEY, tokens.refresh_token.clone()),
            ])
            .await?;

        let session = Arc::new(Session { user, tokens });
        self.sender.send_replace(Some(session.clone()));
        debug!(user_id = session.user.id, "session set");
        Ok(session)
    }

    /// Swaps in a refreshed token pair for the current user.
    ///
    /// The old pair may already be revoked server-side, so the in-memory
    /// session is updated first. A persistence failure is still returned.
    pub async fn update_tokens(&self, tokens: TokenPair) -> Result<Arc<Session>> {
        let _guard = self.write_lock.lock().await;

        let user = self
            .sender
            .borrow()
            .as_ref()
            .map(|session| session.user.clone())
            .ok_or_else(|| ClientError::Authentication("no active session to update".into()))?;

        let entries = vec![
            (ACCESS_TOKEN_KEY, tokens.access_token.clone()),
            (REFRESH_TOKEN_KEY, tokens.refresh_token.clone()),
        ];
        let session = Arc::new(Session { user, tokens });
        self.sender.send_replace(Some(session.clone()));
        debug!(user_id = session.user.id, "session tokens replaced");

        self.storage.set_many(entries).await?;
        Ok(session)
    }

    /// Drops the session. The in-memory session is cleared even when erasing
    /// the persisted copy fails.
    pub async fn clear_session(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let previous = self.sender.send_replace(None);
        if let Some(session) = previous {
            info!(user_id = session.user.id, "session cleared");
        }

        self.storage.remove_many(&SESSION_KEYS).await
    }

    pub fn current_session(&self) -> Option<Arc<Session>> {
        self.sender.borrow().clone()
    }

    pub fn current_user(&self) -> Option<User> {
        self.sender
            .borrow()
            .as_ref()
            .map(|session| session.user.clone())
    }

    pub fn access_token(&self) -> Option<String> {
        self.sender
            .borrow()
            .as_ref()
            .map(|session| session.tokens.access_token.clone())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.sender
            .borrow()
            .as_ref()
            .map(|session| session.tokens.refresh_token.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.sender.borrow().is_some()
    }

    /// Subscribes to session changes. The receiver starts marked as seen, so
    /// `changed()` resolves on the next mutation.
    pub fn subscribe(&self) -> SessionReceiver {
        self.sender.subscribe()
    }
}
