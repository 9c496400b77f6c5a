use crate::{error::Result, token::TokenPair};

/// Trait for exchanging a refresh token for a new token pair.
///
/// The request pipeline calls this at most once at a time, no matter how many
/// requests were rejected concurrently. Implementations are plain
/// request/response exchanges and know nothing about queued requests.
///
/// # Example Implementation
///
/// ```rust
/// use todo_session_client::{Result, TokenPair, TokenRefresher};
///
/// struct StaticRefresher;
///
/// impl TokenRefresher for StaticRefresher {
///     async fn refresh(&self, _refresh_token: &str) -> Result<TokenPair> {
///         Ok(TokenPair::new("new-access", "new-refresh"))
///     }
/// }
/// ```
pub trait TokenRefresher: Send + Sync {
    /// Exchange `refresh_token` for a fresh pair.
    ///
    /// Any error is treated by the pipeline as the end of the session.
    fn refresh(
        &self,
        refresh_token: &str,
    ) -> impl std::future::Future<Output = Result<TokenPair>> + Send;
}
