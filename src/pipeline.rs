use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use reqwest::StatusCode;
use tokio::sync::oneshot;
use tracing::{Instrument, debug, debug_span, info, warn};
use uuid::Uuid;

use crate::{
    error::{ClientError, Result},
    refresher::TokenRefresher,
    session::SessionStore,
    storage::SessionStorage,
    transport::{ApiRequest, ApiResponse, HttpTransport},
};

/// New access token, or the error every waiter fails with.
type RefreshOutcome = std::result::Result<String, ClientError>;

/// A request parked until the in-flight refresh resolves.
struct PendingRequest {
    request_id: Uuid,
    completion: oneshot::Sender<RefreshOutcome>,
}

#[derive(Default)]
struct RefreshState {
    in_progress: bool,
    pending: VecDeque<PendingRequest>,
}

enum Recovery {
    /// This request runs the refresh exchange.
    Lead { refresh_token: String },
    /// Another request is refreshing; wait for its outcome.
    Wait(oneshot::Receiver<RefreshOutcome>),
    /// The token was rotated while this request was on the wire.
    Replay(String),
    NoRefreshToken,
}

/// Sends resource requests with the current bearer token and recovers from
/// expired access tokens.
///
/// On a 401 the first rejected request refreshes the token pair while every
/// other rejected request queues behind it. When the refresh settles the
/// queue is released in arrival order and each request is replayed once with
/// the new token. A 401 on a replay ends the session.
pub struct RequestPipeline<T, R, S>
where
    T: HttpTransport,
    R: TokenRefresher,
    S: SessionStorage,
{
    transport: Arc<T>,
    refresher: Arc<R>,
    sessions: Arc<SessionStore<S>>,
    refresh_state: Mutex<RefreshState>,
}

impl<T, R, S> RequestPipeline<T, R, S>
where
    T: HttpTransport,
    R: TokenRefresher,
    S: SessionStorage,
{
    pub fn new(transport: Arc<T>, refresher: Arc<R>, sessions: Arc<SessionStore<S>>) -> Self {
        Self {
            transport,
            refresher,
            sessions,
            refresh_state: Mutex::new(RefreshState::default()),
        }
    }

    pub fn sessions(&self) -> &Arc<SessionStore<S>> {
        &self.sessions
    }

    pub fn is_refreshing(&self) -> bool {
        self.state().in_progress
    }

    /// Number of requests parked behind the in-flight refresh.
    pub fn queued_requests(&self) -> usize {
        self.state().pending.len()
    }

    /// Sends `request` with the current access token attached.
    ///
    /// Every response other than 401 is returned as-is, including error
    /// statuses. Transport failures are returned unchanged and never touch
    /// the session.
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let request_id = Uuid::new_v4();
        let span = debug_span!(
            "api_request",
            %request_id,
            method = %request.method,
            path = %request.path,
        );
        self.run(request_id, request).instrument(span).await
    }

    async fn run(&self, request_id: Uuid, mut request: ApiRequest) -> Result<ApiResponse> {
        let sent_token = self.sessions.access_token();
        self.attach_token(&mut request, sent_token.as_deref()).await?;

        let response = self.transport.send(&request).await?;
        if response.status != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }
        debug!("access token rejected");

        let token = self.recover(request_id, sent_token.as_deref()).await?;
        self.attach_token(&mut request, Some(&token)).await?;

        // Replays never re-enter recovery.
        let response = self.transport.send(&request).await?;
        if response.status == StatusCode::UNAUTHORIZED {
            warn!("replayed request rejected, ending session");
            self.end_session().await;
            return Err(ClientError::Authentication(
                "request rejected after token refresh".into(),
            ));
        }

        Ok(response)
    }

    /// Yields an access token to replay with, refreshing if nobody else is.
    async fn recover(&self, request_id: Uuid, sent_token: Option<&str>) -> Result<String> {
        match self.begin_recovery(request_id, sent_token) {
            Recovery::Lead { refresh_token } => self.lead_refresh(refresh_token).await,
            Recovery::Wait(receiver) => receiver.await.unwrap_or_else(|_| {
                Err(ClientError::Authentication(
                    "token refresh was abandoned".into(),
                ))
            }),
            Recovery::Replay(token) => {
                debug!("token rotated while request was in flight, replaying");
                Ok(token)
            }
            Recovery::NoRefreshToken => {
                info!("no refresh token available, ending session");
                self.end_session().await;
                Err(ClientError::Authentication(
                    "no refresh token available".into(),
                ))
            }
        }
    }

    fn begin_recovery(&self, request_id: Uuid, sent_token: Option<&str>) -> Recovery {
        let mut state = self.state();

        if state.in_progress {
            let (completion, receiver) = oneshot::channel();
            state.pending.push_back(PendingRequest {
                request_id,
                completion,
            });
            debug!(queued = state.pending.len(), "refresh in flight, queuing request");
            return Recovery::Wait(receiver);
        }

        let Some(session) = self.sessions.current_session() else {
            return Recovery::NoRefreshToken;
        };

        if sent_token != Some(session.tokens.access_token.as_str()) {
            return Recovery::Replay(session.tokens.access_token.clone());
        }

        state.in_progress = true;
        Recovery::Lead {
            refresh_token: session.tokens.refresh_token.clone(),
        }
    }

    async fn lead_refresh(&self, refresh_token: String) -> Result<String> {
        let in_flight = InFlight::new(&self.refresh_state);
        info!("refreshing access token");

        let outcome = match self.refresher.refresh(&refresh_token).await {
            Ok(tokens) => {
                let access_token = tokens.access_token.clone();
                let expires_at = tokens.access_expires_at();
                match self.sessions.update_tokens(tokens).await {
                    Ok(_) => {
                        info!(?expires_at, "access token refreshed");
                        Ok(access_token)
                    }
                    Err(ClientError::Storage(reason)) => {
                        warn!(%reason, "refreshed tokens could not be persisted");
                        Ok(access_token)
                    }
                    Err(e) => Err(e),
                }
            }
            Err(e) => {
                warn!(error = %e, "token refresh failed, ending session");
                self.end_session().await;
                Err(match e {
                    ClientError::Authentication(_) => e,
                    other => ClientError::Authentication(format!("token refresh failed: {other}")),
                })
            }
        };

        in_flight.settle(outcome.clone());
        outcome
    }

    /// A token that cannot be sent will never work, so the session ends.
    async fn attach_token(&self, request: &mut ApiRequest, token: Option<&str>) -> Result<()> {
        if let Err(e) = request.authorize(token) {
            warn!("access token cannot be sent, ending session");
            self.end_session().await;
            return Err(e);
        }
        Ok(())
    }

        async fn end_session(&self) {
        if let Err(e) = self.sessions.clear_session().await {
            warn!(error = %e, "failed to erase persisted session");
        }
    }

    fn state(&self) -> MutexGuard<'_, RefreshState> {
        lock(&self.refresh_state)
    }
}

fn lock(state: &Mutex<RefreshState>) -> MutexGuard<'_, RefreshState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Marks a refresh as in flight. Settling, or dropping the leader's future,
/// returns the pipeline to idle and releases the queue in arrival order.
struct InFlight<'a> {
    state: &'a Mutex<RefreshState>,
    settled: bool,
}

impl<'a> InFlight<'a> {
    fn new(state: &'a Mutex<RefreshState>) -> Self {
        Self {
            state,
            settled: false,
        }
    }

    fn settle(mut self, outcome: RefreshOutcome) {
        self.settled = true;
        release(self.state, outcome);
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            release(
                self.state,
                Err(ClientError::Authentication(
                    "token refresh was abandoned".into(),
                )),
            );
        }
    }
}

fn release(state: &Mutex<RefreshState>, outcome: RefreshOutcome) {
    let pending = {
        let mut state = lock(state);
        state.in_progress = false;
        std::mem::take(&mut state.pending)
    };

    for request in pending {
        if request.completion.send(outcome.clone()).is_err() {
            debug!(request_id = %request.request_id, "queued request dropped before refresh settled");
        }
    }
}
