use std::sync::Arc;

use tracing::info;

use crate::{
    config::ClientConfig,
    error::{ClientError, Result},
    gateway::AuthGateway,
    guard::AccessGuard,
    pipeline::RequestPipeline,
    resource::ResourceClient,
    session::SessionStore,
    storage::{FileStorage, SessionStorage},
    todos::TodoList,
    transport::{HttpTransport, ReqwestTransport},
};

pub type AppPipeline<T, S> = RequestPipeline<T, AuthGateway<T, S>, S>;
pub type AppResourceClient<T, S> = ResourceClient<T, AuthGateway<T, S>, S>;
pub type AppTodoList<T, S> = TodoList<T, AuthGateway<T, S>, S>;

/// Every component wired around one session store and one transport.
pub struct TodoApp<S: SessionStorage, T: HttpTransport = ReqwestTransport> {
    pub config: ClientConfig,
    pub sessions: Arc<SessionStore<S>>,
    pub auth: Arc<AuthGateway<T, S>>,
    pub pipeline: Arc<AppPipeline<T, S>>,
    pub todos: AppResourceClient<T, S>,
    pub guard: AccessGuard<S>,
}

impl<S: SessionStorage, T: HttpTransport> TodoApp<S, T> {
    /// Wires the components and restores any persisted session.
    pub async fn start(config: ClientConfig, storage: S, transport: T) -> Self {
        let transport = Arc::new(transport);
        let sessions = Arc::new(SessionStore::new(storage));
        sessions.initialize().await;

        let auth = Arc::new(AuthGateway::new(
            &config,
            transport.clone(),
            sessions.clone(),
        ));
        let pipeline = Arc::new(RequestPipeline::new(
            transport,
            auth.clone(),
            sessions.clone(),
        ));

        info!(base_url = %config.base_url, authenticated = sessions.is_authenticated(), "client ready");

        Self {
            todos: ResourceClient::new(pipeline.clone()),
            guard: AccessGuard::new(sessions.clone()),
            config,
            sessions,
            auth,
            pipeline,
        }
    }

    pub fn todo_list(&self) -> AppTodoList<T, S> {
        TodoList::new(self.todos.clone())
    }
}

impl TodoApp<FileStorage> {
    /// Production wiring: `reqwest` transport and the configured session file.
    pub async fn from_config(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let path = config.session_file.clone().ok_or_else(|| {
            ClientError::Config("session_file is required for a file-backed session".into())
        })?;
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::start(config, FileStorage::new(path), transport).await)
    }
}
