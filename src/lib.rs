pub mod app;
pub mod config;
pub mod error;
pub mod gateway;
pub mod guard;
pub mod pipeline;
pub mod refresher;
pub mod resource;
pub mod session;
pub mod storage;
pub mod todos;
pub mod token;
pub mod transport;

pub use app::TodoApp;
pub use config::ClientConfig;
pub use error::{ClientError, ErrorReport, Result};
pub use gateway::AuthGateway;
pub use guard::{AccessGuard, GuardDecision};
pub use pipeline::RequestPipeline;
pub use refresher::TokenRefresher;
pub use resource::ResourceClient;
pub use session::{Session, SessionReceiver, SessionStore, User};
pub use storage::{FileStorage, MemoryStorage, SessionStorage};
pub use todos::{NewTodo, Todo, TodoList, TodoPage, TodoUpdate};
pub use token::{TokenClaims, TokenPair, decode_claims};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, ReqwestTransport};

pub mod prelude {
    pub use crate::{
        app::TodoApp,
        config::ClientConfig,
        error::{ClientError, Result},
        gateway::AuthGateway,
        guard::{AccessGuard, GuardDecision},
        pipeline::RequestPipeline,
        refresher::TokenRefresher,
        resource::ResourceClient,
        session::{Session, SessionStore, User},
        storage::{FileStorage, MemoryStorage, SessionStorage},
        todos::{NewTodo, Todo, TodoList, TodoPage, TodoUpdate},
        token::TokenPair,
        transport::{ApiRequest, ApiResponse, HttpTransport, ReqwestTransport},
    };
}
