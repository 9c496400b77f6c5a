use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::{
    error::Result,
    pipeline::RequestPipeline,
    refresher::TokenRefresher,
    session::User,
    storage::SessionStorage,
    todos::{NewTodo, Todo, TodoPage, TodoUpdate},
    transport::{ApiRequest, HttpTransport},
};

/// Typed access to the todo API. Every call goes through the
/// [`RequestPipeline`], so callers never see an expired-token 401.
pub struct ResourceClient<T, R, S>
where
    T: HttpTransport,
    R: TokenRefresher,
    S: SessionStorage,
{
    pipeline: Arc<RequestPipeline<T, R, S>>,
}

impl<T, R, S> Clone for ResourceClient<T, R, S>
where
    T: HttpTransport,
    R: TokenRefresher,
    S: SessionStorage,
{
    fn clone(&self) -> Self {
        Self {
            pipeline: self.pipeline.clone(),
        }
    }
}

impl<T, R, S> ResourceClient<T, R, S>
where
    T: HttpTransport,
    R: TokenRefresher,
    S: SessionStorage,
{
    pub fn new(pipeline: Arc<RequestPipeline<T, R, S>>) -> Self {
        Self { pipeline }
    }

    /// Fetches a page of todos. `limit` and `skip` are only sent when
    /// non-zero, leaving the server defaults in charge otherwise.
    pub async fn list_todos(&self, limit: u32, skip: u32) -> Result<TodoPage> {
        let mut request = ApiRequest::get("/todos");
        if limit > 0 {
            request = request.with_query("limit", limit);
        }
        if skip > 0 {
            request = request.with_query("skip", skip);
        }
        self.call(request).await
    }

    pub async fn get_todo(&self, id: u64) -> Result<Todo> {
        self.call(ApiRequest::get(format!("/todos/{id}"))).await
    }

    pub async fn todos_by_user(&self, user_id: u64) -> Result<TodoPage> {
        self.call(ApiRequest::get(format!("/todos/user/{user_id}")))
            .await
    }

    pub async fn random_todo(&self) -> Result<Todo> {
        self.call(ApiRequest::get("/todos/random")).await
    }

    pub async fn create_todo(&self, todo: &NewTodo) -> Result<Todo> {
        todo.validate()?;
        self.call(ApiRequest::post("/todos/add").with_json(todo)?)
            .await
    }

    pub async fn update_todo(&self, id: u64, update: &TodoUpdate) -> Result<Todo> {
        update.validate()?;
        self.call(ApiRequest::put(format!("/todos/{id}")).with_json(update)?)
            .await
    }

    pub async fn delete_todo(&self, id: u64) -> Result<Todo> {
        self.call(ApiRequest::delete(format!("/todos/{id}"))).await
    }

    /// Profile of the signed-in user as the server currently sees it.
    pub async fn current_user(&self) -> Result<User> {
        self.call(ApiRequest::get("/auth/me")).await
    }

    async fn call<D: DeserializeOwned>(&self, request: ApiRequest) -> Result<D> {
        self.pipeline
            .execute(request)
            .await?
            .error_for_status()?
            .json()
    }
}
