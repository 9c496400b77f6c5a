use tracing::debug;

use crate::{
    error::{ClientError, Result},
    refresher::TokenRefresher,
    resource::ResourceClient,
    storage::SessionStorage,
    todos::{Todo, TodoUpdate},
    transport::HttpTransport,
};

pub const DEFAULT_ITEMS_PER_PAGE: u32 = 10;

/// Headless state behind a paginated todo list view.
///
/// Failed operations leave an inline message in [`TodoList::last_error`] and
/// also return the error, so the caller can react to authentication failures.
pub struct TodoList<T, R, S>
where
    T: HttpTransport,
    R: TokenRefresher,
    S: SessionStorage,
{
    client: ResourceClient<T, R, S>,
    todos: Vec<Todo>,
    current_page: u32,
    items_per_page: u32,
    total_items: u32,
    last_error: Option<String>,
}

impl<T, R, S> TodoList<T, R, S>
where
    T: HttpTransport,
    R: TokenRefresher,
    S: SessionStorage,
{
    pub fn new(client: ResourceClient<T, R, S>) -> Self {
        Self::with_page_size(client, DEFAULT_ITEMS_PER_PAGE)
    }

    pub fn with_page_size(client: ResourceClient<T, R, S>, items_per_page: u32) -> Self {
        Self {
            client,
            todos: Vec::new(),
            current_page: 1,
            items_per_page: items_per_page.max(1),
            total_items: 0,
            last_error: None,
        }
    }

    pub fn todos(&self) -> &[Todo] {
        &self.todos
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn items_per_page(&self) -> u32 {
        self.items_per_page
    }

    pub fn total_items(&self) -> u32 {
        self.total_items
    }

    pub fn total_pages(&self) -> u32 {
        self.total_items.div_ceil(self.items_per_page)
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Loads the current page.
    pub async fn load(&mut self) -> Result<()> {
        self.last_error = None;
        let skip = (self.current_page - 1) * self.items_per_page;

        match self.client.list_todos(self.items_per_page, skip).await {
            Ok(page) => {
                debug!(page = self.current_page, total = page.total, "todo page loaded");
                self.todos = page.todos;
                self.total_items = page.total;
                Ok(())
            }
            Err(e) => Err(self.record(e, "Failed to load todos. Please try again.")),
        }
    }

    /// Flips the completion flag of a todo on the current page.
    pub async fn toggle(&mut self, id: u64) -> Result<()> {
        let completed = self
            .todos
            .iter()
            .find(|todo| todo.id == id)
            .map(|todo| todo.completed)
            .ok_or_else(|| ClientError::Validation(format!("Todo {id} is not on this page")))?;

        match self
            .client
            .update_todo(id, &TodoUpdate::completed(!completed))
            .await
        {
            Ok(updated) => {
                if let Some(todo) = self.todos.iter_mut().find(|todo| todo.id == id) {
                    todo.completed = updated.completed;
                }
                Ok(())
            }
            Err(e) => Err(self.record(e, "Failed to update todo status.")),
        }
    }

    /// Deletes a todo. When that empties a page other than the first, the
    /// list steps back one page and reloads.
    pub async fn delete(&mut self, id: u64) -> Result<()> {
        if let Err(e) = self.client.delete_todo(id).await {
            return Err(self.record(e, "Failed to delete todo."));
        }

        self.todos.retain(|todo| todo.id != id);
        self.total_items = self.total_items.saturating_sub(1);

        if self.todos.is_empty() && self.current_page > 1 {
            self.current_page -= 1;
            debug!(page = self.current_page, "page emptied, stepping back");
            self.load().await?;
        }

        Ok(())
    }

    /// Moves to `page` and loads it. Out-of-range pages and the current page
    /// are ignored and return `false`.
    pub async fn go_to_page(&mut self, page: u32) -> Result<bool> {
        if page < 1 || page > self.total_pages() || page == self.current_page {
            return Ok(false);
        }
        self.current_page = page;
        self.load().await?;
        Ok(true)
    }

    fn record(&mut self, error: ClientError, fallback: &str) -> ClientError {
        self.last_error = Some(if error.is_authentication() {
            error.user_message()
        } else {
            fallback.to_string()
        });
        error
    }
}
