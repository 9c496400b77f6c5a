use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

mod list;

pub use list::TodoList;

pub const TODO_MIN_CHARS: usize = 3;
pub const TODO_MAX_CHARS: usize = 200;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: u64,
    pub todo: String,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,
}

/// One page of `GET /todos`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TodoPage {
    pub todos: Vec<Todo>,
    pub total: u32,
    pub skip: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewTodo {
    pub todo: String,
    pub completed: bool,
    pub user_id: u64,
}

impl NewTodo {
    pub fn new(todo: impl Into<String>, user_id: u64) -> Self {
        Self {
            todo: todo.into(),
            completed: false,
            user_id,
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_text(&self.todo)
    }
}

/// Partial update; `None` fields are left out of the request body.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TodoUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub todo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl TodoUpdate {
    pub fn completed(completed: bool) -> Self {
        Self {
            todo: None,
            completed: Some(completed),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.todo.is_none() && self.completed.is_none() {
            return Err(ClientError::Validation("Nothing to update".into()));
        }
        match &self.todo {
            Some(text) => validate_text(text),
            None => Ok(()),
        }
    }
}

fn validate_text(text: &str) -> Result<()> {
    let chars = text.chars().count();
    if text.trim().is_empty() {
        return Err(ClientError::Validation("Todo is required".into()));
    }
    if chars < TODO_MIN_CHARS {
        return Err(ClientError::Validation(format!(
            "Todo must be at least {TODO_MIN_CHARS} characters"
        )));
    }
    if chars > TODO_MAX_CHARS {
        return Err(ClientError::Validation(format!(
            "Todo must be at most {TODO_MAX_CHARS} characters"
        )));
    }
    Ok(())
}
