//! Logs in against the configured todo API, lists the first page and keeps
//! the session on disk so the next run starts signed in.
//!
//! ```sh
//! TODO_SESSION_FILE=/tmp/todo-session.json \
//! TODO_USERNAME=emilys TODO_PASSWORD=emilyspass \
//! RUST_LOG=todo_session_client=debug cargo run --example todo_session
//! ```

use std::path::PathBuf;

use todo_session_client::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config = ClientConfig::from_env()?;
    if config.session_file.is_none() {
        config = config.with_session_file(PathBuf::from("todo-session.json"));
    }

    let app = TodoApp::<FileStorage>::from_config(config).await?;

    if !app.guard.check("/todos").is_allowed() {
        let username = std::env::var("TODO_USERNAME").unwrap_or_else(|_| "emilys".into());
        let password = std::env::var("TODO_PASSWORD").unwrap_or_else(|_| "emilyspass".into());
        let session = app.auth.login(&username, &password).await?;
        println!("Signed in as {}", session.user.display_name());
    }

    let mut list = app.todo_list();
    if let Err(e) = list.load().await {
        eprintln!("{}", list.last_error().unwrap_or("Failed to load todos."));
        if e.is_authentication() {
            println!("Session ended, run again to sign in.");
        }
        return Err(e);
    }

    println!(
        "Page {}/{} ({} todos)",
        list.current_page(),
        list.total_pages(),
        list.total_items()
    );
    for todo in list.todos() {
        let mark = if todo.completed { "x" } else { " " };
        println!("[{mark}] {:>4} {}", todo.id, todo.todo);
    }

    let me = app.todos.current_user().await?;
    println!("Server sees you as {} <{}>", me.username, me.email.unwrap_or_default());

    Ok(())
}
