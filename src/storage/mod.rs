use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::Result;

mod file;

pub use file::FileStorage;

/// Trait for durable client-side key-value storage.
///
/// The session store keeps the signed-in user and both tokens under fixed
/// keys and rewrites them on every session change. Implementations only need
/// string values; serialization happens in the session store.
///
/// All methods are async and return Send futures, allowing them to be used
/// safely across thread boundaries in async contexts.
///
/// # Example Implementation
///
/// ```rust
/// use std::collections::HashMap;
/// use std::sync::Mutex;
/// use todo_session_client::error::Result;
/// use todo_session_client::SessionStorage;
///
/// struct StdMutexStorage {
///     entries: Mutex<HashMap<String, String>>,
/// }
///
/// impl SessionStorage for StdMutexStorage {
///     async fn get(&self, key: &str) -> Result<Option<String>> {
///         Ok(self.entries.lock().unwrap().get(key).cloned())
///     }
///
///     async fn set(&self, key: &str, value: String) -> Result<()> {
///         self.entries.lock().unwrap().insert(key.to_string(), value);
///         Ok(())
///     }
///
///     async fn remove(&self, key: &str) -> Result<()> {
///         self.entries.lock().unwrap().remove(key);
///         Ok(())
///     }
/// }
/// ```
pub trait SessionStorage: Send + Sync {
    /// Read the value stored under `key`
    fn get(&self, key: &str) -> impl std::future::Future<Output = Result<Option<String>>> + Send;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: String)
    -> impl std::future::Future<Output = Result<()>> + Send;

    /// Remove `key`; removing a missing key is not an error
    fn remove(&self, key: &str) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Write several entries. Backends with batched writes should override this.
    fn set_many(
        &self,
        entries: Vec<(&'static str, String)>,
    ) -> impl std::future::Future<Output = Result<()>> + Send {
        async move {
            for (key, value) in entries {
                self.set(key, value).await?;
            }
            Ok(())
        }
    }

    /// Remove several keys. Backends with batched writes should override this.
    fn remove_many(
        &self,
        keys: &[&'static str],
    ) -> impl std::future::Future<Output = Result<()>> + Send {
        async move {
            for key in keys {
                self.remove(key).await?;
            }
            Ok(())
        }
    }
}

/// Process-local storage. Clones share the same entries, which lets tests
/// simulate a restart by building a new session store over a clone.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl SessionStorage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}
