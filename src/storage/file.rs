use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

use crate::error::{ClientError, Result};
use crate::storage::SessionStorage;

type Entries = BTreeMap<String, String>;

/// Session storage backed by a single JSON file.
///
/// The file holds a flat `{key: value}` object and is rewritten on every
/// change with owner-only permissions on unix. Writes go to a sibling temp
/// file first and are renamed into place, so a crash never leaves a
/// half-written session behind.
///
/// # Example Usage
///
/// ```rust,no_run
/// use todo_session_client::storage::FileStorage;
///
/// let storage = FileStorage::new("/home/me/.config/todo/session.json");
/// ```
pub struct FileStorage {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_entries(&self) -> Result<Entries> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Entries::new()),
            Err(e) => {
                return Err(ClientError::Storage(format!(
                    "Failed to read {}: {e}",
                    self.path.display()
                )));
            }
        };

        serde_json::from_str(&contents).map_err(|e| {
            ClientError::Decode(format!("Failed to parse {}: {e}", self.path.display()))
        })
    }

    /// Entries to start a rewrite from, and whether a corrupt file was
    /// discarded and must be rewritten regardless of changes.
    async fn entries_for_update(&self) -> Result<(Entries, bool)> {
        match self.read_entries().await {
            Ok(entries) => Ok((entries, false)),
            Err(ClientError::Decode(reason)) => {
                warn!(path = %self.path.display(), %reason, "discarding unreadable session file");
                Ok((Entries::new(), true))
            }
            Err(e) => Err(e),
        }
    }

    async fn write_entries(&self, entries: &Entries) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    ClientError::Storage(format!(
                        "Failed to create directory {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }

        let contents = serde_json::to_vec_pretty(entries)
            .map_err(|e| ClientError::Storage(format!("Failed to serialize session: {e}")))?;

        let tmp_path = self.path.with_extension("tmp");
        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&tmp_path).await.map_err(|e| {
            ClientError::Storage(format!("Failed to open {}: {e}", tmp_path.display()))
        })?;
        file.write_all(&contents).await.map_err(|e| {
            ClientError::Storage(format!("Failed to write {}: {e}", tmp_path.display()))
        })?;
        file.sync_all().await.map_err(|e| {
            ClientError::Storage(format!("Failed to flush {}: {e}", tmp_path.display()))
        })?;
        drop(file);

        tokio::fs::rename(&tmp_path, &self.path).await.map_err(|e| {
            ClientError::Storage(format!(
                "Failed to move session into {}: {e}",
                self.path.display()
            ))
        })
    }
}

impl SessionStorage for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_entries().await?.remove(key))
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let (mut entries, _) = self.entries_for_update().await?;
        entries.insert(key.to_string(), value);
        self.write_entries(&entries).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let (mut entries, discarded) = self.entries_for_update().await?;
        if entries.remove(key).is_some() || discarded {
            self.write_entries(&entries).await?;
        }
        Ok(())
    }

    async fn set_many(&self, new_entries: Vec<(&'static str, String)>) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let (mut entries, _) = self.entries_for_update().await?;
        for (key, value) in new_entries {
            entries.insert(key.to_string(), value);
        }
        self.write_entries(&entries).await
    }

    async fn remove_many(&self, keys: &[&'static str]) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let (mut entries, discarded) = self.entries_for_update().await?;
        let before = entries.len();
        for key in keys {
            entries.remove(*key);
        }
        if entries.len() != before || discarded {
            self.write_entries(&entries).await?;
        }
        Ok(())
    }
}
