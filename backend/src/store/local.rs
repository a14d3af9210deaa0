use super::{SlotChange, Store, StoreResult, change_channel};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::{RwLock, broadcast};
use uuid::Uuid;

/// Key/value pairs kept in memory and mirrored to a single JSON file.
pub struct LocalStore {
    path: Option<PathBuf>,
    entries: RwLock<BTreeMap<String, String>>,
    changes: broadcast::Sender<SlotChange>,
}

impl LocalStore {
    pub async fn open(path: PathBuf) -> StoreResult<Self> {
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("{} is not a valid store file, starting empty: {}", path.display(), e);
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::info!("Opened local store at {}", path.display());

        Ok(Self {
            path: Some(path),
            entries: RwLock::new(entries),
            changes: change_channel(),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: RwLock::new(BTreeMap::new()),
            changes: change_channel(),
        }
    }

    async fn save(&self, entries: &BTreeMap<String, String>) -> StoreResult<()> {
        if let Some(path) = &self.path {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                tokio::fs::create_dir_all(parent).await?;
            }
            let content = serde_json::to_string_pretty(entries)?;
            // Write beside the file and swap it in so a crash never leaves half a store.
            let tmp = temp_path(path);
            tokio::fs::write(&tmp, content).await?;
            tokio::fs::rename(&tmp, path).await?;
        }
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[async_trait]
impl Store for LocalStore {
    async fn read(&self, key: &str) -> StoreResult<Option<String>> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).cloned())
    }

    async fn write(&self, key: &str, value: String, origin: Uuid) -> StoreResult<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), value.clone());
        self.save(&entries).await?;

        // Nobody listening is fine.
        let _ = self.changes.send(SlotChange {
            key: key.to_string(),
            value: Some(value),
            origin,
        });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<SlotChange> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_file() -> PathBuf {
        std::env::temp_dir().join(format!("companion-store-{}.json", Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let path = scratch_file();
        let store = LocalStore::open(path.clone()).await.unwrap();
        store
            .write("theme", "\"dark\"".into(), Uuid::new_v4())
            .await
            .unwrap();

        let reopened = LocalStore::open(path.clone()).await.unwrap();
        assert_eq!(reopened.read("theme").await.unwrap().as_deref(), Some("\"dark\""));
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_save_replaces_file_without_leftovers() {
        let path = scratch_file();
        std::fs::write(&path, "{\"theme\":\"\\\"light\\\"\"}").unwrap();
        let store = LocalStore::open(path.clone()).await.unwrap();
        store
            .write("ai-chat-muted", "true".into(), Uuid::new_v4())
            .await
            .unwrap();

        assert!(!temp_path(&path).exists());
        let saved: BTreeMap<String, String> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved.get("theme").map(String::as_str), Some("\"light\""));
        assert_eq!(saved.get("ai-chat-muted").map(String::as_str), Some("true"));
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_corrupt_file_opens_empty() {
        let path = scratch_file();
        std::fs::write(&path, "{{{").unwrap();
        let store = LocalStore::open(path.clone()).await.unwrap();
        assert!(store.read("theme").await.unwrap().is_none());
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_write_notifies_subscribers() {
        let store = LocalStore::in_memory();
        let mut changes = store.subscribe();
        let origin = Uuid::new_v4();
        store.write("ai-chat-muted", "true".into(), origin).await.unwrap();

        let change = changes.recv().await.unwrap();
        assert_eq!(change.key, "ai-chat-muted");
        assert_eq!(change.value.as_deref(), Some("true"));
        assert_eq!(change.origin, origin);
    }
}
