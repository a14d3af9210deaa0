use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use shared::models::{Character, Conversation, Theme, User};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{RwLock, broadcast};
use tokio::task::JoinHandle;
use uuid::Uuid;

pub mod local;
pub mod sqlite;

pub use local::LocalStore;
pub use sqlite::SqliteStore;

pub type StoreResult<T> = Result<T, StoreError>;

pub const USERS_KEY: &str = "ai-users";
pub const CURRENT_USER_KEY: &str = "ai-currentUser";
pub const CHARACTERS_KEY: &str = "ai-characters";
pub const CONVERSATIONS_KEY: &str = "ai-conversations";
pub const THEME_KEY: &str = "theme";
pub const MUTED_KEY: &str = "ai-chat-muted";

const CHANGE_BUFFER: usize = 64;

#[derive(Clone, Debug)]
pub enum StoreConfig {
    /// JSON file of key/value pairs. `None` keeps everything in memory.
    Local { path: Option<PathBuf> },
    Sqlite { url: String },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A write observed on a store, broadcast to every subscriber.
#[derive(Clone, Debug)]
pub struct SlotChange {
    pub key: String,
    pub value: Option<String>,
    /// Identifies the [`Slots`] container that made the write
    pub origin: Uuid,
}

/// Raw key/value persistence. Values are whole serialized documents.
#[async_trait]
pub trait Store: Send + Sync {
    async fn read(&self, key: &str) -> StoreResult<Option<String>>;
    async fn write(&self, key: &str, value: String, origin: Uuid) -> StoreResult<()>;
    fn subscribe(&self) -> broadcast::Receiver<SlotChange>;
}

pub async fn open(config: &StoreConfig) -> StoreResult<Arc<dyn Store>> {
    match config {
        StoreConfig::Local { path: Some(path) } => Ok(Arc::new(LocalStore::open(path.clone()).await?)),
        StoreConfig::Local { path: None } => Ok(Arc::new(LocalStore::in_memory())),
        StoreConfig::Sqlite { url } => Ok(Arc::new(SqliteStore::connect(url).await?)),
    }
}

pub(crate) fn change_channel() -> broadcast::Sender<SlotChange> {
    broadcast::channel(CHANGE_BUFFER).0
}

/// A typed, cached view over one store key.
pub struct Slot<T> {
    key: &'static str,
    origin: Uuid,
    store: Arc<dyn Store>,
    value: RwLock<T>,
}

impl<T> Slot<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    /// Reads the stored value, falling back to `default` when the key is
    /// missing or its content does not parse.
    pub async fn load(store: Arc<dyn Store>, origin: Uuid, key: &'static str, default: T) -> Self {
        let value = match store.read(key).await {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!("Stored value for {} is malformed, using default: {}", key, e);
                default
            }),
            Ok(None) => default,
            Err(e) => {
                tracing::warn!("Failed to read {}, using default: {}", key, e);
                default
            }
        };

        Self {
            key,
            origin,
            store,
            value: RwLock::new(value),
        }
    }

    pub async fn get(&self) -> T {
        self.value.read().await.clone()
    }

    pub async fn set_value(&self, value: T) -> StoreResult<()> {
        self.update_value(move |current| *current = value).await
    }

    pub async fn update_value<R>(&self, f: impl FnOnce(&mut T) -> R) -> StoreResult<R> {
        self.try_update(|current| Ok::<_, StoreError>(f(current))).await
    }

    /// Applies `f` to a copy of the value. The copy is persisted and becomes
    /// current only when `f` succeeds; on error nothing changes.
    pub async fn try_update<R, E>(&self, f: impl FnOnce(&mut T) -> Result<R, E>) -> Result<R, E>
    where
        E: From<StoreError>,
    {
        let mut guard = self.value.write().await;
        let mut next = guard.clone();
        let result = f(&mut next)?;

        let raw = serde_json::to_string(&next).map_err(StoreError::from)?;
        self.store.write(self.key, raw, self.origin).await?;
        *guard = next;
        Ok(result)
    }

    /// Overwrites the cached value with a write made by another container.
    /// Returns whether the change was applied.
    pub async fn apply_change(&self, change: &SlotChange) -> bool {
        if change.key != self.key || change.origin == self.origin {
            return false;
        }
        let Some(raw) = change.value.as_deref() else {
            return false;
        };
        match serde_json::from_str(raw) {
            Ok(value) => {
                *self.value.write().await = value;
                true
            }
            Err(e) => {
                tracing::warn!("Ignoring malformed external change to {}: {}", self.key, e);
                false
            }
        }
    }
}

/// Every persisted slot of the application.
pub struct Slots {
    pub origin: Uuid,
    store: Arc<dyn Store>,
    pub users: Slot<Vec<User>>,
    pub current_user: Slot<Option<User>>,
    pub characters: Slot<Vec<Character>>,
    pub conversations: Slot<Vec<Conversation>>,
    pub theme: Slot<Theme>,
    pub muted: Slot<bool>,
}

impl Slots {
    pub async fn load(store: Arc<dyn Store>) -> Self {
        let origin = Uuid::new_v4();
        let s = || store.clone();
        Self {
            origin,
            users: Slot::load(s(), origin, USERS_KEY, Vec::new()).await,
            current_user: Slot::load(s(), origin, CURRENT_USER_KEY, None).await,
            characters: Slot::load(s(), origin, CHARACTERS_KEY, crate::seed::default_characters())
                .await,
            conversations: Slot::load(s(), origin, CONVERSATIONS_KEY, Vec::new()).await,
            theme: Slot::load(s(), origin, THEME_KEY, Theme::default()).await,
            muted: Slot::load(s(), origin, MUTED_KEY, false).await,
            store,
        }
    }

    pub async fn apply_change(&self, change: &SlotChange) -> bool {
        match change.key.as_str() {
            USERS_KEY => self.users.apply_change(change).await,
            CURRENT_USER_KEY => self.current_user.apply_change(change).await,
            CHARACTERS_KEY => self.characters.apply_change(change).await,
            CONVERSATIONS_KEY => self.conversations.apply_change(change).await,
            THEME_KEY => self.theme.apply_change(change).await,
            MUTED_KEY => self.muted.apply_change(change).await,
            _ => false,
        }
    }

    /// Keeps the slots in step with writes made by other containers sharing
    /// the same store. Last writer wins.
    pub fn watch(self: &Arc<Self>) -> JoinHandle<()> {
        let slots = self.clone();
        let mut changes = self.store.subscribe();
        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) => {
                        if slots.apply_change(&change).await {
                            tracing::debug!("Applied external change to {}", change.key);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("Store watcher lagged, {} changes skipped", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{Message, MessageAttachment};
    use std::time::Duration;

    fn conversation_with_attachment() -> Conversation {
        let character = crate::seed::default_characters().remove(0);
        let mut conversation = Conversation::new(Uuid::new_v4(), &character);
        conversation.push(Message::user(
            "look at this",
            Some(MessageAttachment {
                mime_type: "image/jpeg".into(),
                data: "/9j/4AAQSkZJRg==".into(),
            }),
        ));
        conversation.push(Message::reply("nice photo", 1));
        conversation
    }

    #[tokio::test]
    async fn test_conversations_round_trip() {
        let store: Arc<dyn Store> = Arc::new(LocalStore::in_memory());
        let slots = Slots::load(store.clone()).await;
        let conversations = vec![conversation_with_attachment()];
        slots.conversations.set_value(conversations.clone()).await.unwrap();

        let reloaded = Slots::load(store).await;
        assert_eq!(reloaded.conversations.get().await, conversations);
    }

    #[tokio::test]
    async fn test_malformed_value_falls_back_to_default() {
        let store: Arc<dyn Store> = Arc::new(LocalStore::in_memory());
        store
            .write(MUTED_KEY, "not json".into(), Uuid::new_v4())
            .await
            .unwrap();
        store
            .write(USERS_KEY, "{\"broken\":".into(), Uuid::new_v4())
            .await
            .unwrap();

        let slots = Slots::load(store).await;
        assert!(!slots.muted.get().await);
        assert!(slots.users.get().await.is_empty());
        assert!(!slots.characters.get().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_update_leaves_value_untouched() {
        let store: Arc<dyn Store> = Arc::new(LocalStore::in_memory());
        let slots = Slots::load(store.clone()).await;
        let result: Result<(), StoreError> = slots
            .theme
            .try_update(|theme| {
                *theme = Theme::Dark;
                Err(StoreError::Io(std::io::Error::other("rejected")))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(slots.theme.get().await, Theme::Light);
        assert!(store.read(THEME_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_external_change_overwrites_other_container() {
        let store: Arc<dyn Store> = Arc::new(LocalStore::in_memory());
        let first = Arc::new(Slots::load(store.clone()).await);
        let second = Arc::new(Slots::load(store).await);
        let _watcher = second.watch();

        first.theme.set_value(Theme::Dark).await.unwrap();

        let mut synced = false;
        for _ in 0..50 {
            if second.theme.get().await == Theme::Dark {
                synced = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(synced);
    }

    #[tokio::test]
    async fn test_own_changes_are_not_reapplied() {
        let store: Arc<dyn Store> = Arc::new(LocalStore::in_memory());
        let slots = Slots::load(store).await;
        let change = SlotChange {
            key: MUTED_KEY.into(),
            value: Some("true".into()),
            origin: slots.origin,
        };
        assert!(!slots.apply_change(&change).await);

        let foreign = SlotChange {
            origin: Uuid::new_v4(),
            ..change
        };
        assert!(slots.apply_change(&foreign).await);
        assert!(slots.muted.get().await);
    }
}
