use super::{SlotChange, Store, StoreResult, change_channel};
use async_trait::async_trait;
use sqlx::{Pool, Row, Sqlite, sqlite::SqlitePoolOptions};
use tokio::sync::broadcast;
use uuid::Uuid;

#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
    changes: broadcast::Sender<SlotChange>,
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        // An in-memory database only lives as long as its connection.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        let store = Self {
            pool,
            changes: change_channel(),
        };
        store.init().await?;
        tracing::info!("Connected to sqlite store at {}", database_url);
        Ok(store)
    }

    async fn init(&self) -> StoreResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS slots (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn read(&self, key: &str) -> StoreResult<Option<String>> {
        let row = sqlx::query("SELECT value FROM slots WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|row| row.get("value")))
    }

    async fn write(&self, key: &str, value: String, origin: Uuid) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO slots (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(&value)
        .execute(&self.pool)
        .await?;

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
