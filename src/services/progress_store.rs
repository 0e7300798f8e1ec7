use async_trait::async_trait;
use redis::{Client, AsyncCommands};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use crate::errors::{StoreError, StoreResult};
use crate::models::ProgressRecord;

/// Document key of a task's progress record.
pub fn document_key(username: &str, task_id: &str) -> String {
    format!("{}_{}", username, task_id)
}

/// Where task progress lives. The single source of truth for whether a
/// user has a task in flight.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Upserts the record for `(username, task_id)`.
    async fn save(&self, username: &str, task_id: &str, record: &ProgressRecord) -> StoreResult<()>;

    /// Returns the stored record, or `ProgressRecord::default()` (complete) if there is none.
    async fn load(&self, username: &str, task_id: &str) -> StoreResult<ProgressRecord>;

    /// Remembers `task_id` as the user's newest task.
    async fn record_task(&self, username: &str, task_id: &str) -> StoreResult<()>;

    /// Task ids of the user, newest first.
    async fn task_ids(&self, username: &str) -> StoreResult<Vec<String>>;

    async fn latest_task(&self, username: &str) -> StoreResult<Option<String>> {
        Ok(self.task_ids(username).await?.into_iter().next())
    }
}

pub struct RedisProgressStore {
    client: Arc<Client>,
}

impl RedisProgressStore {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }
}

impl Clone for RedisProgressStore {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone()
        }
    }
}

#[async_trait]
impl ProgressStore for RedisProgressStore {
    async fn save(&self, username: &str, task_id: &str, record: &ProgressRecord) -> StoreResult<()> {
        let key = document_key(username, task_id);
        let document = serde_json::to_string(record)
            .map_err(|source| StoreError::Malformed { key: key.clone(), source })?;

        let mut conn = self.client.get_async_connection().await?;
        conn.set::<_, _, ()>(format!("user_progress:{}", key), document).await?;
        Ok(())
    }

    async fn load(&self, username: &str, task_id: &str) -> StoreResult<ProgressRecord> {
        let key = document_key(username, task_id);
        let mut conn = self.client.get_async_connection().await?;
        let document: Option<String> = conn.get(format!("user_progress:{}", key)).await?;

        match document {
            Some(data) => serde_json::from_str(&data)
                .map_err(|source| StoreError::Malformed { key, source }),
            None => Ok(ProgressRecord::default()),
        }
    }

    async fn record_task(&self, username: &str, task_id: &str) -> StoreResult<()> {
        let mut conn = self.client.get_async_connection().await?;
        conn.lpush::<_, _, ()>(format!("user_tasks:{}", username), task_id).await?;
        Ok(())
    }

    async fn task_ids(&self, username: &str) -> StoreResult<Vec<String>> {
        let mut conn = self.client.get_async_connection().await?;
        let ids: Vec<String> = conn.lrange(format!("user_tasks:{}", username), 0, -1).await?;
        Ok(ids)
    }
}

/// Process-local store, for running without Redis.
#[derive(Default)]
pub struct MemoryProgressStore {
    documents: RwLock<HashMap<String, ProgressRecord>>,
    tasks: RwLock<HashMap<String, Vec<String>>>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProgressStore for MemoryProgressStore {
    async fn save(&self, username: &str, task_id: &str, record: &ProgressRecord) -> StoreResult<()> {
        self.documents
            .write()
            .await
            .insert(document_key(username, task_id), record.clone());
        Ok(())
    }

    async fn load(&self, username: &str, task_id: &str) -> StoreResult<ProgressRecord> {
        Ok(self
            .documents
            .read()
            .await
            .get(&document_key(username, task_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn record_task(&self, username: &str, task_id: &str) -> StoreResult<()> {
        self.tasks
            .write()
            .await
            .entry(username.to_string())
            .or_default()
            .insert(0, task_id.to_string());
        Ok(())
    }

    async fn task_ids(&self, username: &str) -> StoreResult<Vec<String>> {
        Ok(self.tasks.read().await.get(username).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, TaskStatus};

    #[test]
    fn document_key_joins_user_and_task() {
        assert_eq!(document_key("alice", "1712345678"), "alice_1712345678");
    }

    #[tokio::test]
    async fn missing_record_reads_as_complete() {
        let store = MemoryProgressStore::new();
        let record = store.load("nobody", "").await.unwrap();
        assert!(record.task_complete);
        assert!(!record.is_running());
    }

    #[tokio::test]
    async fn save_then_load_round_trips_per_key() {
        let store = MemoryProgressStore::new();
        let record = ProgressRecord::running(vec!["cables".into()], Category::Contracting);
        store.save("alice", "t1", &record).await.unwrap();

        assert_eq!(store.load("alice", "t1").await.unwrap(), record);
        assert!(!store.load("alice", "t2").await.unwrap().is_running());
        assert!(!store.load("bob", "t1").await.unwrap().is_running());
    }

    #[tokio::test]
    async fn save_overwrites() {
        let store = MemoryProgressStore::new();
        let mut record = ProgressRecord::running(vec![], Category::Trade);
        store.save("alice", "t1", &record).await.unwrap();
        record.finish(TaskStatus::Succeeded);
        store.save("alice", "t1", &record).await.unwrap();

        let loaded = store.load("alice", "t1").await.unwrap();
        assert_eq!(loaded.status, Some(TaskStatus::Succeeded));
    }

    #[tokio::test]
    async fn task_index_is_newest_first() {
        let store = MemoryProgressStore::new();
        store.record_task("alice", "first").await.unwrap();
        store.record_task("alice", "second").await.unwrap();

        assert_eq!(store.task_ids("alice").await.unwrap(), vec!["second", "first"]);
        assert_eq!(store.latest_task("alice").await.unwrap().as_deref(), Some("second"));
        assert_eq!(store.latest_task("bob").await.unwrap(), None);
    }
}
