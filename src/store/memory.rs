//! In-process store for tests and single-node runs.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::trace;

use super::Store;
use crate::error::DnsError;

const CHANNEL_CAPACITY: usize = 256;

/// Thread-safe in-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryStoreInner>>,
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    values: HashMap<String, String>,
    lists: HashMap<String, Vec<String>>,
    channels: HashMap<String, broadcast::Sender<String>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive everything published on `channel` from now on.
    pub fn subscribe(&self, channel: &str) -> broadcast::Receiver<String> {
        let mut inner = self.inner.write();
        inner
            .channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Snapshot of a list.
    pub fn list(&self, key: &str) -> Vec<String> {
        self.inner.read().lists.get(key).cloned().unwrap_or_default()
    }

    /// Synchronous read, for assertions.
    pub fn value(&self, key: &str) -> Option<String> {
        self.inner.read().values.get(key).cloned()
    }

    /// Synchronous write, for seeding.
    pub fn insert(&self, key: &str, value: &str) {
        self.inner
            .write()
            .values
            .insert(key.to_string(), value.to_string());
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, DnsError> {
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), DnsError> {
        self.insert(key, value);
        Ok(())
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &str,
        new: &str,
    ) -> Result<bool, DnsError> {
        let mut inner = self.inner.write();
        match inner.values.get_mut(key) {
            Some(current) if current == expected => {
                *current = new.to_string();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<(), DnsError> {
        let inner = self.inner.read();
        if let Some(tx) = inner.channels.get(channel) {
            // No receivers is not an error
            let delivered = tx.send(payload.to_string()).unwrap_or(0);
            trace!(channel, delivered, "published");
        }
        Ok(())
    }

    async fn append(&self, key: &str, payload: &str) -> Result<u64, DnsError> {
        let mut inner = self.inner.write();
        let list = inner.lists.entry(key.to_string()).or_default();
        list.push(payload.to_string());
        Ok(list.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = MemoryStore::new();
        assert!(store.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_compare_and_swap() {
        let store = MemoryStore::new();
        store.set("k", "old").await.unwrap();

        assert!(!store.compare_and_swap("k", "stale", "x").await.unwrap());
        assert_eq!(store.value("k").as_deref(), Some("old"));

        assert!(store.compare_and_swap("k", "old", "new").await.unwrap());
        assert_eq!(store.value("k").as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_compare_and_swap_missing_key_fails() {
        let store = MemoryStore::new();
        assert!(!store.compare_and_swap("k", "", "x").await.unwrap());
        assert!(store.value("k").is_none());
    }

    #[tokio::test]
    async fn test_append_returns_length() {
        let store = MemoryStore::new();
        assert_eq!(store.append("l", "a").await.unwrap(), 1);
        assert_eq!(store.append("l", "b").await.unwrap(), 2);
        assert_eq!(store.list("l"), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_publish_reaches_current_subscribers_only() {
        let store = MemoryStore::new();
        store.publish("ch", "missed").await.unwrap();

        let mut rx = store.subscribe("ch");
        store.publish("ch", "seen").await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), "seen");
        assert!(rx.try_recv().is_err());
    }
}
