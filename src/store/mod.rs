//! Storage collaborator: key/value, append-only lists and pub/sub.
//!
//! The web tier reads everything this server writes, so key names are
//! part of the wire contract (see [`keys`]).

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::DnsError;

mod memory;
mod redis;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

/// Storage operations used by the resolver and the query logger.
///
/// Every call may block on I/O. Implementations must give
/// linearizable `get`/`set` per key.
#[async_trait]
pub trait Store: Send + Sync {
    /// Read a value.
    async fn get(&self, key: &str) -> Result<Option<String>, DnsError>;

    /// Overwrite a value.
    async fn set(&self, key: &str, value: &str) -> Result<(), DnsError>;

    /// Replace `key` with `new` only if it currently holds `expected`.
    /// Returns whether the write happened.
    async fn compare_and_swap(&self, key: &str, expected: &str, new: &str)
        -> Result<bool, DnsError>;

    /// Fire-and-forget publish; listeners that are not subscribed miss it.
    async fn publish(&self, channel: &str, payload: &str) -> Result<(), DnsError>;

    /// Append to a list. Returns the list length after the append.
    async fn append(&self, key: &str, payload: &str) -> Result<u64, DnsError>;
}

/// Open the configured backend.
pub async fn connect(config: &StorageConfig) -> Result<Arc<dyn Store>, DnsError> {
    match config.backend {
        StorageBackend::Redis => Ok(Arc::new(RedisStore::connect(&config.url).await?)),
        StorageBackend::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}

/// Key layout shared with the web tier.
pub mod keys {
    /// Override record for `(record_type, domain)`.
    pub fn dns_override(record_type: &str, domain: &str) -> String {
        format!("dns:{record_type}:{domain}")
    }

    /// Live channel for an owner.
    pub fn pubsub(owner: &str) -> String {
        format!("pubsub:{owner}")
    }

    /// Durable request list for an owner.
    pub fn requests(owner: &str) -> String {
        format!("requests:{owner}")
    }

    /// Entry id to list index mapping.
    pub fn request_index(owner: &str, entry_id: &str) -> String {
        format!("request:{owner}:{entry_id}")
    }
}
