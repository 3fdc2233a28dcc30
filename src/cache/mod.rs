//! Key/value cache with per-entry TTL.
//!
//! Keys follow `<entity-type>:<id>`. Values are opaque bytes; callers choose
//! the encoding (JSON for catalog items).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CacheError {
    #[error("Cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("Cached value could not be decoded: {0}")]
    Decode(String),
}

#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    /// Removes the key. Deleting a missing key succeeds.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

pub fn cache_key(entity: &str, id: &str) -> String {
    format!("{}:{}", entity, id)
}

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// Process-local cache. Expired entries are dropped lazily on read.
#[derive(Default)]
pub struct MemoryCache {
    entries: DashMap<String, Entry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > now {
                return Ok(Some(entry.value.clone()));
            }
        }
        self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        Ok(None)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        self.entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }
}
