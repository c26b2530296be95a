//! Key-value storage for schedule state.
//!
//! The trigger manager persists schedule records and fire claims
//! through this trait. The in-memory implementation covers tests and
//! single-process deployments; a Redis-like backend maps onto the same
//! operations.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::error::KvError;

/// Minimal key-value operations the scheduler relies on.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;
    async fn set(&self, key: &str, value: String) -> Result<(), KvError>;
    async fn remove(&self, key: &str) -> Result<bool, KvError>;
    /// Atomically increments an integer value, creating it at 1. A
    /// `ttl` applies in the same operation when the key is created, so
    /// a crash cannot leave an immortal counter.
    async fn increment(&self, key: &str, ttl: Option<Duration>) -> Result<i64, KvError>;
    /// Sets a time-to-live on an existing key.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), KvError>;
    /// Keys starting with `prefix`, sorted.
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, KvError>;
}

struct Entry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

/// In-memory key-value store with lazy expiry.
#[derive(Default)]
pub struct InMemoryKeyValueStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemoryKeyValueStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let now = Utc::now();
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: String) -> Result<(), KvError> {
        self.entries.write().await.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, KvError> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn increment(&self, key: &str, ttl: Option<Duration>) -> Result<i64, KvError> {
        let now = Utc::now();
        let mut entries = self.entries.write().await;

        let live = entries.get(key).filter(|entry| !entry.is_expired(now));
        let current = match live {
            Some(entry) => entry.value.parse::<i64>().map_err(|_| {
                KvError::new(format!("key '{key}' holds a non-integer value"))
            })?,
            None => 0,
        };
        // TTL is set when the counter is created and kept on later
        // increments.
        let expires_at = match live {
            Some(entry) => entry.expires_at,
            None => match ttl {
                Some(ttl) => Some(
                    now + ChronoDuration::from_std(ttl)
                        .map_err(|e| KvError::new(format!("ttl out of range: {e}")))?,
                ),
                None => None,
            },
        };
        let next = current + 1;
        entries.insert(
            key.to_string(),
            Entry {
                value: next.to_string(),
                expires_at,
            },
        );
        Ok(next)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), KvError> {
        let deadline = Utc::now()
            + ChronoDuration::from_std(ttl)
                .map_err(|e| KvError::new(format!("ttl out of range: {e}")))?;
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get_mut(key) {
            entry.expires_at = Some(deadline);
        }
        Ok(())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, KvError> {
        let now = Utc::now();
        let entries = self.entries.read().await;
        let mut keys: Vec<String> = entries
            .iter()
            .filter(|(key, entry)| key.starts_with(prefix) && !entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort_unstable();
        Ok(keys)
    }
}
