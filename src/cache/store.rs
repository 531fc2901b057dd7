//! Process-local cache store with per-entry expiry.
//!
//! Used when no external cache is configured and as the store in tests.
//! Expiry is measured on the tokio clock so paused-time tests can advance it.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

use crate::application::repos::{CacheError, CacheStore};

#[derive(Debug)]
struct CacheEntry {
    data: Vec<u8>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

#[derive(Debug, Default)]
pub struct InMemoryCacheStore {
    entries: DashMap<String, CacheEntry>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` holds an unexpired entry.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| entry.is_live(Instant::now()))
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn evict_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.is_live(now));
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.is_live(now) {
                return Ok(Some(entry.data.clone()));
            }
        }
        self.entries.remove_if(key, |_, entry| !entry.is_live(now));
        Ok(None)
    }

    async fn set_raw(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                data: value.to_vec(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn ping(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::application::repos::CacheStoreExt;

    #[tokio::test]
    async fn hit_and_miss() {
        let store = InMemoryCacheStore::new();

        assert!(store.get_raw("key").await.expect("get").is_none());

        store
            .set_raw("key", b"value", Duration::from_secs(60))
            .await
            .expect("set");

        let hit = store.get_raw("key").await.expect("get");
        assert_eq!(hit.as_deref(), Some(&b"value"[..]));
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let store = InMemoryCacheStore::new();
        store
            .set_raw("key", b"value", Duration::from_secs(1))
            .await
            .expect("set");

        tokio::time::advance(Duration::from_millis(500)).await;
        assert!(store.contains_key("key"));

        tokio::time::advance(Duration::from_millis(1000)).await;
        assert!(!store.contains_key("key"));
        assert!(store.get_raw("key").await.expect("get").is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn overwrite_replaces_value() {
        let store = InMemoryCacheStore::new();
        store
            .set_raw("key", b"first", Duration::from_secs(60))
            .await
            .expect("set");
        store
            .set_raw("key", b"second", Duration::from_secs(60))
            .await
            .expect("set");

        let hit = store.get_raw("key").await.expect("get");
        assert_eq!(hit.as_deref(), Some(&b"second"[..]));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn json_helpers_return_default_on_absent_key() {
        let store = InMemoryCacheStore::new();
        let fallback: Vec<u32> = store
            .get_json_or("missing", vec![7])
            .await
            .expect("get with default");
        assert_eq!(fallback, vec![7]);

        store
            .set_json("present", &json!({"n": 1}), Duration::from_secs(60))
            .await
            .expect("set json");
        let value: serde_json::Value = store
            .get_json_or("present", json!(null))
            .await
            .expect("get with default");
        assert_eq!(value["n"], 1);
    }

    #[tokio::test]
    async fn corrupt_payload_is_a_serialization_error() {
        let store = InMemoryCacheStore::new();
        store
            .set_raw("key", b"not json", Duration::from_secs(60))
            .await
            .expect("set");

        let result = store.get_json::<Vec<u32>>("key").await;
        assert!(matches!(result, Err(CacheError::Serialization(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn evict_expired_drops_only_stale_entries() {
        let store = InMemoryCacheStore::new();
        store
            .set_raw("short", b"1", Duration::from_secs(1))
            .await
            .expect("set");
        store
            .set_raw("long", b"2", Duration::from_secs(60))
            .await
            .expect("set");

        tokio::time::advance(Duration::from_secs(2)).await;
        store.evict_expired();

        assert_eq!(store.len(), 1);
        assert!(store.contains_key("long"));
    }
}
