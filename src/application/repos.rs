//! Traits describing the search index and cache adapters.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error;

use crate::application::pagination::{FilterSpec, SearchSpec};
use crate::domain::types::SortOrder;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("document `{id}` not found in index `{index}`")]
    NotFound { index: String, id: String },
    #[error("search index unavailable: {0}")]
    Unavailable(String),
    #[error("search index rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("failed to decode search index response: {0}")]
    Decode(String),
    #[error("search index request timed out")]
    Timeout,
    #[error("no search index connection available within {0:?}")]
    PoolExhausted(Duration),
}

impl IndexError {
    pub fn unavailable(err: impl std::fmt::Display) -> Self {
        Self::Unavailable(err.to_string())
    }

    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache store unavailable: {0}")]
    Unavailable(String),
    #[error("cache payload could not be (de)serialized: {0}")]
    Serialization(String),
    #[error("cache command timed out")]
    Timeout,
    #[error("no cache connection available within {0:?}")]
    PoolExhausted(Duration),
}

impl CacheError {
    pub fn unavailable(err: impl std::fmt::Display) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// Sort applied to every search. No secondary tie-break is added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub order: SortOrder,
}

impl SortSpec {
    pub fn new(field: impl Into<String>, order: SortOrder) -> Self {
        Self {
            field: field.into(),
            order,
        }
    }

    /// `field:order`, the form the index accepts as a sort parameter.
    pub fn as_param(&self) -> String {
        format!("{}:{}", self.field, self.order.as_str())
    }
}

/// A composed search: optional match and filter clauses, sort, and window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub sort: SortSpec,
    pub search: SearchSpec,
    pub filter: FilterSpec,
    pub offset: u64,
    pub limit: u64,
}

/// Raw documents returned by a search plus the total match count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchHits {
    pub documents: Vec<Value>,
    pub total: u64,
}

/// Read access to the search index, the source of truth.
#[async_trait]
pub trait IndexClient: Send + Sync {
    /// Total documents in `index`.
    async fn count(&self, index: &str) -> Result<u64, IndexError>;

    /// Source document for `id`, or `IndexError::NotFound`.
    async fn get_by_id(&self, index: &str, id: &str) -> Result<Value, IndexError>;

    async fn search(&self, index: &str, request: &SearchRequest)
    -> Result<SearchHits, IndexError>;

    async fn ping(&self) -> bool;
}

/// Key-value store with expiring entries.
///
/// A key is either fully written or absent; implementations never expose a
/// partial value.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    async fn set_raw(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError>;

    async fn ping(&self) -> bool;
}

/// JSON helpers over any [`CacheStore`].
#[async_trait]
pub trait CacheStoreExt: CacheStore {
    async fn get_json<T>(&self, key: &str) -> Result<Option<T>, CacheError>
    where
        T: DeserializeOwned + Send,
    {
        match self.get_raw(key).await? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|err| CacheError::Serialization(err.to_string())),
            None => Ok(None),
        }
    }

    /// Cached value, or `default` when the key is absent or expired.
    async fn get_json_or<T>(&self, key: &str, default: T) -> Result<T, CacheError>
    where
        T: DeserializeOwned + Send,
    {
        Ok(self.get_json(key).await?.unwrap_or(default))
    }

    async fn set_json<T>(&self, key: &str, value: &T, ttl: Duration) -> Result<(), CacheError>
    where
        T: Serialize + Sync,
    {
        let bytes =
            serde_json::to_vec(value).map_err(|err| CacheError::Serialization(err.to_string()))?;
        self.set_raw(key, &bytes, ttl).await
    }
}

impl<S: CacheStore + ?Sized> CacheStoreExt for S {}
