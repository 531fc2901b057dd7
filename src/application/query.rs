//! Cache-aside reads over the search index.
//!
//! Every read first consults the cache under a deterministic key. Misses go
//! to the index, and successful results are written back with the adapter's
//! TTL. Cache failures degrade to misses; they never fail a request.

use std::collections::BTreeSet;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use serde::{Serialize, Serializer, de::DeserializeOwned, ser::Error as _};
use serde_json::Value;
use tracing::debug;

use crate::application::catalog::EntityAdapter;
use crate::application::error::QueryError;
use crate::application::pagination::{FilterSpec, PaginatedResult, QueryParams, SearchSpec};
use crate::application::repos::{
    CacheStore, CacheStoreExt, IndexClient, IndexError, SearchRequest, SortSpec,
};
use crate::cache::{CacheKeyBuilder, FlightGuard, SingleFlight};
use crate::domain::entities::{FilmRecord, GenreRecord, PersonRecord};

pub const METRIC_CACHE_HIT: &str = "marquee_cache_hit_total";
pub const METRIC_CACHE_MISS: &str = "marquee_cache_miss_total";
pub const METRIC_CACHE_ERROR: &str = "marquee_cache_error_total";
pub const METRIC_INDEX_QUERY_MS: &str = "marquee_index_query_ms";

pub type FilmService = PaginatedQueryService<FilmRecord>;
pub type GenreService = PaginatedQueryService<GenreRecord>;
pub type PersonService = PaginatedQueryService<PersonRecord>;

/// Field names removed from a single-record response. `id` is always kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExcludeFields(BTreeSet<String>);

impl ExcludeFields {
    pub fn none() -> Self {
        Self::default()
    }

    /// Parse `a,b, c`. Blank segments and `id` are dropped.
    pub fn from_csv(raw: &str) -> Self {
        raw.split(',').map(str::trim).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<'a> FromIterator<&'a str> for ExcludeFields {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .filter(|field| !field.is_empty() && *field != "id")
                .map(str::to_string)
                .collect(),
        )
    }
}

/// A record paired with the fields to omit when it is serialized.
#[derive(Debug, Clone, PartialEq)]
pub struct Projected<R> {
    record: R,
    exclude: ExcludeFields,
}

impl<R> Projected<R> {
    pub fn new(record: R, exclude: ExcludeFields) -> Self {
        Self { record, exclude }
    }

    pub fn record(&self) -> &R {
        &self.record
    }

    pub fn into_inner(self) -> R {
        self.record
    }
}

impl<R: Serialize> Serialize for Projected<R> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.exclude.is_empty() {
            return self.record.serialize(serializer);
        }
        let mut value = serde_json::to_value(&self.record).map_err(S::Error::custom)?;
        if let Value::Object(map) = &mut value {
            for field in self.exclude.iter() {
                map.remove(field);
            }
        }
        value.serialize(serializer)
    }
}

/// Generic cache-aside query service for one entity type.
pub struct PaginatedQueryService<R> {
    adapter: EntityAdapter,
    keys: CacheKeyBuilder,
    index: Arc<dyn IndexClient>,
    cache: Option<Arc<dyn CacheStore>>,
    flight: Option<SingleFlight>,
    _record: PhantomData<fn() -> R>,
}

impl<R> PaginatedQueryService<R>
where
    R: Serialize + DeserializeOwned + Send + Sync,
{
    /// A service without a cache reads the index on every call.
    pub fn new(
        adapter: EntityAdapter,
        index: Arc<dyn IndexClient>,
        cache: Option<Arc<dyn CacheStore>>,
    ) -> Self {
        Self {
            keys: CacheKeyBuilder::new(adapter.name),
            adapter,
            index,
            cache,
            flight: None,
            _record: PhantomData,
        }
    }

    /// Serialize concurrent misses for the same key.
    ///
    /// Has no effect on a service without a cache.
    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.flight = (enabled && self.cache.is_some()).then(SingleFlight::new);
        self
    }

    pub fn single_flight(&self) -> bool {
        self.flight.is_some()
    }

    pub fn adapter(&self) -> &EntityAdapter {
        &self.adapter
    }

    pub fn keys(&self) -> &CacheKeyBuilder {
        &self.keys
    }

    /// Fetch one record by id. Exclusions apply to the returned projection only.
    pub async fn get(&self, id: &str, exclude: &ExcludeFields) -> Result<Projected<R>, QueryError> {
        let key = self.keys.single_key(id);
        let _flight = match self.read_through::<R>(&key).await {
            ReadThrough::Cached(record) => return Ok(Projected::new(record, exclude.clone())),
            ReadThrough::Fetch(guard) => guard,
        };

        let started = Instant::now();
        let document = self.index.get_by_id(self.adapter.index, id).await;
        self.record_index_latency(started);
        let document = document.map_err(|err| match err {
            IndexError::NotFound { .. } => QueryError::not_found(id),
            other => QueryError::from(other),
        })?;
        let record: R = decode_document(document).map_err(QueryError::QueryFailed)?;

        self.cache_store(&key, &record).await;
        Ok(Projected::new(record, exclude.clone()))
    }

    /// Fetch one page of records plus the total match count.
    ///
    /// A page size of zero returns every matching document.
    pub async fn get_multi(
        &self,
        params: &QueryParams,
        search: Option<&SearchSpec>,
        filter: Option<&FilterSpec>,
    ) -> Result<PaginatedResult<R>, QueryError> {
        let key = self.keys.list_key(params, search, filter);
        let _flight = match self.read_through::<PaginatedResult<R>>(&key).await {
            ReadThrough::Cached(result) => return Ok(result),
            ReadThrough::Fetch(guard) => guard,
        };

        let started = Instant::now();
        let result = self.search_index(params, search, filter).await;
        self.record_index_latency(started);
        let result = result?;

        self.cache_store(&key, &result).await;
        Ok(result)
    }

    async fn search_index(
        &self,
        params: &QueryParams,
        search: Option<&SearchSpec>,
        filter: Option<&FilterSpec>,
    ) -> Result<PaginatedResult<R>, QueryError> {
        let limit = if params.is_unpaginated() {
            self.index.count(self.adapter.index).await?
        } else {
            u64::from(params.page_size())
        };

        let request = SearchRequest {
            sort: SortSpec::new(params.sort_by(), params.order()),
            search: search.cloned().unwrap_or_default(),
            filter: filter.cloned().unwrap_or_default(),
            offset: params.offset(),
            limit,
        };
        let hits = self.index.search(self.adapter.index, &request).await?;

        let records = hits
            .documents
            .into_iter()
            .map(decode_document)
            .collect::<Result<Vec<R>, _>>()
            .map_err(QueryError::QueryFailed)?;
        Ok(PaginatedResult::new(records, hits.total))
    }

    /// Consult the cache and, on a clean miss, take the population lock.
    ///
    /// A cache that fails to answer skips the lock: the index is queried
    /// directly and concurrently.
    async fn read_through<T>(&self, key: &str) -> ReadThrough<T>
    where
        T: DeserializeOwned + Send,
    {
        match self.cache_lookup::<T>(key).await {
            Lookup::Hit(value) => return ReadThrough::Cached(value),
            Lookup::Failed => return ReadThrough::Fetch(None),
            Lookup::Miss => {}
        }

        let Some(flight) = self.flight.as_ref() else {
            return ReadThrough::Fetch(None);
        };
        let guard = flight.acquire(key).await;
        if !guard.waited() {
            return ReadThrough::Fetch(Some(guard));
        }

        match self.cache_lookup::<T>(key).await {
            Lookup::Hit(value) => ReadThrough::Cached(value),
            Lookup::Miss => ReadThrough::Fetch(Some(guard)),
            Lookup::Failed => ReadThrough::Fetch(None),
        }
    }

    async fn cache_lookup<T>(&self, key: &str) -> Lookup<T>
    where
        T: DeserializeOwned + Send,
    {
        let Some(cache) = self.cache.as_ref() else {
            return Lookup::Miss;
        };
        let entity = self.adapter.name;
        match cache.get_json::<T>(key).await {
            Ok(Some(value)) => {
                counter!(METRIC_CACHE_HIT, "entity" => entity).increment(1);
                debug!(key, "cache hit");
                Lookup::Hit(value)
            }
            Ok(None) => {
                counter!(METRIC_CACHE_MISS, "entity" => entity).increment(1);
                debug!(key, "cache miss");
                Lookup::Miss
            }
            Err(err) => {
                counter!(METRIC_CACHE_ERROR, "entity" => entity).increment(1);
                debug!(key, error = %err, "cache read failed, treating as miss");
                Lookup::Failed
            }
        }
    }

    async fn cache_store<T>(&self, key: &str, value: &T)
    where
        T: Serialize + Sync,
    {
        let Some(cache) = self.cache.as_ref() else {
            return;
        };
        if let Err(err) = cache.set_json(key, value, self.adapter.ttl).await {
            counter!(METRIC_CACHE_ERROR, "entity" => self.adapter.name).increment(1);
            debug!(key, error = %err, "cache write failed");
        }
    }

    fn record_index_latency(&self, started: Instant) {
        histogram!(METRIC_INDEX_QUERY_MS, "entity" => self.adapter.name)
            .record(started.elapsed().as_secs_f64() * 1000.0);
    }
}

enum Lookup<T> {
    Hit(T),
    Miss,
    Failed,
}

enum ReadThrough<T> {
    Cached(T),
    /// Query the index, holding the population lock if one was taken.
    Fetch(Option<FlightGuard>),
}

fn decode_document<R: DeserializeOwned>(document: Value) -> Result<R, IndexError> {
    serde_json::from_value(document).map_err(IndexError::decode)
}
