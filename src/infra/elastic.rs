//! Search index client speaking the Elasticsearch HTTP API.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tokio::sync::OwnedSemaphorePermit;
use tracing::{debug, instrument};
use url::Url;

use crate::application::pagination::Criteria;
use crate::application::repos::{IndexClient, IndexError, SearchHits, SearchRequest};
use crate::config::IndexSettings;
use crate::infra::error::InfraError;
use crate::infra::pool::{ConnectionGate, GateError};

#[derive(Debug, Clone)]
pub struct ElasticIndexClient {
    client: Client,
    base: Url,
    gate: ConnectionGate,
}

impl ElasticIndexClient {
    pub fn new(settings: &IndexSettings) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(settings.request_timeout)
            .pool_max_idle_per_host(settings.max_connections.get() as usize)
            .build()
            .map_err(|err| InfraError::index(format!("failed to build HTTP client: {err}")))?;
        let gate = ConnectionGate::new(
            settings.max_connections.get() as usize,
            settings.acquire_timeout,
        );
        Ok(Self {
            client,
            base: settings.url.clone(),
            gate,
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("marquee/", env!("CARGO_PKG_VERSION"))
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, IndexError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| IndexError::unavailable(format!("`{}` cannot be a base URL", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send under a gate permit. The permit is returned with the response and
    /// must be held until the body has been read.
    async fn send(
        &self,
        request: RequestBuilder,
    ) -> Result<(Response, OwnedSemaphorePermit), IndexError> {
        let permit = self.gate.acquire().await.map_err(|err| match err {
            GateError::Exhausted(waited) => IndexError::PoolExhausted(waited),
            GateError::Closed => IndexError::unavailable(err),
        })?;
        let response = request.send().await.map_err(map_transport_error)?;
        Ok((response, permit))
    }

    async fn read_json<T: for<'de> Deserialize<'de>>(
        response: Response,
        _permit: OwnedSemaphorePermit,
    ) -> Result<T, IndexError> {
        let status = response.status();
        let bytes = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(IndexError::Rejected {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }
        serde_json::from_slice(&bytes).map_err(IndexError::decode)
    }
}

#[async_trait]
impl IndexClient for ElasticIndexClient {
    #[instrument(skip(self))]
    async fn count(&self, index: &str) -> Result<u64, IndexError> {
        let url = self.endpoint(&[index, "_count"])?;
        let (response, permit) = self.send(self.client.request(Method::GET, url)).await?;
        let body: CountResponse = Self::read_json(response, permit).await?;
        Ok(body.count)
    }

    #[instrument(skip(self))]
    async fn get_by_id(&self, index: &str, id: &str) -> Result<Value, IndexError> {
        let url = self.endpoint(&[index, "_doc", id])?;
        let (response, permit) = self.send(self.client.request(Method::GET, url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(IndexError::NotFound {
                index: index.to_string(),
                id: id.to_string(),
            });
        }

        let body: DocumentResponse = Self::read_json(response, permit).await?;
        match body {
            DocumentResponse {
                found: true,
                source: Some(source),
            } => Ok(source),
            _ => Err(IndexError::NotFound {
                index: index.to_string(),
                id: id.to_string(),
            }),
        }
    }

    #[instrument(skip(self, request), fields(offset = request.offset, limit = request.limit))]
    async fn search(
        &self,
        index: &str,
        request: &SearchRequest,
    ) -> Result<SearchHits, IndexError> {
        let mut url = self.endpoint(&[index, "_search"])?;
        url.query_pairs_mut()
            .append_pair("size", &request.limit.to_string())
            .append_pair("from", &request.offset.to_string())
            .append_pair("sort", &request.sort.as_param());

        let body = build_query_body(&request.search, &request.filter);
        let started = Instant::now();
        let (response, permit) = self
            .send(self.client.request(Method::POST, url).json(&body))
            .await?;
        let body: SearchResponse = Self::read_json(response, permit).await?;
        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            returned = body.hits.hits.len(),
            "search completed"
        );

        Ok(SearchHits {
            total: body.hits.total.value(),
            documents: body.hits.hits.into_iter().map(|hit| hit.source).collect(),
        })
    }

    async fn ping(&self) -> bool {
        let request = self.client.request(Method::GET, self.base.clone());
        match self.send(request).await {
            Ok((response, _permit)) => response.status().is_success(),
            Err(err) => {
                debug!(error = %err, "search index ping failed");
                false
            }
        }
    }
}

/// Query body for a search: `match_all` without criteria, otherwise a bool
/// query with a `match` clause per search pair and a `fuzzy` filter per
/// filter pair.
pub fn build_query_body(search: &Criteria, filter: &Criteria) -> Value {
    if search.is_empty() && filter.is_empty() {
        return json!({ "query": { "match_all": {} } });
    }

    let mut clauses = Map::new();
    if !search.is_empty() {
        clauses.insert("must".to_string(), clause_list("match", search));
    }
    if !filter.is_empty() {
        clauses.insert("filter".to_string(), clause_list("fuzzy", filter));
    }
    json!({ "query": { "bool": clauses } })
}

fn clause_list(kind: &str, criteria: &Criteria) -> Value {
    Value::Array(
        criteria
            .pairs()
            .iter()
            .map(|pair| json!({ kind: { pair.field.as_str(): pair.value.as_str() } }))
            .collect(),
    )
}

fn map_transport_error(err: reqwest::Error) -> IndexError {
    if err.is_timeout() {
        IndexError::Timeout
    } else {
        IndexError::unavailable(err)
    }
}

#[derive(Debug, Deserialize)]
struct CountResponse {
    count: u64,
}

#[derive(Debug, Deserialize)]
struct DocumentResponse {
    #[serde(default)]
    found: bool,
    #[serde(rename = "_source")]
    source: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    total: TotalHits,
    #[serde(default)]
    hits: Vec<Hit>,
}

/// Clusters before 7.0 report the total as a bare number.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TotalHits {
    Object { value: u64 },
    Bare(u64),
}

impl TotalHits {
    fn value(&self) -> u64 {
        match self {
            TotalHits::Object { value } | TotalHits::Bare(value) => *value,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_source")]
    source: Value,
}
