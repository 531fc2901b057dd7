#![allow(dead_code)]

use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use marquee::application::pagination::Criteria;
use marquee::application::repos::{
    CacheError, CacheStore, IndexClient, IndexError, SearchHits, SearchRequest,
};
use marquee::domain::types::SortOrder;
use serde_json::{Value, json};

type FailureFn = Box<dyn Fn() -> IndexError + Send + Sync>;

/// In-memory index that counts calls and evaluates searches over stored documents.
///
/// Search terms match case-insensitive substrings; filters match
/// case-insensitive equality. Dotted fields reach into arrays of objects.
#[derive(Default)]
pub struct FakeIndex {
    documents: Mutex<HashMap<String, Vec<Value>>>,
    failure: Mutex<Option<FailureFn>>,
    last_request: Mutex<Option<SearchRequest>>,
    delay: Mutex<Option<Duration>>,
    down: AtomicBool,
    pub count_calls: AtomicUsize,
    pub get_calls: AtomicUsize,
    pub search_calls: AtomicUsize,
}

impl FakeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_documents(self, index: &str, documents: Vec<Value>) -> Self {
        self.documents
            .lock()
            .expect("documents lock")
            .insert(index.to_string(), documents);
        self
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock().expect("delay lock") = Some(delay);
        self
    }

    pub fn fail_with(&self, failure: impl Fn() -> IndexError + Send + Sync + 'static) {
        *self.failure.lock().expect("failure lock") = Some(Box::new(failure));
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub fn last_request(&self) -> Option<SearchRequest> {
        self.last_request.lock().expect("request lock").clone()
    }

    pub fn searches(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn gets(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn counts(&self) -> usize {
        self.count_calls.load(Ordering::SeqCst)
    }

    fn check_failure(&self) -> Result<(), IndexError> {
        match self.failure.lock().expect("failure lock").as_ref() {
            Some(failure) => Err(failure()),
            None => Ok(()),
        }
    }

    async fn pause(&self) {
        let delay = *self.delay.lock().expect("delay lock");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn documents(&self, index: &str) -> Vec<Value> {
        self.documents
            .lock()
            .expect("documents lock")
            .get(index)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl IndexClient for FakeIndex {
    async fn count(&self, index: &str) -> Result<u64, IndexError> {
        self.count_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        Ok(self.documents(index).len() as u64)
    }

    async fn get_by_id(&self, index: &str, id: &str) -> Result<Value, IndexError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.check_failure()?;
        self.documents(index)
            .into_iter()
            .find(|doc| doc["id"] == id)
            .ok_or_else(|| IndexError::NotFound {
                index: index.to_string(),
                id: id.to_string(),
            })
    }

    async fn search(&self, index: &str, request: &SearchRequest) -> Result<SearchHits, IndexError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().expect("request lock") = Some(request.clone());
        self.pause().await;
        self.check_failure()?;

        let mut matched: Vec<Value> = self
            .documents(index)
            .into_iter()
            .filter(|doc| matches_all(doc, &request.search, contains_ci))
            .filter(|doc| matches_all(doc, &request.filter, equals_ci))
            .collect();
        let field = request.sort.field.as_str();
        matched.sort_by(|a, b| compare(&a[field], &b[field]));
        if request.sort.order == SortOrder::Desc {
            matched.reverse();
        }

        let total = matched.len() as u64;
        let documents = matched
            .into_iter()
            .skip(request.offset as usize)
            .take(request.limit as usize)
            .collect();
        Ok(SearchHits { documents, total })
    }

    async fn ping(&self) -> bool {
        !self.down.load(Ordering::SeqCst)
    }
}

fn matches_all(doc: &Value, criteria: &Criteria, test: fn(&str, &str) -> bool) -> bool {
    criteria
        .pairs()
        .iter()
        .all(|pair| field_values(doc, &pair.field).iter().any(|v| test(v, &pair.value)))
}

fn field_values(doc: &Value, path: &str) -> Vec<String> {
    let mut current = vec![doc.clone()];
    for segment in path.split('.') {
        current = current
            .into_iter()
            .flat_map(|value| match value {
                Value::Array(items) => items
                    .into_iter()
                    .map(|item| item[segment].clone())
                    .collect::<Vec<_>>(),
                other => vec![other[segment].clone()],
            })
            .collect();
    }
    current
        .into_iter()
        .flat_map(|value| match value {
            Value::Array(items) => items,
            other => vec![other],
        })
        .filter_map(|value| match value {
            Value::String(s) => Some(s),
            Value::Null => None,
            other => Some(other.to_string()),
        })
        .collect()
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn equals_ci(value: &str, expected: &str) -> bool {
    value.eq_ignore_ascii_case(expected)
}

fn compare(a: &Value, b: &Value) -> CmpOrdering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(CmpOrdering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Null, Value::Null) => CmpOrdering::Equal,
        (Value::Null, _) => CmpOrdering::Less,
        (_, Value::Null) => CmpOrdering::Greater,
        _ => CmpOrdering::Equal,
    }
}

/// Cache store whose every operation fails.
#[derive(Default)]
pub struct FailingCache {
    pub reads: AtomicUsize,
    pub writes: AtomicUsize,
}

#[async_trait]
impl CacheStore for FailingCache {
    async fn get_raw(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::unavailable("connection refused"))
    }

    async fn set_raw(&self, _key: &str, _value: &[u8], _ttl: Duration) -> Result<(), CacheError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::unavailable("connection refused"))
    }

    async fn ping(&self) -> bool {
        false
    }
}

pub const GENRE_A: &str = "0b7e9d1c-8f1a-4c55-9a8e-1f0a00000001";
pub const GENRE_B: &str = "0b7e9d1c-8f1a-4c55-9a8e-1f0a00000002";
pub const GENRE_C: &str = "0b7e9d1c-8f1a-4c55-9a8e-1f0a00000003";
pub const FILM_STAR: &str = "3d825f60-9fff-4dfe-b294-1a45fa1e115d";
pub const FILM_DUNE: &str = "a2b3c4d5-0000-4000-8000-000000000002";
pub const PERSON_FORD: &str = "5b4bf1bc-3397-4e83-9b17-8b10c6544ed1";

pub fn genre_documents() -> Vec<Value> {
    vec![
        json!({"id": GENRE_C, "name": "C", "description": "third"}),
        json!({"id": GENRE_A, "name": "A", "description": "first"}),
        json!({"id": GENRE_B, "name": "B", "description": "second"}),
    ]
}

pub fn film_documents() -> Vec<Value> {
    vec![
        json!({
            "id": FILM_STAR,
            "title": "Star Wars",
            "imdb_rating": 8.6,
            "description": "A long time ago",
            "genres": [{"id": GENRE_A, "name": "Sci-Fi"}],
            "directors": [],
            "actors": [{"id": PERSON_FORD, "name": "Harrison Ford"}],
            "writers": []
        }),
        json!({
            "id": FILM_DUNE,
            "title": "Dune",
            "imdb_rating": 8.0,
            "description": "Spice",
            "genres": [{"id": GENRE_B, "name": "Drama"}],
            "directors": [],
            "actors": [],
            "writers": []
        }),
    ]
}

pub fn person_documents() -> Vec<Value> {
    vec![json!({
        "id": PERSON_FORD,
        "name": "Harrison Ford",
        "roles": ["actor"],
        "film_ids": [FILM_STAR]
    })]
}

pub fn catalog_index() -> FakeIndex {
    FakeIndex::new()
        .with_documents("genres", genre_documents())
        .with_documents("movies", film_documents())
        .with_documents("persons", person_documents())
}
