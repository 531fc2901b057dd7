//! Catalog records mirrored from search-index documents.
//!
//! Every record is validated at the deserialization boundary: an `id` that is
//! not a UUID or a missing required field rejects the whole document.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::types::PersonRole;

/// Nested genre reference embedded in film documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreRef {
    pub id: Uuid,
    pub name: String,
}

/// Nested person reference embedded in film documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonRef {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilmRecord {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub imdb_rating: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub genres: Vec<GenreRef>,
    #[serde(default)]
    pub directors: Vec<PersonRef>,
    #[serde(default)]
    pub actors: Vec<PersonRef>,
    #[serde(default)]
    pub writers: Vec<PersonRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreRecord {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonRecord {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub roles: Vec<PersonRole>,
    #[serde(default)]
    pub film_ids: Vec<Uuid>,
}
