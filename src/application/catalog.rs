//! Entity adapters: declarative bindings between a record type and its index.

use std::time::Duration;

use crate::application::pagination::{DEFAULT_PAGE, DEFAULT_PAGE_SIZE, PaginationError, QueryParams};
use crate::domain::types::SortOrder;

pub const DEFAULT_FILM_TTL: Duration = Duration::from_secs(600);
pub const DEFAULT_GENRE_TTL: Duration = Duration::from_secs(1200);
pub const DEFAULT_PERSON_TTL: Duration = Duration::from_secs(600);

/// Binds one entity type to its index, cache namespace, sort defaults, and TTL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityAdapter {
    /// Cache namespace, route segment, and metrics label.
    pub name: &'static str,
    pub index: &'static str,
    pub default_sort: &'static str,
    pub default_order: SortOrder,
    /// Field matched by the search endpoint's `query` term.
    pub search_field: &'static str,
    /// Fields accepted as `filter[<field>]` constraints.
    pub filter_fields: &'static [&'static str],
    pub ttl: Duration,
}

impl EntityAdapter {
    pub fn films() -> Self {
        Self {
            name: "films",
            index: "movies",
            default_sort: "imdb_rating",
            default_order: SortOrder::Desc,
            search_field: "title",
            filter_fields: &["genres.name", "directors.name", "actors.name", "writers.name"],
            ttl: DEFAULT_FILM_TTL,
        }
    }

    pub fn genres() -> Self {
        Self {
            name: "genres",
            index: "genres",
            default_sort: "id",
            default_order: SortOrder::Asc,
            search_field: "name",
            filter_fields: &["name"],
            ttl: DEFAULT_GENRE_TTL,
        }
    }

    pub fn persons() -> Self {
        Self {
            name: "persons",
            index: "persons",
            default_sort: "id",
            default_order: SortOrder::Asc,
            search_field: "name",
            filter_fields: &["roles"],
            ttl: DEFAULT_PERSON_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn accepts_filter(&self, field: &str) -> bool {
        self.filter_fields.contains(&field)
    }

    /// First page with this adapter's default size and sort.
    pub fn default_params(&self) -> Result<QueryParams, PaginationError> {
        QueryParams::new(
            DEFAULT_PAGE,
            DEFAULT_PAGE_SIZE,
            self.default_sort,
            self.default_order.is_descending(),
        )
    }
}
