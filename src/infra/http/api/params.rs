//! Query-string parsing for catalog endpoints.
//!
//! Bracketed keys (`page[number]`, `filter[genres.name]`) do not fit a flat
//! serde struct, so the raw pairs are walked in order. Unknown keys are
//! ignored; repeated filter keys are kept in request order.

use thiserror::Error;

use crate::application::catalog::EntityAdapter;
use crate::application::pagination::{
    DEFAULT_PAGE, DEFAULT_PAGE_SIZE, FieldMatch, FilterSpec, PaginationError, QueryParams,
    SearchSpec,
};

pub type RawQuery = Vec<(String, String)>;

const PAGE_NUMBER: &str = "page[number]";
const PAGE_SIZE: &str = "page[size]";
const SORT_BY: &str = "sort_by";
const DESCENDING: &str = "descending";
const SEARCH_TERM: &str = "query";
const EXCLUDE: &str = "exclude";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    #[error(transparent)]
    Pagination(#[from] PaginationError),
    #[error("`{name}` must be an integer (got `{value}`)")]
    NotAnInteger { name: &'static str, value: String },
    #[error("`descending` must be true or false (got `{0}`)")]
    NotABoolean(String),
    #[error("filtering on `{0}` is not supported")]
    UnknownFilter(String),
    #[error("`query` must not be empty")]
    MissingSearchTerm,
}

/// A validated list request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    pub params: QueryParams,
    pub search: Option<SearchSpec>,
    pub filter: Option<FilterSpec>,
}

pub fn parse_list(
    adapter: &EntityAdapter,
    raw: &[(String, String)],
) -> Result<ListRequest, ParamError> {
    let mut page = DEFAULT_PAGE;
    let mut page_size = DEFAULT_PAGE_SIZE;
    let mut sort_by = adapter.default_sort.to_string();
    let mut descending = adapter.default_order.is_descending();
    let mut filter = FilterSpec::new();

    for (key, value) in raw {
        match key.as_str() {
            PAGE_NUMBER => page = parse_integer(PAGE_NUMBER, value)?,
            PAGE_SIZE => page_size = parse_integer(PAGE_SIZE, value)?,
            SORT_BY => sort_by = value.trim().to_string(),
            DESCENDING => descending = parse_bool(value)?,
            other => {
                if let Some(field) = filter_field(other) {
                    if !adapter.accepts_filter(field) {
                        return Err(ParamError::UnknownFilter(field.to_string()));
                    }
                    filter.push(FieldMatch::new(field, value.as_str()));
                }
            }
        }
    }

    let params = QueryParams::new(page, page_size, sort_by, descending)?;
    Ok(ListRequest {
        params,
        search: None,
        filter: (!filter.is_empty()).then_some(filter),
    })
}

/// A list request plus a match on the adapter's search field.
pub fn parse_search(
    adapter: &EntityAdapter,
    raw: &[(String, String)],
) -> Result<ListRequest, ParamError> {
    let term = raw
        .iter()
        .find(|(key, _)| key == SEARCH_TERM)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
        .ok_or(ParamError::MissingSearchTerm)?;

    let mut request = parse_list(adapter, raw)?;
    request.search = Some(SearchSpec::single(adapter.search_field, term));
    Ok(request)
}

/// Comma-separated field names from `exclude`, if present.
pub fn exclude_csv(raw: &[(String, String)]) -> Option<&str> {
    raw.iter()
        .find(|(key, _)| key == EXCLUDE)
        .map(|(_, value)| value.as_str())
}

fn filter_field(key: &str) -> Option<&str> {
    key.strip_prefix("filter[")?
        .strip_suffix(']')
        .filter(|field| !field.is_empty())
}

fn parse_integer(name: &'static str, value: &str) -> Result<i64, ParamError> {
    value
        .trim()
        .parse()
        .map_err(|_| ParamError::NotAnInteger {
            name,
            value: value.to_string(),
        })
}

fn parse_bool(value: &str) -> Result<bool, ParamError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ParamError::NotABoolean(value.to_string())),
    }
}
