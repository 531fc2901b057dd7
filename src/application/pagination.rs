//! Offset pagination, sort, and search/filter criteria shared by every catalog.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::types::SortOrder;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 25;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Rejected pagination input. Surfaces as an unprocessable-entity response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginationError {
    #[error("page number must be at least 1 (got {0})")]
    PageNumber(i64),
    #[error("page size must be between 0 and {MAX_PAGE_SIZE} (got {0})")]
    PageSize(i64),
    #[error("sort field must not be empty")]
    EmptySortField,
}

/// Validated page/sort parameters for a list request.
///
/// A page size of zero means "no pagination": every matching document is
/// returned and the page number is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryParams {
    page: u32,
    page_size: u32,
    sort_by: String,
    order: SortOrder,
}

impl QueryParams {
    pub fn new(
        page: i64,
        page_size: i64,
        sort_by: impl Into<String>,
        descending: bool,
    ) -> Result<Self, PaginationError> {
        if page < 1 {
            return Err(PaginationError::PageNumber(page));
        }
        let page = u32::try_from(page).map_err(|_| PaginationError::PageNumber(page))?;

        if !(0..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(PaginationError::PageSize(page_size));
        }
        let page_size =
            u32::try_from(page_size).map_err(|_| PaginationError::PageSize(page_size))?;

        let sort_by = sort_by.into();
        if sort_by.trim().is_empty() {
            return Err(PaginationError::EmptySortField);
        }

        Ok(Self {
            page,
            page_size,
            sort_by,
            order: SortOrder::from_descending(descending),
        })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn sort_by(&self) -> &str {
        &self.sort_by
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    pub fn descending(&self) -> bool {
        self.order.is_descending()
    }

    pub fn is_unpaginated(&self) -> bool {
        self.page_size == 0
    }

    /// Document offset for this page. Always zero when the page size is zero.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }
}

/// One `(field, value)` constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldMatch {
    pub field: String,
    pub value: String,
}

impl FieldMatch {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Ordered list of field constraints. Order is significant for cache keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Criteria {
    pairs: Vec<FieldMatch>,
}

/// Full-text match pairs.
pub type SearchSpec = Criteria;
/// Fuzzy term filter pairs.
pub type FilterSpec = Criteria;

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            pairs: vec![FieldMatch::new(field, value)],
        }
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.pairs.push(FieldMatch::new(field, value));
        self
    }

    pub fn push(&mut self, pair: FieldMatch) {
        self.pairs.push(pair);
    }

    pub fn pairs(&self) -> &[FieldMatch] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }
}

impl FromIterator<FieldMatch> for Criteria {
    fn from_iter<I: IntoIterator<Item = FieldMatch>>(iter: I) -> Self {
        Self {
            pairs: iter.into_iter().collect(),
        }
    }
}

/// Records for one page plus the total number of matching documents.
///
/// This is also the cached payload for list keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedResult<R> {
    pub records: Vec<R>,
    pub total: u64,
}

impl<R> PaginatedResult<R> {
    pub fn new(records: Vec<R>, total: u64) -> Self {
        Self { records, total }
    }

    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
            total: 0,
        }
    }
}

/// List response echoing the request parameters.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPage<R> {
    pub page: u32,
    pub page_size: u32,
    pub total_count: u64,
    pub sort_by: String,
    pub descending: bool,
    pub data: Vec<R>,
}

impl<R> ListPage<R> {
    pub fn from_result(params: &QueryParams, result: PaginatedResult<R>) -> Self {
        Self {
            page: params.page(),
            page_size: params.page_size(),
            total_count: result.total,
            sort_by: params.sort_by().to_string(),
            descending: params.descending(),
            data: result.records,
        }
    }
}
