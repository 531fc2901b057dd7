use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::application::pagination::ListPage;
use crate::application::query::{ExcludeFields, PaginatedQueryService, Projected};
use crate::domain::entities::{FilmRecord, GenreRecord, PersonRecord};

use super::error::ApiError;
use super::params::{ListRequest, RawQuery, exclude_csv, parse_list, parse_search};
use super::state::CatalogState;

type ListResponse<R> = Result<Json<ListPage<R>>, ApiError>;
type DetailResponse<R> = Result<Json<Projected<R>>, ApiError>;

/// -------- Films --------
pub async fn list_films(
    State(state): State<CatalogState>,
    Query(raw): Query<RawQuery>,
) -> ListResponse<FilmRecord> {
    let request = parse_list(state.films.adapter(), &raw)?;
    list_page(&state.films, request).await
}

pub async fn search_films(
    State(state): State<CatalogState>,
    Query(raw): Query<RawQuery>,
) -> ListResponse<FilmRecord> {
    let request = parse_search(state.films.adapter(), &raw)?;
    list_page(&state.films, request).await
}

pub async fn get_film(
    State(state): State<CatalogState>,
    Path(id): Path<String>,
    Query(raw): Query<RawQuery>,
) -> DetailResponse<FilmRecord> {
    detail(&state.films, &id, &raw).await
}

/// -------- Genres --------
pub async fn list_genres(
    State(state): State<CatalogState>,
    Query(raw): Query<RawQuery>,
) -> ListResponse<GenreRecord> {
    let request = parse_list(state.genres.adapter(), &raw)?;
    list_page(&state.genres, request).await
}

pub async fn search_genres(
    State(state): State<CatalogState>,
    Query(raw): Query<RawQuery>,
) -> ListResponse<GenreRecord> {
    let request = parse_search(state.genres.adapter(), &raw)?;
    list_page(&state.genres, request).await
}

pub async fn get_genre(
    State(state): State<CatalogState>,
    Path(id): Path<String>,
    Query(raw): Query<RawQuery>,
) -> DetailResponse<GenreRecord> {
    detail(&state.genres, &id, &raw).await
}

/// -------- Persons --------
pub async fn list_persons(
    State(state): State<CatalogState>,
    Query(raw): Query<RawQuery>,
) -> ListResponse<PersonRecord> {
    let request = parse_list(state.persons.adapter(), &raw)?;
    list_page(&state.persons, request).await
}

pub async fn search_persons(
    State(state): State<CatalogState>,
    Query(raw): Query<RawQuery>,
) -> ListResponse<PersonRecord> {
    let request = parse_search(state.persons.adapter(), &raw)?;
    list_page(&state.persons, request).await
}

pub async fn get_person(
    State(state): State<CatalogState>,
    Path(id): Path<String>,
    Query(raw): Query<RawQuery>,
) -> DetailResponse<PersonRecord> {
    detail(&state.persons, &id, &raw).await
}

async fn list_page<R>(service: &PaginatedQueryService<R>, request: ListRequest) -> ListResponse<R>
where
    R: Serialize + DeserializeOwned + Send + Sync,
{
    let result = service
        .get_multi(
            &request.params,
            request.search.as_ref(),
            request.filter.as_ref(),
        )
        .await?;
    Ok(Json(ListPage::from_result(&request.params, result)))
}

async fn detail<R>(
    service: &PaginatedQueryService<R>,
    id: &str,
    raw: &RawQuery,
) -> DetailResponse<R>
where
    R: Serialize + DeserializeOwned + Send + Sync,
{
    let exclude = exclude_csv(raw)
        .map(ExcludeFields::from_csv)
        .unwrap_or_default();
    let record = service.get(id, &exclude).await?;
    Ok(Json(record))
}
