pub mod error;
pub mod handlers;
pub mod middleware;
pub mod params;
pub mod state;

pub use state::CatalogState;

use axum::{Router, middleware as axum_middleware, routing::get};

pub fn build_api_router(state: CatalogState) -> Router {
    let access_state = state.clone();

    Router::new()
        .route("/api/v1/films", get(handlers::list_films))
        .route("/api/v1/films/search", get(handlers::search_films))
        .route("/api/v1/films/{id}", get(handlers::get_film))
        .route("/api/v1/genres", get(handlers::list_genres))
        .route("/api/v1/genres/search", get(handlers::search_genres))
        .route("/api/v1/genres/{id}", get(handlers::get_genre))
        .route("/api/v1/persons", get(handlers::list_persons))
        .route("/api/v1/persons/search", get(handlers::search_persons))
        .route("/api/v1/persons/{id}", get(handlers::get_person))
        .with_state(state)
        .layer(axum_middleware::from_fn_with_state(
            access_state,
            middleware::require_access,
        ))
}
