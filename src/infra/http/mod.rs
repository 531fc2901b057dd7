pub mod api;
mod middleware;

pub use api::{CatalogState, build_api_router};
pub use middleware::RequestContext;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Router, middleware as axum_middleware, routing::get};
use serde::Serialize;

use crate::application::error::ErrorReport;

/// Full HTTP surface: catalog API, health probe, and the shared middleware.
pub fn build_router(state: CatalogState) -> Router {
    let probes = Router::new()
        .route("/api/health", get(health))
        .with_state(state.clone());

    build_api_router(state)
        .merge(probes)
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
}

#[derive(Debug, Serialize)]
struct HealthBody {
    index: &'static str,
    cache: &'static str,
}

async fn health(State(state): State<CatalogState>) -> Response {
    let index_up = state.index.ping().await;
    let cache = match state.cache.as_ref() {
        Some(cache) if cache.ping().await => "up",
        Some(_) => "down",
        None => "disabled",
    };
    let body = HealthBody {
        index: if index_up { "up" } else { "down" },
        cache,
    };

    if index_up {
        return (StatusCode::OK, Json(body)).into_response();
    }

    let mut response = (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response();
    ErrorReport::from_message(
        "infra::http::health",
        StatusCode::SERVICE_UNAVAILABLE,
        "search index unreachable",
    )
    .attach(&mut response);
    response
}
