use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderValue, Request, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::error::ApiError;
use super::state::CatalogState;

pub async fn require_access(
    State(state): State<CatalogState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let token = extract_token(request.headers().get(header::AUTHORIZATION));
    if !state.access.allows(token.as_deref()) {
        return ApiError::unauthorized().into_response();
    }
    next.run(request).await
}

fn extract_token(header: Option<&HeaderValue>) -> Option<String> {
    let raw = header?.to_str().ok()?;
    let bearer = raw.strip_prefix("Bearer ")?;
    Some(bearer.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_bearer_token() {
        let value = HeaderValue::from_static("Bearer secret");
        assert_eq!(extract_token(Some(&value)).as_deref(), Some("secret"));
    }

    #[test]
    fn ignores_other_schemes() {
        let value = HeaderValue::from_static("Basic dXNlcjpwYXNz");
        assert_eq!(extract_token(Some(&value)), None);
        assert_eq!(extract_token(None), None);
    }
}
