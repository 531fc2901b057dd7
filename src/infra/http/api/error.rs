use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::error::{ErrorReport, QueryError};

use super::params::ParamError;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub detail: String,
}

pub mod codes {
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const NOT_FOUND: &str = "not_found";
    pub const INVALID_PARAMS: &str = "invalid_params";
    pub const QUERY_FAILED: &str = "query_failed";
    pub const POOL_EXHAUSTED: &str = "pool_exhausted";
    pub const TIMEOUT: &str = "timeout";
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    detail: String,
    chain: Vec<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, detail: impl Into<String>) -> Self {
        Self {
            status,
            code,
            detail: detail.into(),
            chain: Vec::new(),
        }
    }

    pub fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            codes::UNAUTHORIZED,
            "Not authenticated",
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        let status = err.status_code();
        let code = match &err {
            QueryError::EntityNotFound { .. } => codes::NOT_FOUND,
            QueryError::QueryFailed(_) => codes::QUERY_FAILED,
            QueryError::ResourcePoolExhausted(_) => codes::POOL_EXHAUSTED,
            QueryError::Timeout => codes::TIMEOUT,
        };
        let report = ErrorReport::from_error("infra::http::api", status, &err);
        Self {
            status,
            code,
            detail: err.to_string(),
            chain: report.messages,
        }
    }
}

impl From<ParamError> for ApiError {
    fn from(err: ParamError) -> Self {
        Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            codes::INVALID_PARAMS,
            err.to_string(),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            detail: self.detail.clone(),
        };
        let mut response = (self.status, Json(body)).into_response();
        let mut report = ErrorReport::from_message(
            "infra::http::api",
            self.status,
            format!("{}: {}", self.code, self.detail),
        );
        report.messages.extend(self.chain.into_iter().skip(1));
        report.attach(&mut response);
        response
    }
}
