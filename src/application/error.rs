use std::error::Error as StdError;

use axum::{http::StatusCode, response::Response};
use thiserror::Error;

use crate::{application::repos::IndexError, config::LoadError, infra::error::InfraError};

/// Diagnostic detail attached to error responses for the logging middleware.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// Failures of a catalog read.
///
/// Cache failures never appear here: they are absorbed as misses.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Object with identifier {id} not found")]
    EntityNotFound { id: String },
    #[error("catalog query failed")]
    QueryFailed(#[source] IndexError),
    #[error("search index connection pool exhausted")]
    ResourcePoolExhausted(#[source] IndexError),
    #[error("search index request timed out")]
    Timeout,
}

impl QueryError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::EntityNotFound { id: id.into() }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            QueryError::EntityNotFound { .. } => StatusCode::NOT_FOUND,
            QueryError::QueryFailed(_) => StatusCode::BAD_GATEWAY,
            QueryError::ResourcePoolExhausted(_) => StatusCode::SERVICE_UNAVAILABLE,
            QueryError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl From<IndexError> for QueryError {
    fn from(error: IndexError) -> Self {
        match error {
            IndexError::NotFound { id, .. } => QueryError::EntityNotFound { id },
            IndexError::Timeout => QueryError::Timeout,
            err @ IndexError::PoolExhausted(_) => QueryError::ResourcePoolExhausted(err),
            err => QueryError::QueryFailed(err),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}
