//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service, and how the
//! hard-fault variants leave the service as a `{status, detail}` body.

use crate::config::ConfigError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use lesson_deck_core::ports::PortError;
use serde::Serialize;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A request the caller has to fix before retrying.
    #[error("{0}")]
    Validation(String),

    /// A lookup that the operation reports as a hard not-found.
    #[error("{0}")]
    NotFound(String),
}

/// Body of every non-2xx response.
#[derive(Debug, Serialize)]
pub struct FaultBody {
    pub status: u16,
    pub detail: String,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Port(PortError::Validation(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::NotFound(_) | ApiError::Port(PortError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Port(PortError::Conflict(_)) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> String {
        match self {
            ApiError::Port(PortError::NotFound(msg))
            | ApiError::Port(PortError::Validation(msg))
            | ApiError::Port(PortError::Conflict(msg))
            | ApiError::Validation(msg)
            | ApiError::NotFound(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = FaultBody {
            status: status.as_u16(),
            detail: self.detail(),
        };
        (status, Json(body)).into_response()
    }
}
