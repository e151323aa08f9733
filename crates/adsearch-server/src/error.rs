//! Server-side error type and its HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::api::response::ErrorResponse;
use crate::db::StoreError;
use crate::ingest::IngestError;
use crate::search::{MigrationError, SearchError};

/// Anything a handler can fail with.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error(transparent)]
    Migration(#[from] MigrationError),
}

impl AppError {
    fn classify(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Ingest(err) => classify_ingest(err),
            AppError::Store(err) => classify_store(err),
            AppError::Search(err) => classify_search(err),
            AppError::Migration(MigrationError::Store(err)) => classify_store(err),
            AppError::Migration(MigrationError::Search(err)) => classify_search(err),
        }
    }
}

fn classify_ingest(err: &IngestError) -> (StatusCode, &'static str) {
    match err {
        IngestError::InvalidBatchSize => (StatusCode::BAD_REQUEST, "INVALID_BATCH_SIZE"),
        IngestError::Open { .. } => (StatusCode::BAD_REQUEST, "SOURCE_NOT_FOUND"),
        IngestError::Csv(_) => (StatusCode::UNPROCESSABLE_ENTITY, "MALFORMED_SOURCE"),
        IngestError::Parse(_) => (StatusCode::UNPROCESSABLE_ENTITY, "PARSE_ERROR"),
        IngestError::Write(_) => (StatusCode::INTERNAL_SERVER_ERROR, "WRITE_FAILED"),
        IngestError::Cancelled => (StatusCode::INTERNAL_SERVER_ERROR, "CANCELLED"),
    }
}

fn classify_store(err: &StoreError) -> (StatusCode, &'static str) {
    match err {
        StoreError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        StoreError::Unavailable(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORE_UNAVAILABLE"),
    }
}

fn classify_search(err: &SearchError) -> (StatusCode, &'static str) {
    match err {
        SearchError::Transport(_) | SearchError::Rejected { .. } => {
            (StatusCode::BAD_GATEWAY, "SEARCH_STORE_ERROR")
        }
        SearchError::BulkPartialFailure { .. } => {
            (StatusCode::BAD_GATEWAY, "BULK_PARTIAL_FAILURE")
        }
        SearchError::InvalidUrl(_) | SearchError::Serialize(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "SEARCH_CLIENT_ERROR")
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.classify();
        if status.is_server_error() {
            tracing::error!(error = %self, code, "request failed");
        }
        (status, Json(ErrorResponse::new(code, self.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let err = AppError::Store(StoreError::NotFound(42));
        assert_eq!(err.classify().0, StatusCode::NOT_FOUND);
    }

    #[test]
    fn invalid_batch_size_maps_to_400() {
        let err = AppError::Ingest(IngestError::InvalidBatchSize);
        assert_eq!(err.classify().0, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn migration_inherits_inner_classification() {
        let err = AppError::Migration(MigrationError::Store(StoreError::NotFound(1)));
        assert_eq!(err.classify(), (StatusCode::NOT_FOUND, "NOT_FOUND"));
    }
}
