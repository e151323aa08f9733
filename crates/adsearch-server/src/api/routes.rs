//! HTTP handlers for ingestion, search and reindexing.

use std::path::PathBuf;

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;

use adsearch_common::{Advertisement, SearchDocument, SearchFilters};

use crate::config::Config;
use crate::db::AdvertisementRepository;
use crate::error::AppError;
use crate::ingest::{CsvIngestor, DbSink, IngestReport};
use crate::search::{query, MigrationReport, Migrator, PgCheckpointStore, SearchClient};

use super::response::ApiResponse;

/// State shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub search: SearchClient,
    pub config: Config,
}

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/search", get(search_advertisements))
        .route("/advertisements", post(create_advertisement))
        .route("/ingest/csv", post(ingest_csv))
        .route("/reindex", post(reindex_all))
        .route("/reindex/:id", post(reindex_one))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestMode {
    #[default]
    Concurrent,
    Serial,
}

#[derive(Debug, Deserialize)]
pub struct IngestCsvRequest {
    /// Server-local path of the CSV source.
    pub path: PathBuf,
    /// Overrides the configured batch size when present.
    pub batch_size: Option<usize>,
    #[serde(default)]
    pub mode: IngestMode,
}

#[tracing::instrument(skip(state, request), fields(path = %request.path.display(), mode = ?request.mode))]
async fn ingest_csv(
    State(state): State<AppState>,
    Json(request): Json<IngestCsvRequest>,
) -> Result<ApiResponse<IngestReport>, AppError> {
    let mut ingest_config = state.config.ingest.clone();
    if let Some(batch_size) = request.batch_size {
        ingest_config.batch_size = batch_size;
    }

    let ingestor = CsvIngestor::new(DbSink::new(state.db.clone()), ingest_config);
    let report = match request.mode {
        IngestMode::Concurrent => ingestor.ingest_file(&request.path).await?,
        IngestMode::Serial => ingestor.ingest_file_serial(&request.path).await?,
    };

    Ok(ApiResponse::success(report))
}

/// Write one advertisement to both stores: the relational record of truth
/// first, then the search document keyed by the same id.
#[tracing::instrument(skip(state, ad), fields(id = ad.id))]
async fn create_advertisement(
    State(state): State<AppState>,
    Json(ad): Json<Advertisement>,
) -> Result<ApiResponse<serde_json::Value>, AppError> {
    AdvertisementRepository::new(state.db.clone()).save(&ad).await?;
    state
        .search
        .index_document(ad.id, &SearchDocument::from(&ad))
        .await?;
    Ok(ApiResponse::success(json!({ "id": ad.id, "created": true })))
}

#[tracing::instrument(skip(state, filters), fields(brand = ?filters.brand, category = ?filters.category))]
async fn search_advertisements(
    State(state): State<AppState>,
    Query(filters): Query<SearchFilters>,
) -> Result<ApiResponse<Vec<SearchDocument>>, AppError> {
    let hits = query::search(&state.search, &filters).await?;
    tracing::debug!(count = hits.len(), "search completed");
    Ok(ApiResponse::success(hits))
}

#[tracing::instrument(skip(state))]
async fn reindex_all(
    State(state): State<AppState>,
) -> Result<ApiResponse<MigrationReport>, AppError> {
    let migrator = Migrator::new(
        AdvertisementRepository::new(state.db.clone()),
        state.search.clone(),
        state.config.search.migration_page_size,
    )
    .with_checkpoints(PgCheckpointStore::new(state.db.clone()));

    let report = migrator.run_full().await?;
    Ok(ApiResponse::success(report))
}

#[tracing::instrument(skip(state))]
async fn reindex_one(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<ApiResponse<serde_json::Value>, AppError> {
    let migrator = Migrator::new(
        AdvertisementRepository::new(state.db.clone()),
        state.search.clone(),
        state.config.search.migration_page_size,
    );

    migrator.run_single(id).await?;
    Ok(ApiResponse::success(json!({ "id": id, "indexed": true })))
}
