//! Reindexing the relational corpus into the search store.
//!
//! A full run pages through the store in id order and bulk-indexes each page;
//! indexing is idempotent, so replaying pages is safe. An optional checkpoint
//! row persists the next offset after every indexed page, letting an aborted
//! run resume where it stopped instead of starting over at offset 0.

use adsearch_common::SearchDocument;
use async_trait::async_trait;
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;

use super::client::{SearchClient, SearchError};
use super::indexer;
use crate::db::{AdvertisementSource, StoreError};

/// Name under which the full-reindex cursor is stored.
const CHECKPOINT_JOB: &str = "search_reindex";

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Search(#[from] SearchError),
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct MigrationReport {
    pub pages: u64,
    pub documents: u64,
    /// Offset the run started from; non-zero when resumed from a checkpoint.
    pub resumed_from: i64,
}

/// Persisted migration cursor.
///
/// `load` yields the offset of the first unindexed page, or `None` when no
/// run is in flight; `save` moves the cursor after a page has been indexed;
/// `clear` removes it once a run completes.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn load(&self) -> Result<Option<i64>, StoreError>;
    async fn save(&self, next_offset: i64) -> Result<(), StoreError>;
    async fn clear(&self) -> Result<(), StoreError>;
}

#[async_trait]
impl<C: CheckpointStore + ?Sized> CheckpointStore for std::sync::Arc<C> {
    async fn load(&self) -> Result<Option<i64>, StoreError> {
        (**self).load().await
    }

    async fn save(&self, next_offset: i64) -> Result<(), StoreError> {
        (**self).save(next_offset).await
    }

    async fn clear(&self) -> Result<(), StoreError> {
        (**self).clear().await
    }
}

/// Production cursor: one row per job in the relational store.
#[derive(Clone)]
pub struct PgCheckpointStore {
    pool: PgPool,
}

impl PgCheckpointStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CheckpointStore for PgCheckpointStore {
    async fn load(&self) -> Result<Option<i64>, StoreError> {
        let offset = sqlx::query_scalar::<_, i64>(
            "SELECT next_offset FROM search_migration_checkpoints WHERE job = $1",
        )
        .bind(CHECKPOINT_JOB)
        .fetch_optional(&self.pool)
        .await?;
        Ok(offset)
    }

    async fn save(&self, next_offset: i64) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO search_migration_checkpoints (job, next_offset) VALUES ($1, $2) \
             ON CONFLICT (job) DO UPDATE SET next_offset = EXCLUDED.next_offset, updated_at = now()",
        )
        .bind(CHECKPOINT_JOB)
        .bind(next_offset)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM search_migration_checkpoints WHERE job = $1")
            .bind(CHECKPOINT_JOB)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Drives page loading and bulk indexing until the source is exhausted.
pub struct Migrator<S> {
    source: S,
    client: SearchClient,
    page_size: i64,
    checkpoints: Option<Box<dyn CheckpointStore>>,
}

impl<S: AdvertisementSource> Migrator<S> {
    pub fn new(source: S, client: SearchClient, page_size: i64) -> Self {
        Self {
            source,
            client,
            page_size,
            checkpoints: None,
        }
    }

    /// Persist the cursor between pages so a failed run can resume.
    pub fn with_checkpoints(mut self, checkpoints: impl CheckpointStore + 'static) -> Self {
        self.checkpoints = Some(Box::new(checkpoints));
        self
    }

    /// Reindex the whole corpus.
    ///
    /// Terminates on an empty page, or after indexing a page shorter than the
    /// page size. Any store or search failure aborts the run; the checkpoint,
    /// when configured, keeps the offset of the first unindexed page. On
    /// success the checkpoint is cleared.
    pub async fn run_full(&self) -> Result<MigrationReport, MigrationError> {
        let limit = self.page_size;
        let mut offset = match &self.checkpoints {
            Some(checkpoints) => checkpoints.load().await?.unwrap_or(0),
            None => 0,
        };

        let mut report = MigrationReport {
            resumed_from: offset,
            ..MigrationReport::default()
        };
        if offset > 0 {
            info!(offset, "resuming reindex from checkpoint");
        }

        loop {
            let page = self.source.get_page(limit, offset).await?;
            if page.is_empty() {
                break;
            }

            let bulk = indexer::bulk_index(&self.client, &page).await?;
            report.pages += 1;
            report.documents += bulk.indexed as u64;
            info!(offset, rows = page.len(), "indexed page");

            offset += limit;
            if let Some(checkpoints) = &self.checkpoints {
                checkpoints.save(offset).await?;
            }

            if (page.len() as i64) < limit {
                break;
            }
        }

        if let Some(checkpoints) = &self.checkpoints {
            checkpoints.clear().await?;
        }

        info!(
            pages = report.pages,
            documents = report.documents,
            "reindex finished"
        );
        Ok(report)
    }

    /// Reindex one record without a full pass.
    pub async fn run_single(&self, id: i64) -> Result<(), MigrationError> {
        let ad = self.source.get_by_id(id).await?;
        self.client
            .index_document(ad.id, &SearchDocument::from(&ad))
            .await?;
        info!(id, "advertisement reindexed");
        Ok(())
    }
}
