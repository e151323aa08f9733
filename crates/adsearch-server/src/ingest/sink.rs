//! Batch persistence into the relational store.

use adsearch_common::Advertisement;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use thiserror::Error;

/// A batch insert failed as a whole; no rows from the batch were committed.
#[derive(Debug, Error)]
#[error("batch insert failed: {0}")]
pub struct WriteError(#[from] pub sqlx::Error);

/// Destination for parsed advertisement batches.
///
/// The pipeline owns the batching and concurrency; a sink only has to persist
/// one non-empty, ordered batch per call, atomically. Whether a failed batch
/// is dropped or aborts the run is the caller's decision.
#[async_trait]
pub trait BatchSink: Send + Sync {
    async fn write_batch(&self, batch: &[Advertisement]) -> Result<(), WriteError>;
}

#[async_trait]
impl<S: BatchSink + ?Sized> BatchSink for std::sync::Arc<S> {
    async fn write_batch(&self, batch: &[Advertisement]) -> Result<(), WriteError> {
        (**self).write_batch(batch).await
    }
}

/// Production sink: one parameterized multi-row INSERT per batch.
#[derive(Clone)]
pub struct DbSink {
    pool: PgPool,
}

impl DbSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BatchSink for DbSink {
    /// Executes the whole batch as a single statement: either every row
    /// commits or none do. One round trip to the store per call.
    async fn write_batch(&self, batch: &[Advertisement]) -> Result<(), WriteError> {
        debug_assert!(!batch.is_empty(), "empty batches never reach the sink");

        let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO advertisements \
             (id, product_name, description, brand, category, price, currency, stock, ean, color, size, availability) ",
        );

        query_builder.push_values(batch, |mut b, ad| {
            b.push_bind(ad.id)
                .push_bind(&ad.name)
                .push_bind(&ad.description)
                .push_bind(&ad.brand)
                .push_bind(&ad.category)
                .push_bind(ad.price)
                .push_bind(&ad.currency)
                .push_bind(ad.stock)
                .push_bind(&ad.ean)
                .push_bind(&ad.color)
                .push_bind(&ad.size)
                .push_bind(&ad.availability);
        });

        query_builder.build().execute(&self.pool).await?;

        Ok(())
    }
}
