//! Advertisement repository: single-row writes and limit/offset page reads.

use adsearch_common::Advertisement;
use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;

const COLUMNS: &str = "id, product_name, description, brand, category, price, \
                       currency, stock, ean, color, size, availability";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("advertisement {0} not found")]
    NotFound(i64),
    #[error("relational store unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),
}

/// Read seam between the relational store and the reindexing loop.
///
/// `get_page` returning an empty page is the loop-termination signal for a
/// full reindex, never an error.
#[async_trait]
pub trait AdvertisementSource: Send + Sync {
    /// Up to `limit` records ordered by id ascending, starting after
    /// `offset` records. An offset beyond the end yields an empty page.
    async fn get_page(&self, limit: i64, offset: i64) -> Result<Vec<Advertisement>, StoreError>;

    /// Exactly one record, or [`StoreError::NotFound`].
    async fn get_by_id(&self, id: i64) -> Result<Advertisement, StoreError>;
}

#[derive(Clone)]
pub struct AdvertisementRepository {
    pool: PgPool,
}

impl AdvertisementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a single advertisement.
    pub async fn save(&self, ad: &Advertisement) -> Result<(), StoreError> {
        let sql = format!(
            "INSERT INTO advertisements ({COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"
        );
        sqlx::query(&sql)
            .bind(ad.id)
            .bind(&ad.name)
            .bind(&ad.description)
            .bind(&ad.brand)
            .bind(&ad.category)
            .bind(ad.price)
            .bind(&ad.currency)
            .bind(ad.stock)
            .bind(&ad.ean)
            .bind(&ad.color)
            .bind(&ad.size)
            .bind(&ad.availability)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl AdvertisementSource for AdvertisementRepository {
    async fn get_page(&self, limit: i64, offset: i64) -> Result<Vec<Advertisement>, StoreError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM advertisements ORDER BY id LIMIT $1 OFFSET $2"
        );
        let page = sqlx::query_as::<_, Advertisement>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(page)
    }

    async fn get_by_id(&self, id: i64) -> Result<Advertisement, StoreError> {
        let sql = format!("SELECT {COLUMNS} FROM advertisements WHERE id = $1");
        sqlx::query_as::<_, Advertisement>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound(id))
    }
}
