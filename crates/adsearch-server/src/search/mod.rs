//! Search store integration: HTTP client, bulk indexing, reindex migration
//! and the filter-to-query read path.

pub mod client;
pub mod indexer;
pub mod migration;
pub mod query;

pub use client::{SearchClient, SearchError};
pub use indexer::{bulk_index, bulk_payload, BulkReport};
pub use migration::{
    CheckpointStore, MigrationError, MigrationReport, Migrator, PgCheckpointStore,
};
