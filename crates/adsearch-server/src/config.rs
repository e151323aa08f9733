//! Configuration management.
//!
//! The whole process configuration is built once at startup and handed by
//! reference into each component's constructor; nothing reads environment
//! variables after [`Config::load`] returns.

use serde::{Deserialize, Serialize};

use crate::ingest::FailurePolicy;

// ============================================================================
// Defaults
// ============================================================================

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 8080;

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/adsearch";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default search store endpoint.
pub const DEFAULT_SEARCH_URL: &str = "http://localhost:9200";

/// Default search index name.
pub const DEFAULT_SEARCH_INDEX: &str = "advertisements";

/// Default number of records per CSV insert batch.
pub const DEFAULT_INGEST_BATCH_SIZE: usize = 500;

/// Default number of concurrent batch writers.
pub const DEFAULT_INGEST_WORKERS: usize = 4;

/// Default depth of the batch hand-off queue. Independent of the batch size;
/// it only smooths producer/consumer rate mismatch.
pub const DEFAULT_INGEST_QUEUE_DEPTH: usize = 10;

/// Default number of records fetched per page during reindexing.
pub const DEFAULT_MIGRATION_PAGE_SIZE: i64 = 1000;

/// Process configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub search: SearchConfig,
    pub ingest: IngestConfig,
}

/// HTTP server binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Relational store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

/// Search store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub url: String,
    pub index: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub migration_page_size: i64,
}

/// CSV ingestion pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    pub batch_size: usize,
    pub workers: usize,
    pub queue_depth: usize,
    pub failure_policy: FailurePolicy,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_INGEST_BATCH_SIZE,
            workers: DEFAULT_INGEST_WORKERS,
            queue_depth: DEFAULT_INGEST_QUEUE_DEPTH,
            failure_policy: FailurePolicy::BestEffort,
        }
    }
}

impl Config {
    /// Load configuration from the environment and defaults.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            server: ServerConfig {
                host: std::env::var("ADSEARCH_HOST")
                    .unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
                port: std::env::var("ADSEARCH_PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_SERVER_PORT),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
                max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DATABASE_MAX_CONNECTIONS),
                connect_timeout_secs: std::env::var("DATABASE_CONNECT_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS),
            },
            search: SearchConfig {
                url: std::env::var("SEARCH_URL").unwrap_or_else(|_| DEFAULT_SEARCH_URL.to_string()),
                index: std::env::var("SEARCH_INDEX")
                    .unwrap_or_else(|_| DEFAULT_SEARCH_INDEX.to_string()),
                username: std::env::var("SEARCH_USERNAME").ok(),
                password: std::env::var("SEARCH_PASSWORD").ok(),
                migration_page_size: std::env::var("SEARCH_MIGRATION_PAGE_SIZE")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_MIGRATION_PAGE_SIZE),
            },
            ingest: IngestConfig {
                batch_size: std::env::var("INGEST_BATCH_SIZE")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_INGEST_BATCH_SIZE),
                workers: std::env::var("INGEST_WORKERS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_INGEST_WORKERS),
                queue_depth: std::env::var("INGEST_QUEUE_DEPTH")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_INGEST_QUEUE_DEPTH),
                failure_policy: std::env::var("INGEST_FAILURE_POLICY")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(FailurePolicy::BestEffort),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        if self.search.url.is_empty() {
            anyhow::bail!("Search URL cannot be empty");
        }

        if self.search.index.is_empty() {
            anyhow::bail!("Search index name cannot be empty");
        }

        if self.search.migration_page_size <= 0 {
            anyhow::bail!("Search migration page size must be greater than 0");
        }

        if self.ingest.batch_size == 0 {
            anyhow::bail!("Ingest batch size must be greater than 0");
        }

        if self.ingest.workers == 0 {
            anyhow::bail!("Ingest worker count must be greater than 0");
        }

        if self.ingest.queue_depth == 0 {
            anyhow::bail!("Ingest queue depth must be greater than 0");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            server: ServerConfig {
                host: DEFAULT_SERVER_HOST.to_string(),
                port: DEFAULT_SERVER_PORT,
            },
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
            },
            search: SearchConfig {
                url: DEFAULT_SEARCH_URL.to_string(),
                index: DEFAULT_SEARCH_INDEX.to_string(),
                username: None,
                password: None,
                migration_page_size: DEFAULT_MIGRATION_PAGE_SIZE,
            },
            ingest: IngestConfig::default(),
        }
    }

    #[test]
    fn default_config_validates() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let mut config = base_config();
        config.ingest.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_index_is_rejected() {
        let mut config = base_config();
        config.search.index = String::new();
        assert!(config.validate().is_err());
    }
}
