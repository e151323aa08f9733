//! Operational CLI: CSV ingestion and search reindexing without the server.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing::error;

use adsearch_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use adsearch_server::{
    config::Config,
    db::{self, AdvertisementRepository},
    ingest::{CsvIngestor, DbSink, FailurePolicy},
    search::{CheckpointStore, Migrator, PgCheckpointStore, SearchClient},
};

#[derive(Parser)]
#[command(name = "adsearch", about = "Advertisement search operations", version)]
struct Cli {
    /// Log debug output to the console
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load an advertisement CSV into the relational store
    IngestCsv {
        /// Path of the CSV source file
        path: PathBuf,

        /// Records per insert batch (defaults to the configured size)
        #[arg(long)]
        batch_size: Option<usize>,

        /// Write batches sequentially instead of with the worker pool
        #[arg(long)]
        serial: bool,

        /// Abort on the first failed batch instead of dropping it
        #[arg(long)]
        fail_fast: bool,
    },

    /// Reindex the whole relational corpus into the search store
    Reindex {
        /// Ignore any persisted checkpoint and start from offset 0
        #[arg(long)]
        fresh: bool,
    },

    /// Reindex a single advertisement by id
    ReindexOne {
        id: i64,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_config = LogConfig::builder()
        .level(if cli.verbose {
            LogLevel::Debug
        } else {
            LogLevel::Warn
        })
        .output(LogOutput::Console)
        .log_file_prefix("adsearch-cli".to_string())
        .build();
    let log_config = match LogConfig::from_env() {
        // LOG_* variables in the environment win over the flag defaults.
        Ok(config) if std::env::var("LOG_LEVEL").is_ok() => config,
        _ => log_config,
    };
    let _ = init_logging(&log_config);

    if let Err(err) = run(&cli).await {
        error!(error = %err, "command failed");
        eprintln!("Error: {err}");
        process::exit(1);
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = Config::load()?;

    match &cli.command {
        Commands::IngestCsv {
            path,
            batch_size,
            serial,
            fail_fast,
        } => {
            let pool = db::connect_pool(&config.database).await?;

            let mut ingest_config = config.ingest.clone();
            if let Some(batch_size) = batch_size {
                ingest_config.batch_size = *batch_size;
            }
            if *fail_fast {
                ingest_config.failure_policy = FailurePolicy::FailFast;
            }

            let ingestor = CsvIngestor::new(DbSink::new(pool), ingest_config);
            let report = if *serial {
                ingestor.ingest_file_serial(path).await?
            } else {
                ingestor.ingest_file(path).await?
            };

            println!(
                "Ingested {} rows in {} batches ({} failed)",
                report.rows_read, report.batches_submitted, report.batches_failed
            );
        }

        Commands::Reindex { fresh } => {
            let pool = db::connect_pool(&config.database).await?;
            let search = SearchClient::new(&config.search)?;
            search.ping().await?;

            let checkpoints = PgCheckpointStore::new(pool.clone());
            if *fresh {
                checkpoints.clear().await?;
            }

            let migrator = Migrator::new(
                AdvertisementRepository::new(pool),
                search,
                config.search.migration_page_size,
            )
            .with_checkpoints(checkpoints);

            let report = migrator.run_full().await?;
            if report.resumed_from > 0 {
                println!(
                    "Indexed {} documents in {} pages (resumed from offset {})",
                    report.documents, report.pages, report.resumed_from
                );
            } else {
                println!(
                    "Indexed {} documents in {} pages",
                    report.documents, report.pages
                );
            }
        }

        Commands::ReindexOne { id } => {
            let pool = db::connect_pool(&config.database).await?;
            let search = SearchClient::new(&config.search)?;
            search.ping().await?;

            let migrator = Migrator::new(
                AdvertisementRepository::new(pool),
                search,
                config.search.migration_page_size,
            );
            migrator.run_single(*id).await?;
            println!("Advertisement {id} reindexed");
        }
    }

    Ok(())
}
