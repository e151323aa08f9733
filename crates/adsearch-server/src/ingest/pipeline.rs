//! The CSV ingestion pipeline.
//!
//! One producer reads and parses the source row by row, groups records into
//! fixed-size batches and pushes them onto a bounded queue; a fixed pool of
//! workers pulls batches and hands them to the sink. The queue push is the
//! only operation that may block for long, which gives natural backpressure
//! when writers fall behind. Batches may commit in any relative order across
//! workers; within a batch, source row order is preserved into the insert.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::compat::TokioAsyncReadCompatExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use adsearch_common::Advertisement;

use super::parser::{parse_row, ParseError};
use super::sink::{BatchSink, WriteError};
use crate::config::IngestConfig;

/// What a worker does with a failed batch write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Log the failure, drop the batch, keep ingesting. One bad batch never
    /// aborts the rest of the file.
    #[default]
    BestEffort,
    /// Stop dispatching on the first failed batch and surface its error.
    FailFast,
}

impl std::str::FromStr for FailurePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "best-effort" | "best_effort" => Ok(FailurePolicy::BestEffort),
            "fail-fast" | "fail_fast" => Ok(FailurePolicy::FailFast),
            _ => Err(anyhow::anyhow!("Invalid failure policy: {}", s)),
        }
    }
}

/// Errors that abort an ingestion run.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("batch size must be greater than 0")]
    InvalidBatchSize,
    #[error("failed to open source file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read CSV row: {0}")]
    Csv(#[from] csv_async::Error),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Write(#[from] WriteError),
    #[error("ingestion cancelled")]
    Cancelled,
}

/// What an ingestion run did.
///
/// With [`FailurePolicy::BestEffort`] a run can finish Ok with
/// `batches_failed > 0`; those rows were dropped after logging.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct IngestReport {
    pub rows_read: u64,
    pub batches_submitted: u64,
    pub batches_failed: u64,
}

/// Streams an advertisement CSV into a [`BatchSink`].
pub struct CsvIngestor<S> {
    sink: Arc<S>,
    config: IngestConfig,
}

impl<S: BatchSink + 'static> CsvIngestor<S> {
    pub fn new(sink: S, config: IngestConfig) -> Self {
        Self {
            sink: Arc::new(sink),
            config,
        }
    }

    /// Concurrent ingestion with a fixed worker pool.
    ///
    /// Reads the source once (header row discarded), parses rows, dispatches
    /// full batches onto the bounded queue and flushes the trailing partial
    /// batch at end of file. Returns only after every worker has drained.
    /// Parse errors abort immediately; write failures follow the configured
    /// [`FailurePolicy`].
    pub async fn ingest_file(&self, path: impl AsRef<Path>) -> Result<IngestReport, IngestError> {
        self.ingest_file_with_cancel(path, CancellationToken::new())
            .await
    }

    /// Like [`ingest_file`](Self::ingest_file), but checks `cancel` between
    /// batch dispatches so a long run can be aborted cleanly mid-file.
    pub async fn ingest_file_with_cancel(
        &self,
        path: impl AsRef<Path>,
        cancel: CancellationToken,
    ) -> Result<IngestReport, IngestError> {
        let batch_size = self.config.batch_size;
        if batch_size == 0 {
            return Err(IngestError::InvalidBatchSize);
        }

        let path = path.as_ref();
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|source| IngestError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        let (tx, rx) = mpsc::channel::<Vec<Advertisement>>(self.config.queue_depth);
        let rx = Arc::new(Mutex::new(rx));
        let batches_failed = Arc::new(AtomicU64::new(0));
        let first_write_error: Arc<Mutex<Option<WriteError>>> = Arc::new(Mutex::new(None));

        let mut workers = JoinSet::new();
        for worker_id in 0..self.config.workers {
            let rx = Arc::clone(&rx);
            let sink = Arc::clone(&self.sink);
            let batches_failed = Arc::clone(&batches_failed);
            let first_write_error = Arc::clone(&first_write_error);
            let cancel = cancel.clone();
            let policy = self.config.failure_policy;

            workers.spawn(async move {
                loop {
                    // A fail-fast stop must also stop the other workers, or
                    // they would drain and write every already-queued batch.
                    if cancel.is_cancelled() {
                        break;
                    }
                    // Exactly one worker receives each batch; the lock is
                    // released before the write so batches persist in parallel.
                    let batch = {
                        let mut rx = rx.lock().await;
                        rx.recv().await
                    };
                    let Some(batch) = batch else { break };

                    if let Err(err) = sink.write_batch(&batch).await {
                        batches_failed.fetch_add(1, Ordering::Relaxed);
                        match policy {
                            FailurePolicy::BestEffort => {
                                error!(
                                    worker_id,
                                    rows = batch.len(),
                                    error = %err,
                                    "batch write failed, dropping batch"
                                );
                            }
                            FailurePolicy::FailFast => {
                                first_write_error.lock().await.get_or_insert(err);
                                cancel.cancel();
                                break;
                            }
                        }
                    } else {
                        debug!(worker_id, rows = batch.len(), "batch persisted");
                    }
                }
            });
        }

        let mut reader = csv_async::AsyncReaderBuilder::new()
            .has_headers(true)
            .create_reader(file.compat());
        let mut records = reader.records();

        let mut buffer: Vec<Advertisement> = Vec::with_capacity(batch_size);
        let mut rows_read = 0u64;
        let mut batches_submitted = 0u64;
        let mut aborted: Option<IngestError> = None;

        while let Some(record) = records.next().await {
            let record = match record {
                Ok(record) => record,
                Err(err) => {
                    aborted = Some(err.into());
                    break;
                }
            };
            let ad = match parse_row(&record) {
                Ok(ad) => ad,
                Err(err) => {
                    aborted = Some(err.into());
                    break;
                }
            };

            buffer.push(ad);
            rows_read += 1;

            if buffer.len() >= batch_size {
                // The batch is moved into the queue; from here exactly one
                // worker owns it until the write completes. The send races
                // cancellation so a fail-fast stop cannot leave the producer
                // blocked on a full queue after every worker has exited.
                let batch = std::mem::replace(&mut buffer, Vec::with_capacity(batch_size));
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        aborted = Some(IngestError::Cancelled);
                        break;
                    }
                    sent = tx.send(batch) => {
                        if sent.is_err() {
                            break;
                        }
                        batches_submitted += 1;
                    }
                }
            }
        }

        // Trailing partial batch.
        if aborted.is_none() && !buffer.is_empty() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    aborted = Some(IngestError::Cancelled);
                }
                sent = tx.send(buffer) => {
                    if sent.is_ok() {
                        batches_submitted += 1;
                    }
                }
            }
        }

        // Close the queue and wait for every worker to drain and exit.
        drop(tx);
        while let Some(joined) = workers.join_next().await {
            if let Err(err) = joined {
                error!(error = %err, "ingestion worker panicked");
            }
        }

        if let Some(err) = first_write_error.lock().await.take() {
            return Err(err.into());
        }
        if let Some(err) = aborted {
            return Err(err);
        }

        let report = IngestReport {
            rows_read,
            batches_submitted,
            batches_failed: batches_failed.load(Ordering::Relaxed),
        };
        info!(
            rows = report.rows_read,
            batches = report.batches_submitted,
            failed = report.batches_failed,
            "ingestion finished"
        );
        Ok(report)
    }

    /// Sequential ingestion: same read/parse/batch loop, writes inline, and
    /// the first failed write aborts the run.
    pub async fn ingest_file_serial(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<IngestReport, IngestError> {
        let batch_size = self.config.batch_size;
        if batch_size == 0 {
            return Err(IngestError::InvalidBatchSize);
        }

        let path = path.as_ref();
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|source| IngestError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        let mut reader = csv_async::AsyncReaderBuilder::new()
            .has_headers(true)
            .create_reader(file.compat());
        let mut records = reader.records();

        let mut buffer: Vec<Advertisement> = Vec::with_capacity(batch_size);
        let mut report = IngestReport::default();

        while let Some(record) = records.next().await {
            let ad = parse_row(&record?)?;
            buffer.push(ad);
            report.rows_read += 1;

            if buffer.len() >= batch_size {
                self.sink.write_batch(&buffer).await?;
                report.batches_submitted += 1;
                buffer.clear();
            }
        }

        if !buffer.is_empty() {
            self.sink.write_batch(&buffer).await?;
            report.batches_submitted += 1;
        }

        info!(
            rows = report.rows_read,
            batches = report.batches_submitted,
            "serial ingestion finished"
        );
        Ok(report)
    }
}
