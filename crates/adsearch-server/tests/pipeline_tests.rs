//! Ingestion pipeline tests against an in-memory sink.

use std::collections::HashSet;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio_util::sync::CancellationToken;

use adsearch_common::Advertisement;
use adsearch_server::config::IngestConfig;
use adsearch_server::ingest::{
    BatchSink, CsvIngestor, FailurePolicy, IngestError, ParseError, WriteError,
};

const HEADER: &str = "id,name,description,brand,category,price,currency,stock,color,size,availability";

/// Write a CSV fixture with `rows` sequential valid data rows.
fn csv_fixture(rows: usize) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{HEADER}").unwrap();
    for id in 1..=rows {
        writeln!(
            file,
            "{id},Item {id},Desc,Acme,Misc,19.99,USD,5,Red,L,in_stock"
        )
        .unwrap();
    }
    file.flush().unwrap();
    file
}

fn injected_failure() -> WriteError {
    WriteError(sqlx::Error::Protocol("injected failure".into()))
}

/// Sink that records every batch and can be told to reject them all.
#[derive(Default)]
struct RecordingSink {
    batches: Mutex<Vec<Vec<i64>>>,
    fail_all: bool,
}

impl RecordingSink {
    fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    fn batch_sizes(&self) -> Vec<usize> {
        self.batches
            .lock()
            .unwrap()
            .iter()
            .map(|batch| batch.len())
            .collect()
    }
}

#[async_trait]
impl BatchSink for RecordingSink {
    async fn write_batch(&self, batch: &[Advertisement]) -> Result<(), WriteError> {
        self.batches
            .lock()
            .unwrap()
            .push(batch.iter().map(|ad| ad.id).collect());
        if self.fail_all {
            return Err(injected_failure());
        }
        Ok(())
    }
}

fn config(batch_size: usize, policy: FailurePolicy) -> IngestConfig {
    IngestConfig {
        batch_size,
        workers: 4,
        queue_depth: 10,
        failure_policy: policy,
    }
}

#[tokio::test]
async fn batch_count_is_ceil_of_rows_over_batch_size() {
    let sink = Arc::new(RecordingSink::default());
    let ingestor = CsvIngestor::new(Arc::clone(&sink), config(3, FailurePolicy::BestEffort));

    let file = csv_fixture(10);
    let report = ingestor.ingest_file(file.path()).await.unwrap();

    assert_eq!(report.rows_read, 10);
    assert_eq!(report.batches_submitted, 4);
    assert_eq!(report.batches_failed, 0);

    let sizes = sink.batch_sizes();
    assert_eq!(sizes.len(), 4);
    assert_eq!(sizes.iter().sum::<usize>(), 10);
    assert!(sizes.iter().all(|size| *size > 0), "empty batch submitted");
}

#[tokio::test]
async fn exact_multiple_produces_no_partial_batch() {
    let sink = Arc::new(RecordingSink::default());
    let ingestor = CsvIngestor::new(Arc::clone(&sink), config(3, FailurePolicy::BestEffort));

    let file = csv_fixture(6);
    let report = ingestor.ingest_file(file.path()).await.unwrap();

    assert_eq!(report.batches_submitted, 2);
    assert_eq!(sink.batch_sizes(), vec![3, 3]);
}

#[tokio::test]
async fn header_only_file_submits_nothing() {
    let sink = Arc::new(RecordingSink::default());
    let ingestor = CsvIngestor::new(Arc::clone(&sink), config(3, FailurePolicy::BestEffort));

    let file = csv_fixture(0);
    let report = ingestor.ingest_file(file.path()).await.unwrap();

    assert_eq!(report.rows_read, 0);
    assert_eq!(report.batches_submitted, 0);
    assert!(sink.batch_sizes().is_empty());
}

#[tokio::test]
async fn zero_batch_size_is_rejected_before_any_io() {
    let ingestor = CsvIngestor::new(
        RecordingSink::default(),
        config(0, FailurePolicy::BestEffort),
    );

    // The path does not exist; the batch-size check must fire first.
    let err = ingestor
        .ingest_file("/nonexistent/source.csv")
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::InvalidBatchSize));
}

#[tokio::test]
async fn parse_error_aborts_the_run() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{HEADER}").unwrap();
    writeln!(file, "1,Item 1,Desc,Acme,Misc,19.99,USD,5,Red,L,in_stock").unwrap();
    writeln!(file, "2,Item 2,Desc,Acme,Misc,cheap,USD,5,Red,L,in_stock").unwrap();
    file.flush().unwrap();

    let ingestor = CsvIngestor::new(
        RecordingSink::default(),
        config(10, FailurePolicy::BestEffort),
    );
    let err = ingestor.ingest_file(file.path()).await.unwrap_err();
    assert!(matches!(
        err,
        IngestError::Parse(ParseError::InvalidPrice(_))
    ));
}

#[tokio::test]
async fn best_effort_swallows_write_failures() {
    let sink = Arc::new(RecordingSink::failing());
    let ingestor = CsvIngestor::new(Arc::clone(&sink), config(2, FailurePolicy::BestEffort));

    let file = csv_fixture(5);
    let report = ingestor.ingest_file(file.path()).await.unwrap();

    assert_eq!(report.batches_submitted, 3);
    assert_eq!(report.batches_failed, 3);
}

#[tokio::test]
async fn fail_fast_surfaces_the_write_error() {
    let sink = Arc::new(RecordingSink::failing());
    let ingestor = CsvIngestor::new(Arc::clone(&sink), config(2, FailurePolicy::FailFast));

    let file = csv_fixture(50);
    let err = ingestor.ingest_file(file.path()).await.unwrap_err();
    assert!(matches!(err, IngestError::Write(_)));
}

/// Sink whose first write fails quickly; later writes succeed but slowly, so
/// any worker still draining after the failure is observable.
#[derive(Default)]
struct SlowFailSink {
    calls: AtomicUsize,
}

#[async_trait]
impl BatchSink for SlowFailSink {
    async fn write_batch(&self, _batch: &[Advertisement]) -> Result<(), WriteError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            return Err(injected_failure());
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(())
    }
}

#[tokio::test]
async fn fail_fast_stops_the_other_workers_writes() {
    let sink = Arc::new(SlowFailSink::default());
    let ingestor = CsvIngestor::new(
        Arc::clone(&sink),
        IngestConfig {
            batch_size: 1,
            workers: 2,
            queue_depth: 10,
            failure_policy: FailurePolicy::FailFast,
        },
    );

    let file = csv_fixture(30);
    let err = ingestor.ingest_file(file.path()).await.unwrap_err();
    assert!(matches!(err, IngestError::Write(_)));

    // Each worker had at most one write in flight when the failure hit; the
    // queued batches behind them must not be written.
    assert!(
        sink.calls.load(Ordering::SeqCst) <= 2,
        "workers kept draining after the fail-fast stop"
    );
}

#[tokio::test]
async fn serial_ingest_aborts_on_write_failure() {
    let ingestor = CsvIngestor::new(RecordingSink::failing(), config(2, FailurePolicy::BestEffort));

    let file = csv_fixture(5);
    let err = ingestor.ingest_file_serial(file.path()).await.unwrap_err();
    assert!(matches!(err, IngestError::Write(_)));
}

#[tokio::test]
async fn serial_ingest_batches_like_the_concurrent_path() {
    let sink = Arc::new(RecordingSink::default());
    let ingestor = CsvIngestor::new(Arc::clone(&sink), config(4, FailurePolicy::BestEffort));

    let file = csv_fixture(10);
    let report = ingestor.ingest_file_serial(file.path()).await.unwrap();

    assert_eq!(report.batches_submitted, 3);
    assert_eq!(sink.batch_sizes(), vec![4, 4, 2]);
}

#[tokio::test]
async fn pre_cancelled_token_aborts_at_first_dispatch() {
    let ingestor = CsvIngestor::new(
        RecordingSink::default(),
        config(2, FailurePolicy::BestEffort),
    );

    let cancel = CancellationToken::new();
    cancel.cancel();

    let file = csv_fixture(10);
    let err = ingestor
        .ingest_file_with_cancel(file.path(), cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::Cancelled));
}

/// Sink that checks no two concurrent writes ever share an advertisement id.
#[derive(Default)]
struct OverlapSink {
    active: Mutex<HashSet<i64>>,
    overlap_seen: AtomicBool,
}

#[async_trait]
impl BatchSink for OverlapSink {
    async fn write_batch(&self, batch: &[Advertisement]) -> Result<(), WriteError> {
        {
            let mut active = self.active.lock().unwrap();
            for ad in batch {
                if !active.insert(ad.id) {
                    self.overlap_seen.store(true, Ordering::SeqCst);
                }
            }
        }

        // Hold the ids long enough for writes to actually overlap in time.
        tokio::time::sleep(Duration::from_millis(5)).await;

        let mut active = self.active.lock().unwrap();
        for ad in batch {
            active.remove(&ad.id);
        }
        Ok(())
    }
}

#[tokio::test]
async fn concurrent_batches_never_share_record_ids() {
    let sink = Arc::new(OverlapSink::default());
    let ingestor = CsvIngestor::new(Arc::clone(&sink), config(5, FailurePolicy::BestEffort));

    let file = csv_fixture(100);
    let report = ingestor.ingest_file(file.path()).await.unwrap();

    assert_eq!(report.rows_read, 100);
    assert_eq!(report.batches_submitted, 20);
    assert!(
        !sink.overlap_seen.load(Ordering::SeqCst),
        "two workers processed the same record concurrently"
    );
}
