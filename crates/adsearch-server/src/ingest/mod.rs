//! CSV ingestion: parsing, batch persistence and the concurrent pipeline.
//!
//! Data flows source file -> [`parser`] -> [`pipeline`] (batching + worker
//! pool) -> [`sink`] -> relational store. Parse failures abort a run; write
//! failures are governed by the configured [`FailurePolicy`].

pub mod parser;
pub mod pipeline;
pub mod sink;

pub use parser::{parse_row, ParseError};
pub use pipeline::{CsvIngestor, FailurePolicy, IngestError, IngestReport};
pub use sink::{BatchSink, DbSink, WriteError};
