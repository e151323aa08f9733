//! Advertisement search service.
//!
//! Keeps two stores consistent for a corpus of advertisement records: the
//! relational store holds the record of truth, the search store serves
//! filtered full-text queries. The data-movement core is a concurrent CSV
//! batch loader ([`ingest`]) and a page-by-page bulk reindexer ([`search`]);
//! the [`api`] module exposes both over HTTP.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod search;
