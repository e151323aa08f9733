//! HTTP client for the search store.
//!
//! Speaks the Elasticsearch-compatible REST surface the service needs:
//! `_bulk` with an NDJSON body, single-document `_doc` puts and `_search`.
//! Transport problems and non-success statuses are distinct error kinds from
//! a bulk response that was accepted but carries per-document failures.

use adsearch_common::SearchDocument;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::config::SearchConfig;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search store transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid search store URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("failed to serialize search payload: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("search store rejected request ({status}): {body}")]
    Rejected { status: StatusCode, body: String },
    #[error("bulk indexing reported {failed} of {total} documents failed: {sample}")]
    BulkPartialFailure {
        failed: usize,
        total: usize,
        sample: String,
    },
}

/// Response of a `_bulk` call, with per-item outcomes.
#[derive(Debug, Deserialize)]
pub struct BulkResponse {
    pub errors: bool,
    #[serde(default)]
    pub items: Vec<BulkItem>,
}

#[derive(Debug, Deserialize)]
pub struct BulkItem {
    #[serde(rename = "index")]
    pub index: Option<BulkItemStatus>,
}

#[derive(Debug, Deserialize)]
pub struct BulkItemStatus {
    #[serde(rename = "_id")]
    pub id: String,
    pub status: u16,
    pub error: Option<BulkItemError>,
}

#[derive(Debug, Deserialize)]
pub struct BulkItemError {
    #[serde(rename = "type")]
    pub kind: String,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: SearchHits,
}

#[derive(Debug, Deserialize)]
struct SearchHits {
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(rename = "_source")]
    source: SearchDocument,
}

#[derive(Clone)]
pub struct SearchClient {
    http: reqwest::Client,
    base_url: Url,
    index: String,
    username: Option<String>,
    password: Option<String>,
}

impl SearchClient {
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        let mut base_url = Url::parse(&config.url)?;
        // `Url::join` replaces the last path segment unless the base path
        // ends in a slash, which would silently drop a path prefix such as
        // "http://host:9200/es".
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let http = reqwest::Client::builder().build()?;

        Ok(Self {
            http,
            base_url,
            index: config.index.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    pub fn index_name(&self) -> &str {
        &self.index
    }

    /// Connectivity check, called once at construction time by the binaries.
    pub async fn ping(&self) -> Result<(), SearchError> {
        let response = self.request(Method::GET, self.base_url.clone()).send().await?;
        Self::check_status(response).await?;
        info!(url = %self.base_url, "search store reachable");
        Ok(())
    }

    /// Submit one NDJSON bulk payload in a single round trip.
    pub async fn bulk(&self, payload: String) -> Result<BulkResponse, SearchError> {
        let url = self.base_url.join("_bulk")?;
        let response = self
            .request(Method::POST, url)
            .header("content-type", "application/x-ndjson")
            .body(payload)
            .send()
            .await?;
        let response = Self::check_status(response).await?;
        Ok(response.json::<BulkResponse>().await?)
    }

    /// Idempotent single-document upsert: the document stored at `id` is
    /// replaced, never duplicated. Refreshes so the write is searchable
    /// immediately.
    pub async fn index_document(&self, id: i64, doc: &SearchDocument) -> Result<(), SearchError> {
        let url = self
            .base_url
            .join(&format!("{}/_doc/{}?refresh=true", self.index, id))?;
        let response = self.request(Method::PUT, url).json(doc).send().await?;
        Self::check_status(response).await?;
        Ok(())
    }

    /// Run a query against the index and decode the matching documents.
    pub async fn search(
        &self,
        query: &serde_json::Value,
    ) -> Result<Vec<SearchDocument>, SearchError> {
        let url = self.base_url.join(&format!("{}/_search", self.index))?;
        let response = self.request(Method::POST, url).json(query).send().await?;
        let response = Self::check_status(response).await?;
        let body = response.json::<SearchResponse>().await?;
        Ok(body.hits.hits.into_iter().map(|hit| hit.source).collect())
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.username {
            Some(username) => builder.basic_auth(username, self.password.as_deref()),
            None => builder,
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, SearchError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(SearchError::Rejected { status, body })
    }
}
