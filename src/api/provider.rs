//! Query executor trait
//!
//! The remote REST client is not part of this crate. Callers plug in their
//! own [`QueryExecutor`]; [`FixtureExecutor`] replays recorded result pages
//! from a directory for the CLI and the tests.
//!
//! Layout of a pages directory:
//!
//! ```text
//! <root>/page-0.json
//! <root>/page-1.json
//! ...
//! ```
//!
//! A page holding a JSON array of `{message, errorCode}` entries is replayed
//! as a remote failure.

use crate::api::types::{ApiErrorEntry, QueryBatch, QueryMode};
use crate::error::{QueryError, QueryResult};
use crate::query::ValueLookup;
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Asynchronous query execution
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Run a query and return its first page
    ///
    /// # Errors
    /// Returns `QueryError::RemoteFailure` if the endpoint rejects the query
    async fn query(&self, mode: QueryMode, query: &str) -> QueryResult<QueryBatch>;

    /// Fetch the page behind a `nextRecordsUrl`
    ///
    /// # Errors
    /// Returns `QueryError::RemoteFailure` if the request fails
    async fn next_batch(&self, next_records_url: &str) -> QueryResult<QueryBatch>;
}

/// Run a distinct value lookup and return the non-empty values.
pub async fn fetch_values(
    executor: &dyn QueryExecutor,
    lookup: &ValueLookup,
) -> QueryResult<Vec<String>> {
    tracing::debug!(query = %lookup.query, mode = %lookup.mode, "running value lookup");
    let batch = executor.query(lookup.mode, &lookup.query).await?;
    let values = batch
        .records_for(lookup.mode)
        .iter()
        .filter_map(|record| match record.get(&lookup.field_name)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Bool(true) => Some("true".to_string()),
            Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
            _ => None,
        })
        .collect();
    Ok(values)
}

/// Parse a response body as a page or a remote error list
pub fn parse_batch(body: &str) -> QueryResult<QueryBatch> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| QueryError::InvalidResponse(e.to_string()))?;
    if value.is_array() {
        let errors: Vec<ApiErrorEntry> = serde_json::from_value(value)
            .map_err(|e| QueryError::InvalidResponse(e.to_string()))?;
        let message = errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        return Err(QueryError::RemoteFailure(message));
    }
    serde_json::from_value(value).map_err(|e| QueryError::InvalidResponse(e.to_string()))
}

const FIXTURE_SCHEME: &str = "fixture:";

/// Executor replaying `page-N.json` files
#[derive(Debug, Clone)]
pub struct FixtureExecutor {
    root: PathBuf,
    api_version: String,
}

impl FixtureExecutor {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            api_version: crate::config::DEFAULT_API_VERSION.to_string(),
        }
    }

    /// Use `api_version` when building request paths
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    /// Path a live client would request for `query`
    pub fn request_path(&self, mode: QueryMode, query: &str) -> String {
        mode.request_path(&self.api_version, query)
    }

    async fn page(&self, index: usize) -> QueryResult<QueryBatch> {
        let path = self.root.join(format!("page-{index}.json"));
        let body = read(&path).await?;
        let mut batch = parse_batch(&body)?;
        if !batch.done && batch.next_records_url.is_none() {
            batch.next_records_url = Some(format!("{FIXTURE_SCHEME}{}", index + 1));
        }
        Ok(batch)
    }
}

async fn read(path: &Path) -> QueryResult<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| QueryError::RemoteFailure(format!("{}: {e}", path.display())))
}

#[async_trait]
impl QueryExecutor for FixtureExecutor {
    async fn query(&self, mode: QueryMode, query: &str) -> QueryResult<QueryBatch> {
        tracing::debug!(path = %self.request_path(mode, query), "replaying first page");
        self.page(0).await
    }

    async fn next_batch(&self, next_records_url: &str) -> QueryResult<QueryBatch> {
        let index = next_records_url
            .strip_prefix(FIXTURE_SCHEME)
            .and_then(|n| n.parse::<usize>().ok())
            .ok_or_else(|| {
                QueryError::InvalidResponse(format!("unexpected next records url: {next_records_url}"))
            })?;
        self.page(index).await
    }
}
