//! Query API types
//!
//! The REST endpoint a query is sent to, and the shape of one result page.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Characters left unescaped in query text, matching `encodeURIComponent`
const QUERY_TEXT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Which query endpoint to call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QueryMode {
    #[default]
    Query,
    /// Includes deleted and archived records
    QueryAll,
    Tooling,
    /// Search language (`FIND ...`)
    Search,
}

impl QueryMode {
    /// Pick the mode from the editor toggles. Search wins over tooling,
    /// tooling over query-all.
    pub fn from_flags(search: bool, tooling: bool, query_all: bool) -> Self {
        if search {
            QueryMode::Search
        } else if tooling {
            QueryMode::Tooling
        } else if query_all {
            QueryMode::QueryAll
        } else {
            QueryMode::Query
        }
    }

    pub fn endpoint(&self) -> &'static str {
        match self {
            QueryMode::Query => "query",
            QueryMode::QueryAll => "queryAll",
            QueryMode::Tooling => "tooling/query",
            QueryMode::Search => "search",
        }
    }

    /// REST path running `query` in this mode
    pub fn request_path(&self, api_version: &str, query: &str) -> String {
        format!(
            "/services/data/v{api_version}/{}/?q={}",
            self.endpoint(),
            utf8_percent_encode(query, QUERY_TEXT)
        )
    }

    /// Only structured queries paginate
    pub fn paginates(&self) -> bool {
        *self != QueryMode::Search
    }
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.endpoint())
    }
}

fn default_done() -> bool {
    true
}

fn default_total_size() -> i64 {
    -1
}

/// One page of query results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryBatch {
    #[serde(default)]
    pub records: Vec<Value>,
    /// Search endpoint results
    #[serde(default)]
    pub search_records: Vec<Value>,
    #[serde(default = "default_done")]
    pub done: bool,
    /// Total matching records, `-1` when unknown
    #[serde(default = "default_total_size")]
    pub total_size: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_records_url: Option<String>,
}

impl QueryBatch {
    /// Records of this page for `mode`
    pub fn records_for(&self, mode: QueryMode) -> &[Value] {
        match mode {
            QueryMode::Search => &self.search_records,
            _ => &self.records,
        }
    }
}

/// One entry of a remote error response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorEntry {
    pub message: String,
    #[serde(default)]
    pub error_code: String,
}
