//! Metadata provider trait
//!
//! Source of describe payloads. The live implementation talks to the remote
//! REST API; this crate ships a directory-backed provider that replays
//! recorded describe JSON, which is what the CLI and the tests use.
//!
//! Layout of a describe directory:
//!
//! ```text
//! <root>/global.json
//! <root>/sobjects/<Name>.json
//! <root>/tooling/global.json
//! <root>/tooling/sobjects/<Name>.json
//! ```

use crate::error::{MetadataError, MetadataResult};
use crate::metadata::cache::DescribeRequest;
use crate::metadata::describe::{GlobalDescribe, SObjectDescribe};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Asynchronous describe source
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Fetch the global describe
    ///
    /// # Errors
    /// Returns `MetadataError::DescribeFailed` if the call fails
    async fn describe_global(&self, tooling: bool) -> MetadataResult<GlobalDescribe>;

    /// Fetch the describe of one object
    ///
    /// # Errors
    /// Returns `MetadataError::NotFound` if the object does not exist
    async fn describe_sobject(&self, tooling: bool, name: &str) -> MetadataResult<SObjectDescribe>;
}

/// Outcome of one [`DescribeRequest`]
#[derive(Debug)]
pub enum DescribeResponse {
    Global {
        tooling: bool,
        result: MetadataResult<GlobalDescribe>,
    },
    SObject {
        tooling: bool,
        name: String,
        result: MetadataResult<SObjectDescribe>,
    },
}

/// Perform the queued requests concurrently.
pub async fn fetch_all(
    provider: &dyn MetadataProvider,
    requests: Vec<DescribeRequest>,
) -> Vec<DescribeResponse> {
    let fetches = requests.into_iter().map(|request| async move {
        match request {
            DescribeRequest::Global { tooling } => DescribeResponse::Global {
                tooling,
                result: provider.describe_global(tooling).await,
            },
            DescribeRequest::SObject { tooling, name } => {
                let result = provider.describe_sobject(tooling, &name).await;
                DescribeResponse::SObject {
                    tooling,
                    name,
                    result,
                }
            }
        }
    });
    futures::future::join_all(fetches).await
}

/// Provider that reads recorded describe JSON from a directory
#[derive(Debug, Clone)]
pub struct DirectoryMetadataProvider {
    root: PathBuf,
}

impl DirectoryMetadataProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn api_root(&self, tooling: bool) -> PathBuf {
        if tooling {
            self.root.join("tooling")
        } else {
            self.root.clone()
        }
    }

    async fn read(path: &Path) -> MetadataResult<String> {
        Ok(tokio::fs::read_to_string(path).await?)
    }
}

#[async_trait]
impl MetadataProvider for DirectoryMetadataProvider {
    async fn describe_global(&self, tooling: bool) -> MetadataResult<GlobalDescribe> {
        let path = self.api_root(tooling).join("global.json");
        tracing::debug!(path = %path.display(), "reading global describe");
        let content = Self::read(&path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    async fn describe_sobject(&self, tooling: bool, name: &str) -> MetadataResult<SObjectDescribe> {
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(MetadataError::NotFound(name.to_string()));
        }
        let path = self
            .api_root(tooling)
            .join("sobjects")
            .join(format!("{name}.json"));
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(MetadataError::NotFound(name.to_string()));
        }
        tracing::debug!(path = %path.display(), "reading object describe");
        let content = Self::read(&path).await?;
        Ok(serde_json::from_str(&content)?)
    }
}
