//! Describe cache
//!
//! Single-threaded store of describe results. A lookup never blocks: an
//! uncached object is marked as loading and queued as a [`DescribeRequest`],
//! and the caller drains the queue, fetches asynchronously and feeds the
//! responses back with [`DescribeCache::apply`]. The resolver is then run
//! again and sees the ready state.

use crate::error::MetadataError;
use crate::metadata::describe::{GlobalDescribe, SObjectDescribe};
use crate::metadata::provider::DescribeResponse;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

/// Result of a describe lookup
#[derive(Debug, Clone)]
pub enum DescribeState<T> {
    Loading,
    LoadFailed,
    NotFound,
    Ready(Arc<T>),
}

/// Payload-free discriminant of [`DescribeState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescribeStatus {
    Loading,
    LoadFailed,
    NotFound,
    Ready,
}

impl<T> DescribeState<T> {
    pub fn status(&self) -> DescribeStatus {
        match self {
            DescribeState::Loading => DescribeStatus::Loading,
            DescribeState::LoadFailed => DescribeStatus::LoadFailed,
            DescribeState::NotFound => DescribeStatus::NotFound,
            DescribeState::Ready(_) => DescribeStatus::Ready,
        }
    }
}

impl std::fmt::Display for DescribeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DescribeStatus::Loading => "loading",
            DescribeStatus::LoadFailed => "loadfailed",
            DescribeStatus::NotFound => "notfound",
            DescribeStatus::Ready => "ready",
        };
        f.write_str(s)
    }
}

/// Read side of the metadata cache, as seen by the resolver.
///
/// `tooling` selects the alternate (tooling) API namespace.
pub trait MetadataCache {
    fn describe_global(&self, tooling: bool) -> DescribeState<GlobalDescribe>;
    fn describe_sobject(&self, tooling: bool, name: &str) -> DescribeState<SObjectDescribe>;
}

/// A describe fetch the cache wants performed
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DescribeRequest {
    Global { tooling: bool },
    SObject { tooling: bool, name: String },
}

enum Entry<T> {
    Loading,
    Failed,
    Missing,
    Ready(Arc<T>),
}

impl<T> Entry<T> {
    fn state(&self) -> DescribeState<T> {
        match self {
            Entry::Loading => DescribeState::Loading,
            Entry::Failed => DescribeState::LoadFailed,
            Entry::Missing => DescribeState::NotFound,
            Entry::Ready(v) => DescribeState::Ready(Arc::clone(v)),
        }
    }

    fn from_result(result: Result<T, MetadataError>) -> Self {
        match result {
            Ok(v) => Entry::Ready(Arc::new(v)),
            Err(MetadataError::NotFound(_)) => Entry::Missing,
            Err(_) => Entry::Failed,
        }
    }
}

#[derive(Default)]
struct ApiCache {
    global: Option<Entry<GlobalDescribe>>,
    /// Keyed by lowercase object name
    sobjects: HashMap<String, Entry<SObjectDescribe>>,
}

#[derive(Default)]
struct CacheState {
    regular: ApiCache,
    tooling: ApiCache,
    pending: Vec<DescribeRequest>,
}

impl CacheState {
    fn api(&mut self, tooling: bool) -> &mut ApiCache {
        if tooling {
            &mut self.tooling
        } else {
            &mut self.regular
        }
    }
}

/// In-memory describe cache with a pending-fetch queue
#[derive(Default)]
pub struct DescribeCache {
    state: RefCell<CacheState>,
}

impl DescribeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain the queued fetches.
    pub fn take_pending(&self) -> Vec<DescribeRequest> {
        std::mem::take(&mut self.state.borrow_mut().pending)
    }

    pub fn has_pending(&self) -> bool {
        !self.state.borrow().pending.is_empty()
    }

    pub fn store_global(&self, tooling: bool, result: Result<GlobalDescribe, MetadataError>) {
        if let Err(e) = &result {
            tracing::warn!(tooling, error = %e, "global describe failed");
        }
        self.state.borrow_mut().api(tooling).global = Some(Entry::from_result(result));
    }

    pub fn store_sobject(
        &self,
        tooling: bool,
        name: &str,
        result: Result<SObjectDescribe, MetadataError>,
    ) {
        if let Err(e) = &result {
            tracing::warn!(tooling, sobject = name, error = %e, "object describe failed");
        }
        self.state
            .borrow_mut()
            .api(tooling)
            .sobjects
            .insert(name.to_ascii_lowercase(), Entry::from_result(result));
    }

    /// Feed a fetched response back into the cache.
    pub fn apply(&self, response: DescribeResponse) {
        match response {
            DescribeResponse::Global { tooling, result } => self.store_global(tooling, result),
            DescribeResponse::SObject {
                tooling,
                name,
                result,
            } => self.store_sobject(tooling, &name, result),
        }
    }

    /// Forget everything so the next lookups fetch again (the "Retry" action).
    pub fn reload_all(&self) {
        tracing::info!("reloading all describe metadata");
        *self.state.borrow_mut() = CacheState::default();
    }
}

impl MetadataCache for DescribeCache {
    fn describe_global(&self, tooling: bool) -> DescribeState<GlobalDescribe> {
        let mut state = self.state.borrow_mut();
        if let Some(entry) = &state.api(tooling).global {
            return entry.state();
        }
        state.api(tooling).global = Some(Entry::Loading);
        state.pending.push(DescribeRequest::Global { tooling });
        tracing::debug!(tooling, "queued global describe");
        DescribeState::Loading
    }

    fn describe_sobject(&self, tooling: bool, name: &str) -> DescribeState<SObjectDescribe> {
        let global = match self.describe_global(tooling) {
            DescribeState::Ready(global) => global,
            DescribeState::Loading => return DescribeState::Loading,
            DescribeState::LoadFailed => return DescribeState::LoadFailed,
            DescribeState::NotFound => return DescribeState::NotFound,
        };
        let Some(summary) = global.find(name) else {
            return DescribeState::NotFound;
        };
        let key = summary.name.to_ascii_lowercase();
        let mut state = self.state.borrow_mut();
        if let Some(entry) = state.api(tooling).sobjects.get(&key) {
            return entry.state();
        }
        state.api(tooling).sobjects.insert(key, Entry::Loading);
        state.pending.push(DescribeRequest::SObject {
            tooling,
            name: summary.name.clone(),
        });
        tracing::debug!(tooling, sobject = %summary.name, "queued object describe");
        DescribeState::Loading
    }
}
