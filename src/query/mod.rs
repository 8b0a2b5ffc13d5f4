//! Query context resolution
//!
//! Works out what the token under the cursor is (keyword, object, field,
//! relationship, value) in a possibly incomplete query and produces ranked
//! suggestions for it. Recognition is regex and substring driven rather than
//! a full grammar so it can run on every keystroke, and it tolerates the
//! half-typed queries an editor is full of.
//!
//! - [`soql`]: structured queries (`SELECT ... FROM ...`), including subqueries
//! - [`sosl`]: search queries (`FIND {...} IN ... RETURNING ...`)
//! - [`field`]: field, relationship path, value and object contexts shared by both
//! - [`columns`]: select-list extraction used to seed result columns

pub mod columns;
pub mod field;
pub mod soql;
pub mod sosl;
pub mod span;
pub mod suggestion;
pub mod values;

pub use columns::{FieldNode, SelectList, extract_columns};
pub use span::QuerySpan;
pub use suggestion::{
    ClickAction, Resolution, Suggestion, SuggestionKind, SuggestionSet, TextEdit, ValueLookup,
    sort_suggestions,
};

use crate::api::types::QueryMode;
use crate::error::QueryResult;
use crate::metadata::cache::MetadataCache;
use chrono::{DateTime, Local};

/// Flags of one resolution pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Use the tooling API namespace for metadata and lookups
    pub tooling: bool,
    /// Include deleted and archived records in lookups
    pub query_all: bool,
    /// The user explicitly asked for expensive completions (bulk insert, value lookup)
    pub ctrl_space: bool,
    /// Row limit of the distinct value lookup query
    pub value_lookup_limit: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            tooling: false,
            query_all: false,
            ctrl_space: false,
            value_lookup_limit: 100,
        }
    }
}

/// One resolution pass over a span
pub struct Resolver<'a> {
    pub(crate) cache: &'a dyn MetadataCache,
    pub(crate) span: &'a QuerySpan,
    pub(crate) options: ResolveOptions,
    pub(crate) now: DateTime<Local>,
    /// Answer of the value lookup an earlier pass over the same input asked for
    pub(crate) loaded_values: Option<&'a QueryResult<Vec<String>>>,
}

impl<'a> Resolver<'a> {
    pub fn new(cache: &'a dyn MetadataCache, span: &'a QuerySpan, options: ResolveOptions) -> Self {
        Self {
            cache,
            span,
            options,
            now: Local::now(),
            loaded_values: None,
        }
    }

    /// Resolve value contexts from `result` instead of requesting a lookup
    pub fn with_loaded_values(mut self, result: &'a QueryResult<Vec<String>>) -> Self {
        self.loaded_values = Some(result);
        self
    }

    /// Override the clock used for "Today"/"Now" literals
    pub fn with_clock(mut self, now: DateTime<Local>) -> Self {
        self.now = now;
        self
    }

    pub fn resolve(&self) -> Resolution {
        if self.span.is_search_mode() {
            sosl::resolve(self)
        } else {
            soql::resolve(self)
        }
    }

    pub(crate) fn query(&self) -> &str {
        &self.span.text
    }

    pub(crate) fn term(&self) -> &str {
        self.span.search_term()
    }

    pub(crate) fn token_start(&self) -> usize {
        self.span.token_start()
    }

    pub(crate) fn selection_end(&self) -> usize {
        self.span.selection_end
    }

    /// Resolution replacing the token under the cursor
    pub(crate) fn at_token(&self, set: SuggestionSet) -> Resolution {
        Resolution::new(set, self.token_start(), self.selection_end())
    }

    /// Endpoint used for lookups issued while resolving
    pub(crate) fn lookup_mode(&self) -> QueryMode {
        QueryMode::from_flags(false, self.options.tooling, self.options.query_all)
    }
}

/// Resolve suggestions for `span` against the metadata in `cache`.
pub fn resolve(cache: &dyn MetadataCache, span: &QuerySpan, options: ResolveOptions) -> Resolution {
    Resolver::new(cache, span, options).resolve()
}
