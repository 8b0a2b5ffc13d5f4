//! Stateful autocompletion engine
//!
//! Wraps the query resolver with the state an editor needs between
//! keystrokes: the last resolved input (so repeated events are free), the
//! current suggestion set, and the single value lookup allowed in flight.
//! The completer is owned by the session; it never performs I/O itself.

use crate::error::{QueryError, QueryResult};
use crate::metadata::MetadataCache;
use crate::query::{
    QuerySpan, Resolution, ResolveOptions, Resolver, Suggestion, SuggestionSet, TextEdit,
    ValueLookup,
};
use chrono::{DateTime, Local};

/// Appended when a `FIELDS(...)` function is chosen in a query without LIMIT
const FIELDS_LIMIT: &str = " LIMIT 200";

/// Input of the last resolution pass
#[derive(Debug, Clone, PartialEq, Eq)]
struct MemoKey {
    tooling: bool,
    text: String,
    selection_start: usize,
    selection_end: usize,
}

impl MemoKey {
    fn new(span: &QuerySpan, tooling: bool) -> Self {
        Self {
            tooling,
            text: span.text.clone(),
            selection_start: span.selection_start,
            selection_end: span.selection_end,
        }
    }
}

/// Input a lookup was requested for, resolved again once it answers
#[derive(Debug, Clone)]
struct PendingLookup {
    generation: u64,
    span: QuerySpan,
    options: ResolveOptions,
}

/// What an update pass asks the caller to do
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionOutcome {
    /// Generation of an in-flight lookup this pass made obsolete
    pub cancelled_lookup: Option<u64>,
    /// Lookup to run, tagged with the generation to report it back under
    pub start_lookup: Option<(u64, ValueLookup)>,
    /// Bulk insertion to apply to the query text
    pub edit: Option<TextEdit>,
}

/// Query text after choosing a suggestion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub text: String,
    /// Cursor after the inserted text
    pub cursor: usize,
}

/// Autocompletion state of one query editor
#[derive(Debug, Default)]
pub struct Autocompleter {
    last: Option<MemoKey>,
    generation: u64,
    in_flight: Option<PendingLookup>,
    current: Option<Resolution>,
    clock: Option<DateTime<Local>>,
}

impl Autocompleter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the clock used for date literals
    pub fn with_clock(mut self, now: DateTime<Local>) -> Self {
        self.clock = Some(now);
        self
    }

    /// Latest resolution, if any pass ran
    pub fn resolution(&self) -> Option<&Resolution> {
        self.current.as_ref()
    }

    pub fn suggestions(&self) -> Option<&SuggestionSet> {
        self.current.as_ref().map(|r| &r.suggestions)
    }

    /// Generation of the lookup currently awaited
    pub fn pending_lookup(&self) -> Option<u64> {
        self.in_flight.as_ref().map(|p| p.generation)
    }

    /// Resolve `span`. Returns `None` without doing anything when the input
    /// is unchanged since the last pass, unless Ctrl+Space was pressed or new
    /// metadata arrived.
    pub fn update(
        &mut self,
        cache: &dyn MetadataCache,
        span: &QuerySpan,
        options: ResolveOptions,
        new_describe: bool,
    ) -> Option<CompletionOutcome> {
        let key = MemoKey::new(span, options.tooling);
        if self.last.as_ref() == Some(&key) && !options.ctrl_space && !new_describe {
            return None;
        }
        self.last = Some(key);
        self.generation += 1;

        let mut outcome = CompletionOutcome::default();
        if let Some(stale) = self.in_flight.take() {
            tracing::debug!(generation = stale.generation, "value lookup cancelled");
            outcome.cancelled_lookup = Some(stale.generation);
        }

        let mut resolver = Resolver::new(cache, span, options);
        if let Some(now) = self.clock {
            resolver = resolver.with_clock(now);
        }
        let mut resolution = resolver.resolve();

        if let Some(lookup) = resolution.value_lookup.take() {
            tracing::debug!(generation = self.generation, query = %lookup.query, "value lookup requested");
            self.in_flight = Some(PendingLookup {
                generation: self.generation,
                span: span.clone(),
                options,
            });
            outcome.start_lookup = Some((self.generation, lookup));
        }
        outcome.edit = resolution.edit.take();
        self.current = Some(resolution);
        Some(outcome)
    }

    /// Feed back the result of the lookup started under `generation`.
    /// The input the lookup was requested for is resolved again with the
    /// answer. Returns whether the suggestions changed; stale or cancelled
    /// results change nothing.
    pub fn complete_value_lookup(
        &mut self,
        cache: &dyn MetadataCache,
        generation: u64,
        result: QueryResult<Vec<String>>,
    ) -> bool {
        let Some(pending) = self
            .in_flight
            .take_if(|p| p.generation == generation)
        else {
            tracing::debug!(generation, "stale value lookup ignored");
            return false;
        };
        match &result {
            Err(QueryError::Cancelled) => return false,
            Err(err) => tracing::warn!(error = %err, "value lookup failed"),
            Ok(values) => tracing::debug!(generation, count = values.len(), "value lookup completed"),
        }
        let mut resolver =
            Resolver::new(cache, &pending.span, pending.options).with_loaded_values(&result);
        if let Some(now) = self.clock {
            resolver = resolver.with_clock(now);
        }
        let mut resolution = resolver.resolve();
        resolution.value_lookup = None;
        resolution.edit = None;
        self.current = Some(resolution);
        true
    }

    /// Forget the memoized input so the next update always resolves
    pub fn invalidate(&mut self) {
        self.last = None;
    }
}

/// Replace the resolution's token in `text` with `suggestion`.
///
/// A `, ` suffix is dropped when the select list already continues (a comma
/// or FROM follows, or only blanks remain before FROM). Choosing a
/// `FIELDS(...)` function appends a LIMIT when the query has none.
pub fn apply_suggestion(text: &str, resolution: &Resolution, suggestion: &Suggestion) -> Applied {
    let start = resolution.replace_start.min(text.len());
    let end = resolution.replace_end.clamp(start, text.len());
    let rest = &text[end..];
    let rest_lower = rest.to_ascii_lowercase();
    let next = rest_lower.trim_start();

    let mut suffix = suggestion.suffix.as_str();
    if suffix.trim() == ","
        && (next.starts_with(',')
            || next.starts_with("from")
            || rest_lower
                .find("from")
                .is_some_and(|i| rest_lower[..i].trim().is_empty()))
    {
        suffix = "";
    }

    let inserted = format!("{}{suffix}", suggestion.value);
    let mut out = String::with_capacity(text.len() + inserted.len());
    out.push_str(&text[..start]);
    out.push_str(&inserted);
    out.push_str(rest);
    let cursor = start + inserted.len();
    if suggestion.value.starts_with("FIELDS") && !text.to_ascii_lowercase().contains("limit") {
        out.push_str(FIELDS_LIMIT);
    }
    Applied { text: out, cursor }
}

/// Apply a bulk insertion to `text`
pub fn apply_edit(text: &str, edit: &TextEdit) -> Applied {
    let start = edit.start.min(text.len());
    let end = edit.end.clamp(start, text.len());
    let mut out = String::with_capacity(text.len() + edit.text.len());
    out.push_str(&text[..start]);
    out.push_str(&edit.text);
    out.push_str(&text[end..]);
    Applied {
        text: out,
        cursor: start + edit.text.len(),
    }
}
