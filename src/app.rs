//! Session state and event handling
//!
//! `Session` owns everything one query editor needs: the text and
//! selection, the API toggles, the describe cache, the autocompleter and the
//! last exported table. Events go in through [`Session::handle_event`];
//! the I/O they require comes back out as [`Action`]s, which a [`Driver`]
//! (or any other host loop) performs before feeding the results back in as
//! new events.

use crate::api::export::{ExportReport, ExportStatus, PerfSummary, run_export};
use crate::api::provider::{QueryExecutor, fetch_values};
use crate::api::types::QueryMode;
use crate::completer::{Autocompleter, apply_edit, apply_suggestion};
use crate::config::Settings;
use crate::error::QueryResult;
use crate::metadata::{DescribeCache, DescribeRequest, DescribeResponse, MetadataProvider, fetch_all};
use crate::query::{ClickAction, QuerySpan, ResolveOptions, SelectList, ValueLookup, extract_columns};
use crate::table::RecordTable;
use futures::future::{AbortHandle, AbortRegistration};
use std::collections::VecDeque;

/// Events from the editor and from finished background work
#[derive(Debug)]
pub enum AppEvent {
    /// Text or selection changed
    Edit(QuerySpan),
    /// Explicit completion request (bulk insert, value lookup)
    CtrlSpace,
    ToggleTooling(bool),
    ToggleQueryAll(bool),
    MetadataLoaded(Vec<DescribeResponse>),
    ValueLookupCompleted {
        generation: u64,
        result: QueryResult<Vec<String>>,
    },
    /// Entry `index` of the current suggestion set was chosen
    SuggestionChosen(usize),
    /// Drop cached metadata and fetch it again
    ReloadMetadata,
    SelectTemplate(usize),
    FilterChanged(String),
    /// Run the current query
    Export,
    ExportFinished {
        table: RecordTable,
        report: ExportReport,
    },
}

/// Work the host must perform for the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    FetchMetadata(Vec<DescribeRequest>),
    LookupValues { generation: u64, lookup: ValueLookup },
    CancelValueLookup(u64),
    RunExport {
        query: String,
        mode: QueryMode,
        select: SelectList,
    },
}

/// State of one query editor
pub struct Session {
    pub settings: Settings,
    pub cache: DescribeCache,
    pub completer: Autocompleter,
    span: QuerySpan,
    tooling: bool,
    query_all: bool,
    table: Option<RecordTable>,
    status: String,
    export_error: Option<String>,
    perf: Option<PerfSummary>,
    exporting: bool,
}

impl Session {
    pub fn new(settings: Settings) -> Self {
        let span = QuerySpan::at_end(settings.default_query.clone());
        Self {
            settings,
            cache: DescribeCache::new(),
            completer: Autocompleter::new(),
            span,
            tooling: false,
            query_all: false,
            table: None,
            status: "Ready".to_string(),
            export_error: None,
            perf: None,
            exporting: false,
        }
    }

    pub fn span(&self) -> &QuerySpan {
        &self.span
    }

    pub fn table(&self) -> Option<&RecordTable> {
        self.table.as_ref()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn export_error(&self) -> Option<&str> {
        self.export_error.as_deref()
    }

    pub fn perf(&self) -> Option<&PerfSummary> {
        self.perf.as_ref()
    }

    pub fn is_exporting(&self) -> bool {
        self.exporting
    }

    pub fn can_delete(&self) -> bool {
        self.table
            .as_ref()
            .is_some_and(|t| t.can_delete(self.exporting))
    }

    fn mode(&self) -> QueryMode {
        QueryMode::from_flags(self.span.is_search_mode(), self.tooling, self.query_all)
    }

    fn options(&self, ctrl_space: bool) -> ResolveOptions {
        ResolveOptions {
            tooling: self.tooling,
            query_all: self.query_all,
            ctrl_space,
            value_lookup_limit: self.settings.value_lookup_limit,
        }
    }

    pub fn handle_event(&mut self, event: AppEvent) -> Vec<Action> {
        match event {
            AppEvent::Edit(span) => {
                self.span = span;
                self.autocomplete(false, false)
            }
            AppEvent::CtrlSpace => self.autocomplete(true, false),
            AppEvent::ToggleTooling(on) => {
                self.tooling = on;
                self.autocomplete(false, false)
            }
            AppEvent::ToggleQueryAll(on) => {
                self.query_all = on;
                Vec::new()
            }
            AppEvent::MetadataLoaded(responses) => {
                for response in responses {
                    self.cache.apply(response);
                }
                self.autocomplete(false, true)
            }
            AppEvent::ValueLookupCompleted { generation, result } => {
                self.completer.complete_value_lookup(&self.cache, generation, result);
                Vec::new()
            }
            AppEvent::SuggestionChosen(index) => self.choose_suggestion(index),
            AppEvent::ReloadMetadata => self.reload_metadata(),
            AppEvent::SelectTemplate(index) => {
                let Some(template) = self.settings.query_templates.get(index) else {
                    return Vec::new();
                };
                let text = template.trim_start().to_string();
                // Cursor goes where the object name is typed
                let cursor = text
                    .to_ascii_lowercase()
                    .find("from ")
                    .map_or(text.len(), |i| i + 5);
                self.span = QuerySpan::cursor(text, cursor);
                self.autocomplete(false, false)
            }
            AppEvent::FilterChanged(filter) => {
                if let Some(table) = self.table.as_mut() {
                    table.set_filter(&filter);
                    self.status = table.filter_status();
                }
                Vec::new()
            }
            AppEvent::Export => {
                if self.exporting {
                    return Vec::new();
                }
                self.exporting = true;
                self.status = ExportStatus::Started.to_string();
                self.export_error = None;
                vec![Action::RunExport {
                    query: self.span.text.clone(),
                    mode: self.mode(),
                    select: extract_columns(&self.span.text),
                }]
            }
            AppEvent::ExportFinished { table, report } => {
                self.exporting = false;
                self.status = report.status.to_string();
                self.export_error = report.status.error().map(str::to_string);
                self.perf = if self.settings.display_performance {
                    report.timer.summary()
                } else {
                    None
                };
                self.table = match report.status {
                    ExportStatus::Failed { .. } => None,
                    _ => Some(table),
                };
                Vec::new()
            }
        }
    }

    fn autocomplete(&mut self, ctrl_space: bool, new_describe: bool) -> Vec<Action> {
        let options = self.options(ctrl_space);
        let mut actions = Vec::new();
        let Some(outcome) = self
            .completer
            .update(&self.cache, &self.span, options, new_describe)
        else {
            return actions;
        };
        if let Some(generation) = outcome.cancelled_lookup {
            actions.push(Action::CancelValueLookup(generation));
        }
        if let Some((generation, lookup)) = outcome.start_lookup {
            actions.push(Action::LookupValues { generation, lookup });
        }
        if let Some(edit) = outcome.edit {
            let applied = apply_edit(&self.span.text, &edit);
            self.span = QuerySpan::cursor(applied.text, applied.cursor);
            actions.extend(self.autocomplete(false, false));
        }
        let pending = self.cache.take_pending();
        if !pending.is_empty() {
            actions.push(Action::FetchMetadata(pending));
        }
        actions
    }

    fn choose_suggestion(&mut self, index: usize) -> Vec<Action> {
        let Some(resolution) = self.completer.resolution() else {
            return Vec::new();
        };
        if resolution.suggestions.click == ClickAction::ReloadMetadata {
            return self.reload_metadata();
        }
        let Some(suggestion) = resolution.suggestions.results.get(index) else {
            return Vec::new();
        };
        let applied = apply_suggestion(&self.span.text, resolution, suggestion);
        self.span = QuerySpan::cursor(applied.text, applied.cursor);
        self.autocomplete(false, false)
    }

    fn reload_metadata(&mut self) -> Vec<Action> {
        tracing::info!("reloading metadata");
        self.cache.reload_all();
        self.completer.invalidate();
        self.autocomplete(false, true)
    }
}

/// Performs session actions against a metadata provider and an executor
pub struct Driver<'a> {
    provider: &'a dyn MetadataProvider,
    executor: &'a dyn QueryExecutor,
}

impl<'a> Driver<'a> {
    pub fn new(provider: &'a dyn MetadataProvider, executor: &'a dyn QueryExecutor) -> Self {
        Self { provider, executor }
    }

    /// Perform `actions` and every action their results lead to, until the
    /// session is idle. `abort` cancels an export started on the way.
    pub async fn run(
        &self,
        session: &mut Session,
        actions: Vec<Action>,
        mut abort: Option<AbortRegistration>,
    ) {
        let mut queue: VecDeque<Action> = actions.into();
        while let Some(action) = queue.pop_front() {
            let event = match action {
                Action::FetchMetadata(requests) => {
                    tracing::debug!(count = requests.len(), "fetching metadata");
                    AppEvent::MetadataLoaded(fetch_all(self.provider, requests).await)
                }
                Action::LookupValues { generation, lookup } => {
                    let result = fetch_values(self.executor, &lookup).await;
                    AppEvent::ValueLookupCompleted { generation, result }
                }
                Action::CancelValueLookup(generation) => {
                    // Lookups run to completion before the next action here
                    tracing::debug!(generation, "nothing to cancel");
                    continue;
                }
                Action::RunExport {
                    query,
                    mode,
                    select,
                } => {
                    let registration = abort
                        .take()
                        .unwrap_or_else(|| AbortHandle::new_pair().1);
                    let mut table = RecordTable::new(select);
                    let report = run_export(
                        self.executor,
                        mode,
                        &query,
                        &mut table,
                        registration,
                        |status| tracing::debug!(%status, "export progress"),
                    )
                    .await;
                    AppEvent::ExportFinished { table, report }
                }
            };
            queue.extend(session.handle_event(event));
        }
    }
}
