//! CLI argument parsing and command execution
//!
//! Both commands work offline: metadata comes from a describe directory and
//! query results from recorded page files.

use crate::api::provider::{FixtureExecutor, QueryExecutor};
use crate::app::{AppEvent, Driver, Session};
use crate::config::Settings;
use crate::export::{ExportFormat, to_preview};
use crate::metadata::DirectoryMetadataProvider;
use crate::query::{QuerySpan, SuggestionSet};
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use futures::future::AbortRegistration;
use std::fmt::{self, Write as _};
use std::path::PathBuf;

/// soqlx - SOQL/SOSL autocompletion and record export
#[derive(Parser, Debug)]
#[command(name = "soqlx")]
#[command(about = "Context-aware SOQL/SOSL autocompletion and record table export", long_about = None)]
#[command(version)]
pub struct Args {
    /// Settings file (defaults to ~/.soqlx/config.toml)
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the suggestions for a query at a cursor position
    Complete(CompleteArgs),
    /// Run a query against recorded result pages and print the table
    Export(ExportArgs),
}

#[derive(clap::Args, Debug)]
pub struct CompleteArgs {
    /// Directory of recorded describe JSON
    #[arg(short = 'd', long, value_name = "DIR")]
    pub describe_dir: PathBuf,

    /// Query text
    #[arg(short, long)]
    pub query: String,

    /// Cursor byte offset (defaults to the end of the query)
    #[arg(short, long)]
    pub cursor: Option<usize>,

    /// End of the selection starting at the cursor
    #[arg(long)]
    pub selection_end: Option<usize>,

    /// Use the tooling API
    #[arg(long)]
    pub tooling: bool,

    /// Include deleted records in value lookups
    #[arg(long)]
    pub query_all: bool,

    /// Request bulk insertion or a value lookup, as Ctrl+Space does
    #[arg(long)]
    pub ctrl_space: bool,

    /// Recorded pages answering value lookups
    #[arg(long, value_name = "DIR")]
    pub pages: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct ExportArgs {
    /// Directory of recorded result pages (page-0.json, page-1.json, ...)
    #[arg(short, long, value_name = "DIR")]
    pub pages: PathBuf,

    /// Query text
    #[arg(short, long)]
    pub query: String,

    /// Directory of recorded describe JSON
    #[arg(short = 'd', long, value_name = "DIR")]
    pub describe_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "csv", value_enum)]
    pub format: OutputFormat,

    /// Only keep rows containing this text
    #[arg(long)]
    pub filter: Option<String>,

    /// CSV delimiter (overrides the settings file)
    #[arg(long)]
    pub delimiter: Option<char>,

    /// Use the tooling API
    #[arg(long)]
    pub tooling: bool,

    /// Include deleted and archived records
    #[arg(long)]
    pub query_all: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Csv,
    Excel,
    Json,
    /// Aligned plain-text table
    Preview,
}

/// What a command prints
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Main output, for stdout
    pub stdout: String,
    /// Status lines, for stderr
    pub status: Vec<String>,
    /// The command produced nothing usable
    pub failed: bool,
}

/// Run the `complete` command
pub async fn run_complete(args: &CompleteArgs, settings: Settings) -> Result<CommandOutput> {
    let provider = DirectoryMetadataProvider::new(&args.describe_dir);
    let executor = args
        .pages
        .as_ref()
        .map(|pages| FixtureExecutor::new(pages.as_path()).with_api_version(&settings.api_version));
    let executor: &dyn QueryExecutor = match &executor {
        Some(executor) => executor,
        None => &NoPages,
    };
    let driver = Driver::new(&provider, executor);

    let mut session = Session::new(settings);
    let cursor = args.cursor.unwrap_or(args.query.len());
    let selection_end = args.selection_end.unwrap_or(cursor);
    if cursor > args.query.len() || selection_end < cursor || selection_end > args.query.len() {
        bail!("selection {cursor}..{selection_end} is outside the query");
    }
    if args.tooling {
        session.handle_event(AppEvent::ToggleTooling(true));
    }
    if args.query_all {
        session.handle_event(AppEvent::ToggleQueryAll(true));
    }
    let span = QuerySpan::new(args.query.clone(), cursor, selection_end);
    let actions = session.handle_event(AppEvent::Edit(span));
    driver.run(&mut session, actions, None).await;
    if args.ctrl_space {
        let actions = session.handle_event(AppEvent::CtrlSpace);
        driver.run(&mut session, actions, None).await;
    }

    let mut output = CommandOutput::default();
    if let Some(set) = session.completer.suggestions() {
        output.stdout = render_suggestions(set).context("rendering suggestions")?;
    }
    if session.span().text != args.query {
        output.status.push(format!("Query: {}", session.span().text));
    }
    Ok(output)
}

fn render_suggestions(set: &SuggestionSet) -> Result<String, fmt::Error> {
    let mut out = String::new();
    writeln!(out, "{}", set.title)?;
    let width = set
        .results
        .iter()
        .map(|s| s.value.chars().count())
        .max()
        .unwrap_or(0);
    for s in &set.results {
        if s.title == s.value {
            writeln!(out, "  {}", s.value)?;
        } else {
            writeln!(out, "  {:<width$}  {}", s.value, s.title)?;
        }
    }
    Ok(out)
}

/// Run the `export` command. Aborting through `abort` keeps the records
/// exported so far.
pub async fn run_export_command(
    args: &ExportArgs,
    settings: Settings,
    abort: Option<AbortRegistration>,
) -> Result<CommandOutput> {
    let delimiter = match args.delimiter {
        Some(c) => c,
        None => settings.csv_delimiter().context("invalid csv_separator setting")?,
    };
    let provider = DirectoryMetadataProvider::new(
        args.describe_dir.clone().unwrap_or_else(|| args.pages.clone()),
    );
    let executor = FixtureExecutor::new(&args.pages).with_api_version(&settings.api_version);
    let driver = Driver::new(&provider, &executor);

    let mut session = Session::new(settings);
    session.handle_event(AppEvent::ToggleTooling(args.tooling));
    session.handle_event(AppEvent::ToggleQueryAll(args.query_all));
    session.handle_event(AppEvent::Edit(QuerySpan::at_end(args.query.clone())));
    let actions = session.handle_event(AppEvent::Export);
    driver.run(&mut session, actions, abort).await;

    if let Some(filter) = &args.filter {
        session.handle_event(AppEvent::FilterChanged(filter.clone()));
    }

    let mut output = CommandOutput::default();
    output.status.push(session.status().to_string());
    if let Some(error) = session.export_error() {
        output.status.push(error.to_string());
        output.failed = session.table().is_none();
    }
    if let Some(perf) = session.perf() {
        output.status.push(perf.text.clone());
        if !perf.batch_stats.is_empty() {
            output.status.push(perf.batch_stats.clone());
        }
    }
    if let Some(table) = session.table() {
        output.stdout = match args.format {
            OutputFormat::Csv => ExportFormat::Csv.serialize(table, delimiter),
            OutputFormat::Excel => ExportFormat::Excel.serialize(table, delimiter),
            OutputFormat::Json => ExportFormat::Json.serialize(table, delimiter),
            OutputFormat::Preview => to_preview(table),
        };
    }
    Ok(output)
}

/// Executor used when no pages directory is given
struct NoPages;

#[async_trait::async_trait]
impl QueryExecutor for NoPages {
    async fn query(
        &self,
        _mode: crate::api::types::QueryMode,
        _query: &str,
    ) -> crate::error::QueryResult<crate::api::types::QueryBatch> {
        Err(crate::error::QueryError::RemoteFailure(
            "no result pages configured (use --pages)".to_string(),
        ))
    }

    async fn next_batch(
        &self,
        _next_records_url: &str,
    ) -> crate::error::QueryResult<crate::api::types::QueryBatch> {
        Err(crate::error::QueryError::RemoteFailure(
            "no result pages configured (use --pages)".to_string(),
        ))
    }
}
