//! Export driver
//!
//! Runs a query page by page into a [`RecordTable`]. Page N+1 is requested
//! only after page N is merged, so the table is rectangular whenever the
//! export stops: at the end, on a remote error, or when aborted.

use crate::api::provider::QueryExecutor;
use crate::api::types::{QueryBatch, QueryMode};
use crate::error::{QueryError, QueryResult};
use crate::table::RecordTable;
use futures::future::{AbortRegistration, Abortable};
use std::fmt;
use std::time::{Duration, Instant};

fn plural(n: i64) -> &'static str {
    if n == 1 { "" } else { "s" }
}

/// Progress and outcome of an export
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportStatus {
    Started,
    InProgress { completed: usize, total: i64 },
    /// Finished, or aborted by the caller after `exported` records
    Completed { exported: usize, total: i64 },
    /// A page failed after some records were merged
    StoppedByError {
        exported: usize,
        total: i64,
        message: String,
    },
    /// The first page failed; there is nothing to show
    Failed { message: String },
}

impl ExportStatus {
    pub fn is_working(&self) -> bool {
        matches!(self, ExportStatus::Started | ExportStatus::InProgress { .. })
    }

    /// Error message to show next to the status, if any
    pub fn error(&self) -> Option<&str> {
        match self {
            ExportStatus::Failed { message } => Some(message),
            _ => None,
        }
    }
}

impl fmt::Display for ExportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportStatus::Started => write!(f, "Exporting..."),
            ExportStatus::InProgress { completed, total } => write!(
                f,
                "Exporting... Completed {completed} of {total} record{}.",
                plural(*total)
            ),
            ExportStatus::Completed { exported: 0, total } => {
                write!(f, "No data exported.")?;
                if *total > 0 {
                    write!(f, " {total} record{}.", plural(*total))?;
                }
                Ok(())
            }
            ExportStatus::Completed { exported, total } => {
                write!(f, "Exported {exported}")?;
                if *exported as i64 != *total {
                    write!(f, " of {total}")?;
                }
                write!(f, " record{}", plural(*exported as i64))
            }
            ExportStatus::StoppedByError {
                exported, total, ..
            } => write!(
                f,
                "Exported {exported} of {total} record{}. Stopped by error.",
                plural(*total)
            ),
            ExportStatus::Failed { .. } => write!(f, "Error"),
        }
    }
}

/// Per-batch timing of one export
#[derive(Debug, Clone)]
pub struct BatchTimer {
    started: Instant,
    last: Instant,
    batches: Vec<Duration>,
    total: Duration,
}

impl Default for BatchTimer {
    fn default() -> Self {
        Self::start()
    }
}

/// Timing summary shown next to the export status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerfSummary {
    /// `"{n} Batches / {total}ms"`, or just the total for a single batch
    pub text: String,
    /// Average, min and max batch time; empty for a single batch
    pub batch_stats: String,
}

impl BatchTimer {
    pub fn start() -> Self {
        let now = Instant::now();
        Self {
            started: now,
            last: now,
            batches: Vec::new(),
            total: Duration::ZERO,
        }
    }

    /// Close the current batch
    pub fn mark(&mut self) {
        let now = Instant::now();
        self.batches.push(now - self.last);
        self.last = now;
        self.total = now - self.started;
    }

    pub fn summary(&self) -> Option<PerfSummary> {
        summarize(&self.batches, self.total)
    }
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn summarize(batches: &[Duration], total: Duration) -> Option<PerfSummary> {
    if batches.is_empty() {
        return None;
    }
    let total_ms = millis(total);
    if batches.len() == 1 {
        return Some(PerfSummary {
            text: format!("{total_ms:.1}ms"),
            batch_stats: String::new(),
        });
    }
    let times: Vec<f64> = batches.iter().copied().map(millis).collect();
    let avg = times.iter().sum::<f64>() / times.len() as f64;
    let min = times.iter().copied().fold(f64::INFINITY, f64::min);
    let max = times.iter().copied().fold(0.0, f64::max);
    Some(PerfSummary {
        text: format!("{} Batches / {total_ms:.1}ms", batches.len()),
        batch_stats: format!("Batch Performance: Avg {avg:.1}ms, Min {min:.1}ms, Max {max:.1}ms"),
    })
}

/// Outcome of [`run_export`]
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub status: ExportStatus,
    pub timer: BatchTimer,
}

/// Run `query` into `table`, reporting progress after each page.
///
/// Aborting through the handle paired with `abort` stops the export after
/// the page being merged; that, like a [`QueryError::Cancelled`] from the
/// executor, ends as a normal [`ExportStatus::Completed`] over the records
/// merged so far.
pub async fn run_export<F>(
    executor: &dyn QueryExecutor,
    mode: QueryMode,
    query: &str,
    table: &mut RecordTable,
    abort: AbortRegistration,
    mut on_progress: F,
) -> ExportReport
where
    F: FnMut(&ExportStatus),
{
    let mut timer = BatchTimer::start();
    on_progress(&ExportStatus::Started);
    tracing::info!(%mode, "export started");

    let fetch = fetch_pages(executor, mode, query, table, &mut timer, &mut on_progress);
    let result = match Abortable::new(fetch, abort).await {
        Ok(result) => result,
        Err(_aborted) => Err(QueryError::Cancelled),
    };

    let exported = table.record_count();
    let total = table.total_size;
    let status = match result {
        Ok(()) => ExportStatus::Completed { exported, total },
        Err(QueryError::Cancelled) => {
            tracing::info!(exported, "export cancelled");
            ExportStatus::Completed { exported, total }
        }
        Err(err) if total != -1 => {
            tracing::warn!(exported, total, error = %err, "export stopped by error");
            ExportStatus::StoppedByError {
                exported,
                total,
                message: err.to_string(),
            }
        }
        Err(err) => {
            tracing::warn!(error = %err, "export failed");
            ExportStatus::Failed {
                message: err.to_string(),
            }
        }
    };
    timer.mark();
    on_progress(&status);
    ExportReport { status, timer }
}

async fn fetch_pages<F>(
    executor: &dyn QueryExecutor,
    mode: QueryMode,
    query: &str,
    table: &mut RecordTable,
    timer: &mut BatchTimer,
    on_progress: &mut F,
) -> QueryResult<()>
where
    F: FnMut(&ExportStatus),
{
    let mut batch = executor.query(mode, query).await?;
    loop {
        merge(mode, table, &batch);
        match batch.next_records_url.take() {
            Some(next) if mode.paginates() && !batch.done => {
                timer.mark();
                on_progress(&ExportStatus::InProgress {
                    completed: table.record_count(),
                    total: table.total_size,
                });
                batch = executor.next_batch(&next).await?;
            }
            _ => return Ok(()),
        }
    }
}

fn merge(mode: QueryMode, table: &mut RecordTable, batch: &QueryBatch) {
    table.add_batch(batch.records_for(mode));
    if mode == QueryMode::Search {
        table.total_size = table.record_count() as i64;
    } else if batch.total_size != -1 {
        table.total_size = batch.total_size;
    }
    tracing::debug!(
        records = table.record_count(),
        total = table.total_size,
        "batch merged"
    );
}
