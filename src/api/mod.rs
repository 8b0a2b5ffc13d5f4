//! Query execution: endpoints, result pages, executors and the export driver

pub mod export;
pub mod provider;
pub mod types;

pub use export::{BatchTimer, ExportReport, ExportStatus, PerfSummary, run_export};
pub use provider::{FixtureExecutor, QueryExecutor, fetch_values, parse_batch};
pub use types::{QueryBatch, QueryMode};
