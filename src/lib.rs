//! soqlx - Context-aware SOQL/SOSL autocompletion and record table export
//!
//! soqlx takes a query being edited, with its cursor or selection, and works
//! out what the user may type next: object names, fields, relationships,
//! picklist and date values, SOSL scopes and keywords. It also runs queries
//! page by page into a rectangular record table that can be filtered and
//! serialized.
//!
//! # Architecture
//!
//! - [`metadata`]: describe cache with lazy fetching and dedup
//! - [`query`]: context resolution, suggestion ranking, select-list parsing
//! - [`completer`]: per-editor completion state and text insertion
//! - [`api`]: query execution seam, pagination and export progress
//! - [`table`]: record flattening into columns and rows
//! - [`export`]: CSV / Excel / JSON / preview output
//! - [`app`]: session events and the actions they request
//! - [`config`]: settings file
//! - [`cli`]: command-line front end
//!
//! # Example
//!
//! ```no_run
//! use soqlx::app::{AppEvent, Driver, Session};
//! use soqlx::api::FixtureExecutor;
//! use soqlx::config::Settings;
//! use soqlx::metadata::DirectoryMetadataProvider;
//! use soqlx::query::QuerySpan;
//!
//! # async fn example() {
//! let provider = DirectoryMetadataProvider::new("describes");
//! let executor = FixtureExecutor::new("pages");
//! let driver = Driver::new(&provider, &executor);
//!
//! let mut session = Session::new(Settings::default());
//! let actions = session.handle_event(AppEvent::Edit(QuerySpan::at_end("SELECT Id FROM Acc")));
//! driver.run(&mut session, actions, None).await;
//!
//! if let Some(set) = session.completer.suggestions() {
//!     println!("{}", set.title);
//!     for s in &set.results {
//!         println!("  {}", s.value);
//!     }
//! }
//! # }
//! ```

pub mod api;
pub mod app;
pub mod cli;
pub mod completer;
pub mod config;
pub mod error;
pub mod export;
pub mod metadata;
pub mod query;
pub mod table;

pub use error::{ConfigError, MetadataError, QueryError};
