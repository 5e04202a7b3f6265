//! # seriesq-core
//!
//! **Streaming reports over a time series store.**
//!
//! `seriesq-core` issues queries and metadata requests to a series store and
//! renders the events it sends back as a topic-grouped text report. Events
//! arrive one at a time through the [`SeriesHandler`] callbacks; the
//! [`ReportEngine`] tracks which series they belong to and writes output as
//! it goes, never holding a whole result set.
//!
//! ## Quick Start
//!
//! ```no_run
//! use seriesq_core::{MemoryStore, ReportOptions, run};
//!
//! # async fn demo() -> seriesq_core::Result<()> {
//! let mut store = MemoryStore::open("series.json").await?;
//! let options = ReportOptions { desc: true, ..Default::default() };
//! let ids = vec!["605fc77742cd0317597291329561ac4e50c0dd12".to_string()];
//! let outcome = run(&mut store, &options, &ids, std::io::stdout(), std::io::stderr()).await?;
//! std::process::exit(outcome.exit_code());
//! # }
//! ```
//!
//! ## Architecture
//!
//! Dispatcher → store → handler callbacks → report state + writer → stdout
//!
//! The dispatcher picks one of four modes (load, query, sources, per-series
//! report) from validated [`ReportOptions`]. Stores implement
//! [`SeriesStore`]; [`MemoryStore`] serves a local JSON document.

pub mod dispatch;
pub mod engine;
pub mod error;
pub mod handler;
pub mod memory;
pub mod model;
pub mod options;
pub mod output;
pub mod state;
pub mod store;

pub use dispatch::{execute, run, split_identifiers};
pub use engine::{Outcome, ReportEngine};
pub use error::{Result, SeriesError, StoreError};
pub use handler::SeriesHandler;
pub use memory::{LoadDocument, MemoryStore, SeriesQuery, StoreDocument};
pub use model::{
    DataType, InDomId, MetricId, NULL_ID, Semantics, SeriesDesc, SeriesInst, SeriesLabel,
    SeriesValue, ValueType,
};
pub use options::{Mode, Plan, ReportFlags, ReportOptions};
pub use output::{LogLevel, ReportWriter};
pub use state::{Instance, Label, ReportState};
pub use store::{DEFAULT_DOCUMENT, DEFAULT_HOST, DEFAULT_PORT, Request, SeriesStore, StoreSettings};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Program name used as the prefix of error lines.
pub const PROGNAME: &str = "seriesq";
