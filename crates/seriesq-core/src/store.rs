//! Store interface.
//!
//! A store receives one [`Request`] at a time together with the handler that
//! consumes its events. Data callbacks for the request are delivered before
//! the single [`SeriesHandler::on_done`] that ends it.
//!
//! [`SeriesHandler::on_done`]: crate::handler::SeriesHandler::on_done

use std::path::PathBuf;

use crate::handler::SeriesHandler;

/// Default store host.
pub const DEFAULT_HOST: &str = "localhost";
/// Default store port.
pub const DEFAULT_PORT: u16 = 6379;
/// Default local store document.
pub const DEFAULT_DOCUMENT: &str = "series.json";

/// One request to a store. Identifier lists that are empty ask for a global
/// listing of names instead of per-series data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request<'a> {
    /// Evaluate a query; values follow matches unless `metadata_only`.
    Query { text: &'a str, metadata_only: bool },
    /// Ingest the data named by `text`; values are skipped if `metadata_only`.
    Load { text: &'a str, metadata_only: bool },
    Descs(&'a [String]),
    Sources(&'a [String]),
    Metrics(&'a [String]),
    Labels(&'a [String]),
    Instances(&'a [String]),
}

impl Request<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Query { .. } => "query",
            Self::Load { .. } => "load",
            Self::Descs(_) => "descs",
            Self::Sources(_) => "sources",
            Self::Metrics(_) => "metrics",
            Self::Labels(_) => "labels",
            Self::Instances(_) => "instances",
        }
    }
}

/// Asynchronous series store.
#[allow(async_fn_in_trait)]
pub trait SeriesStore {
    /// Run `request` to completion, delivering its events to `handler`.
    async fn request(&mut self, request: Request<'_>, handler: &mut dyn SeriesHandler);
}

/// Where the store lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    /// `host:port` of the store endpoint.
    pub hostspec: String,
    /// Local document serving that endpoint.
    pub document: PathBuf,
}

impl StoreSettings {
    pub fn new(host: &str, port: u16, document: impl Into<PathBuf>) -> Self {
        Self {
            hostspec: format!("{host}:{port}"),
            document: document.into(),
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT, DEFAULT_DOCUMENT)
    }
}
