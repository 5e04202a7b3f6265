//! Callback interface between a store and its consumer.
//!
//! A store invokes these methods zero or more times per request and finishes
//! every request with exactly one [`SeriesHandler::on_done`]. Methods taking
//! an `Option` series are also used for global name enumeration, signalled by
//! `None`.

use crate::error::StoreError;
use crate::model::{SeriesDesc, SeriesInst, SeriesLabel, SeriesValue};
use crate::output::LogLevel;

pub trait SeriesHandler {
    /// A query resolved to `series`.
    fn on_match(&mut self, series: &str);

    /// Descriptor for `series`.
    fn on_desc(&mut self, series: &str, desc: &SeriesDesc);

    /// An instance of `series`.
    fn on_inst(&mut self, series: &str, inst: &SeriesInst);

    /// Instance name, for `series` or (with `None`) from the global listing.
    fn on_instance(&mut self, series: Option<&str>, name: &str);

    /// Label name, for `series` or from the global listing.
    fn on_label(&mut self, series: Option<&str>, name: &str);

    /// Resolved label of a metric or instance series.
    fn on_labelmap(&mut self, series: &str, label: &SeriesLabel);

    /// Metric name, for `series` or from the global listing.
    fn on_metric(&mut self, series: Option<&str>, name: &str);

    /// Context name, for a `source` or from the global listing.
    fn on_context(&mut self, source: Option<&str>, name: &str);

    /// One sampled value of `series`.
    fn on_value(&mut self, series: &str, value: &SeriesValue);

    /// Diagnostic from the store.
    fn on_info(&mut self, level: LogLevel, message: &str);

    /// Terminal event of a request.
    fn on_done(&mut self, status: Result<(), StoreError>);
}
