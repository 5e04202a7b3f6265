//! Report assembly engine.
//!
//! [`ReportEngine`] consumes store events as they arrive and writes the report
//! incrementally. It owns the [`ReportState`] for the series currently being
//! reported and switches it whenever an event names a different series, so
//! each series' output stays in one block.

use std::collections::TryReserveError;
use std::fmt;
use std::io::Write;

use log::debug;

use crate::PROGNAME;
use crate::error::{Result, StoreError};
use crate::handler::SeriesHandler;
use crate::model::{
    DataType, InDomId, MetricId, Semantics, SeriesDesc, SeriesInst, SeriesLabel, SeriesValue,
    render_value,
};
use crate::options::ReportFlags;
use crate::output::{LogLevel, ReportWriter};
use crate::state::{ReportState, label_names, push_label, render_labels};

/// Result of one invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Outcome {
    /// Some request or identifier list failed.
    pub failed: bool,
}

impl Outcome {
    pub fn exit_code(&self) -> i32 {
        i32::from(self.failed)
    }
}

/// Streaming report builder; implements [`SeriesHandler`].
pub struct ReportEngine<O: Write, E: Write> {
    flags: ReportFlags,
    state: ReportState,
    out: ReportWriter<O>,
    err: ReportWriter<E>,
    failed: bool,
}

impl<O: Write, E: Write> ReportEngine<O, E> {
    pub fn new(flags: ReportFlags, out: O, err: E) -> Self {
        Self {
            flags,
            state: ReportState::new(),
            out: ReportWriter::new(out),
            err: ReportWriter::new(err),
            failed: false,
        }
    }

    pub fn flags(&self) -> &ReportFlags {
        &self.flags
    }

    pub fn state(&self) -> &ReportState {
        &self.state
    }

    /// Start a fresh report; pending output is terminated.
    pub fn reset(&mut self) {
        self.out.end_topic();
        self.state = ReportState::new();
    }

    /// Series boundary check. Returns true when `series` differs from the
    /// series being reported, after flushing line state and resetting the
    /// accumulated instances, source and value type.
    pub fn advance(&mut self, series: &str) -> bool {
        if self.state.series() == series {
            return false;
        }
        self.out.clear_continuation();
        self.out.end_line();
        self.state.switch_to(series);
        true
    }

    /// Blank line, then the identifier on a line of its own.
    pub fn header(&mut self, series: &str) {
        self.out.line(format_args!("\n{series}"));
    }

    pub fn end_topic(&mut self) {
        self.out.end_topic();
    }

    pub fn end_line(&mut self) {
        self.out.end_line();
    }

    /// Cached source of the current series, empty when unknown.
    pub fn source(&self) -> &str {
        self.state.source()
    }

    pub fn set_instance_scoped(&mut self, scoped: bool) {
        self.state.set_instance_scoped(scoped);
    }

    pub fn instance_series(&self) -> Vec<String> {
        self.state.instance_series()
    }

    /// Report a client-side failure and mark the invocation failed.
    pub fn fail(&mut self, message: impl fmt::Display) {
        self.out.end_line();
        self.err.line(format_args!("{PROGNAME}: {message}"));
        self.failed = true;
    }

    pub fn failed(&self) -> bool {
        self.failed
    }

    fn allocation_failed(&mut self, what: &str, error: TryReserveError) {
        self.out.end_line();
        self.err
            .line(format_args!("{PROGNAME}: failed to allocate {what}: {error}"));
    }

    // -----------------------------------------------------------------------
    // Topic summaries, emitted after a request completes
    // -----------------------------------------------------------------------

    /// `    labels {...}` for the series, unless empty or names-only.
    pub fn report_metric_labels(&mut self) {
        if self.flags.names_only {
            return;
        }
        let labels = render_labels(self.state.labels_mut());
        if labels.len() > 2 {
            self.out.line(format_args!("    labels {labels}"));
        }
    }

    /// Sort the instances and list them when instances were asked for.
    pub fn report_instances(&mut self) {
        self.state.sort_instances();
        if !self.flags.instances {
            return;
        }
        for ip in self.state.instances() {
            if self.flags.series_id {
                self.out
                    .line(format_args!("    {} series {}", ip.tag(), ip.series));
            } else {
                self.out.line(format_args!("    {}", ip.tag()));
            }
        }
    }

    /// One line of labels per instance.
    pub fn report_instance_labels(&mut self) {
        let names_only = self.flags.names_only;
        let mut lines = Vec::new();
        for ip in self.state.instances() {
            if names_only {
                let names = label_names(&ip.labels);
                if !names.is_empty() {
                    lines.push(format!("    {} labels: {}", ip.tag(), names.join(", ")));
                }
            } else {
                let mut labels = ip.labels.clone();
                lines.push(format!("    {} labels {}", ip.tag(), render_labels(&mut labels)));
            }
        }
        for line in lines {
            self.out.line(format_args!("{line}"));
        }
    }

    /// Flush both streams and return the invocation outcome.
    pub fn finish(mut self) -> Result<Outcome> {
        self.out.end_line();
        self.out.flush();
        self.err.flush();
        if let Some(e) = self.out.take_error().or_else(|| self.err.take_error()) {
            return Err(e.into());
        }
        Ok(Outcome {
            failed: self.failed,
        })
    }

    fn descriptor(&mut self, desc: &SeriesDesc) {
        let flags = self.flags;

        if flags.desc || flags.full_pmid {
            let mut line = format!("    PMID: {}", desc.pmid);
            if flags.full_pmid {
                let id = MetricId::packed_or_null(&desc.pmid);
                line.push_str(&format!(" = {id} = 0x{id:x}"));
            }
            self.out.line(format_args!("{line}"));
        }

        let mut segments = Vec::new();
        if flags.desc {
            segments.push(format!("Data Type: {}", DataType::parse(&desc.value_type)));
        }
        if flags.desc || flags.full_indom {
            let mut indom = format!("InDom: {}", desc.indom);
            if flags.full_indom {
                let id = InDomId::packed_or_null(&desc.indom);
                indom.push_str(&format!(" = {id} = 0x{id:x}"));
            }
            segments.push(indom);
        }
        if !segments.is_empty() {
            self.out.line(format_args!("    {}", segments.join("  ")));
        }

        if flags.desc {
            let units = if desc.units.is_empty() {
                "none"
            } else {
                desc.units.as_str()
            };
            self.out.line(format_args!(
                "    Semantics: {}  Units: {units}",
                Semantics::parse(&desc.semantics)
            ));
        }
        if flags.source_id {
            self.out.line(format_args!("    Source: {}", desc.source));
        }
    }
}

impl<O: Write, E: Write> SeriesHandler for ReportEngine<O, E> {
    fn on_match(&mut self, series: &str) {
        if self.advance(series) {
            self.out.line(format_args!("{series}"));
        }
    }

    fn on_desc(&mut self, series: &str, desc: &SeriesDesc) {
        if self.advance(series) {
            self.header(series);
        }
        self.out.end_line();
        self.state.set_data_type(DataType::parse(&desc.value_type));
        self.state.set_source(&desc.source);
        self.descriptor(desc);
    }

    fn on_inst(&mut self, series: &str, inst: &SeriesInst) {
        if self.advance(series) && self.flags.instances {
            self.header(series);
        }
        if let Err(e) = self.state.add_instance(inst) {
            self.allocation_failed("instance", e);
        }
    }

    fn on_instance(&mut self, series: Option<&str>, name: &str) {
        if !self.flags.instances {
            return;
        }
        let Some(series) = series else {
            self.out.line(format_args!("{name}"));
            return;
        };
        if self.advance(series) {
            self.header(series);
        }
        self.out.list_item("Instances", name);
    }

    fn on_label(&mut self, series: Option<&str>, name: &str) {
        let Some(series) = series else {
            self.out.line(format_args!("{name}"));
            return;
        };
        if !self.flags.names_only {
            return;
        }
        if self.state.instance_scoped() {
            let Some(ip) = self.state.instance_mut(series) else {
                return;
            };
            if let Err(e) = push_label(&mut ip.labels, name, None) {
                self.allocation_failed("label", e);
            }
            return;
        }
        if self.advance(series) {
            self.header(series);
        }
        self.out.list_item("Labels", name);
    }

    fn on_labelmap(&mut self, series: &str, label: &SeriesLabel) {
        let added = if self.state.instance_scoped() {
            // Labels for instances not seen yet are dropped.
            let Some(ip) = self.state.instance_mut(series) else {
                return;
            };
            push_label(&mut ip.labels, &label.name, Some(&label.value))
        } else {
            // With -s the instance lines carry the series, so no header.
            if self.advance(series) && !self.flags.series_id {
                self.header(series);
            }
            self.state.add_label(&label.name, Some(&label.value))
        };
        if let Err(e) = added {
            self.allocation_failed("label", e);
        }
    }

    fn on_metric(&mut self, series: Option<&str>, name: &str) {
        let Some(series) = series else {
            self.out.line(format_args!("{name}"));
            return;
        };
        if self.advance(series) {
            self.header(series);
        }
        self.out.list_item("Metric", name);
    }

    fn on_context(&mut self, source: Option<&str>, name: &str) {
        let Some(source) = source else {
            self.out.line(format_args!("{name}"));
            return;
        };
        if self.state.source() != source {
            self.out.end_topic();
            self.header(source);
            self.state.set_source(source);
        }
        self.out.list_item("Context", name);
    }

    fn on_value(&mut self, series: &str, value: &SeriesValue) {
        if self.advance(series) {
            self.header(series);
        }
        let data = render_value(self.state.value_type(), &value.data);
        let timestamp = &value.timestamp;
        if value.series == series {
            self.out.line(format_args!("    [{timestamp}] {data}"));
        } else if let Some(ip) = self.state.instance(&value.series) {
            self.out
                .line(format_args!("    [{timestamp}] {data} \"{}\"", ip.name));
        } else {
            self.out
                .line(format_args!("    [{timestamp}] {data} {}", value.series));
        }
    }

    fn on_info(&mut self, level: LogLevel, message: &str) {
        let colour = self.flags.colour;
        if level == LogLevel::Info {
            self.out.log(level, message, colour);
        } else {
            self.out.end_line();
            self.err.log(level, message, colour);
        }
    }

    fn on_done(&mut self, status: std::result::Result<(), StoreError>) {
        self.out.end_line();
        if let Err(e) = status {
            debug!("request failed with status {}", e.code);
            self.fail(e);
        }
    }
}
