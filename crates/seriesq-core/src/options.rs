//! Reporting options and their validation.
//!
//! [`ReportOptions`] mirrors the command line one flag per field.
//! [`ReportOptions::validate`] rejects conflicting combinations and produces a
//! [`Plan`]: the selected [`Mode`] plus [`ReportFlags`] with every implied
//! flag already applied.

use crate::error::{Result, SeriesError};

/// Flags as given by the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportOptions {
    /// `-a`: all metadata plus source and series annotations.
    pub all: bool,
    /// `-c`: report context names of source identifiers.
    pub contexts: bool,
    /// `-d`: metric descriptors.
    pub desc: bool,
    /// `-i`: instances.
    pub instances: bool,
    /// `-l`: labels.
    pub labels: bool,
    /// `-L`: load into the store instead of reporting.
    pub load: bool,
    /// `-m`: metric names.
    pub metrics: bool,
    /// `-q`: evaluate a query (the default mode).
    pub query: bool,
    /// `-F`: metadata only, no values.
    pub fast: bool,
    /// `-M`: verbose metric identifiers.
    pub full_pmid: bool,
    /// `-I`: verbose instance-domain identifiers.
    pub full_indom: bool,
    /// `-n`: label names only.
    pub names_only: bool,
    /// `-S`: annotate with source identifiers.
    pub source_id: bool,
    /// `-s`: annotate with series identifiers.
    pub series_id: bool,
    /// Colour diagnostics (terminal output).
    pub colour: bool,
}

/// What a single invocation does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Load,
    Query,
    /// Context names for source identifiers.
    Sources,
    /// Metadata for series identifiers.
    Report,
}

/// Effective flags, after implied options are applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportFlags {
    pub desc: bool,
    pub instances: bool,
    pub labels: bool,
    pub metrics: bool,
    pub contexts: bool,
    pub fast: bool,
    pub full_pmid: bool,
    pub full_indom: bool,
    pub names_only: bool,
    pub source_id: bool,
    pub series_id: bool,
    pub colour: bool,
    /// Descriptors must be fetched even without `-d`.
    pub need_descs: bool,
    /// Instances must be fetched even without `-i`.
    pub need_insts: bool,
}

/// A validated invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plan {
    pub mode: Mode,
    pub flags: ReportFlags,
}

impl ReportOptions {
    /// Any of `-d -i -l -m`, after `-a` expansion.
    fn meta(&self) -> bool {
        self.all || self.desc || self.instances || self.labels || self.metrics
    }

    /// Check for conflicts and resolve the mode. `has_text` tells whether any
    /// positional arguments were given.
    pub fn validate(&self, has_text: bool) -> Result<Plan> {
        let mut errors = Vec::new();
        let meta = self.meta();

        if self.load && (meta || self.contexts) {
            errors.push("cannot use load and reporting options together".to_string());
        }
        if self.load && self.query {
            errors.push("cannot use load and querying options together".to_string());
        }
        if self.query && (meta || self.contexts) {
            errors.push("cannot use query and metadata options together".to_string());
        }

        let flags = ReportFlags {
            desc: self.desc || self.all,
            instances: self.instances || self.all,
            labels: self.labels || self.all,
            metrics: self.metrics || self.all,
            contexts: self.contexts,
            fast: self.fast,
            full_pmid: self.full_pmid,
            full_indom: self.full_indom,
            names_only: self.names_only,
            source_id: self.source_id || self.all,
            series_id: self.series_id || self.all,
            colour: self.colour,
            need_descs: self.full_pmid
                || self.full_indom
                || self.source_id
                || self.series_id
                || self.all,
            need_insts: self.labels || self.all,
        };

        let implied = flags.need_descs || flags.need_insts;
        let query = self.query || !(meta || self.load || self.contexts || implied);

        let mode = if self.load {
            Mode::Load
        } else if query {
            Mode::Query
        } else if self.contexts && !meta {
            Mode::Sources
        } else {
            Mode::Report
        };

        if !has_text && mode == Mode::Query {
            errors.push("no --query string provided".to_string());
        }
        if !has_text && mode == Mode::Load {
            errors.push("no --load string provided".to_string());
        }

        if errors.is_empty() {
            Ok(Plan { mode, flags })
        } else {
            Err(SeriesError::Usage(errors))
        }
    }
}
