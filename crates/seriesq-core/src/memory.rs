//! Local document store.
//!
//! [`MemoryStore`] answers every [`Request`] from a JSON document held in
//! memory. Loading ingests a second JSON document describing one metrics
//! context, derives content-addressed identifiers for everything in it and
//! writes the merged store document back to disk.
//!
//! Query syntax is `name-or-glob` optionally followed by label filters:
//! `kernel.*.load{hostname=="box",agent=="linux"}`.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use crate::error::{Result, SeriesError, StoreError};
use crate::handler::SeriesHandler;
use crate::model::{SeriesDesc, SeriesInst, SeriesLabel, SeriesValue};
use crate::output::LogLevel;
use crate::store::{Request, SeriesStore};

/// Hex digits kept from each identifier digest.
const ID_LEN: usize = 40;

// ---------------------------------------------------------------------------
// Store document
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreDocument {
    #[serde(default)]
    pub sources: Vec<SourceRecord>,
    #[serde(default)]
    pub series: Vec<SeriesRecord>,
}

/// A metrics context and the names it was loaded under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub source: String,
    #[serde(default)]
    pub contexts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesRecord {
    pub series: String,
    pub source: String,
    #[serde(default)]
    pub metrics: Vec<String>,
    #[serde(default)]
    pub desc: DescRecord,
    #[serde(default)]
    pub labels: BTreeMap<String, Value>,
    #[serde(default)]
    pub instances: Vec<InstanceRecord>,
    #[serde(default)]
    pub values: Vec<ValueRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescRecord {
    #[serde(default = "none")]
    pub pmid: String,
    #[serde(default = "none")]
    pub indom: String,
    #[serde(default)]
    pub semantics: String,
    #[serde(rename = "type", default)]
    pub value_type: String,
    #[serde(default)]
    pub units: String,
}

impl Default for DescRecord {
    fn default() -> Self {
        Self {
            pmid: none(),
            indom: none(),
            semantics: String::new(),
            value_type: String::new(),
            units: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub series: String,
    pub instid: String,
    pub name: String,
    #[serde(default)]
    pub labels: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueRecord {
    pub timestamp: String,
    /// Instance series, absent for singular metrics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    pub data: Value,
}

fn none() -> String {
    "none".to_string()
}

// ---------------------------------------------------------------------------
// Ingest document
// ---------------------------------------------------------------------------

/// One metrics context to load.
#[derive(Debug, Clone, Deserialize)]
pub struct LoadDocument {
    pub context: String,
    #[serde(default)]
    pub metrics: Vec<LoadMetric>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoadMetric {
    pub name: String,
    #[serde(flatten)]
    pub desc: DescRecord,
    #[serde(default)]
    pub labels: BTreeMap<String, Value>,
    #[serde(default)]
    pub instances: Vec<LoadInstance>,
    #[serde(default)]
    pub values: Vec<LoadValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoadInstance {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub labels: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoadValue {
    pub timestamp: String,
    /// Instance name, absent for singular metrics.
    #[serde(default)]
    pub instance: Option<String>,
    pub data: Value,
}

/// Truncated hex SHA-256 over NUL-separated parts.
fn digest(parts: &[&str]) -> String {
    let mut h = Sha256::new();
    for part in parts {
        h.update(part.as_bytes());
        h.update([0u8]);
    }
    let mut id: String = h.finalize().iter().map(|b| format!("{b:02x}")).collect();
    id.truncate(ID_LEN);
    id
}

/// Data as printed: strings raw, everything else as compact JSON.
fn value_text(data: &Value) -> String {
    match data {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// A parsed query expression.
#[derive(Debug)]
pub struct SeriesQuery {
    matcher: GlobMatcher,
    filters: Vec<(String, Value)>,
}

impl SeriesQuery {
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let (name, filters) = match text.split_once('{') {
            Some((name, rest)) => {
                let body = rest.strip_suffix('}').ok_or_else(|| {
                    SeriesError::Query(format!("unterminated label filter in '{text}'"))
                })?;
                (name.trim(), parse_filters(body)?)
            }
            None => (text, Vec::new()),
        };
        if name.is_empty() {
            return Err(SeriesError::Query(format!("no metric name in '{text}'")));
        }
        let matcher = GlobBuilder::new(name).build()?.compile_matcher();
        Ok(Self { matcher, filters })
    }

    pub fn matches(&self, record: &SeriesRecord) -> bool {
        record.metrics.iter().any(|m| self.matcher.is_match(m))
            && self
                .filters
                .iter()
                .all(|(name, want)| record.labels.get(name) == Some(want))
    }
}

fn parse_filters(body: &str) -> Result<Vec<(String, Value)>> {
    let mut filters = Vec::new();
    for clause in body.split(',').map(str::trim).filter(|c| !c.is_empty()) {
        let (name, value) = clause
            .split_once("==")
            .ok_or_else(|| SeriesError::Query(format!("expected name==value, found '{clause}'")))?;
        let value = value.trim();
        let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
        filters.push((name.trim().to_string(), value));
    }
    Ok(filters)
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Store served from a JSON document.
#[derive(Debug, Default)]
pub struct MemoryStore {
    path: Option<PathBuf>,
    doc: StoreDocument,
}

impl MemoryStore {
    /// Open the document at `path`; a missing file gives an empty store.
    /// Loads are written back to the same path.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let doc = match tokio::fs::read_to_string(&path).await {
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("no store document at {}, starting empty", path.display());
                StoreDocument::default()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path: Some(path),
            doc,
        })
    }

    /// In-memory store; loads are not persisted.
    pub fn from_document(doc: StoreDocument) -> Self {
        Self { path: None, doc }
    }

    pub fn document(&self) -> &StoreDocument {
        &self.doc
    }

    fn find(&self, series: &str) -> Option<&SeriesRecord> {
        self.doc.series.iter().find(|sp| sp.series == series)
    }

    fn find_instance(&self, series: &str) -> Option<&InstanceRecord> {
        self.doc
            .series
            .iter()
            .flat_map(|sp| sp.instances.iter())
            .find(|ip| ip.series == series)
    }

    // -----------------------------------------------------------------------
    // Request handlers
    // -----------------------------------------------------------------------

    fn query(
        &self,
        text: &str,
        metadata_only: bool,
        handler: &mut dyn SeriesHandler,
    ) -> std::result::Result<(), StoreError> {
        let query = SeriesQuery::parse(text)?;
        for sp in self.doc.series.iter().filter(|sp| query.matches(sp)) {
            handler.on_match(&sp.series);
            if metadata_only {
                continue;
            }
            handler.on_desc(&sp.series, &describe(sp));
            for ip in &sp.instances {
                handler.on_inst(&sp.series, &instance(ip));
            }
            for vp in &sp.values {
                let value = SeriesValue {
                    timestamp: vp.timestamp.clone(),
                    series: vp.instance.clone().unwrap_or_else(|| sp.series.clone()),
                    data: value_text(&vp.data),
                };
                handler.on_value(&sp.series, &value);
            }
        }
        Ok(())
    }

    fn descs(&self, ids: &[String], handler: &mut dyn SeriesHandler) {
        for sp in ids.iter().filter_map(|id| self.find(id)) {
            handler.on_desc(&sp.series, &describe(sp));
        }
    }

    fn sources(&self, ids: &[String], handler: &mut dyn SeriesHandler) {
        if ids.is_empty() {
            let names: BTreeSet<&str> = self
                .doc
                .sources
                .iter()
                .flat_map(|src| src.contexts.iter().map(String::as_str))
                .collect();
            for name in names {
                handler.on_context(None, name);
            }
            return;
        }
        for id in ids {
            for src in self.doc.sources.iter().filter(|src| &src.source == id) {
                for name in &src.contexts {
                    handler.on_context(Some(src.source.as_str()), name);
                }
            }
        }
    }

    fn metrics(&self, ids: &[String], handler: &mut dyn SeriesHandler) {
        if ids.is_empty() {
            let names: BTreeSet<&str> = self
                .doc
                .series
                .iter()
                .flat_map(|sp| sp.metrics.iter().map(String::as_str))
                .collect();
            for name in names {
                handler.on_metric(None, name);
            }
            return;
        }
        for sp in ids.iter().filter_map(|id| self.find(id)) {
            for name in &sp.metrics {
                handler.on_metric(Some(sp.series.as_str()), name);
            }
        }
    }

    fn labels(&self, ids: &[String], handler: &mut dyn SeriesHandler) {
        if ids.is_empty() {
            let names: BTreeSet<&str> = self
                .doc
                .series
                .iter()
                .flat_map(|sp| {
                    sp.labels
                        .keys()
                        .chain(sp.instances.iter().flat_map(|ip| ip.labels.keys()))
                })
                .map(String::as_str)
                .collect();
            for name in names {
                handler.on_label(None, name);
            }
            return;
        }
        for id in ids {
            let labels = match self.find(id) {
                Some(sp) => &sp.labels,
                None => match self.find_instance(id) {
                    Some(ip) => &ip.labels,
                    None => continue,
                },
            };
            for (name, value) in labels {
                handler.on_label(Some(id.as_str()), name);
                handler.on_labelmap(id, &SeriesLabel {
                    name: name.clone(),
                    value: value.to_string(),
                });
            }
        }
    }

    fn instances(&self, ids: &[String], handler: &mut dyn SeriesHandler) {
        if ids.is_empty() {
            let names: BTreeSet<&str> = self
                .doc
                .series
                .iter()
                .flat_map(|sp| sp.instances.iter().map(|ip| ip.name.as_str()))
                .collect();
            for name in names {
                handler.on_instance(None, name);
            }
            return;
        }
        for sp in ids.iter().filter_map(|id| self.find(id)) {
            for ip in &sp.instances {
                handler.on_inst(&sp.series, &instance(ip));
            }
        }
    }

    // -----------------------------------------------------------------------
    // Load
    // -----------------------------------------------------------------------

    async fn load(
        &mut self,
        text: &str,
        metadata_only: bool,
        handler: &mut dyn SeriesHandler,
    ) -> Result<()> {
        let path = text.trim();
        let raw = tokio::fs::read_to_string(path).await?;
        let load: LoadDocument = serde_json::from_str(&raw)?;
        let loaded = self.ingest(&load, metadata_only, handler);
        if let Some(store) = &self.path {
            save(store, &self.doc)?;
        }
        handler.on_info(
            LogLevel::Info,
            &format!("loaded {loaded} series from {}", load.context),
        );
        Ok(())
    }

    /// Merge one context into the document. Returns the number of metric
    /// series touched.
    fn ingest(
        &mut self,
        load: &LoadDocument,
        metadata_only: bool,
        handler: &mut dyn SeriesHandler,
    ) -> usize {
        let source = digest(&[load.context.as_str()]);
        match self.doc.sources.iter_mut().find(|src| src.source == source) {
            Some(src) => {
                if !src.contexts.contains(&load.context) {
                    src.contexts.push(load.context.clone());
                }
            }
            None => self.doc.sources.push(SourceRecord {
                source: source.clone(),
                contexts: vec![load.context.clone()],
            }),
        }

        for metric in &load.metrics {
            let record = build_record(&source, metric, metadata_only, handler);
            debug!("ingest {} as {}", metric.name, record.series);
            match self.doc.series.iter_mut().find(|sp| sp.series == record.series) {
                Some(sp) => merge(sp, record),
                None => self.doc.series.push(record),
            }
        }
        load.metrics.len()
    }
}

fn build_record(
    source: &str,
    metric: &LoadMetric,
    metadata_only: bool,
    handler: &mut dyn SeriesHandler,
) -> SeriesRecord {
    let d = &metric.desc;
    let desc_key = format!(
        "{}|{}|{}|{}|{}",
        d.pmid, d.indom, d.value_type, d.semantics, d.units
    );
    let label_key = Value::Object(
        metric
            .labels
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    )
    .to_string();
    let series = digest(&[source, metric.name.as_str(), desc_key.as_str(), label_key.as_str()]);

    let instances: Vec<InstanceRecord> = metric
        .instances
        .iter()
        .map(|inst| InstanceRecord {
            series: digest(&[series.as_str(), inst.name.as_str()]),
            instid: inst.id.to_string(),
            name: inst.name.clone(),
            labels: inst.labels.clone(),
        })
        .collect();

    let mut values = Vec::new();
    if !metadata_only {
        for v in &metric.values {
            let instance = match &v.instance {
                None => None,
                Some(name) => match instances.iter().find(|ip| &ip.name == name) {
                    Some(ip) => Some(ip.series.clone()),
                    None => {
                        let message =
                            format!("{}: skipping value for unknown instance \"{name}\"", metric.name);
                        warn!("{message}");
                        handler.on_info(LogLevel::Warning, &message);
                        continue;
                    }
                },
            };
            values.push(ValueRecord {
                timestamp: v.timestamp.clone(),
                instance,
                data: v.data.clone(),
            });
        }
    }

    SeriesRecord {
        series,
        source: source.to_string(),
        metrics: vec![metric.name.clone()],
        desc: metric.desc.clone(),
        labels: metric.labels.clone(),
        instances,
        values,
    }
}

fn merge(into: &mut SeriesRecord, from: SeriesRecord) {
    for name in from.metrics {
        if !into.metrics.contains(&name) {
            into.metrics.push(name);
        }
    }
    for ip in from.instances {
        if !into.instances.iter().any(|have| have.series == ip.series) {
            into.instances.push(ip);
        }
    }
    for vp in from.values {
        let seen = into
            .values
            .iter()
            .any(|have| have.timestamp == vp.timestamp && have.instance == vp.instance);
        if !seen {
            into.values.push(vp);
        }
    }
}

/// Write the document next to its final path, then rename over it.
fn save(path: &Path, doc: &StoreDocument) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut tmp, doc)?;
    tmp.write_all(b"\n")?;
    tmp.persist(path).map_err(|e| e.error)?;
    debug!("saved store document {}", path.display());
    Ok(())
}

fn describe(sp: &SeriesRecord) -> SeriesDesc {
    SeriesDesc {
        indom: sp.desc.indom.clone(),
        pmid: sp.desc.pmid.clone(),
        semantics: sp.desc.semantics.clone(),
        source: sp.source.clone(),
        value_type: sp.desc.value_type.clone(),
        units: sp.desc.units.clone(),
    }
}

fn instance(ip: &InstanceRecord) -> SeriesInst {
    SeriesInst {
        instid: ip.instid.clone(),
        name: ip.name.clone(),
        series: ip.series.clone(),
    }
}

impl SeriesStore for MemoryStore {
    async fn request(&mut self, request: Request<'_>, handler: &mut dyn SeriesHandler) {
        debug!("{} request", request.kind());
        let status = match request {
            Request::Query { text, metadata_only } => self.query(text, metadata_only, handler),
            Request::Load { text, metadata_only } => self
                .load(text, metadata_only, handler)
                .await
                .map_err(StoreError::from),
            Request::Descs(ids) => {
                self.descs(ids, handler);
                Ok(())
            }
            Request::Sources(ids) => {
                self.sources(ids, handler);
                Ok(())
            }
            Request::Metrics(ids) => {
                self.metrics(ids, handler);
                Ok(())
            }
            Request::Labels(ids) => {
                self.labels(ids, handler);
                Ok(())
            }
            Request::Instances(ids) => {
                self.instances(ids, handler);
                Ok(())
            }
        };
        handler.on_done(status);
    }
}
