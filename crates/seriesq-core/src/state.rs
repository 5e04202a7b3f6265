//! Per-series report state: the accumulator for the series currently being
//! reported, with instance dedup and deterministic ordering for emission.

use std::cmp::Ordering;
use std::collections::TryReserveError;

use crate::model::{DataType, SeriesInst, ValueType};

/// A label collected for a series or an instance.
///
/// `value` is `None` when only the label name has been seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub name: String,
    pub value: Option<String>,
}

/// An instance of the series being reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub instid: String,
    pub name: String,
    /// The instance's own series identifier.
    pub series: String,
    pub labels: Vec<Label>,
}

impl Instance {
    fn from_event(inst: &SeriesInst) -> Self {
        Self {
            instid: inst.instid.clone(),
            name: inst.name.clone(),
            series: inst.series.clone(),
            labels: Vec::new(),
        }
    }

    /// `inst [1 or "cpu1"]`
    pub fn tag(&self) -> String {
        format!("inst [{} or \"{}\"]", self.instid, self.name)
    }
}

/// The live aggregate for the series currently being reported.
#[derive(Debug, Default)]
pub struct ReportState {
    series: String,
    source: String,
    data_type: Option<DataType>,
    labels: Vec<Label>,
    instances: Vec<Instance>,
    instance_scoped: bool,
}

impl ReportState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn series(&self) -> &str {
        &self.series
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn set_source(&mut self, source: &str) {
        source.clone_into(&mut self.source);
    }

    pub fn set_data_type(&mut self, data_type: DataType) {
        self.data_type = Some(data_type);
    }

    /// Sticky value type used to render sampled values.
    pub fn value_type(&self) -> Option<ValueType> {
        self.data_type.as_ref().and_then(DataType::value_type)
    }

    /// Switch to `series`, dropping source, type and every instance.
    ///
    /// Metric-level labels survive; they belong to the per-identifier report.
    pub fn switch_to(&mut self, series: &str) {
        series.clone_into(&mut self.series);
        self.source.clear();
        self.data_type = None;
        self.instances.clear();
    }

    /// Whether label events currently target instances rather than the series.
    pub fn instance_scoped(&self) -> bool {
        self.instance_scoped
    }

    pub fn set_instance_scoped(&mut self, scoped: bool) {
        self.instance_scoped = scoped;
    }

    // -----------------------------------------------------------------------
    // Instances
    // -----------------------------------------------------------------------

    /// Insert an instance unless one with the same series id is present.
    ///
    /// Returns `Ok(false)` for a duplicate.
    pub fn add_instance(&mut self, inst: &SeriesInst) -> Result<bool, TryReserveError> {
        if self.instance(&inst.series).is_some() {
            return Ok(false);
        }
        self.instances.try_reserve(1)?;
        self.instances.push(Instance::from_event(inst));
        Ok(true)
    }

    pub fn instance(&self, series: &str) -> Option<&Instance> {
        self.instances.iter().find(|ip| ip.series == series)
    }

    pub fn instance_mut(&mut self, series: &str) -> Option<&mut Instance> {
        self.instances.iter_mut().find(|ip| ip.series == series)
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    /// Order instances by numeric id, then by name.
    pub fn sort_instances(&mut self) {
        self.instances.sort_by(compare_instances);
    }

    /// Series identifiers of all instances, in current order.
    pub fn instance_series(&self) -> Vec<String> {
        self.instances.iter().map(|ip| ip.series.clone()).collect()
    }

    // -----------------------------------------------------------------------
    // Labels
    // -----------------------------------------------------------------------

    pub fn add_label(&mut self, name: &str, value: Option<&str>) -> Result<(), TryReserveError> {
        push_label(&mut self.labels, name, value)
    }

    pub fn labels_mut(&mut self) -> &mut [Label] {
        &mut self.labels
    }
}

/// Append a label, reserving first so that exhaustion drops only this label.
pub fn push_label(
    labels: &mut Vec<Label>,
    name: &str,
    value: Option<&str>,
) -> Result<(), TryReserveError> {
    labels.try_reserve(1)?;
    labels.push(Label {
        name: name.to_string(),
        value: value.map(str::to_string),
    });
    Ok(())
}

/// Sort labels by name and render the valued ones as `{"a":1,"b":2}`.
pub fn render_labels(labels: &mut [Label]) -> String {
    labels.sort_by(|a, b| a.name.cmp(&b.name));
    let body: Vec<String> = labels
        .iter()
        .filter_map(|lp| lp.value.as_ref().map(|v| format!("\"{}\":{}", lp.name, v)))
        .collect();
    format!("{{{}}}", body.join(","))
}

/// Distinct label names in sorted order.
pub fn label_names(labels: &[Label]) -> Vec<&str> {
    let mut names: Vec<&str> = labels.iter().map(|lp| lp.name.as_str()).collect();
    names.sort_unstable();
    names.dedup();
    names
}

/// Leading integer of an instance id, 0 when there is none.
fn numeric_id(text: &str) -> i64 {
    let text = text.trim_start();
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, text.strip_prefix('+').unwrap_or(text)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().map_or(0, |n| sign * n)
}

fn compare_instances(a: &Instance, b: &Instance) -> Ordering {
    numeric_id(&a.instid)
        .cmp(&numeric_id(&b.instid))
        .then_with(|| a.name.cmp(&b.name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inst(instid: &str, name: &str, series: &str) -> SeriesInst {
        SeriesInst {
            instid: instid.into(),
            name: name.into(),
            series: series.into(),
        }
    }

    // -----------------------------------------------------------------------
    // Instances
    // -----------------------------------------------------------------------

    #[test]
    fn duplicate_instance_series_is_ignored() {
        let mut state = ReportState::new();
        assert!(state.add_instance(&inst("0", "cpu0", "i0")).unwrap());
        assert!(!state.add_instance(&inst("0", "cpu0", "i0")).unwrap());
        assert_eq!(state.instances().len(), 1);
    }

    #[test]
    fn instances_sort_numerically() {
        let mut state = ReportState::new();
        for (id, series) in [("10", "a"), ("2", "b"), ("1", "c")] {
            state.add_instance(&inst(id, "same", series)).unwrap();
        }
        state.sort_instances();
        let ids: Vec<&str> = state.instances().iter().map(|i| i.instid.as_str()).collect();
        assert_eq!(ids, ["1", "2", "10"]);
    }

    #[test]
    fn equal_ids_sort_by_name() {
        let mut state = ReportState::new();
        state.add_instance(&inst("3", "zeta", "a")).unwrap();
        state.add_instance(&inst("3", "alpha", "b")).unwrap();
        state.sort_instances();
        assert_eq!(state.instances()[0].name, "alpha");
    }

    #[test]
    fn switching_series_drops_instances_and_type() {
        let mut state = ReportState::new();
        state.switch_to("s1");
        state.set_source("src");
        state.set_data_type(DataType::parse("STRING"));
        state.add_instance(&inst("1", "one", "i1")).unwrap();
        state.switch_to("s2");
        assert_eq!(state.series(), "s2");
        assert!(state.source().is_empty());
        assert!(state.value_type().is_none());
        assert!(state.instances().is_empty());
    }

    #[test]
    fn numeric_id_follows_leading_digits() {
        assert_eq!(numeric_id("42"), 42);
        assert_eq!(numeric_id("-3"), -3);
        assert_eq!(numeric_id("7abc"), 7);
        assert_eq!(numeric_id("abc"), 0);
    }

    // -----------------------------------------------------------------------
    // Labels
    // -----------------------------------------------------------------------

    #[test]
    fn labels_render_sorted() {
        let mut labels = Vec::new();
        push_label(&mut labels, "b", Some("1")).unwrap();
        push_label(&mut labels, "a", Some("2")).unwrap();
        assert_eq!(render_labels(&mut labels), "{\"a\":2,\"b\":1}");
    }

    #[test]
    fn name_only_labels_are_not_rendered_as_values() {
        let mut labels = Vec::new();
        push_label(&mut labels, "host", None).unwrap();
        assert_eq!(render_labels(&mut labels), "{}");
        assert_eq!(label_names(&labels), ["host"]);
    }

    #[test]
    fn label_names_are_distinct() {
        let mut labels = Vec::new();
        push_label(&mut labels, "b", None).unwrap();
        push_label(&mut labels, "a", Some("1")).unwrap();
        push_label(&mut labels, "b", Some("\"x\"")).unwrap();
        assert_eq!(label_names(&labels), ["a", "b"]);
    }
}
