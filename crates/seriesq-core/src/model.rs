//! Event payloads and descriptor vocabulary.
//!
//! Stores hand descriptors over as display strings. The engine resolves them
//! into [`DataType`], [`Semantics`], [`MetricId`] and [`InDomId`] so that
//! sentinel values are explicit variants rather than magic text.

use std::fmt;

/// Null value for an unresolved metric or instance-domain identifier.
pub const NULL_ID: u32 = 0xffff_ffff;

// ---------------------------------------------------------------------------
// Event payloads
// ---------------------------------------------------------------------------

/// Metric descriptor for one series, as display strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeriesDesc {
    pub indom: String,
    pub pmid: String,
    pub semantics: String,
    pub source: String,
    pub value_type: String,
    pub units: String,
}

/// One instance of a series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesInst {
    /// Internal instance identifier, usually numeric text.
    pub instid: String,
    /// External instance name.
    pub name: String,
    /// Series identifier of the instance itself.
    pub series: String,
}

/// A resolved label; `value` is JSON text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesLabel {
    pub name: String,
    pub value: String,
}

/// One sampled value. `series` names the instance series for instance values,
/// otherwise it equals the series the event is delivered for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesValue {
    pub timestamp: String,
    pub series: String,
    pub data: String,
}

// ---------------------------------------------------------------------------
// Value types
// ---------------------------------------------------------------------------

/// Known value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    I32,
    I64,
    U32,
    U64,
    Float,
    Double,
    String,
    Aggregate,
    AggregateStatic,
    Event,
    HighresEvent,
}

impl ValueType {
    /// Human phrase used in descriptor reports.
    pub fn phrase(self) -> &'static str {
        match self {
            Self::I32 => "32-bit int",
            Self::I64 => "64-bit int",
            Self::U32 => "32-bit unsigned int",
            Self::U64 => "64-bit unsigned int",
            Self::Float => "float",
            Self::Double => "double",
            Self::String => "string",
            Self::Aggregate => "aggregate",
            Self::AggregateStatic => "aggregate static",
            Self::Event => "event record array",
            Self::HighresEvent => "highres event record array",
        }
    }

    /// Aggregate payloads are opaque bytes and get escaped on output.
    pub fn is_aggregate(self) -> bool {
        matches!(self, Self::Aggregate | Self::AggregateStatic)
    }
}

/// Resolved descriptor type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    Known(ValueType),
    /// The collector does not support this metric.
    Unsupported,
    /// Type text the client does not recognise, kept verbatim.
    Unresolved(String),
}

impl DataType {
    /// Parse a store type word. Matching is case-insensitive.
    pub fn parse(word: &str) -> Self {
        let known = match word.to_ascii_uppercase().as_str() {
            "32" => ValueType::I32,
            "64" => ValueType::I64,
            "U32" => ValueType::U32,
            "U64" => ValueType::U64,
            "FLOAT" => ValueType::Float,
            "DOUBLE" => ValueType::Double,
            "STRING" => ValueType::String,
            "AGGREGATE" => ValueType::Aggregate,
            "AGGREGATE_STATIC" => ValueType::AggregateStatic,
            "EVENT" => ValueType::Event,
            "HIGHRES_EVENT" => ValueType::HighresEvent,
            "NO_SUPPORT" => return Self::Unsupported,
            _ => return Self::Unresolved(word.to_string()),
        };
        Self::Known(known)
    }

    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            Self::Known(t) => Some(*t),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(t) => write!(f, "{}", t.phrase()),
            Self::Unsupported => write!(f, "Not Supported"),
            Self::Unresolved(raw) => write!(f, "??? ({raw})"),
        }
    }
}

/// Resolved descriptor semantics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Semantics {
    Counter,
    Instant,
    Discrete,
    Unresolved(String),
}

impl Semantics {
    pub fn parse(word: &str) -> Self {
        match word.to_ascii_lowercase().as_str() {
            "counter" => Self::Counter,
            "instant" => Self::Instant,
            "discrete" => Self::Discrete,
            _ => Self::Unresolved(word.to_string()),
        }
    }
}

impl fmt::Display for Semantics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Counter => write!(f, "counter"),
            Self::Instant => write!(f, "instant"),
            Self::Discrete => write!(f, "discrete"),
            Self::Unresolved(raw) => write!(f, "??? ({raw})"),
        }
    }
}

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Metric identifier `domain.cluster.item`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricId {
    pub domain: u32,
    pub cluster: u32,
    pub item: u32,
}

impl MetricId {
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.split('.');
        let domain = parts.next()?.parse().ok()?;
        let cluster = parts.next()?.parse().ok()?;
        let item = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self {
            domain,
            cluster,
            item,
        })
    }

    /// Packed form: 9-bit domain, 12-bit cluster, 10-bit item.
    pub fn packed(self) -> u32 {
        ((self.domain & 0x1ff) << 22) | ((self.cluster & 0xfff) << 10) | (self.item & 0x3ff)
    }

    /// Packed value of a descriptor field, [`NULL_ID`] when unresolved.
    pub fn packed_or_null(text: &str) -> u32 {
        Self::parse(text).map_or(NULL_ID, Self::packed)
    }
}

/// Instance-domain identifier `domain.serial`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InDomId {
    pub domain: u32,
    pub serial: u32,
}

impl InDomId {
    pub fn parse(text: &str) -> Option<Self> {
        let (domain, serial) = text.split_once('.')?;
        Some(Self {
            domain: domain.parse().ok()?,
            serial: serial.parse().ok()?,
        })
    }

    /// Packed form: 9-bit domain, 22-bit serial.
    pub fn packed(self) -> u32 {
        ((self.domain & 0x1ff) << 22) | (self.serial & 0x3f_ffff)
    }

    pub fn packed_or_null(text: &str) -> u32 {
        Self::parse(text).map_or(NULL_ID, Self::packed)
    }
}

// ---------------------------------------------------------------------------
// Value rendering
// ---------------------------------------------------------------------------

/// Quote and escape an opaque payload so it prints on a single line.
pub fn quote_repr(data: &str) -> String {
    let mut out = String::with_capacity(data.len() + 2);
    out.push('"');
    for c in data.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{07}' => out.push_str("\\a"),
            '\u{08}' => out.push_str("\\b"),
            c if c.is_control() => {
                let mut buf = [0u8; 4];
                for b in c.encode_utf8(&mut buf).bytes() {
                    out.push_str(&format!("\\x{b:02x}"));
                }
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Render a sampled value according to the series value type.
pub fn render_value(value_type: Option<ValueType>, data: &str) -> String {
    match value_type {
        Some(t) if t.is_aggregate() => quote_repr(data),
        Some(ValueType::String) => format!("\"{data}\""),
        _ => data.to_string(),
    }
}
