//! Socket document schema.
//!
//! The document is a fixed, typed shape. Generic dot-path writes go through
//! its JSON form and are decoded back, so a write that does not fit the
//! shape is rejected instead of corrupting the file. Keys outside the
//! schema are carried in the `extra` map of the object they appear in.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use super::status::SocketStatus;

/// The full persisted document of a socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocketData {
    #[serde(deserialize_with = "lenient::string")]
    pub id: String,
    /// Owner of the job, if the host tracks one.
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub user: Option<String>,
    /// `None` only when a caller explicitly wrote `null`.
    #[serde(default = "undefined_status")]
    pub status: Option<SocketStatus>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub created: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub started: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub finished: Option<String>,
    /// Whether a user has looked at the outcome.
    #[serde(default)]
    pub seen: bool,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub message: Option<String>,
    #[serde(default)]
    pub progress: Progress,
    #[serde(default)]
    pub result: JobResult,
    #[serde(default)]
    pub confirmation: Confirmation,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn undefined_status() -> Option<SocketStatus> {
    Some(SocketStatus::Undefined)
}

/// Progress bar state. `-1` means unknown maximum / not started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Progress {
    pub enabled: bool,
    pub maximum: i64,
    pub position: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            enabled: false,
            maximum: -1,
            position: -1,
            extra: Map::new(),
        }
    }
}

/// Outcome of the job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobResult {
    pub error: bool,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub message: Option<String>,
    #[serde(deserialize_with = "lenient::strings")]
    pub files: Vec<String>,
    pub data: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for JobResult {
    fn default() -> Self {
        Self {
            error: false,
            message: None,
            files: Vec::new(),
            data: Value::Object(Map::new()),
            extra: Map::new(),
        }
    }
}

/// Interactive yes/no/choice gate used while the socket is waiting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Confirmation {
    pub enabled: bool,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub message: Option<String>,
    pub options: Vec<Value>,
    pub answer: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SocketData {
    /// Fresh document with every field at its default.
    pub fn new(id: impl Into<String>, created: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            user: None,
            status: Some(SocketStatus::Undefined),
            created: Some(created.into()),
            started: None,
            finished: None,
            seen: false,
            title: None,
            message: None,
            progress: Progress::default(),
            result: JobResult::default(),
            confirmation: Confirmation::default(),
            extra: Map::new(),
        }
    }

    /// JSON form of the document, as addressed by dot paths.
    pub fn to_document(&self) -> Value {
        serde_json::to_value(self).unwrap_or_default()
    }

    /// Decode a JSON document back into the typed shape.
    pub fn from_document(doc: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(doc)
    }

    /// On-disk encoding: 4-space pretty JSON, canonical numeric strings
    /// written as numbers.
    pub fn to_pretty_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        let doc = numeric_check(self.to_document());
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
        doc.serialize(&mut ser)?;
        Ok(out)
    }
}

/// Replace every string that is the canonical spelling of a number with
/// that number. Object keys are left alone.
pub fn numeric_check(value: Value) -> Value {
    match value {
        Value::String(s) => match canonical_number(&s) {
            Some(n) => Value::Number(n),
            None => Value::String(s),
        },
        Value::Array(items) => Value::Array(items.into_iter().map(numeric_check).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, numeric_check(v)))
                .collect(),
        ),
        other => other,
    }
}

/// `Some` only when formatting the number back yields `s` exactly, so
/// `"007"` or `"1e3"` stay strings and reloads are lossless.
fn canonical_number(s: &str) -> Option<Number> {
    if let Ok(n) = s.parse::<i64>() {
        return (n.to_string() == s).then(|| Number::from(n));
    }
    let f: f64 = s.parse().ok()?;
    let n = Number::from_f64(f)?;
    (n.to_string() == s).then_some(n)
}

/// Deserializers that accept the numbers `numeric_check` produced in
/// places the schema expects strings.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Number;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose {
        Text(String),
        Number(Number),
    }

    impl From<Loose> for String {
        fn from(loose: Loose) -> Self {
            match loose {
                Loose::Text(s) => s,
                Loose::Number(n) => n.to_string(),
            }
        }
    }

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Loose::deserialize(d).map(String::from)
    }

    pub fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Option::<Loose>::deserialize(d).map(|v| v.map(String::from))
    }

    pub fn strings<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        Vec::<Loose>::deserialize(d).map(|v| v.into_iter().map(String::from).collect())
    }
}
