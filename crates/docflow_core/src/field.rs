//! Decoded extraction results.
//!
//! The backend returns extracted fields as a loosely typed JSON object. Values
//! are decoded once into [`FieldValue`] so the rest of the crate matches on a
//! closed set of shapes instead of probing JSON at display time.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// One decoded value of an extracted field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(Number),
    Bool(bool),
    Null,
    /// An array whose items are all strings.
    List(Vec<String>),
    /// An object carrying both `text` and `conf`. `raw` keeps every key the
    /// backend sent, including siblings such as `bbox`.
    Scored {
        text: String,
        conf: String,
        raw: Map<String, Value>,
    },
    Object(Map<String, Value>),
    /// An array with at least one non-string item.
    Array(Vec<Value>),
}

impl FieldValue {
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::String(text) => FieldValue::Text(text),
            Value::Number(n) => FieldValue::Number(n),
            Value::Bool(b) => FieldValue::Bool(b),
            Value::Null => FieldValue::Null,
            Value::Array(items) => {
                if items.iter().all(Value::is_string) {
                    FieldValue::List(
                        items
                            .into_iter()
                            .filter_map(|item| match item {
                                Value::String(s) => Some(s),
                                _ => None,
                            })
                            .collect(),
                    )
                } else {
                    FieldValue::Array(items)
                }
            }
            Value::Object(map) => {
                let scored = match (map.get("text"), map.get("conf")) {
                    (Some(text), Some(conf)) => Some((plain_text(text), plain_text(conf))),
                    _ => None,
                };
                match scored {
                    Some((text, conf)) => FieldValue::Scored {
                        text,
                        conf,
                        raw: map,
                    },
                    None => FieldValue::Object(map),
                }
            }
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Text(text) => Value::String(text.clone()),
            FieldValue::Number(n) => Value::Number(n.clone()),
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Null => Value::Null,
            FieldValue::List(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
            FieldValue::Scored { raw, .. } | FieldValue::Object(raw) => Value::Object(raw.clone()),
            FieldValue::Array(items) => Value::Array(items.clone()),
        }
    }

    /// Confidence as sent by the backend (a percentage), only present for
    /// scored values.
    pub fn confidence(&self) -> Option<&str> {
        match self {
            FieldValue::Scored { conf, .. } => Some(conf.as_str()),
            _ => None,
        }
    }

    /// Display lines for this value.
    pub fn display_lines(&self) -> Vec<String> {
        match self {
            FieldValue::Text(text) if text.is_empty() => vec!["N/A".to_string()],
            FieldValue::Text(text) => vec![text.clone()],
            FieldValue::Number(n) => vec![n.to_string()],
            FieldValue::Bool(b) => vec![b.to_string()],
            FieldValue::Null => vec!["N/A".to_string()],
            FieldValue::List(items) => items.iter().map(|item| format!("• {item}")).collect(),
            FieldValue::Scored { text, .. } => vec![text.clone()],
            FieldValue::Object(_) | FieldValue::Array(_) => vec![format!("{:#}", self.to_json())],
        }
    }
}

/// Strings verbatim, whole numbers without a fraction, anything else as JSON.
fn plain_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{f:.0}"),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

/// A single named field, in the order the backend sent it.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedField {
    pub key: String,
    pub value: FieldValue,
}

impl ExtractedField {
    /// Human-readable label: underscores become spaces.
    pub fn label(&self) -> String {
        self.key.replace('_', " ")
    }
}

/// Structured extraction result, decoded from the `info` object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct ExtractionFields {
    fields: Vec<ExtractedField>,
}

impl ExtractionFields {
    pub fn from_json_map(map: Map<String, Value>) -> Self {
        let fields = map
            .into_iter()
            .map(|(key, value)| ExtractedField {
                key,
                value: FieldValue::from_json(value),
            })
            .collect();
        Self { fields }
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.to_json_map())
    }

    fn to_json_map(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .map(|field| (field.key.clone(), field.value.to_json()))
            .collect()
    }

    /// Pretty-printed JSON with two-space indentation.
    pub fn to_json_pretty(&self) -> String {
        format!("{:#}", self.to_json())
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|field| field.key == key)
            .map(|field| &field.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExtractedField> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Map<String, Value>> for ExtractionFields {
    fn from(map: Map<String, Value>) -> Self {
        Self::from_json_map(map)
    }
}

impl From<ExtractionFields> for Map<String, Value> {
    fn from(fields: ExtractionFields) -> Self {
        fields.to_json_map()
    }
}
