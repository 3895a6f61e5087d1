//! Dynamically typed document values.
//!
//! Records sampled from a document store are decoded into a closed [`Value`]
//! variant so that inference never has to reflect on arbitrary runtime types.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A sampled document: field name to value.
pub type Record = BTreeMap<String, Value>;

/// Scalar payloads.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    DateTime(DateTime<Utc>),
}

/// A field value as observed in a sampled record.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(Scalar),
    /// A reference to another document (e.g. a MongoDB ObjectId).
    ReferenceId(String),
    Array(Vec<Value>),
    Embedded(Record),
    Null,
}

/// Observed type name of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TypeTag {
    String,
    Integer,
    Float,
    Boolean,
    Datetime,
    ObjectId,
    Array,
    Object,
    Null,
}

impl TypeTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Datetime => "datetime",
            Self::ObjectId => "objectId",
            Self::Array => "array",
            Self::Object => "object",
            Self::Null => "null",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Value {
    /// Runtime type of this value.
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Value::Scalar(Scalar::String(_)) => TypeTag::String,
            Value::Scalar(Scalar::Integer(_)) => TypeTag::Integer,
            Value::Scalar(Scalar::Float(_)) => TypeTag::Float,
            Value::Scalar(Scalar::Boolean(_)) => TypeTag::Boolean,
            Value::Scalar(Scalar::DateTime(_)) => TypeTag::Datetime,
            Value::ReferenceId(_) => TypeTag::ObjectId,
            Value::Array(_) => TypeTag::Array,
            Value::Embedded(_) => TypeTag::Object,
            Value::Null => TypeTag::Null,
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Value::ReferenceId(_))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Value::Scalar(Scalar::String(s.into()))
    }

    pub fn integer(n: i64) -> Self {
        Value::Scalar(Scalar::Integer(n))
    }

    pub fn reference(id: impl Into<String>) -> Self {
        Value::ReferenceId(id.into())
    }

    /// Decode a MongoDB Extended JSON value (canonical or relaxed mode).
    ///
    /// Unknown `$`-prefixed wrappers are kept as embedded documents.
    pub fn from_extended_json(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Scalar(Scalar::Boolean(b)),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::integer(i),
                None => Value::Scalar(Scalar::Float(n.as_f64().unwrap_or(f64::NAN))),
            },
            Json::String(s) => Value::string(s),
            Json::Array(items) => {
                Value::Array(items.into_iter().map(Value::from_extended_json).collect())
            }
            Json::Object(map) => {
                if map.len() == 1 {
                    if let Some((key, inner)) = map.iter().next() {
                        if let Some(decoded) = decode_wrapper(key, inner) {
                            return decoded;
                        }
                    }
                }
                Value::Embedded(
                    map.into_iter()
                        .map(|(k, v)| (k, Value::from_extended_json(v)))
                        .collect(),
                )
            }
        }
    }
}

fn decode_wrapper(key: &str, inner: &serde_json::Value) -> Option<Value> {
    use serde_json::Value as Json;

    match (key, inner) {
        ("$oid", Json::String(hex)) => Some(Value::reference(hex.as_str())),
        ("$numberInt" | "$numberLong", Json::String(s)) => s.parse().ok().map(Value::integer),
        ("$numberDouble" | "$numberDecimal", Json::String(s)) => {
            s.parse().ok().map(|f| Value::Scalar(Scalar::Float(f)))
        }
        ("$date", Json::String(iso)) => DateTime::parse_from_rfc3339(iso)
            .ok()
            .map(|dt| Value::Scalar(Scalar::DateTime(dt.with_timezone(&Utc)))),
        ("$date", Json::Number(n)) => n.as_i64().and_then(millis_to_datetime),
        ("$date", Json::Object(wrapped)) => wrapped
            .get("$numberLong")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok())
            .and_then(millis_to_datetime),
        _ => None,
    }
}

fn millis_to_datetime(millis: i64) -> Option<Value> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .map(|dt| Value::Scalar(Scalar::DateTime(dt)))
}

/// Decode one Extended JSON document into a [`Record`].
///
/// Returns `None` when the JSON is not an object.
pub fn record_from_json(json: serde_json::Value) -> Option<Record> {
    match Value::from_extended_json(json) {
        Value::Embedded(record) => Some(record),
        _ => None,
    }
}
