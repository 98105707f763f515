//! Typed document representation.
//!
//! Query text is translated into [`TypedValue`] trees. Besides plain JSON
//! scalars, a leaf may be a date, an object id reference, or an opaque
//! passthrough operator object that the driver boundary interprets.

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::Value;

/// An ordered mapping of field names to typed values.
pub type TypedDocument = IndexMap<String, TypedValue>;

/// Single-key operator objects that are handed to the driver untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassthroughOperator {
    /// `$date`
    Date,
    /// `$oid`
    Oid,
    /// `$binary`
    Binary,
    /// `$type`
    Type,
    /// `$numberDecimal`
    NumberDecimal,
    /// `$numberLong`
    NumberLong,
    /// `$numberInt`
    NumberInt,
}

impl PassthroughOperator {
    /// All recognised operators.
    pub const ALL: [PassthroughOperator; 7] = [
        Self::Date,
        Self::Oid,
        Self::Binary,
        Self::Type,
        Self::NumberDecimal,
        Self::NumberLong,
        Self::NumberInt,
    ];

    /// Look up an operator by its key.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == key)
    }

    /// The operator key, including the leading `$`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Date => "$date",
            Self::Oid => "$oid",
            Self::Binary => "$binary",
            Self::Type => "$type",
            Self::NumberDecimal => "$numberDecimal",
            Self::NumberLong => "$numberLong",
            Self::NumberInt => "$numberInt",
        }
    }
}

/// A node of a translated query or result document.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    /// JSON null.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// String.
    String(String),
    /// Point in time.
    DateTime(DateTime<Utc>),
    /// Reference to an object id, kept as its textual form.
    ObjectId(String),
    /// Operator object left for the driver to interpret.
    Passthrough {
        /// The operator key.
        operator: PassthroughOperator,
        /// The whole operator object, as written.
        value: Value,
    },
    /// Sequence.
    Array(Vec<TypedValue>),
    /// Nested document.
    Document(TypedDocument),
}

impl TypedValue {
    /// Convert JSON without any literal rewriting.
    ///
    /// Integers outside the `i64` range become `Float` and may lose precision.
    pub fn from_plain_json(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Self::String(s),
            Value::Array(items) => {
                Self::Array(items.into_iter().map(Self::from_plain_json).collect())
            }
            Value::Object(map) => Self::Document(
                map.into_iter()
                    .map(|(k, v)| (k, Self::from_plain_json(v)))
                    .collect(),
            ),
        }
    }

    /// Get the nested document, if this is one.
    pub fn as_document(&self) -> Option<&TypedDocument> {
        match self {
            Self::Document(doc) => Some(doc),
            _ => None,
        }
    }

    /// Get the date, if this is one.
    pub fn as_datetime(&self) -> Option<&DateTime<Utc>> {
        match self {
            Self::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    /// Get the string, if this is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the integer, if this is one.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Whether this is a plain JSON value with no special leaves below it.
    pub fn is_plain(&self) -> bool {
        match self {
            Self::DateTime(_) | Self::ObjectId(_) | Self::Passthrough { .. } => false,
            Self::Array(items) => items.iter().all(Self::is_plain),
            Self::Document(doc) => doc.values().all(Self::is_plain),
            _ => true,
        }
    }

    /// Convert back to JSON.
    ///
    /// Dates render as ISO-8601 with milliseconds and object ids as their
    /// hex string.
    pub fn to_json(&self) -> Value {
        // Serializing into a Value cannot fail for this type.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Serialize for TypedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::String(s) => serializer.serialize_str(s),
            Self::DateTime(dt) => {
                serializer.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            Self::ObjectId(id) => serializer.serialize_str(id),
            Self::Passthrough { value, .. } => value.serialize(serializer),
            Self::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Document(doc) => {
                let mut map = serializer.serialize_map(Some(doc.len()))?;
                for (k, v) in doc {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

/// Whether a query tree contains at least one `$`-prefixed key.
///
/// A cheap sanity check for callers; translation does not depend on it.
pub fn is_valid_query(value: &TypedValue) -> bool {
    match value {
        TypedValue::Passthrough { .. } => true,
        TypedValue::Array(items) => items.iter().any(is_valid_query),
        TypedValue::Document(doc) => is_valid_document(doc),
        _ => false,
    }
}

/// [`is_valid_query`] for a document root.
pub fn is_valid_document(doc: &TypedDocument) -> bool {
    doc.iter()
        .any(|(k, v)| k.starts_with('$') || is_valid_query(v))
}
