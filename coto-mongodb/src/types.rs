//! Conversion between typed values and BSON.

use bson::{Bson, Document, oid::ObjectId};
use serde_json::Value;

use coto_query::{PassthroughOperator, TypedDocument, TypedValue};

/// Convert a typed value to BSON.
pub fn to_bson(value: &TypedValue) -> Bson {
    match value {
        TypedValue::Null => Bson::Null,
        TypedValue::Bool(b) => Bson::Boolean(*b),
        TypedValue::Int(i) => match i32::try_from(*i) {
            Ok(small) => Bson::Int32(small),
            Err(_) => Bson::Int64(*i),
        },
        TypedValue::Float(f) => Bson::Double(*f),
        TypedValue::String(s) => Bson::String(s.clone()),
        TypedValue::DateTime(dt) => Bson::DateTime(bson::DateTime::from_chrono(*dt)),
        TypedValue::ObjectId(id) => object_id(id),
        TypedValue::Passthrough { value, .. } => passthrough(value),
        TypedValue::Array(items) => Bson::Array(items.iter().map(to_bson).collect()),
        TypedValue::Document(doc) => Bson::Document(to_document(doc)),
    }
}

/// Convert a typed document to a BSON document.
pub fn to_document(doc: &TypedDocument) -> Document {
    doc.iter().map(|(k, v)| (k.clone(), to_bson(v))).collect()
}

/// Convert BSON to a typed value.
///
/// Types without a typed counterpart are kept in relaxed Extended JSON.
pub fn from_bson(value: Bson) -> TypedValue {
    match value {
        Bson::Null | Bson::Undefined => TypedValue::Null,
        Bson::Boolean(b) => TypedValue::Bool(b),
        Bson::Int32(i) => TypedValue::Int(i64::from(i)),
        Bson::Int64(i) => TypedValue::Int(i),
        Bson::Double(f) => TypedValue::Float(f),
        Bson::String(s) => TypedValue::String(s),
        Bson::DateTime(dt) => TypedValue::DateTime(dt.to_chrono()),
        Bson::ObjectId(oid) => TypedValue::ObjectId(oid.to_hex()),
        Bson::Array(items) => TypedValue::Array(items.into_iter().map(from_bson).collect()),
        Bson::Document(doc) => TypedValue::Document(from_document(doc)),
        decimal @ Bson::Decimal128(_) => TypedValue::Passthrough {
            operator: PassthroughOperator::NumberDecimal,
            value: decimal.into_relaxed_extjson(),
        },
        binary @ Bson::Binary(_) => TypedValue::Passthrough {
            operator: PassthroughOperator::Binary,
            value: binary.into_relaxed_extjson(),
        },
        other => TypedValue::from_plain_json(other.into_relaxed_extjson()),
    }
}

/// Convert a BSON document to a typed document.
pub fn from_document(doc: Document) -> TypedDocument {
    doc.into_iter().map(|(k, v)| (k, from_bson(v))).collect()
}

fn object_id(id: &str) -> Bson {
    if id.len() == 24 && id.chars().all(|c| c.is_ascii_hexdigit()) {
        if let Ok(oid) = ObjectId::parse_str(id) {
            return Bson::ObjectId(oid);
        }
    }
    Bson::String(id.to_string())
}

fn passthrough(value: &Value) -> Bson {
    Bson::try_from(value.clone())
        .or_else(|_| bson::to_bson(value))
        .unwrap_or(Bson::Null)
}
