//! Extended-JSON query translation.
//!
//! Callers write queries as ordinary JSON in which some string values are
//! shell-style literals:
//!
//! ```rust
//! use coto_query::extjson::translate_document;
//! use coto_query::TypedValue;
//!
//! let filter = translate_document(
//!     r#"{"_id": "ObjectId('507f1f77bcf86cd799439011')",
//!         "createdAt": {"$gte": "ISODate('2024-01-01T00:00:00.000Z')"}}"#,
//! ).unwrap();
//!
//! assert_eq!(filter["_id"], TypedValue::ObjectId("507f1f77bcf86cd799439011".into()));
//! let created = filter["createdAt"].as_document().unwrap();
//! assert!(created["$gte"].as_datetime().is_some());
//! ```
//!
//! Each value is rewritten by the first matching rule:
//!
//! 1. a string `ISODate('<ts>')` becomes a date;
//! 2. a string `ObjectId('<id>')` becomes an object id reference;
//! 3. a single-key object whose key is a passthrough operator (`$date`, `$oid`,
//!    `$binary`, `$type`, `$numberDecimal`, `$numberLong`, `$numberInt`) is kept
//!    opaque, except `$date`, which becomes a date;
//! 4. a string under a comparison operator (`$gte`, `$gt`, `$lte`, `$lt`, `$eq`,
//!    `$ne`) that is a strict ISO-8601 UTC timestamp becomes a date;
//! 5. an object with a `$date` field becomes a date;
//! 6. anything else is kept as written.
//!
//! Rules 1 to 3 ignore the surrounding key; rules 4 and 5 are context-sensitive
//! fallbacks. Values that look like literals but do not parse are kept as
//! written.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex_lite::Regex;
use serde_json::{Map, Value};

use crate::error::{QueryError, QueryResult};
use crate::value::{PassthroughOperator, TypedDocument, TypedValue};

/// Comparison operators whose string operands may be bare ISO-8601 timestamps.
pub const COMPARISON_OPERATORS: [&str; 6] = ["$gte", "$gt", "$lte", "$lt", "$eq", "$ne"];

static ISO_DATE_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ISODate\('([^']+)'\)$").expect("valid regex"));

static OBJECT_ID_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ObjectId\('([^']+)'\)$").expect("valid regex"));

static STRICT_ISO_8601: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d{3})?Z$").expect("valid regex")
});

/// Translate query text into a typed tree.
///
/// Fails only when `text` is not valid JSON.
pub fn translate(text: &str) -> QueryResult<TypedValue> {
    let json: Value = serde_json::from_str(text).map_err(|e| QueryError::parse("query", e))?;
    Ok(rewrite(None, json))
}

/// Translate text that must hold a single document (a filter).
pub fn translate_document(text: &str) -> QueryResult<TypedDocument> {
    match translate(text)? {
        TypedValue::Document(doc) => Ok(doc),
        other => Err(QueryError::parse(
            "query",
            format!("expected a JSON object, found {}", describe(&other)),
        )),
    }
}

/// Translate text that must hold an aggregation pipeline.
///
/// Every stage is rewritten independently with the same rules.
pub fn translate_pipeline(text: &str) -> QueryResult<Vec<TypedDocument>> {
    match translate(text)? {
        TypedValue::Array(stages) => stages
            .into_iter()
            .enumerate()
            .map(|(i, stage)| match stage {
                TypedValue::Document(doc) => Ok(doc),
                other => Err(QueryError::parse(
                    "pipeline",
                    format!("stage {} must be a JSON object, found {}", i, describe(&other)),
                )),
            })
            .collect(),
        other => Err(QueryError::parse(
            "pipeline",
            format!("expected a JSON array, found {}", describe(&other)),
        )),
    }
}

/// Parse a document without any literal rewriting.
///
/// Used for sort and projection specifications. `what` names the text in
/// error messages.
pub fn parse_plain_document(what: &str, text: &str) -> QueryResult<TypedDocument> {
    let json: Value = serde_json::from_str(text).map_err(|e| QueryError::parse(what, e))?;
    match TypedValue::from_plain_json(json) {
        TypedValue::Document(doc) => Ok(doc),
        other => Err(QueryError::parse(
            what,
            format!("expected a JSON object, found {}", describe(&other)),
        )),
    }
}

fn rewrite(key: Option<&str>, value: Value) -> TypedValue {
    match value {
        Value::String(s) => rewrite_string(key, s),
        Value::Object(map) => rewrite_object(map),
        Value::Array(items) => {
            TypedValue::Array(items.into_iter().map(|v| rewrite(None, v)).collect())
        }
        scalar => TypedValue::from_plain_json(scalar),
    }
}

fn rewrite_string(key: Option<&str>, s: String) -> TypedValue {
    if let Some(dt) = iso_date_literal(&s) {
        return TypedValue::DateTime(dt);
    }
    if let Some(id) = object_id_literal(&s) {
        return TypedValue::ObjectId(id);
    }
    if key.is_some_and(is_comparison_operator) && STRICT_ISO_8601.is_match(&s) {
        if let Some(dt) = parse_timestamp(&s) {
            return TypedValue::DateTime(dt);
        }
    }
    TypedValue::String(s)
}

fn rewrite_object(map: Map<String, Value>) -> TypedValue {
    if map.len() == 1 {
        let operator = map.keys().next().and_then(|k| PassthroughOperator::from_key(k));
        if let Some(operator) = operator {
            if operator == PassthroughOperator::Date {
                if let Some(dt) = map.get("$date").and_then(date_from_json) {
                    return TypedValue::DateTime(dt);
                }
            }
            return TypedValue::Passthrough {
                operator,
                value: Value::Object(map),
            };
        }
    }

    if let Some(dt) = map.get("$date").and_then(date_from_json) {
        return TypedValue::DateTime(dt);
    }

    TypedValue::Document(
        map.into_iter()
            .map(|(k, v)| {
                let typed = rewrite(Some(&k), v);
                (k, typed)
            })
            .collect(),
    )
}

fn is_comparison_operator(key: &str) -> bool {
    COMPARISON_OPERATORS.contains(&key)
}

fn iso_date_literal(s: &str) -> Option<DateTime<Utc>> {
    let caps = ISO_DATE_LITERAL.captures(s)?;
    parse_timestamp(caps.get(1)?.as_str())
}

fn object_id_literal(s: &str) -> Option<String> {
    let caps = OBJECT_ID_LITERAL.captures(s)?;
    Some(caps.get(1)?.as_str().to_string())
}

/// Interpret the operand of a `$date` wrapper.
///
/// Accepts a timestamp string (optionally an `ISODate(...)` literal),
/// milliseconds since the epoch, or `{"$numberLong": "<ms>"}`.
fn date_from_json(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => iso_date_literal(s).or_else(|| parse_timestamp(s)),
        Value::Number(n) => DateTime::from_timestamp_millis(n.as_i64()?),
        Value::Object(map) if map.len() == 1 => {
            let millis = map.get("$numberLong")?.as_str()?.parse::<i64>().ok()?;
            DateTime::from_timestamp_millis(millis)
        }
        _ => None,
    }
}

/// Parse a timestamp.
///
/// RFC 3339 with any offset is accepted; timestamps without an offset and
/// bare dates are read as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()?
        .and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
}

fn describe(value: &TypedValue) -> &'static str {
    match value {
        TypedValue::Null => "null",
        TypedValue::Bool(_) => "a boolean",
        TypedValue::Int(_) | TypedValue::Float(_) => "a number",
        TypedValue::String(_) => "a string",
        TypedValue::DateTime(_) => "a date",
        TypedValue::ObjectId(_) => "an object id",
        TypedValue::Passthrough { .. } => "an operator object",
        TypedValue::Array(_) => "an array",
        TypedValue::Document(_) => "an object",
    }
}
