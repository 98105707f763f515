//! Integration tests for the Extended-JSON translator on realistic
//! dashboard queries.

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use serde_json::json;

use coto::query::{
    PassthroughOperator, QueryErrorKind, TypedValue, is_valid_query, translate, translate_document,
    translate_pipeline,
};

#[test]
fn test_time_range_inside_logical_operators() {
    let doc = translate_document(
        r#"{
            "$and": [
                {"ts": {"$gte": "ISODate('2024-03-01T00:00:00Z')"}},
                {"ts": {"$lt": "2024-03-02T00:00:00.000Z"}},
                {"$or": [{"status": "2024-03-01T00:00:00.000Z"}, {"status": "ok"}]}
            ]
        }"#,
    )
    .unwrap();

    let rendered = TypedValue::Document(doc.clone()).to_json();
    assert_eq!(
        rendered,
        json!({
            "$and": [
                {"ts": {"$gte": "2024-03-01T00:00:00.000Z"}},
                {"ts": {"$lt": "2024-03-02T00:00:00.000Z"}},
                {"$or": [{"status": "2024-03-01T00:00:00.000Z"}, {"status": "ok"}]}
            ]
        })
    );

    let clauses = match &doc["$and"] {
        TypedValue::Array(items) => items,
        other => panic!("expected array, got {other:?}"),
    };
    let first = clauses[0].as_document().unwrap()["ts"].as_document().unwrap();
    assert_eq!(
        first["$gte"],
        TypedValue::DateTime(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
    );
    let second = clauses[1].as_document().unwrap()["ts"].as_document().unwrap();
    assert!(matches!(second["$lt"], TypedValue::DateTime(_)));

    // A bare timestamp outside a comparison stays a string.
    let or = clauses[2].as_document().unwrap();
    let TypedValue::Array(branches) = &or["$or"] else {
        panic!("expected $or array");
    };
    assert_eq!(
        branches[0].as_document().unwrap()["status"],
        TypedValue::String("2024-03-01T00:00:00.000Z".into())
    );

    assert!(is_valid_query(&TypedValue::Document(doc)));
}

#[test]
fn test_pipeline_with_dates_ids_and_wrappers() {
    let stages = translate_pipeline(
        r#"[
            {"$match": {
                "owner": "ObjectId('65a1b2c3d4e5f60718293a4b')",
                "at": {"$gt": {"$date": "2024-01-01T00:00:00Z"}},
                "total": {"$gte": {"$numberDecimal": "10.50"}}
            }},
            {"$group": {"_id": "$owner", "n": {"$sum": 1}}},
            {"$sort": {"n": -1}}
        ]"#,
    )
    .unwrap();

    assert_eq!(stages.len(), 3);
    let matcher = stages[0]["$match"].as_document().unwrap();
    assert_eq!(
        matcher["owner"],
        TypedValue::ObjectId("65a1b2c3d4e5f60718293a4b".into())
    );
    assert_eq!(
        matcher["at"].as_document().unwrap()["$gt"],
        TypedValue::DateTime(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    );
    assert_eq!(
        matcher["total"].as_document().unwrap()["$gte"],
        TypedValue::Passthrough {
            operator: PassthroughOperator::NumberDecimal,
            value: json!({"$numberDecimal": "10.50"}),
        }
    );

    // Field paths and plain numbers are left alone.
    let group = stages[1]["$group"].as_document().unwrap();
    assert_eq!(group["_id"], TypedValue::String("$owner".into()));
    assert_eq!(stages[2]["$sort"].as_document().unwrap()["n"], TypedValue::Int(-1));
}

#[test]
fn test_key_order_is_preserved() {
    let doc = translate_document(r#"{"z": 1, "a": 2, "m": {"y": 1, "b": 2}}"#).unwrap();

    assert_eq!(doc.keys().collect::<Vec<_>>(), vec!["z", "a", "m"]);
    assert_eq!(
        doc["m"].as_document().unwrap().keys().collect::<Vec<_>>(),
        vec!["y", "b"]
    );
}

#[test]
fn test_scalar_and_array_roots() {
    assert_eq!(translate("42").unwrap(), TypedValue::Int(42));
    assert_eq!(
        translate(r#""ISODate('2024-01-01')""#).unwrap(),
        TypedValue::DateTime(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    );
    assert!(matches!(translate("[]").unwrap(), TypedValue::Array(items) if items.is_empty()));
}

#[test]
fn test_shape_errors_name_the_input() {
    let err = translate_document("[1]").unwrap_err();
    assert_eq!(err.kind, QueryErrorKind::ParseFailure);
    assert!(err.message.contains("query"));

    let err = translate_pipeline(r#"[{"$match": {}}, 3]"#).unwrap_err();
    assert_eq!(err.kind, QueryErrorKind::ParseFailure);
    assert!(err.message.contains("stage 1"));
}
