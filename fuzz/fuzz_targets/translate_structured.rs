//! Structured fuzz target for the Extended-JSON translator.
//!
//! Builds JSON trees that mix comparison operators, shell literals, and
//! `$date` wrappers, and checks that translation accepts every one of them.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_translate_structured
//! ```

#![no_main]

use arbitrary::Arbitrary;
use coto_query::extjson::translate;
use libfuzzer_sys::fuzz_target;
use serde_json::{Map, Value, json};

const KEYS: [&str; 10] = [
    "$gte", "$gt", "$lte", "$lt", "$eq", "$ne", "$and", "$match", "createdAt", "_id",
];

#[derive(Debug, Arbitrary)]
enum FuzzNode {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    IsoDate(String),
    ObjectId(String),
    DateWrapper(String),
    DateMillis(i64),
    Array(Vec<FuzzNode>),
    Object(Vec<(u8, FuzzNode)>),
}

impl FuzzNode {
    fn to_json(&self, depth: usize) -> Value {
        if depth > 16 {
            return Value::Null;
        }
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => json!(b),
            Self::Int(i) => json!(i),
            Self::Float(f) => serde_json::Number::from_f64(*f).map_or(Value::Null, Value::Number),
            Self::Text(s) => json!(s),
            Self::IsoDate(s) => json!(format!("ISODate('{}')", s)),
            Self::ObjectId(s) => json!(format!("ObjectId('{}')", s)),
            Self::DateWrapper(s) => json!({ "$date": s }),
            Self::DateMillis(ms) => json!({ "$date": ms }),
            Self::Array(items) => Value::Array(items.iter().map(|n| n.to_json(depth + 1)).collect()),
            Self::Object(fields) => {
                let mut map = Map::new();
                for (key, node) in fields {
                    map.insert(
                        KEYS[*key as usize % KEYS.len()].to_string(),
                        node.to_json(depth + 1),
                    );
                }
                Value::Object(map)
            }
        }
    }
}

fuzz_target!(|node: FuzzNode| {
    let text = node.to_json(0).to_string();
    // Any valid JSON must translate.
    let translated = translate(&text).expect("valid JSON must translate");
    let _ = translated.to_json();
});
