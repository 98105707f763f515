//! In-memory database client shared by the integration tests.

#![allow(dead_code)]

use std::cmp::Ordering as CmpOrdering;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;

use coto::query::{
    ConnectOptions, ConnectionError, ConnectionResult, ConnectionUri, DatabaseClient, FindOptions,
    Namespace, QueryError, QueryResult, TypedDocument, TypedValue,
};

/// A connection handed out by [`MemoryClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryConnection {
    pub id: u64,
    pub uri: String,
}

/// A [`DatabaseClient`] that keeps collections in memory.
///
/// Supports equality and `$gt`/`$gte`/`$lt`/`$lte`/`$ne` filters, single-key
/// sorts, and the `$match`, `$limit`, and `$count` stages.
#[derive(Default)]
pub struct MemoryClient {
    collections: Mutex<HashMap<String, Vec<TypedDocument>>>,
    next_id: AtomicU64,
    dead: Mutex<HashSet<u64>>,
    closed: Mutex<Vec<u64>>,
    uris: Mutex<Vec<String>>,
    reject_auth: AtomicBool,
    latency: Mutex<Duration>,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// A client with `shop.products` holding three products.
    pub fn with_products() -> Self {
        let client = Self::new();
        client.insert("shop", "products", products());
        client
    }

    pub fn insert(&self, database: &str, collection: &str, docs: Vec<TypedDocument>) {
        self.collections
            .lock()
            .entry(format!("{database}.{collection}"))
            .or_default()
            .extend(docs);
    }

    /// Number of connections opened so far.
    pub fn opens(&self) -> u64 {
        self.next_id.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> Vec<u64> {
        self.closed.lock().clone()
    }

    pub fn uris(&self) -> Vec<String> {
        self.uris.lock().clone()
    }

    /// Make every later probe of `id` fail.
    pub fn kill(&self, id: u64) {
        self.dead.lock().insert(id);
    }

    pub fn reject_auth(&self, reject: bool) {
        self.reject_auth.store(reject, Ordering::SeqCst);
    }

    /// Delay every find and aggregate by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    fn documents(&self, namespace: &Namespace) -> Vec<TypedDocument> {
        self.collections
            .lock()
            .get(&namespace.to_string())
            .cloned()
            .unwrap_or_default()
    }

    async fn delay(&self) {
        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl DatabaseClient for MemoryClient {
    type Connection = MemoryConnection;

    async fn open(
        &self,
        uri: &ConnectionUri,
        _options: &ConnectOptions,
    ) -> ConnectionResult<MemoryConnection> {
        self.uris.lock().push(uri.expose().to_string());
        tokio::time::sleep(Duration::from_millis(5)).await;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(MemoryConnection {
            id,
            uri: uri.expose().to_string(),
        })
    }

    async fn ping(&self, conn: &MemoryConnection) -> ConnectionResult<()> {
        if self.reject_auth.load(Ordering::SeqCst) {
            return Err(ConnectionError::classified(format!(
                "Authentication failed for {}",
                conn.uri
            )));
        }
        if self.dead.lock().contains(&conn.id) {
            return Err(ConnectionError::refused("connection reset by peer"));
        }
        Ok(())
    }

    async fn find(
        &self,
        _conn: &MemoryConnection,
        namespace: &Namespace,
        filter: &TypedDocument,
        options: &FindOptions,
    ) -> QueryResult<Vec<TypedDocument>> {
        self.delay().await;
        let mut docs: Vec<_> = self
            .documents(namespace)
            .into_iter()
            .filter(|doc| matches(doc, filter))
            .collect();
        if let Some(sort) = &options.sort {
            sort_by(&mut docs, sort);
        }
        if let Some(limit) = options.limit {
            docs.truncate(limit as usize);
        }
        if let Some(projection) = &options.projection {
            docs = docs.into_iter().map(|d| project(d, projection)).collect();
        }
        Ok(docs)
    }

    async fn aggregate(
        &self,
        _conn: &MemoryConnection,
        namespace: &Namespace,
        pipeline: &[TypedDocument],
    ) -> QueryResult<Vec<TypedDocument>> {
        self.delay().await;
        let mut docs = self.documents(namespace);
        for stage in pipeline {
            let Some((name, body)) = stage.first() else {
                return Err(QueryError::remote("empty pipeline stage"));
            };
            match (name.as_str(), body) {
                ("$match", TypedValue::Document(filter)) => {
                    docs.retain(|doc| matches(doc, filter));
                }
                ("$limit", TypedValue::Int(n)) => docs.truncate(*n as usize),
                ("$count", TypedValue::String(field)) => {
                    let mut out = TypedDocument::new();
                    out.insert(field.clone(), TypedValue::Int(docs.len() as i64));
                    docs = vec![out];
                }
                (other, _) => {
                    return Err(QueryError::remote(format!(
                        "Unrecognized pipeline stage name: '{other}'"
                    )));
                }
            }
        }
        Ok(docs)
    }

    async fn close(&self, conn: MemoryConnection) -> ConnectionResult<()> {
        self.closed.lock().push(conn.id);
        Ok(())
    }
}

fn matches(doc: &TypedDocument, filter: &TypedDocument) -> bool {
    filter.iter().all(|(field, condition)| {
        let actual = doc.get(field).unwrap_or(&TypedValue::Null);
        match condition {
            TypedValue::Document(ops) if ops.keys().all(|k| k.starts_with('$')) => {
                ops.iter().all(|(op, expected)| {
                    let ord = compare(actual, expected);
                    match op.as_str() {
                        "$gt" => ord == Some(CmpOrdering::Greater),
                        "$gte" => matches!(ord, Some(CmpOrdering::Greater | CmpOrdering::Equal)),
                        "$lt" => ord == Some(CmpOrdering::Less),
                        "$lte" => matches!(ord, Some(CmpOrdering::Less | CmpOrdering::Equal)),
                        "$eq" => actual == expected,
                        "$ne" => actual != expected,
                        _ => false,
                    }
                })
            }
            expected => actual == expected,
        }
    })
}

fn compare(a: &TypedValue, b: &TypedValue) -> Option<CmpOrdering> {
    match (a, b) {
        (TypedValue::Int(a), TypedValue::Int(b)) => Some(a.cmp(b)),
        (TypedValue::Int(a), TypedValue::Float(b)) => (*a as f64).partial_cmp(b),
        (TypedValue::Float(a), TypedValue::Int(b)) => a.partial_cmp(&(*b as f64)),
        (TypedValue::Float(a), TypedValue::Float(b)) => a.partial_cmp(b),
        (TypedValue::String(a), TypedValue::String(b)) => Some(a.cmp(b)),
        (TypedValue::DateTime(a), TypedValue::DateTime(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn sort_by(docs: &mut [TypedDocument], sort: &TypedDocument) {
    let Some((field, direction)) = sort.first() else {
        return;
    };
    let descending = direction.as_i64() == Some(-1);
    docs.sort_by(|a, b| {
        let ord = match (a.get(field), b.get(field)) {
            (Some(a), Some(b)) => compare(a, b).unwrap_or(CmpOrdering::Equal),
            _ => CmpOrdering::Equal,
        };
        if descending { ord.reverse() } else { ord }
    });
}

fn project(doc: TypedDocument, projection: &TypedDocument) -> TypedDocument {
    doc.into_iter()
        .filter(|(k, _)| k == "_id" || projection.get(k).and_then(TypedValue::as_i64) == Some(1))
        .collect()
}

/// Three products with quantities 10, 20, and 30, created on the first of
/// January, February, and March 2024.
pub fn products() -> Vec<TypedDocument> {
    [
        ("507f1f77bcf86cd799439011", "widget", 10, 1),
        ("507f1f77bcf86cd799439012", "gadget", 20, 2),
        ("507f1f77bcf86cd799439013", "gizmo", 30, 3),
    ]
    .into_iter()
    .map(|(id, name, qty, month)| {
        let mut doc = TypedDocument::new();
        doc.insert("_id".into(), TypedValue::ObjectId(id.into()));
        doc.insert("name".into(), TypedValue::String(name.into()));
        doc.insert("qty".into(), TypedValue::Int(qty));
        doc.insert(
            "createdAt".into(),
            TypedValue::DateTime(Utc.with_ymd_and_hms(2024, month, 1, 0, 0, 0).unwrap()),
        );
        doc
    })
    .collect()
}

/// Quantities of `docs`, in order.
pub fn quantities(docs: &[TypedDocument]) -> Vec<i64> {
    docs.iter()
        .filter_map(|d| d.get("qty").and_then(TypedValue::as_i64))
        .collect()
}
