//! Request and response bodies of the `/query` endpoint.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use coto_query::{ConnectionDescriptor, QueryResult, QuerySpec, TypedDocument};
use coto_query::config::DEFAULT_PORT;

use crate::auth::BasicCredentials;

/// A JSON field that holds query text.
///
/// Callers normally send a string; an inline JSON object or array is accepted
/// too and treated as its serialized text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum JsonText {
    /// Text as sent.
    Text(String),
    /// Inline JSON.
    Inline(Value),
}

impl JsonText {
    /// The text to translate. An inline `null` counts as empty.
    pub fn as_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Inline(Value::Null) => String::new(),
            Self::Inline(value) => value.to_string(),
        }
    }
}

impl Default for JsonText {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

/// Where the query runs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbTarget {
    /// Server host.
    #[serde(default)]
    pub host: String,
    /// Server port.
    pub port: Option<u16>,
    /// Database name.
    #[serde(default)]
    pub database: String,
    /// Collection name.
    #[serde(default)]
    pub collection: String,
    /// Authentication database.
    pub auth_source: Option<String>,
    /// Authentication mechanism.
    pub auth_mechanism: Option<String>,
}

/// Body of `POST /query`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QueryRequest {
    /// `find` or `aggregate`.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Filter or pipeline.
    #[serde(default)]
    pub query: JsonText,
    /// Sort specification (find only).
    pub sort: Option<JsonText>,
    /// Projection (find only).
    #[serde(alias = "project")]
    pub projection: Option<JsonText>,
    /// Maximum number of documents (find only).
    pub limit: Option<i64>,
    /// Target database.
    pub db: DbTarget,
}

impl QueryRequest {
    /// Build the query spec.
    pub fn spec(&self) -> QueryResult<QuerySpec> {
        let sort = self.sort.as_ref().map(JsonText::as_text);
        let projection = self.projection.as_ref().map(JsonText::as_text);
        QuerySpec::from_parts(
            &self.kind,
            &self.query.as_text(),
            sort.as_deref(),
            projection.as_deref(),
            self.limit,
        )
    }

    /// Build the connection descriptor for `credentials`.
    pub fn descriptor(&self, credentials: BasicCredentials) -> ConnectionDescriptor {
        let db = &self.db;
        let mut descriptor = ConnectionDescriptor::new(
            credentials.username,
            credentials.password,
            db.host.trim(),
            db.database.trim(),
            db.collection.trim(),
        )
        .port(db.port.unwrap_or(DEFAULT_PORT));
        descriptor.auth_source = db.auth_source.clone().filter(|s| !s.is_empty());
        descriptor.auth_mechanism = db.auth_mechanism.clone().filter(|s| !s.is_empty());
        descriptor
    }
}

/// Body of a successful response.
#[derive(Debug, Serialize)]
pub struct QueryResponse {
    /// Matching documents, in server order.
    pub result: Vec<TypedDocument>,
}
