//! The seam between the broker and a concrete database driver.

use std::fmt;

use async_trait::async_trait;

use crate::config::ClientConfig;
use crate::descriptor::ConnectionUri;
use crate::error::{ConnectionResult, QueryResult};
use crate::value::TypedDocument;

/// A database and collection pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    /// Database name.
    pub database: String,
    /// Collection name.
    pub collection: String,
}

impl Namespace {
    /// Create a namespace.
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

/// Options for opening a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Authentication database after defaults were applied.
    pub auth_source: String,
    /// Authentication mechanism after defaults were applied.
    pub auth_mechanism: String,
    /// Timeouts, pool bounds, and retry settings.
    pub client: ClientConfig,
}

/// Options for a find operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Sort specification.
    pub sort: Option<TypedDocument>,
    /// Projection.
    pub projection: Option<TypedDocument>,
    /// Maximum number of documents; always positive when set.
    pub limit: Option<i64>,
}

/// A database driver as seen by the pool and the executor.
///
/// `Connection` is a cheap, cloneable handle to one live client. The pool
/// owns the canonical copy; clones handed to requests share it.
#[async_trait]
pub trait DatabaseClient: Send + Sync + 'static {
    /// Handle to a live client.
    type Connection: Clone + Send + Sync + 'static;

    /// Open a client. Must not perform the liveness probe itself.
    async fn open(
        &self,
        uri: &ConnectionUri,
        options: &ConnectOptions,
    ) -> ConnectionResult<Self::Connection>;

    /// Run a cheap administrative round-trip.
    async fn ping(&self, conn: &Self::Connection) -> ConnectionResult<()>;

    /// Run a filtered read and collect every matching document.
    async fn find(
        &self,
        conn: &Self::Connection,
        namespace: &Namespace,
        filter: &TypedDocument,
        options: &FindOptions,
    ) -> QueryResult<Vec<TypedDocument>>;

    /// Run an aggregation and collect its output.
    async fn aggregate(
        &self,
        conn: &Self::Connection,
        namespace: &Namespace,
        pipeline: &[TypedDocument],
    ) -> QueryResult<Vec<TypedDocument>>;

    /// Close a client.
    async fn close(&self, conn: Self::Connection) -> ConnectionResult<()>;
}
