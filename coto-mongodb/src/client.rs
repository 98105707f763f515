//! [`DatabaseClient`] implementation on the official MongoDB driver.

use async_trait::async_trait;
use bson::{Document, doc};
use futures::TryStreamExt;
use mongodb::Client;
use tracing::{debug, trace};

use coto_query::{
    ConnectOptions, ConnectionError, ConnectionResult, ConnectionUri, DatabaseClient, FindOptions,
    Namespace, QueryResult, TypedDocument,
};

use crate::config::client_options;
use crate::error::{connection_error, query_error};
use crate::types::{from_document, to_document};

/// Opens driver clients and runs reads on them.
///
/// Stateless; every live client is owned by the broker's pool. The driver
/// keeps its own socket pool inside each client.
#[derive(Debug, Clone, Copy, Default)]
pub struct MongoClient;

impl MongoClient {
    /// Create a new client factory.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DatabaseClient for MongoClient {
    type Connection = Client;

    async fn open(&self, uri: &ConnectionUri, options: &ConnectOptions) -> ConnectionResult<Client> {
        let client_options = client_options(uri, options).await?;
        let client = Client::with_options(client_options)
            .map_err(|e| scrubbed(connection_error(&e), uri))?;
        debug!(uri = %uri, "MongoDB client created");
        Ok(client)
    }

    async fn ping(&self, conn: &Client) -> ConnectionResult<()> {
        conn.database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map(|_| ())
            .map_err(|e| connection_error(&e))
    }

    async fn find(
        &self,
        conn: &Client,
        namespace: &Namespace,
        filter: &TypedDocument,
        options: &FindOptions,
    ) -> QueryResult<Vec<TypedDocument>> {
        let mut find_options = mongodb::options::FindOptions::default();
        find_options.sort = options.sort.as_ref().map(to_document);
        find_options.projection = options.projection.as_ref().map(to_document);
        find_options.limit = options.limit;

        let filter = to_document(filter);
        trace!(namespace = %namespace, filter = %filter, "find");

        let cursor = conn
            .database(&namespace.database)
            .collection::<Document>(&namespace.collection)
            .find(filter, find_options)
            .await
            .map_err(query_error)?;
        let docs: Vec<Document> = cursor.try_collect().await.map_err(query_error)?;
        Ok(docs.into_iter().map(from_document).collect())
    }

    async fn aggregate(
        &self,
        conn: &Client,
        namespace: &Namespace,
        pipeline: &[TypedDocument],
    ) -> QueryResult<Vec<TypedDocument>> {
        let pipeline: Vec<Document> = pipeline.iter().map(to_document).collect();
        trace!(namespace = %namespace, stages = pipeline.len(), "aggregate");

        let cursor = conn
            .database(&namespace.database)
            .collection::<Document>(&namespace.collection)
            .aggregate(pipeline, None)
            .await
            .map_err(query_error)?;
        let docs: Vec<Document> = cursor.try_collect().await.map_err(query_error)?;
        Ok(docs.into_iter().map(from_document).collect())
    }

    async fn close(&self, conn: Client) -> ConnectionResult<()> {
        conn.shutdown().await;
        Ok(())
    }
}

fn scrubbed(mut err: ConnectionError, uri: &ConnectionUri) -> ConnectionError {
    err.message = uri.scrub(&err.message);
    err
}
