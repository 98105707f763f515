//! Query execution against a pooled connection.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::client::{DatabaseClient, FindOptions};
use crate::config::DiagnosticsConfig;
use crate::error::{QueryError, QueryResult};
use crate::extjson;
use crate::pool::ConnectionHandle;
use crate::spec::{FindSpec, QuerySpec};
use crate::value::{TypedDocument, TypedValue};

/// Translates query specs and runs them through a [`DatabaseClient`].
pub struct QueryExecutor<C: DatabaseClient> {
    client: Arc<C>,
    timeout: Duration,
    diagnostics: DiagnosticsConfig,
}

impl<C: DatabaseClient> Clone for QueryExecutor<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            timeout: self.timeout,
            diagnostics: self.diagnostics.clone(),
        }
    }
}

impl<C: DatabaseClient> QueryExecutor<C> {
    /// Create an executor. `timeout` bounds every remote call.
    pub fn new(client: Arc<C>, timeout: Duration) -> Self {
        Self {
            client,
            timeout,
            diagnostics: DiagnosticsConfig::default(),
        }
    }

    /// Set the diagnostic toggles.
    pub fn diagnostics(mut self, diagnostics: DiagnosticsConfig) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Run `spec` on the collection `handle` is bound to.
    ///
    /// The whole result set is collected before returning.
    pub async fn execute(
        &self,
        handle: &ConnectionHandle<C::Connection>,
        spec: &QuerySpec,
    ) -> QueryResult<Vec<TypedDocument>> {
        let namespace = handle.namespace();
        let docs = match spec {
            QuerySpec::Find(find) => {
                let (filter, options) = prepare_find(find)?;
                if self.diagnostics.verbose {
                    debug!(
                        namespace = %namespace,
                        filter = %TypedValue::Document(filter.clone()).to_json(),
                        limit = ?options.limit,
                        "running find"
                    );
                }
                self.bounded(self.client.find(handle.connection(), namespace, &filter, &options))
                    .await?
            }
            QuerySpec::Aggregate { pipeline } => {
                let stages = prepare_pipeline(pipeline)?;
                if self.diagnostics.verbose {
                    debug!(namespace = %namespace, stages = stages.len(), "running aggregate");
                }
                self.bounded(self.client.aggregate(handle.connection(), namespace, &stages))
                    .await?
            }
        };

        debug!(namespace = %namespace, kind = %spec.kind(), count = docs.len(), "query complete");
        if self.diagnostics.should_log_results() {
            let rendered: Vec<_> = docs
                .iter()
                .map(|d| TypedValue::Document(d.clone()).to_json())
                .collect();
            debug!(namespace = %namespace, results = %serde_json::Value::Array(rendered), "query results");
        }
        Ok(docs)
    }

    async fn bounded<F, T>(&self, call: F) -> QueryResult<T>
    where
        F: Future<Output = QueryResult<T>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.inspect_err(|err| warn!(error = %err, "query failed")),
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "query timed out");
                Err(QueryError::remote(format!(
                    "operation timed out after {} ms",
                    self.timeout.as_millis()
                )))
            }
        }
    }
}

/// Translate the texts of a find request into a filter and driver options.
pub fn prepare_find(find: &FindSpec) -> QueryResult<(TypedDocument, FindOptions)> {
    if find.filter.trim().is_empty() {
        return Err(QueryError::empty_query());
    }
    let filter = extjson::translate_document(&find.filter)?;
    let sort = find
        .sort
        .as_deref()
        .map(|text| extjson::parse_plain_document("sort", text))
        .transpose()?;
    let projection = find
        .projection
        .as_deref()
        .map(|text| extjson::parse_plain_document("projection", text))
        .transpose()?;

    Ok((
        filter,
        FindOptions {
            sort,
            projection,
            limit: find.effective_limit(),
        },
    ))
}

/// Translate the text of an aggregate request into pipeline stages.
pub fn prepare_pipeline(pipeline: &str) -> QueryResult<Vec<TypedDocument>> {
    if pipeline.trim().is_empty() {
        return Err(QueryError::empty_query());
    }
    extjson::translate_pipeline(pipeline)
}
