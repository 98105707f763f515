//! HTTP boundary for the coto broker.
//!
//! Exposes a single endpoint, `POST /query`, on top of a
//! [`coto_query::Broker`]. Credentials come from an `Authorization: Basic`
//! header; the body names the target and the query:
//!
//! ```json
//! {
//!   "type": "find",
//!   "query": "{\"createdAt\": {\"$gte\": \"ISODate('2024-01-01T00:00:00Z')\"}}",
//!   "sort": "{\"createdAt\": -1}",
//!   "limit": 10,
//!   "db": { "host": "localhost", "database": "shop", "collection": "orders" }
//! }
//! ```
//!
//! A successful response is `{"result": [...]}`; failures are
//! `{"error": "...", "code": "C...."}` with a matching status.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use coto_axum::{router, shutdown_signal};
//! use coto_mongodb::MongoClient;
//! use coto_query::{Broker, BrokerConfig};
//!
//! let broker = Arc::new(Broker::init(MongoClient::new(), BrokerConfig::from_env()?)?);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3001").await?;
//! axum::serve(listener, router(broker.clone()))
//!     .with_graceful_shutdown(shutdown_signal())
//!     .await?;
//! broker.shutdown().await;
//! ```

pub mod auth;
pub mod cli;
pub mod error;
pub mod request;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::Request;
use axum::response::Response;
use axum::routing::post;
use axum::{Json, Router};
use tower_layer::Layer;
use tower_service::Service;
use tracing::{debug, info};

use coto_query::{Broker, DatabaseClient};

pub use auth::BasicCredentials;
pub use error::{ApiError, ErrorBody};
pub use request::{DbTarget, JsonText, QueryRequest, QueryResponse};

/// Build the router for `broker`.
pub fn router<C: DatabaseClient>(broker: Arc<Broker<C>>) -> Router {
    Router::new()
        .route("/query", post(query::<C>))
        .layer(RequestLogLayer)
        .with_state(broker)
}

async fn query<C: DatabaseClient>(
    State(broker): State<Arc<Broker<C>>>,
    credentials: BasicCredentials,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::invalid_request(e.body_text()))?;

    let spec = request.spec()?;
    let descriptor = request.descriptor(credentials);
    debug!(key = %descriptor.key(), collection = %descriptor.collection, kind = %spec.kind(), "query received");

    let handle = broker.connect(&descriptor).await?;
    let result = broker.run_query(&handle, &spec).await?;
    Ok(Json(QueryResponse { result }))
}

/// Wait for Ctrl-C or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}

/// Wait for `signal`, then close every pooled connection of `broker`.
///
/// Pass this to `with_graceful_shutdown`: the pool is drained as soon as the
/// signal fires, while in-flight requests are still finishing.
pub async fn drain_on<C, F>(broker: Arc<Broker<C>>, signal: F)
where
    C: DatabaseClient,
    F: Future<Output = ()>,
{
    signal.await;
    info!(pooled = broker.pool().len(), "closing pooled connections");
    broker.shutdown().await;
}

/// Layer that logs every request with its status and latency.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLogLayer;

impl<S> Layer<S> for RequestLogLayer {
    type Service = RequestLog<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestLog { inner }
    }
}

/// Service produced by [`RequestLogLayer`].
#[derive(Debug, Clone)]
pub struct RequestLog<S> {
    inner: S,
}

impl<S, ReqBody> Service<Request<ReqBody>> for RequestLog<S>
where
    S: Service<Request<ReqBody>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    ReqBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        let method = request.method().clone();
        let path = request.uri().path().to_string();
        let started = Instant::now();
        let future = self.inner.call(request);

        Box::pin(async move {
            let response = future.await?;
            info!(
                method = %method,
                path = %path,
                status = response.status().as_u16(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "request handled"
            );
            Ok(response)
        })
    }
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{
        ApiError, BasicCredentials, QueryRequest, QueryResponse, RequestLogLayer, drain_on,
        router, shutdown_signal,
    };
    pub use coto_query::prelude::*;
}
