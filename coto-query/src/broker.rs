//! The broker: pool, reaper, and executor behind one call surface.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use crate::client::DatabaseClient;
use crate::config::BrokerConfig;
use crate::descriptor::{ConnectionDescriptor, ConnectionKey};
use crate::error::{BrokerResult, QueryResult};
use crate::executor::QueryExecutor;
use crate::pool::{ConnectionHandle, ConnectionPool};
use crate::reaper::{IdleReaper, ReaperHandle};
use crate::spec::QuerySpec;
use crate::value::TypedDocument;

/// Connection pool and query executor with an explicit lifecycle.
///
/// Created with [`Broker::init`] and torn down with [`Broker::shutdown`]; the
/// hosting process decides when to call the latter.
pub struct Broker<C: DatabaseClient> {
    config: BrokerConfig,
    pool: ConnectionPool<C>,
    executor: QueryExecutor<C>,
    reaper: Mutex<Option<ReaperHandle>>,
}

impl<C: DatabaseClient> Broker<C> {
    /// Build the pool and executor and start the idle reaper.
    ///
    /// Must be called from within a tokio runtime.
    pub fn init(client: C, config: BrokerConfig) -> BrokerResult<Self> {
        config.validate()?;

        let client = Arc::new(client);
        let pool = ConnectionPool::with_shared_client(Arc::clone(&client), config.client.clone());
        let executor = QueryExecutor::new(client, config.client.socket_timeout)
            .diagnostics(config.diagnostics.clone());
        let reaper = IdleReaper::spawn(
            pool.clone(),
            config.pool.reap_interval,
            config.pool.idle_timeout,
        );

        info!(verbose = config.diagnostics.verbose, "broker initialized");
        Ok(Self {
            config,
            pool,
            executor,
            reaper: Mutex::new(Some(reaper)),
        })
    }

    /// The active configuration.
    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// The connection pool.
    pub fn pool(&self) -> &ConnectionPool<C> {
        &self.pool
    }

    /// Validate `descriptor` and get a live connection for it.
    pub async fn connect(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> BrokerResult<ConnectionHandle<C::Connection>> {
        descriptor.validate()?;
        Ok(self.pool.acquire(descriptor).await?)
    }

    /// Run a query on an acquired connection.
    pub async fn run_query(
        &self,
        handle: &ConnectionHandle<C::Connection>,
        spec: &QuerySpec,
    ) -> QueryResult<Vec<TypedDocument>> {
        self.executor.execute(handle, spec).await
    }

    /// Close and forget the connection for `key`.
    pub async fn release(&self, key: &ConnectionKey) {
        self.pool.release(key).await;
    }

    /// Stop the reaper and close every pooled connection.
    ///
    /// In-flight queries on closed connections may fail. Calling this more
    /// than once only drains the pool again.
    pub async fn shutdown(&self) {
        let reaper = self.reaper.lock().take();
        if let Some(reaper) = reaper {
            reaper.shutdown().await;
        }
        self.pool.release_all().await;
        info!("broker shut down");
    }
}
