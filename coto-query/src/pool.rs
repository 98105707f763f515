//! Keyed connection pool.
//!
//! The pool keeps at most one live connection per [`ConnectionKey`]. Each key
//! owns a slot guarded by an async mutex, which serializes the probe-or-create
//! sequence for that key while leaving unrelated keys independent. A short-held
//! map lock protects insertion and removal of slots.
//!
//! ```rust,ignore
//! use coto_query::{ClientConfig, ConnectionDescriptor, ConnectionPool};
//!
//! let pool = ConnectionPool::new(client, ClientConfig::default());
//! let descriptor = ConnectionDescriptor::new("bob", "secret", "localhost", "shop", "orders");
//!
//! let first = pool.acquire(&descriptor).await?;
//! let second = pool.acquire(&descriptor).await?; // pool hit
//! assert_eq!(pool.stats().opens, 1);
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Mutex as SlotMutex;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::client::{ConnectOptions, DatabaseClient, Namespace};
use crate::config::ClientConfig;
use crate::descriptor::{ConnectionDescriptor, ConnectionKey};
use crate::error::{ConnectionError, ConnectionResult};

type Slot<T> = Arc<SlotMutex<Option<PooledConnection<T>>>>;

/// A live connection owned by the pool.
#[derive(Debug, Clone)]
pub struct PooledConnection<T> {
    /// The client handle.
    pub connection: T,
    /// When the connection was last handed out.
    pub last_used: Instant,
}

impl<T> PooledConnection<T> {
    fn new(connection: T) -> Self {
        Self {
            connection,
            last_used: Instant::now(),
        }
    }
}

/// A connection bound to the collection a request targets.
#[derive(Debug, Clone)]
pub struct ConnectionHandle<T> {
    connection: T,
    key: ConnectionKey,
    namespace: Namespace,
}

impl<T> ConnectionHandle<T> {
    /// Create a handle.
    pub fn new(connection: T, key: ConnectionKey, namespace: Namespace) -> Self {
        Self {
            connection,
            key,
            namespace,
        }
    }

    /// The underlying client handle.
    pub fn connection(&self) -> &T {
        &self.connection
    }

    /// The pool key this handle was acquired under.
    pub fn key(&self) -> &ConnectionKey {
        &self.key
    }

    /// The target database and collection.
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }
}

/// Statistics about pool usage.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PoolStats {
    /// Number of new connections opened and verified.
    pub opens: u64,
    /// Number of pool hits.
    pub reuses: u64,
    /// Number of cached connections discarded after a failed probe.
    pub probe_failures: u64,
    /// Number of connections reaped for idleness.
    pub reaped: u64,
    /// Number of close calls issued.
    pub closed: u64,
}

/// A pool of live connections keyed by host, port, database, and user.
pub struct ConnectionPool<C: DatabaseClient> {
    client: Arc<C>,
    config: Arc<ClientConfig>,
    slots: Arc<Mutex<HashMap<ConnectionKey, Slot<C::Connection>>>>,
    stats: Arc<Mutex<PoolStats>>,
}

impl<C: DatabaseClient> Clone for ConnectionPool<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            config: Arc::clone(&self.config),
            slots: Arc::clone(&self.slots),
            stats: Arc::clone(&self.stats),
        }
    }
}

impl<C: DatabaseClient> ConnectionPool<C> {
    /// Create an empty pool.
    pub fn new(client: C, config: ClientConfig) -> Self {
        Self::with_shared_client(Arc::new(client), config)
    }

    /// Create an empty pool around a client shared with other components.
    pub fn with_shared_client(client: Arc<C>, config: ClientConfig) -> Self {
        Self {
            client,
            config: Arc::new(config),
            slots: Arc::new(Mutex::new(HashMap::new())),
            stats: Arc::new(Mutex::new(PoolStats::default())),
        }
    }

    /// The database client.
    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    /// The options applied to new clients.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get a verified connection for `descriptor`.
    ///
    /// A cached connection is probed before reuse; if the probe fails it is
    /// closed and replaced. Concurrent callers with the same key wait for each
    /// other, so a miss opens exactly one connection.
    pub async fn acquire(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> ConnectionResult<ConnectionHandle<C::Connection>> {
        let key = descriptor.key();
        let slot = self.slot(&key);

        let result = {
            let mut guard = slot.lock().await;
            self.probe_or_create(&key, descriptor, &mut guard).await
        };

        match result {
            Ok(connection) => Ok(ConnectionHandle::new(
                connection,
                key,
                Namespace::new(&descriptor.database, &descriptor.collection),
            )),
            Err(err) => {
                self.prune(&key, &slot);
                Err(err)
            }
        }
    }

    async fn probe_or_create(
        &self,
        key: &ConnectionKey,
        descriptor: &ConnectionDescriptor,
        slot: &mut Option<PooledConnection<C::Connection>>,
    ) -> ConnectionResult<C::Connection> {
        if let Some(pooled) = slot.as_mut() {
            match self.client.ping(&pooled.connection).await {
                Ok(()) => {
                    pooled.last_used = Instant::now();
                    self.stats.lock().reuses += 1;
                    trace!(key = %key, "reusing pooled connection");
                    return Ok(pooled.connection.clone());
                }
                Err(err) => {
                    warn!(key = %key, error = %err, "liveness probe failed, reconnecting");
                }
            }
        }

        if let Some(stale) = slot.take() {
            self.stats.lock().probe_failures += 1;
            self.close_quietly(key, stale.connection).await;
        }

        let connection = self.open_verified(key, descriptor).await?;
        *slot = Some(PooledConnection::new(connection.clone()));
        Ok(connection)
    }

    async fn open_verified(
        &self,
        key: &ConnectionKey,
        descriptor: &ConnectionDescriptor,
    ) -> ConnectionResult<C::Connection> {
        let uri = descriptor.connection_uri(&self.config);
        let options = ConnectOptions {
            auth_source: descriptor.effective_auth_source(&self.config).to_string(),
            auth_mechanism: descriptor.effective_auth_mechanism(&self.config).to_string(),
            client: (*self.config).clone(),
        };
        debug!(key = %key, uri = %uri, mechanism = %options.auth_mechanism, "opening connection");

        let connection = match self.client.open(&uri, &options).await {
            Ok(connection) => connection,
            Err(err) => return Err(self.diagnose(err, key, descriptor, &options)),
        };

        if let Err(err) = self.client.ping(&connection).await {
            self.close_quietly(key, connection).await;
            return Err(self.diagnose(err, key, descriptor, &options));
        }

        self.stats.lock().opens += 1;
        info!(key = %key, "connection established");
        Ok(connection)
    }

    fn diagnose(
        &self,
        err: ConnectionError,
        key: &ConnectionKey,
        descriptor: &ConnectionDescriptor,
        options: &ConnectOptions,
    ) -> ConnectionError {
        let err = err.redacted(&descriptor.password).with_diagnostics(
            &descriptor.database,
            &options.auth_source,
            &options.auth_mechanism,
        );
        warn!(
            key = %key,
            kind = %err.kind,
            code = %err.code(),
            error = %err.message,
            "connection failed"
        );
        err
    }

    /// Close and remove the connection for `key`, if any.
    pub async fn release(&self, key: &ConnectionKey) {
        let slot = self.slots.lock().get(key).cloned();
        let Some(slot) = slot else {
            return;
        };

        let taken = slot.lock().await.take();
        self.prune(key, &slot);
        if let Some(pooled) = taken {
            debug!(key = %key, "releasing connection");
            self.close_quietly(key, pooled.connection).await;
        }
    }

    /// Close and remove every connection.
    pub async fn release_all(&self) {
        let keys = self.keys();
        let count = keys.len();
        for key in keys {
            self.release(&key).await;
        }
        info!(count, "released all pooled connections");
    }

    /// Close and remove every connection unused for longer than `max_idle`.
    ///
    /// Slots locked by an in-flight acquire are skipped; that acquire refreshes
    /// the timestamp anyway. Returns the number of connections reaped.
    pub async fn reap_idle(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let mut stale = Vec::new();

        self.slots.lock().retain(|key, slot| {
            let empty = match slot.try_lock() {
                Ok(mut guard) => {
                    let idle = guard
                        .as_ref()
                        .is_some_and(|p| now.duration_since(p.last_used) > max_idle);
                    if idle {
                        if let Some(pooled) = guard.take() {
                            stale.push((key.clone(), pooled.connection));
                        }
                    }
                    guard.is_none()
                }
                Err(_) => return true,
            };
            !(empty && Arc::strong_count(slot) == 1)
        });

        let reaped = stale.len();
        for (key, connection) in stale {
            debug!(key = %key, "reaping idle connection");
            self.close_quietly(&key, connection).await;
        }

        if reaped > 0 {
            self.stats.lock().reaped += reaped as u64;
            info!(reaped, "reaped idle connections");
        }
        reaped
    }

    /// Number of keys in the pool, including slots still being established.
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    /// Whether the pool holds no keys.
    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }

    /// Whether the pool holds a slot for `key`.
    pub fn contains(&self, key: &ConnectionKey) -> bool {
        self.slots.lock().contains_key(key)
    }

    /// When the connection for `key` was last handed out.
    pub async fn last_used(&self, key: &ConnectionKey) -> Option<Instant> {
        let slot = self.slots.lock().get(key).cloned()?;
        let guard = slot.lock().await;
        guard.as_ref().map(|p| p.last_used)
    }

    /// Keys currently in the pool, sorted.
    pub fn keys(&self) -> Vec<ConnectionKey> {
        let mut keys: Vec<ConnectionKey> = self.slots.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Get pool statistics.
    pub fn stats(&self) -> PoolStats {
        self.stats.lock().clone()
    }

    fn slot(&self, key: &ConnectionKey) -> Slot<C::Connection> {
        let mut slots = self.slots.lock();
        Arc::clone(
            slots
                .entry(key.clone())
                .or_insert_with(|| Arc::new(SlotMutex::new(None))),
        )
    }

    /// Drop the map entry for `key` if it is `slot`, holds nothing, and only
    /// the map and the caller reference it.
    fn prune(&self, key: &ConnectionKey, slot: &Slot<C::Connection>) {
        let mut slots = self.slots.lock();
        let removable = slots.get(key).is_some_and(|current| {
            Arc::ptr_eq(current, slot)
                && Arc::strong_count(slot) == 2
                && slot.try_lock().is_ok_and(|guard| guard.is_none())
        });
        if removable {
            slots.remove(key);
        }
    }

    async fn close_quietly(&self, key: &ConnectionKey, connection: C::Connection) {
        self.stats.lock().closed += 1;
        if let Err(err) = self.client.close(connection).await {
            warn!(key = %key, error = %err, "failed to close connection");
        }
    }
}
