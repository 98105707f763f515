//! # coto-query
//!
//! Driver-agnostic core of the coto query broker.
//!
//! This crate provides:
//! - A keyed connection pool with liveness probing and idle reaping
//! - An Extended-JSON translator for shell-style `ISODate(...)` and
//!   `ObjectId(...)` literals
//! - A query executor for find and aggregate requests
//! - The [`Broker`] facade tying them together
//!
//! The database itself sits behind the [`DatabaseClient`] trait; see
//! `coto-mongodb` for the MongoDB implementation.
//!
//! ## Translating queries
//!
//! ```rust
//! use coto_query::extjson;
//!
//! let filter = extjson::translate_document(
//!     r#"{"createdAt": {"$gte": "ISODate('2024-01-01T00:00:00.000Z')"}}"#,
//! ).unwrap();
//! let created = filter["createdAt"].as_document().unwrap();
//! assert_eq!(
//!     created["$gte"].as_datetime().unwrap().to_rfc3339(),
//!     "2024-01-01T00:00:00+00:00"
//! );
//! ```
//!
//! ## Building requests
//!
//! ```rust
//! use coto_query::{ConnectionDescriptor, QueryKind, QuerySpec};
//!
//! let descriptor = ConnectionDescriptor::new("grafana", "secret", "localhost", "shop", "products")
//!     .auth_source("admin");
//! assert_eq!(descriptor.key().to_string(), "localhost:27017:shop:grafana");
//!
//! let spec = QuerySpec::from_parts("find", r#"{"qty": {"$gt": 15}}"#, None, None, Some(2)).unwrap();
//! assert_eq!(spec.kind(), QueryKind::Find);
//! ```
//!
//! ## Running queries
//!
//! ```rust,ignore
//! use coto_query::{Broker, BrokerConfig};
//!
//! let broker = Broker::init(client, BrokerConfig::from_env()?)?;
//! let handle = broker.connect(&descriptor).await?;
//! let docs = broker.run_query(&handle, &spec).await?;
//! broker.shutdown().await;
//! ```

pub mod broker;
pub mod client;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod executor;
pub mod extjson;
pub mod logging;
pub mod pool;
pub mod reaper;
pub mod spec;
pub mod value;

pub use broker::Broker;
pub use client::{ConnectOptions, DatabaseClient, FindOptions, Namespace};
pub use config::{
    BrokerConfig, ClientConfig, DiagnosticsConfig, EnvSource, MapEnvSource, PoolConfig,
    StdEnvSource,
};
pub use descriptor::{ConnectionDescriptor, ConnectionKey, ConnectionUri};
pub use error::{
    BrokerError, BrokerResult, ConnectionError, ConnectionErrorKind, ConnectionResult, ErrorCode,
    QueryError, QueryErrorKind, QueryResult,
};
pub use executor::QueryExecutor;
pub use extjson::{translate, translate_document, translate_pipeline};
pub use pool::{ConnectionHandle, ConnectionPool, PoolStats, PooledConnection};
pub use reaper::{IdleReaper, ReaperHandle};
pub use spec::{FindSpec, QueryKind, QuerySpec};
pub use value::{PassthroughOperator, TypedDocument, TypedValue, is_valid_query};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::broker::Broker;
    pub use crate::client::DatabaseClient;
    pub use crate::config::BrokerConfig;
    pub use crate::descriptor::ConnectionDescriptor;
    pub use crate::error::{BrokerError, BrokerResult};
    pub use crate::spec::QuerySpec;
    pub use crate::value::{TypedDocument, TypedValue};
}
