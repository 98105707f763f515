//! # coto
//!
//! An HTTP query broker for MongoDB.
//!
//! coto accepts per-request credentials and a query payload, resolves or
//! creates a pooled connection for the caller, translates the query text
//! (including shell-style `ISODate(...)` and `ObjectId(...)` literals), runs
//! it as a find or an aggregation, and returns the documents.
//!
//! coto provides:
//! - A keyed connection pool that probes cached connections before reuse and
//!   reaps idle ones in the background
//! - An Extended-JSON translator
//! - A MongoDB binding on the official driver
//! - An axum endpoint and the `coto` server binary
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use coto::prelude::*;
//! use coto::mongodb::MongoClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), BrokerError> {
//!     let broker = Broker::init(MongoClient::new(), BrokerConfig::from_env()?)?;
//!
//!     let descriptor = ConnectionDescriptor::new("grafana", "secret", "localhost", "shop", "orders");
//!     let handle = broker.connect(&descriptor).await?;
//!
//!     let spec = QuerySpec::from_parts(
//!         "find",
//!         r#"{"createdAt": {"$gte": "ISODate('2024-01-01T00:00:00Z')"}}"#,
//!         Some(r#"{"createdAt": -1}"#),
//!         None,
//!         Some(10),
//!     )?;
//!     let docs = broker.run_query(&handle, &spec).await?;
//!
//!     broker.shutdown().await;
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// Pooling, translation, and execution core.
pub mod query {
    pub use coto_query::*;
}

/// MongoDB binding.
#[cfg(feature = "mongodb")]
#[cfg_attr(docsrs, doc(cfg(feature = "mongodb")))]
pub mod mongodb {
    pub use coto_mongodb::*;
}

/// HTTP endpoint and server.
#[cfg(feature = "server")]
#[cfg_attr(docsrs, doc(cfg(feature = "server")))]
pub mod server {
    pub use coto_axum::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use coto_query::prelude::*;
    pub use coto_query::{ConnectionKey, FindSpec, QueryError, QueryKind};
}

// Re-export key types at the crate root
pub use coto_query::{
    Broker, BrokerConfig, BrokerError, ConnectionDescriptor, DatabaseClient, QuerySpec,
    TypedDocument, TypedValue,
};
