//! # coto-mongodb
//!
//! MongoDB binding for the coto broker.
//!
//! This crate provides:
//! - [`MongoClient`], the [`coto_query::DatabaseClient`] implementation on the
//!   official MongoDB driver
//! - Client options built from the broker configuration
//! - Classification of driver errors into connection and query errors
//! - Conversion between typed documents and BSON
//!
//! ## Example
//!
//! ```rust,ignore
//! use coto_mongodb::MongoClient;
//! use coto_query::{Broker, BrokerConfig, ConnectionDescriptor, QuerySpec};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let broker = Broker::init(MongoClient::new(), BrokerConfig::from_env()?)?;
//!
//!     let descriptor = ConnectionDescriptor::new("grafana", "secret", "localhost", "shop", "products");
//!     let handle = broker.connect(&descriptor).await?;
//!
//!     let spec = QuerySpec::from_parts("find", r#"{"qty": {"$gt": 15}}"#, None, None, Some(2))?;
//!     let docs = broker.run_query(&handle, &spec).await?;
//!     println!("{} documents", docs.len());
//!
//!     broker.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod types;

pub use client::MongoClient;
pub use config::{apply_options, client_options};
pub use error::{connection_error, query_error};
pub use types::{from_bson, from_document, to_bson, to_document};

// Re-export BSON types used in results.
pub use bson::{self, Bson, Document, oid::ObjectId};
