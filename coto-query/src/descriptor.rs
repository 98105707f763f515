//! Connection descriptors, pool keys, and connection strings.

use std::fmt;

use crate::config::{ClientConfig, DEFAULT_PORT};
use crate::error::{BrokerError, BrokerResult, REDACTED};

/// Everything a caller supplies to reach one collection.
///
/// Descriptors are built per request and never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    /// Username.
    pub username: String,
    /// Password.
    pub password: String,
    /// Server host.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Database name.
    pub database: String,
    /// Collection queried through this connection.
    pub collection: String,
    /// Authentication database, if the caller chose one.
    pub auth_source: Option<String>,
    /// Authentication mechanism, if the caller chose one.
    pub auth_mechanism: Option<String>,
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("username", &self.username)
            .field("password", &REDACTED)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("collection", &self.collection)
            .field("auth_source", &self.auth_source)
            .field("auth_mechanism", &self.auth_mechanism)
            .finish()
    }
}

impl ConnectionDescriptor {
    /// Create a descriptor on the default port.
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        host: impl Into<String>,
        database: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            host: host.into(),
            port: DEFAULT_PORT,
            database: database.into(),
            collection: collection.into(),
            auth_source: None,
            auth_mechanism: None,
        }
    }

    /// Set the port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the authentication database.
    pub fn auth_source(mut self, source: impl Into<String>) -> Self {
        self.auth_source = Some(source.into());
        self
    }

    /// Set the authentication mechanism.
    pub fn auth_mechanism(mut self, mechanism: impl Into<String>) -> Self {
        self.auth_mechanism = Some(mechanism.into());
        self
    }

    /// Check that every required field is present.
    pub fn validate(&self) -> BrokerResult<()> {
        let missing: Vec<&str> = [
            ("username", &self.username),
            ("host", &self.host),
            ("database", &self.database),
            ("collection", &self.collection),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(BrokerError::invalid_request(format!(
                "missing connection field(s): {}",
                missing.join(", ")
            )))
        }
    }

    /// The pool key of this descriptor.
    pub fn key(&self) -> ConnectionKey {
        ConnectionKey {
            host: self.host.clone(),
            port: self.port,
            database: self.database.clone(),
            username: self.username.clone(),
        }
    }

    /// The authentication database, falling back to the configured default.
    pub fn effective_auth_source<'a>(&'a self, defaults: &'a ClientConfig) -> &'a str {
        self.auth_source
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.default_auth_source.as_str())
    }

    /// The authentication mechanism, falling back to the configured default.
    pub fn effective_auth_mechanism<'a>(&'a self, defaults: &'a ClientConfig) -> &'a str {
        self.auth_mechanism
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.default_auth_mechanism.as_str())
    }

    /// Build the connection string for this descriptor.
    pub fn connection_uri(&self, defaults: &ClientConfig) -> ConnectionUri {
        ConnectionUri::build(self, self.effective_auth_source(defaults))
    }
}

/// Identity of a pooled connection.
///
/// Requests with equal keys share one connection. The password and the
/// collection are deliberately not part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionKey {
    /// Server host.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Database name.
    pub database: String,
    /// Username.
    pub username: String,
}

impl fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}:{}", self.host, self.port, self.database, self.username)
    }
}

/// A connection string that hides its password.
///
/// `Display` and `Debug` render the redacted form; only [`ConnectionUri::expose`]
/// yields the string handed to the driver.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionUri {
    secret: String,
    redacted: String,
    password: String,
}

impl ConnectionUri {
    /// The URI scheme.
    pub const SCHEME: &'static str = "mongodb";

    fn build(descriptor: &ConnectionDescriptor, auth_source: &str) -> Self {
        let user = urlencoding::encode(&descriptor.username);
        let password = urlencoding::encode(&descriptor.password);
        let mut tail = format!("@{}:{}", descriptor.host, descriptor.port);
        if !descriptor.database.is_empty() {
            tail.push('/');
            tail.push_str(&descriptor.database);
        }
        if !auth_source.is_empty() {
            tail.push_str("?authSource=");
            tail.push_str(&urlencoding::encode(auth_source));
        }

        Self {
            secret: format!("{}://{}:{}{}", Self::SCHEME, user, password, tail),
            redacted: format!("{}://{}:{}{}", Self::SCHEME, user, REDACTED, tail),
            password: descriptor.password.clone(),
        }
    }

    /// The full connection string, password included.
    pub fn expose(&self) -> &str {
        &self.secret
    }

    /// The connection string with the password replaced.
    pub fn redacted(&self) -> &str {
        &self.redacted
    }

    /// Remove this URI's password from an arbitrary message.
    pub fn scrub(&self, message: &str) -> String {
        crate::error::redact(message, &self.password)
    }
}

impl fmt::Display for ConnectionUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted)
    }
}

impl fmt::Debug for ConnectionUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ConnectionUri").field(&self.redacted).finish()
    }
}
