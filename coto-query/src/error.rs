//! Error types for the broker core.
//!
//! Every failure carries an [`ErrorCode`] for programmatic handling:
//!
//! - 1xxx: Query input errors (empty query, unknown kind, malformed text)
//! - 3xxx: Connection errors (authentication, timeout, refusal)
//! - 5xxx: Execution errors (remote failures)
//! - 7xxx: Configuration and request errors
//! - 9xxx: Internal errors
//!
//! ```rust
//! use coto_query::{ErrorCode, QueryError, QueryErrorKind};
//!
//! let err = QueryError::empty_query();
//! assert_eq!(err.kind, QueryErrorKind::EmptyQuery);
//! assert_eq!(err.code(), ErrorCode::EmptyQuery);
//! assert_eq!(err.code().code(), "C1001");
//! ```
//!
//! Connection errors never carry the password used to open the connection.
//! Messages coming from the driver are passed through [`redact`] before they
//! are stored.

use std::fmt;

use thiserror::Error;

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Result type for connection operations.
pub type ConnectionResult<T> = Result<T, ConnectionError>;

/// Result type for broker operations.
pub type BrokerResult<T> = Result<T, BrokerError>;

/// Placeholder used wherever a secret has been removed.
pub const REDACTED: &str = "***";

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Query input errors (1xxx)
    /// Query text was empty (C1001).
    EmptyQuery = 1001,
    /// Query kind is neither find nor aggregate (C1002).
    UnsupportedKind = 1002,
    /// Query, sort, or projection text is malformed (C1003).
    ParseFailure = 1003,

    // Connection errors (3xxx)
    /// Connection could not be established (C3001).
    ConnectionFailed = 3001,
    /// Connection timed out (C3003).
    ConnectionTimeout = 3003,
    /// Authentication failed (C3004).
    AuthenticationFailed = 3004,
    /// Server refused the connection (C3006).
    ConnectionRefused = 3006,

    // Execution errors (5xxx)
    /// Remote operation failed (C5005).
    RemoteFailure = 5005,

    // Configuration and request errors (7xxx)
    /// Invalid configuration (C7001).
    InvalidConfiguration = 7001,
    /// Invalid request (C7004).
    InvalidRequest = 7004,

    // Internal errors (9xxx)
    /// Internal error (C9001).
    Internal = 9001,
}

impl ErrorCode {
    /// Get the error code string (e.g., "C3004").
    pub fn code(&self) -> String {
        format!("C{}", *self as u16)
    }

    /// Get a short description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::EmptyQuery => "Query must not be empty",
            Self::UnsupportedKind => "Unsupported query kind",
            Self::ParseFailure => "Malformed query text",
            Self::ConnectionFailed => "Database connection failed",
            Self::ConnectionTimeout => "Connection timeout",
            Self::AuthenticationFailed => "Authentication failed",
            Self::ConnectionRefused => "Connection refused",
            Self::RemoteFailure => "Remote operation failed",
            Self::InvalidConfiguration => "Invalid configuration",
            Self::InvalidRequest => "Invalid request",
            Self::Internal => "Internal error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Classification of a connection failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionErrorKind {
    /// Credentials were rejected by the server.
    AuthFailure,
    /// Connecting or server selection timed out.
    Timeout,
    /// The server actively refused the connection.
    Refused,
    /// Anything else.
    Other,
}

impl ConnectionErrorKind {
    /// Classify a driver message by its text.
    ///
    /// This is the fallback used after structural classification of driver
    /// errors has failed to find a more specific kind.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        if lower.contains("authentication failed")
            || lower.contains("auth error")
            || lower.contains("code: 18")
            || lower.contains("code 18")
        {
            Self::AuthFailure
        } else if lower.contains("timed out") || lower.contains("timeout") {
            Self::Timeout
        } else if lower.contains("econnrefused") || lower.contains("connection refused") {
            Self::Refused
        } else {
            Self::Other
        }
    }

    /// The error code for this kind.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::AuthFailure => ErrorCode::AuthenticationFailed,
            Self::Timeout => ErrorCode::ConnectionTimeout,
            Self::Refused => ErrorCode::ConnectionRefused,
            Self::Other => ErrorCode::ConnectionFailed,
        }
    }
}

impl fmt::Display for ConnectionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AuthFailure => "authentication failure",
            Self::Timeout => "timeout",
            Self::Refused => "connection refused",
            Self::Other => "connection failure",
        };
        f.write_str(name)
    }
}

/// A failure to open or verify a connection.
#[derive(Error, Debug, Clone)]
pub struct ConnectionError {
    /// What went wrong.
    pub kind: ConnectionErrorKind,
    /// Redacted diagnostic message.
    pub message: String,
    /// Hints for the operator.
    pub suggestions: Vec<String>,
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code().code(), self.kind, self.message)
    }
}

impl ConnectionError {
    /// Create a new connection error.
    pub fn new(kind: ConnectionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            suggestions: Vec::new(),
        }
    }

    /// Create an error whose kind is derived from the message text.
    pub fn classified(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ConnectionErrorKind::classify(&message), message)
    }

    /// Create an authentication failure.
    pub fn auth_failure(message: impl Into<String>) -> Self {
        Self::new(ConnectionErrorKind::AuthFailure, message)
    }

    /// Create a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ConnectionErrorKind::Timeout, message)
    }

    /// Create a connection refused error.
    pub fn refused(message: impl Into<String>) -> Self {
        Self::new(ConnectionErrorKind::Refused, message)
    }

    /// Create an unclassified connection error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::new(ConnectionErrorKind::Other, message)
    }

    /// Add a suggestion for fixing the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Remove every occurrence of `secret` from the message.
    pub fn redacted(mut self, secret: &str) -> Self {
        self.message = redact(&self.message, secret);
        self
    }

    /// Attach the standard operator hints for this kind.
    ///
    /// `database`, `auth_source`, and `auth_mechanism` describe the target so
    /// the hints can name them.
    pub fn with_diagnostics(self, database: &str, auth_source: &str, auth_mechanism: &str) -> Self {
        match self.kind {
            ConnectionErrorKind::AuthFailure => self
                .with_suggestion("Check that the username and password are correct")
                .with_suggestion(format!("Check that the user can access database '{}'", database))
                .with_suggestion(format!("Check that the authSource '{}' is correct", auth_source))
                .with_suggestion(format!(
                    "Check that the authMechanism '{}' is supported by the server",
                    auth_mechanism
                )),
            ConnectionErrorKind::Timeout => self.with_suggestion(
                "Check that the server is reachable and not blocked by a firewall",
            ),
            ConnectionErrorKind::Refused => {
                self.with_suggestion("Check that the server is running and accepting connections")
            }
            ConnectionErrorKind::Other => self,
        }
    }

    /// The error code for this error.
    pub fn code(&self) -> ErrorCode {
        self.kind.code()
    }

    /// Check if this is an authentication failure.
    pub fn is_auth_failure(&self) -> bool {
        self.kind == ConnectionErrorKind::AuthFailure
    }

    /// Check if this is a timeout.
    pub fn is_timeout(&self) -> bool {
        self.kind == ConnectionErrorKind::Timeout
    }
}

/// Classification of a query failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryErrorKind {
    /// The filter or pipeline text was empty.
    EmptyQuery,
    /// The query kind is not `find` or `aggregate`.
    UnsupportedKind,
    /// Query, sort, or projection text could not be parsed.
    ParseFailure,
    /// The driver reported an error while running the operation.
    RemoteFailure,
}

impl QueryErrorKind {
    /// The error code for this kind.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::EmptyQuery => ErrorCode::EmptyQuery,
            Self::UnsupportedKind => ErrorCode::UnsupportedKind,
            Self::ParseFailure => ErrorCode::ParseFailure,
            Self::RemoteFailure => ErrorCode::RemoteFailure,
        }
    }
}

/// A failure to translate or execute a query.
#[derive(Error, Debug, Clone)]
pub struct QueryError {
    /// What went wrong.
    pub kind: QueryErrorKind,
    /// Diagnostic message.
    pub message: String,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code().code(), self.message)
    }
}

impl QueryError {
    /// Create a new query error.
    pub fn new(kind: QueryErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// The query text was empty.
    pub fn empty_query() -> Self {
        Self::new(QueryErrorKind::EmptyQuery, "query must not be empty")
    }

    /// The query kind is not recognised.
    pub fn unsupported_kind(kind: impl fmt::Display) -> Self {
        Self::new(
            QueryErrorKind::UnsupportedKind,
            format!("unsupported query kind '{}', expected 'find' or 'aggregate'", kind),
        )
    }

    /// Some text could not be parsed.
    pub fn parse(what: &str, message: impl fmt::Display) -> Self {
        Self::new(
            QueryErrorKind::ParseFailure,
            format!("invalid {}: {}", what, message),
        )
    }

    /// The remote operation failed.
    pub fn remote(message: impl Into<String>) -> Self {
        Self::new(QueryErrorKind::RemoteFailure, message)
    }

    /// The error code for this error.
    pub fn code(&self) -> ErrorCode {
        self.kind.code()
    }

    /// Check if this is a parse failure.
    pub fn is_parse_failure(&self) -> bool {
        self.kind == QueryErrorKind::ParseFailure
    }

    /// Check if this is a remote failure.
    pub fn is_remote_failure(&self) -> bool {
        self.kind == QueryErrorKind::RemoteFailure
    }
}

/// Any error the broker surfaces to its caller.
#[derive(Error, Debug, Clone)]
pub enum BrokerError {
    /// Connection could not be established.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Query could not be translated or executed.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Configuration is invalid.
    #[error("[C7001] configuration error: {0}")]
    Config(String),

    /// Request is missing required information.
    #[error("[C7004] invalid request: {0}")]
    InvalidRequest(String),
}

impl BrokerError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// The error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Connection(e) => e.code(),
            Self::Query(e) => e.code(),
            Self::Config(_) => ErrorCode::InvalidConfiguration,
            Self::InvalidRequest(_) => ErrorCode::InvalidRequest,
        }
    }
}

/// Replace every occurrence of `secret`, raw or percent-encoded, with [`REDACTED`].
pub fn redact(message: &str, secret: &str) -> String {
    if secret.is_empty() {
        return message.to_string();
    }
    let encoded = urlencoding::encode(secret);
    let redacted = message.replace(secret, REDACTED);
    if encoded != secret {
        redacted.replace(encoded.as_ref(), REDACTED)
    } else {
        redacted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(ErrorCode::EmptyQuery.code(), "C1001");
        assert_eq!(ErrorCode::AuthenticationFailed.code(), "C3004");
        assert_eq!(ErrorCode::RemoteFailure.to_string(), "C5005");
    }

    #[test]
    fn test_classify_messages() {
        assert_eq!(
            ConnectionErrorKind::classify("Command failed: Authentication failed."),
            ConnectionErrorKind::AuthFailure
        );
        assert_eq!(
            ConnectionErrorKind::classify("Server selection timed out after 10000 ms"),
            ConnectionErrorKind::Timeout
        );
        assert_eq!(
            ConnectionErrorKind::classify("connect ECONNREFUSED 127.0.0.1:27017"),
            ConnectionErrorKind::Refused
        );
        assert_eq!(
            ConnectionErrorKind::classify("Connection refused (os error 111)"),
            ConnectionErrorKind::Refused
        );
        assert_eq!(
            ConnectionErrorKind::classify("no such host"),
            ConnectionErrorKind::Other
        );
    }

    #[test]
    fn test_redact_raw_and_encoded() {
        let msg = "failed for mongodb://bob:p%40ss@db:27017 using p@ss";
        let out = redact(msg, "p@ss");
        assert!(!out.contains("p@ss"));
        assert!(!out.contains("p%40ss"));
        assert_eq!(out, "failed for mongodb://bob:***@db:27017 using ***");
    }

    #[test]
    fn test_redact_empty_secret() {
        assert_eq!(redact("nothing to hide", ""), "nothing to hide");
    }

    #[test]
    fn test_connection_error_redacted() {
        let err = ConnectionError::classified("Authentication failed for hunter2").redacted("hunter2");
        assert!(err.is_auth_failure());
        assert!(!err.to_string().contains("hunter2"));
    }

    #[test]
    fn test_auth_diagnostics() {
        let err = ConnectionError::auth_failure("Authentication failed").with_diagnostics(
            "test-grafana",
            "admin",
            "SCRAM-SHA-256",
        );
        assert_eq!(err.suggestions.len(), 4);
        assert!(err.suggestions[2].contains("admin"));
    }

    #[test]
    fn test_broker_error_codes() {
        let err: BrokerError = QueryError::unsupported_kind("delete").into();
        assert_eq!(err.code(), ErrorCode::UnsupportedKind);
        assert!(err.to_string().contains("delete"));

        let err: BrokerError = ConnectionError::timeout("timed out").into();
        assert_eq!(err.code(), ErrorCode::ConnectionTimeout);

        let err = BrokerError::invalid_request("missing host");
        assert_eq!(err.code().code(), "C7004");
    }
}
