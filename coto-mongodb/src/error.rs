//! Mapping of driver errors onto broker errors.

use std::io;

use mongodb::error::{Error, ErrorKind};

use coto_query::{ConnectionError, ConnectionErrorKind, QueryError};

/// Server error code for a failed authentication.
pub const AUTHENTICATION_FAILED_CODE: i32 = 18;

/// Classify a driver error raised while opening or probing a connection.
///
/// Structural information is used first; the message text is the fallback.
pub fn connection_error(err: &Error) -> ConnectionError {
    let message = err.to_string();
    match classify(&err.kind) {
        Some(kind) => ConnectionError::new(kind, message),
        None => ConnectionError::classified(message),
    }
}

/// Wrap a driver error raised while running an operation.
pub fn query_error(err: Error) -> QueryError {
    QueryError::remote(err.to_string())
}

fn classify(kind: &ErrorKind) -> Option<ConnectionErrorKind> {
    match kind {
        ErrorKind::Authentication { .. } => Some(ConnectionErrorKind::AuthFailure),
        ErrorKind::Command(command) => classify_code(command.code),
        ErrorKind::Io(io) => classify_io(io.kind()),
        _ => None,
    }
}

/// Classify a server error code.
pub fn classify_code(code: i32) -> Option<ConnectionErrorKind> {
    (code == AUTHENTICATION_FAILED_CODE).then_some(ConnectionErrorKind::AuthFailure)
}

/// Classify an I/O error kind.
pub fn classify_io(kind: io::ErrorKind) -> Option<ConnectionErrorKind> {
    match kind {
        io::ErrorKind::TimedOut => Some(ConnectionErrorKind::Timeout),
        io::ErrorKind::ConnectionRefused => Some(ConnectionErrorKind::Refused),
        _ => None,
    }
}
