//! HTTP error responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use coto_query::{
    BrokerError, ConnectionError, ConnectionErrorKind, ErrorCode, QueryError, QueryErrorKind,
};

/// Errors returned by the `/query` endpoint.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Credentials are missing or malformed.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The broker rejected or failed the request.
    #[error(transparent)]
    Broker(#[from] BrokerError),
}

impl ApiError {
    /// Create an unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    /// Create an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::Broker(BrokerError::invalid_request(message))
    }

    /// The HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Broker(BrokerError::InvalidRequest(_)) => StatusCode::BAD_REQUEST,
            Self::Broker(BrokerError::Config(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Broker(BrokerError::Connection(e)) => match e.kind {
                ConnectionErrorKind::AuthFailure => StatusCode::UNAUTHORIZED,
                ConnectionErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
                ConnectionErrorKind::Refused | ConnectionErrorKind::Other => StatusCode::BAD_GATEWAY,
            },
            Self::Broker(BrokerError::Query(e)) => match e.kind {
                QueryErrorKind::EmptyQuery
                | QueryErrorKind::UnsupportedKind
                | QueryErrorKind::ParseFailure => StatusCode::BAD_REQUEST,
                QueryErrorKind::RemoteFailure => StatusCode::BAD_GATEWAY,
            },
        }
    }

    /// The error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Unauthorized(_) => ErrorCode::InvalidRequest,
            Self::Broker(e) => e.code(),
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Unauthorized(message) => message.clone(),
            Self::Broker(BrokerError::Connection(e)) => e.message.clone(),
            Self::Broker(BrokerError::Query(e)) => e.message.clone(),
            Self::Broker(e) => e.to_string(),
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Broker(BrokerError::Connection(e)) => e.suggestions.clone(),
            _ => Vec::new(),
        }
    }
}

impl From<ConnectionError> for ApiError {
    fn from(err: ConnectionError) -> Self {
        Self::Broker(err.into())
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        Self::Broker(err.into())
    }
}

/// JSON body of an error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Human readable message.
    pub error: String,
    /// Error code, e.g. `C3004`.
    pub code: String,
    /// Hints for the operator.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.message(),
            code: self.code().code(),
            suggestions: self.suggestions(),
        };

        if status.is_server_error() {
            error!(status = status.as_u16(), code = %body.code, error = %body.error, "request failed");
        } else {
            warn!(status = status.as_u16(), code = %body.code, error = %body.error, "request rejected");
        }

        (status, Json(body)).into_response()
    }
}
