//! HTTP Basic credentials.

use std::fmt;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::ApiError;

/// Username and password taken from an `Authorization: Basic` header.
///
/// They are forwarded to the database as-is; the broker performs no
/// authorization of its own.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    /// Username.
    pub username: String,
    /// Password.
    pub password: String,
}

impl fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("password", &coto_query::error::REDACTED)
            .finish()
    }
}

impl BasicCredentials {
    /// Parse the value of an `Authorization` header.
    pub fn parse(header: &str) -> Result<Self, ApiError> {
        let (scheme, encoded) = header
            .trim()
            .split_once(' ')
            .ok_or_else(|| ApiError::unauthorized("malformed Authorization header"))?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return Err(ApiError::unauthorized("Authorization scheme must be Basic"));
        }

        let decoded = STANDARD
            .decode(encoded.trim())
            .map_err(|_| ApiError::unauthorized("Basic credentials are not valid base64"))?;
        let decoded = String::from_utf8(decoded)
            .map_err(|_| ApiError::unauthorized("Basic credentials are not valid UTF-8"))?;
        let (username, password) = decoded
            .split_once(':')
            .ok_or_else(|| ApiError::unauthorized("Basic credentials must be user:password"))?;
        if username.is_empty() {
            return Err(ApiError::unauthorized("username must not be empty"));
        }

        Ok(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

impl<S> FromRequestParts<S> for BasicCredentials
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or_else(|| ApiError::unauthorized("missing Authorization header"))?;
        let header = header
            .to_str()
            .map_err(|_| ApiError::unauthorized("malformed Authorization header"))?;
        Self::parse(header)
    }
}
