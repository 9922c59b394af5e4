//! Caller identity extraction
//!
//! Authentication is an upstream concern; the gateway forwards the
//! authenticated user id in a trusted header, and handlers consume it
//! through the [`CallerId`] extractor.

use std::ops::Deref;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use plaza_types::UserId;

use crate::error::GateError;

/// Header carrying the authenticated user id
pub const CALLER_ID_HEADER: &str = "x-user-id";

/// Extractor for the authenticated caller.
///
/// Rejects with 401 when the header is absent and 400 when it is not a
/// valid user id.
///
/// # Example
///
/// ```ignore
/// async fn handler(caller: CallerId) -> impl IntoResponse {
///     format!("user {}", caller.0)
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct CallerId(pub UserId);

impl Deref for CallerId {
    type Target = UserId;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Read the caller id out of a header map.
///
/// Shared by the extractor and the gate middleware so both reject with the
/// same errors.
pub fn caller_id_from_headers(headers: &HeaderMap) -> Result<UserId, GateError> {
    let value = headers
        .get(CALLER_ID_HEADER)
        .ok_or(GateError::MissingCallerId)?;
    let value = value.to_str().map_err(|_| GateError::InvalidCallerId)?;
    UserId::parse(value).map_err(|_| GateError::InvalidCallerId)
}

impl<S> FromRequestParts<S> for CallerId
where
    S: Send + Sync,
{
    type Rejection = GateError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        caller_id_from_headers(&parts.headers).map(Self)
    }
}
