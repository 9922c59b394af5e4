//! Error types for the gate middleware and extractors

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use plaza_entitlement_core::EntitlementError;
use plaza_types::Decision;

/// JSON error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// Gate middleware errors.
///
/// Denials carry the guard's decision; they are expected outcomes mapped to
/// a structured response, never a pipeline abort.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// The caller-identity header is absent
    #[error("caller identity required")]
    MissingCallerId,

    /// The caller-identity header is not a valid user id
    #[error("invalid caller identity")]
    InvalidCallerId,

    /// The entitlement check denied the request
    #[error("access denied: {0}")]
    Denied(Decision),

    /// Storage failure behind the engine
    #[error("entitlement storage unavailable")]
    Storage(#[source] EntitlementError),

    /// Any other engine failure (configuration integrity, boundary misuse)
    #[error("entitlement engine error")]
    Engine(#[source] EntitlementError),
}

impl GateError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingCallerId => StatusCode::UNAUTHORIZED,
            Self::InvalidCallerId => StatusCode::BAD_REQUEST,
            Self::Denied(Decision::DeniedUsageExceeded) => StatusCode::TOO_MANY_REQUESTS,
            Self::Denied(_) => StatusCode::FORBIDDEN,
            Self::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Engine(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingCallerId => "CALLER_ID_REQUIRED",
            Self::InvalidCallerId => "CALLER_ID_INVALID",
            Self::Denied(decision) => decision.reason_code(),
            Self::Storage(_) => "STORAGE_UNAVAILABLE",
            Self::Engine(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<EntitlementError> for GateError {
    fn from(err: EntitlementError) -> Self {
        match err {
            // Infrastructure failures are kept distinct from denials so a
            // storage outage never reads as "usage exceeded".
            EntitlementError::Database(_) => Self::Storage(err),
            _ => Self::Engine(err),
        }
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        if matches!(self, Self::Storage(_) | Self::Engine(_)) {
            tracing::error!(error = ?self, "entitlement gate failure");
        }

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
            },
        };

        (status, Json(body)).into_response()
    }
}
