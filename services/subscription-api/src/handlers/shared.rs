//! Shared handler utilities
//!
//! Common validation and metrics helpers used across handlers.

use std::time::Instant;

use crate::error::ApiError;

/// Maximum length for user-supplied cancellation reasons
pub const MAX_REASON_LEN: usize = 256;

/// Validate a cancellation reason is within safe bounds.
pub fn validate_reason(reason: &str) -> Result<(), ApiError> {
    if reason.len() > MAX_REASON_LEN {
        return Err(ApiError::BadRequest(format!(
            "Cancellation reason too long (max {MAX_REASON_LEN} chars)"
        )));
    }
    Ok(())
}

/// Record operation duration with result label.
///
/// Labels: operation, result (ok/err)
#[inline]
pub fn record_op_duration(operation: &'static str, start: Instant, success: bool) {
    let result = if success { "ok" } else { "err" };
    metrics::histogram!(
        "subscription_operation_duration_seconds",
        "operation" => operation,
        "result" => result
    )
    .record(start.elapsed().as_secs_f64());
}
