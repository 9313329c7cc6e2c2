//! Error classification logic

use super::FailureClass;
use crate::{Error, ErrorContext};

/// Marker the generation API puts in quota errors, regardless of status code.
const QUOTA_MARKER: &str = "RESOURCE_EXHAUSTED";

/// Classify a non-success HTTP response.
///
/// - 429 or a `RESOURCE_EXHAUSTED` status string: the key's quota is spent
/// - 408 and 5xx: transient server trouble, worth waiting for
/// - everything else (bad request, auth, not found): other
pub fn classify_status(status: u16, body: &str) -> FailureClass {
    if status == 429 || body.contains(QUOTA_MARKER) {
        return FailureClass::QuotaExhausted;
    }
    match status {
        408 | 500..=599 => FailureClass::Transient,
        _ => FailureClass::Other,
    }
}

/// Map a transport-level failure. Connection problems and timeouts are
/// transient; a request that could not even be built is a local bug and is
/// not retried.
pub fn transport_failure(err: reqwest::Error) -> Error {
    if err.is_builder() {
        return Error::configuration_with_context(
            format!("failed to build generation request: {}", err),
            ErrorContext::new().with_source("gemini_tts"),
        );
    }
    let class = if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
        FailureClass::Transient
    } else {
        FailureClass::Other
    };
    Error::remote(class, err.status().map(|s| s.as_u16()), err.to_string())
}
