//! Error types for boot-time spec/config failures and request-time transport failures.
//!
//! The split mirrors the two populations of error in the request lifecycle: a
//! `BootError` is fatal and reported once at startup; a `TransportError` crosses
//! a [`crate::middleware::Transport::round_trip`] boundary and is mapped to an
//! [`HTTPError`] by the error mapper. Everything a middleware rejects on its own
//! (bad auth header, failed schema validation) is not an error at all — it is an
//! `Ok` response whose body is an `HTTPError`.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BootError {
    #[error("unknown backend {0:?} referenced by operation {1}")]
    UnknownBackend(String, String),
    #[error("unknown middleware {0:?} referenced by operation {1}")]
    UnknownMiddleware(String, String),
    #[error("invalid configuration for middleware {0:?}: {1}")]
    InvalidConfig(String, String),
    #[error("backend {0:?} has an invalid host/scheme: {1}")]
    InvalidBackendHost(String, String),
    #[error("failed to parse OpenAPI specification: {0}")]
    SpecParse(String),
    #[error("operation {0} is missing required extension {1:?}")]
    MissingExtension(String, String),
    #[error("neither TRANSPORTD_OPENAPI_SPECIFICATION_FILE nor _CONTENT is set")]
    NoSpecSource,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request cancelled")]
    Cancelled,
    #[error("deadline exceeded")]
    DeadlineExceeded,
    #[error("upstream error: {0}")]
    Upstream(String),
}

/// Canonical JSON error body emitted by every internally generated response:
/// middleware rejections, router misses, and error-mapped upstream failures.
#[derive(Debug, Clone, Serialize)]
pub struct HTTPError {
    pub code: String,
    pub status: u16,
    pub reason: String,
}

impl HTTPError {
    pub fn new(status: u16, code: impl Into<String>, reason: impl Into<String>) -> Self {
        HTTPError {
            code: code.into(),
            status,
            reason: reason.into(),
        }
    }

    pub fn not_found(reason: impl Into<String>) -> Self {
        Self::new(404, "not_found", reason)
    }

    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::new(401, "unauthorized", reason)
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::new(403, "forbidden", reason)
    }

    pub fn bad_request(reason: impl Into<String>) -> Self {
        Self::new(400, "bad_request", reason)
    }

    pub fn bad_gateway(reason: impl Into<String>) -> Self {
        Self::new(502, "bad_gateway", reason)
    }

    /// Map a [`TransportError`] to its HTTP status per the adopted 499/504/502 policy.
    pub fn from_transport_error(err: &TransportError) -> Self {
        match err {
            TransportError::Cancelled => Self::new(499, "client_closed_request", err.to_string()),
            TransportError::DeadlineExceeded => Self::new(504, "gateway_timeout", err.to_string()),
            TransportError::Upstream(_) => Self::new(502, "bad_gateway", err.to_string()),
        }
    }

    pub fn to_body(&self) -> serde_json::Value {
        serde_json::json!({
            "code": self.code,
            "status": self.status,
            "reason": self.reason,
        })
    }
}
