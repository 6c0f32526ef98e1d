// ── Core error types ──
//
// `PollError` classifies every per-device read or write failure. It is a
// value, not a crash: the poll loop records it and moves on.
// `CoreError` covers administrative calls (unknown id, bad input).
// The `From<aquaguard_api::Error>` impls translate transport-layer
// failures into these domain variants.

use thiserror::Error;

/// Why a single device poll or control write failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    #[error("request timed out")]
    Timeout,

    #[error("connection refused")]
    ConnectionRefused,

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("cloud session not authenticated")]
    NotAuthenticated,

    #[error("{0}")]
    Other(String),
}

impl PollError {
    /// Transient I/O failures, the ones the failure tracker absorbs.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::ConnectionRefused)
    }
}

impl From<aquaguard_api::Error> for PollError {
    fn from(err: aquaguard_api::Error) -> Self {
        if err.is_timeout() {
            return Self::Timeout;
        }
        if err.is_connect() {
            return Self::ConnectionRefused;
        }
        match err {
            aquaguard_api::Error::UnsupportedOperation(msg) => Self::Unsupported(msg),
            aquaguard_api::Error::NotAuthenticated => Self::NotAuthenticated,
            aquaguard_api::Error::Http { status: 401, .. } => Self::NotAuthenticated,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Unified error type for administrative operations.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Data errors ──────────────────────────────────────────────────
    #[error("Device not found: {identifier}")]
    DeviceNotFound { identifier: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Operation not supported: {operation}")]
    Unsupported { operation: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Cloud session not authenticated")]
    NotAuthenticated,

    #[error("Poll failed: {0}")]
    Poll(#[from] PollError),

    // ── Persistence errors ───────────────────────────────────────────
    #[error("Persistence error: {message}")]
    Persistence { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<aquaguard_api::Error> for CoreError {
    fn from(err: aquaguard_api::Error) -> Self {
        match PollError::from(err) {
            PollError::NotAuthenticated => Self::NotAuthenticated,
            PollError::Unsupported(operation) => Self::Unsupported { operation },
            other => Self::Poll(other),
        }
    }
}
