use thiserror::Error;

/// Top-level error type for the `aquaguard-api` crate.
///
/// Covers every failure mode across the three API surfaces: HTTP nodes,
/// the cloud platform, and the push service. `aquaguard-core` maps these
/// into its own poll taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Non-success HTTP status from a node or service.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Cloud ───────────────────────────────────────────────────────
    /// Structured error from the cloud platform (`{code, message}` envelope).
    #[error("Cloud API error (code {code}): {message}")]
    Cloud { code: i64, message: String },

    /// No usable cloud session (auth file missing or incomplete).
    #[error("Cloud session not authenticated")]
    NotAuthenticated,

    /// Unreadable or malformed session file.
    #[error("Session file error: {0}")]
    Session(String),

    // ── Node ────────────────────────────────────────────────────────
    /// Operation rejected locally before any I/O (e.g. unknown light mode).
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),
}

impl Error {
    /// Returns `true` if the request timed out.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout(),
            Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if the peer could not be reached.
    pub fn is_connect(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_connect())
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        self.is_timeout() || self.is_connect()
    }

    /// Returns `true` if the session needs to be re-established.
    pub fn is_auth(&self) -> bool {
        match self {
            Self::NotAuthenticated => true,
            Self::Http { status, .. } => *status == 401,
            _ => false,
        }
    }
}
