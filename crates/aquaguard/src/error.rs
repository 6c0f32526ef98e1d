//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use aquaguard_config::ConfigError;
use aquaguard_core::{CoreError, PollError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(code(aquaguard::not_found), help("Run: aquaguard {list_command} to see what exists"))]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("'{identifier}' matches more than one device")]
    #[diagnostic(code(aquaguard::ambiguous), help("Use the device id instead of its name."))]
    Ambiguous { identifier: String },

    // ── Cloud ────────────────────────────────────────────────────────
    #[error("Not logged in to the cloud platform")]
    #[diagnostic(
        code(aquaguard::not_authenticated),
        help(
            "Enable [cloud] in the config and make sure auth_path points to a\n\
             session file with userId, ssecurity and serviceToken."
        )
    )]
    NotAuthenticated,

    // ── Devices ──────────────────────────────────────────────────────
    #[error("Could not reach device '{device}': {reason}")]
    #[diagnostic(code(aquaguard::unreachable), help("Check the node is powered and on the network."))]
    Unreachable { device: String, reason: String },

    #[error("Device '{device}' did not respond in time")]
    #[diagnostic(code(aquaguard::timeout))]
    Timeout { device: String },

    #[error("'{operation}' is not supported: {reason}")]
    #[diagnostic(code(aquaguard::unsupported))]
    Unsupported { operation: String, reason: String },

    #[error("Device '{device}' rejected {operation}")]
    #[diagnostic(code(aquaguard::rejected), help("Run with -v to see why the write failed."))]
    Rejected { device: String, operation: String },

    #[error("Poll failed: {0}")]
    #[diagnostic(code(aquaguard::poll_failed))]
    Poll(String),

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(aquaguard::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(aquaguard::config), help("Check the config file: aquaguard config path"))]
    Config(#[from] ConfigError),

    #[error("{0}")]
    #[diagnostic(code(aquaguard::internal))]
    Internal(String),

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::DeviceNotFound { identifier } => Self::NotFound {
                resource_type: "device".into(),
                identifier,
                list_command: "devices list".into(),
            },
            CoreError::ValidationFailed { message } => Self::Validation {
                field: "device".into(),
                reason: message,
            },
            CoreError::Unsupported { operation } => Self::Unsupported {
                operation,
                reason: "not available for this device".into(),
            },
            CoreError::NotAuthenticated | CoreError::Poll(PollError::NotAuthenticated) => Self::NotAuthenticated,
            CoreError::Poll(e) => Self::Poll(e.to_string()),
            CoreError::Persistence { message } | CoreError::Internal(message) => Self::Internal(message),
        }
    }
}

impl CliError {
    /// Translate a failed poll into a user-facing error.
    pub fn from_poll(device: &str, err: PollError) -> Self {
        match err {
            PollError::Timeout => Self::Timeout { device: device.into() },
            PollError::ConnectionRefused => Self::Unreachable {
                device: device.into(),
                reason: "connection refused".into(),
            },
            PollError::NotAuthenticated => Self::NotAuthenticated,
            PollError::Unsupported(reason) => Self::Unsupported {
                operation: "poll".into(),
                reason,
            },
            PollError::Other(reason) => Self::Poll(format!("{device}: {reason}")),
        }
    }

    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotAuthenticated => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Unreachable { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::Ambiguous { .. } | Self::Unsupported { .. } => exit_code::USAGE,
            Self::Rejected { .. } | Self::Poll(_) | Self::Config(_) | Self::Internal(_) | Self::Io(_) => {
                exit_code::GENERAL
            }
        }
    }
}
