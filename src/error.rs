use std::process::ExitCode;

use serde::Serialize;

/// Machine-readable status tokens for robot-mode envelopes.
///
/// Serialized in snake_case into the envelope `code` field. Every code other
/// than `Ok` maps to a distinct process exit code so shell callers can branch
/// without parsing JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Ok,
    NotConfigured,
    NotFound,
    ValidationFailed,
    UsageError,
    DependencyMissing,
    OracleError,
    LockHeld,
}

impl ErrorCode {
    /// The token as it appears on the wire and in `APR_ERROR_CODE=` lines.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::NotConfigured => "not_configured",
            Self::NotFound => "not_found",
            Self::ValidationFailed => "validation_failed",
            Self::UsageError => "usage_error",
            Self::DependencyMissing => "dependency_missing",
            Self::OracleError => "oracle_error",
            Self::LockHeld => "lock_held",
        }
    }

    pub fn exit_code(self) -> ExitCode {
        match self {
            Self::Ok => ExitCode::SUCCESS,
            Self::UsageError => ExitCode::from(2),
            Self::NotConfigured => ExitCode::from(3),
            Self::NotFound => ExitCode::from(4),
            Self::ValidationFailed => ExitCode::from(5),
            Self::DependencyMissing => ExitCode::from(6),
            Self::OracleError => ExitCode::from(7),
            Self::LockHeld => ExitCode::from(8),
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that cause apr to exit with a specific code.
#[derive(Debug, thiserror::Error)]
pub enum ExitError {
    #[error("not configured: {0}")]
    NotConfigured(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation failed: {0}")]
    ValidationFailed(String),

    #[error("usage: {0}")]
    Usage(String),

    #[error("tool not found: {tool}")]
    ToolNotFound { tool: String },

    #[error("{tool} failed (exit {code}): {message}")]
    ToolFailed {
        tool: String,
        code: i32,
        message: String,
    },

    #[error("{tool} timed out after {timeout_secs}s")]
    Timeout { tool: String, timeout_secs: u64 },

    #[error("lock held by pid {pid}: {path}")]
    LockHeld { pid: u32, path: String },

    #[error("{0}")]
    Other(String),
}

impl ExitError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Other(_) => ExitCode::FAILURE,
            _ => self.error_code().exit_code(),
        }
    }

    /// The robot-mode code this error maps onto.
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotConfigured(_) => ErrorCode::NotConfigured,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::ValidationFailed(_) | Self::Other(_) => ErrorCode::ValidationFailed,
            Self::Usage(_) => ErrorCode::UsageError,
            Self::ToolNotFound { .. } => ErrorCode::DependencyMissing,
            Self::ToolFailed { .. } | Self::Timeout { .. } => ErrorCode::OracleError,
            Self::LockHeld { .. } => ErrorCode::LockHeld,
        }
    }
}
