//! Error types for the ImageFlow backend.
//!
//! Provides a hierarchy of error types using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for the backend.
///
/// Protocol failures are kept distinct from each other so callers can tell
/// apart a process that never started, a process that died, and a process
/// that produced garbage. A script reporting `success: false` through its
/// structured reply is *not* one of these errors; it reaches the caller as a
/// normal result carrying the script's own error message.
#[derive(Error, Debug)]
pub enum FlowError {
    /// The script process could not be started (missing interpreter,
    /// missing script file, permission denied).
    #[error("spawn error: {0}")]
    Spawn(String),

    /// The script process started but exited non-zero, timed out, or its
    /// streams broke mid-invocation. Carries the captured stderr content.
    #[error("script error: {0}")]
    Script(String),

    /// The script exited cleanly but its output is not a decodable reply.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid configuration (bad scripts directory, bad settings value).
    #[error("settings error: {0}")]
    Settings(String),

    /// One or more items of a batch failed; the message joins every failing
    /// item as `op[index]: reason`.
    #[error("batch error: {0}")]
    Batch(String),

    /// The operation was cancelled by the user.
    #[error("operation cancelled")]
    Cancelled,
}

/// Convenience result type for backend operations.
pub type FlowResult<T> = Result<T, FlowError>;

// Helper methods for error creation
impl FlowError {
    pub fn spawn<T: Into<String>>(msg: T) -> Self {
        Self::Spawn(msg.into())
    }

    pub fn script<T: Into<String>>(msg: T) -> Self {
        Self::Script(msg.into())
    }

    pub fn parse<T: Into<String>>(msg: T) -> Self {
        Self::Parse(msg.into())
    }

    pub fn settings<T: Into<String>>(msg: T) -> Self {
        Self::Settings(msg.into())
    }

    pub fn batch<T: Into<String>>(msg: T) -> Self {
        Self::Batch(msg.into())
    }
}
