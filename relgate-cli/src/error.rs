//! CLI-specific error types and exit code mapping

use relgate_core::error::{PatternError, RelgateError};

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to standard Unix exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration, policy, or keyring loading failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// Ignore-rule pattern rejected.
    #[error("pattern error: {0}")]
    Pattern(#[from] PatternError),

    /// The check run recorded blocking results.
    #[error("checks not passed: {failures} failure(s), {exceptions} exception(s), {escalated_warnings} escalated warning(s)")]
    ChecksFailed {
        failures: usize,
        exceptions: usize,
        escalated_warnings: usize,
    },

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from relgate-core.
    #[error("{0}")]
    Core(#[from] RelgateError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                               |
    /// |------|---------------------------------------|
    /// | 0    | Success                               |
    /// | 1    | General / command error               |
    /// | 2    | Configuration error                   |
    /// | 3    | Invalid ignore-rule pattern           |
    /// | 4    | Check run recorded blocking results   |
    /// | 10   | IO error                              |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Pattern(_) => 3,
            Self::ChecksFailed { .. } => 4,
            Self::Io(_) => 10,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Core(_) => 1,
        }
    }
}
