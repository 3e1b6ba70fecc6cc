//! Error types for runner module

use thiserror::Error;

/// Process execution errors
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Failed to spawn '{program}': {reason}")]
    SpawnFailed {
        program: String,
        reason: String,
        /// The program could not be found (maps to exit code 127)
        not_found: bool,
    },

    #[error("Failed to wait for '{program}': {reason}")]
    WaitFailed { program: String, reason: String },

    #[error("Async runtime unavailable: {reason}")]
    RuntimeUnavailable { reason: String },

    #[error("Execution timed out after {timeout_seconds} seconds")]
    Timeout { timeout_seconds: u64 },
}
