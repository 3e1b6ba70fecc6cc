use crate::error::RunnerError;
use std::process::ExitStatus;
use std::time::Duration;

use super::CommandSpec;

// ============================================================================
// ProcessRunner Trait - Secure Process Execution Interface
// ============================================================================

/// Output from a process execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Standard output from the process (empty unless captured)
    pub stdout: Vec<u8>,
    /// Standard error from the process (empty unless captured)
    pub stderr: Vec<u8>,
    /// Exit code from the process (None if terminated by signal)
    pub exit_code: Option<i32>,
    /// Signal that terminated the process, if any
    pub signal: Option<i32>,
}

impl ProcessOutput {
    /// Create a new `ProcessOutput` with the given values.
    #[must_use]
    pub fn new(
        stdout: Vec<u8>,
        stderr: Vec<u8>,
        exit_code: Option<i32>,
        signal: Option<i32>,
    ) -> Self {
        Self {
            stdout,
            stderr,
            exit_code,
            signal,
        }
    }

    /// Build an output from a finished child's status.
    #[must_use]
    pub fn from_status(stdout: Vec<u8>, stderr: Vec<u8>, status: ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        };
        #[cfg(not(unix))]
        let signal = None;

        Self::new(stdout, stderr, status.code(), signal)
    }

    /// Convenience constructor for an exit code with no captured output.
    #[must_use]
    pub fn exited(code: i32) -> Self {
        Self::new(Vec::new(), Vec::new(), Some(code), None)
    }

    /// Get stdout as a UTF-8 string, lossy conversion.
    #[must_use]
    pub fn stdout_string(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    /// Get stderr as a UTF-8 string, lossy conversion.
    #[must_use]
    pub fn stderr_string(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }

    /// Check if the process exited successfully (exit code 0).
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Status as a POSIX shell would report it: the exit code, or 128 + signal.
    #[must_use]
    pub fn shell_status(&self) -> i32 {
        match (self.exit_code, self.signal) {
            (Some(code), _) => code,
            (None, Some(signal)) => 128 + signal,
            (None, None) => 1,
        }
    }
}

/// Trait for process execution.
///
/// Implementations MUST use argv-style APIs only (no shell string evaluation).
///
/// # Threading
///
/// `ProcessRunner` is a synchronous interface. Implementations MAY internally
/// drive an async runtime (e.g., Tokio for timeouts) but MUST NOT expose async
/// in the public API.
///
/// # Example
///
/// ```rust
/// use answercheck_runner::{CommandSpec, ProcessOutput, ProcessRunner, RunnerError};
/// use std::time::Duration;
///
/// struct AlwaysOk;
///
/// impl ProcessRunner for AlwaysOk {
///     fn run(&self, _cmd: &CommandSpec, _timeout: Option<Duration>) -> Result<ProcessOutput, RunnerError> {
///         Ok(ProcessOutput::exited(0))
///     }
/// }
///
/// let output = AlwaysOk.run(&CommandSpec::new("true"), None).unwrap();
/// assert!(output.success());
/// ```
pub trait ProcessRunner {
    /// Execute a command, optionally bounded by `timeout`.
    ///
    /// `None` waits for the child however long it takes.
    ///
    /// # Returns
    ///
    /// * `Ok(ProcessOutput)` - The process completed (possibly with non-zero exit code)
    /// * `Err(RunnerError::Timeout)` - The process outlived `timeout` and was terminated
    /// * `Err(RunnerError::*)` - The process could not be spawned or waited on
    fn run(
        &self,
        cmd: &CommandSpec,
        timeout: Option<Duration>,
    ) -> Result<ProcessOutput, RunnerError>;
}

impl<R: ProcessRunner + ?Sized> ProcessRunner for &R {
    fn run(
        &self,
        cmd: &CommandSpec,
        timeout: Option<Duration>,
    ) -> Result<ProcessOutput, RunnerError> {
        (**self).run(cmd, timeout)
    }
}
