use crate::error::RunnerError;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Child;
use tracing::{debug, warn};

use super::{CommandSpec, ProcessOutput, ProcessRunner};

/// Grace period between SIGTERM and SIGKILL when a child times out.
pub const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(5);

// ============================================================================
// NativeRunner - Secure Native Process Execution
// ============================================================================

/// Native process runner.
///
/// `NativeRunner` spawns children with argv-style APIs only and bounds them with an
/// optional timeout. When the timeout expires the child receives SIGTERM, then
/// SIGKILL once the grace period is over. Foreground children are signalled
/// directly; background children lead their own process group and the whole group
/// is signalled, so grandchildren do not outlive the step.
///
/// # Threading
///
/// The public API is synchronous. Each call drives a current-thread Tokio runtime
/// to race the child against its deadline and to drain captured pipes.
///
/// # Example
///
/// ```rust,no_run
/// use answercheck_runner::{CommandSpec, NativeRunner, ProcessRunner, StdioMode};
/// use std::time::Duration;
///
/// let runner = NativeRunner::new();
/// let cmd = CommandSpec::new("echo").arg("hello").stdio(StdioMode::Capture);
///
/// let output = runner.run(&cmd, Some(Duration::from_secs(30))).unwrap();
/// assert!(output.success());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct NativeRunner {
    kill_grace: Duration,
}

impl Default for NativeRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeRunner {
    /// Create a new `NativeRunner` with the default kill grace period.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            kill_grace: DEFAULT_KILL_GRACE,
        }
    }

    /// Override the SIGTERM → SIGKILL grace period.
    #[must_use]
    pub const fn with_kill_grace(mut self, kill_grace: Duration) -> Self {
        self.kill_grace = kill_grace;
        self
    }

    /// Configured grace period.
    #[must_use]
    pub const fn kill_grace(&self) -> Duration {
        self.kill_grace
    }

    async fn run_async(
        &self,
        cmd: &CommandSpec,
        timeout: Option<Duration>,
    ) -> Result<ProcessOutput, RunnerError> {
        let program = cmd.program_name();
        let mut command = cmd.to_tokio_command();
        command.kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| RunnerError::SpawnFailed {
            program: program.clone(),
            reason: e.to_string(),
            not_found: e.kind() == std::io::ErrorKind::NotFound,
        })?;
        debug!(program = %program, pid = ?child.id(), "spawned child process");

        let stdout_task = child.stdout.take().map(|mut pipe| {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let _ = pipe.read_to_end(&mut buf).await;
                buf
            })
        });
        let stderr_task = child.stderr.take().map(|mut pipe| {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let _ = pipe.read_to_end(&mut buf).await;
                buf
            })
        });

        let wait_result = match timeout {
            None => child.wait().await,
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(
                        program = %program,
                        timeout_secs = limit.as_secs(),
                        "child exceeded its time limit, terminating"
                    );
                    self.terminate(&mut child, cmd.foreground).await;
                    return Err(RunnerError::Timeout {
                        timeout_seconds: limit.as_secs(),
                    });
                }
            },
        };

        let status = wait_result.map_err(|e| RunnerError::WaitFailed {
            program: program.clone(),
            reason: e.to_string(),
        })?;

        let stdout = match stdout_task {
            Some(task) => task.await.unwrap_or_default(),
            None => Vec::new(),
        };
        let stderr = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => Vec::new(),
        };

        debug!(program = %program, status = %status, "child process finished");
        Ok(ProcessOutput::from_status(stdout, stderr, status))
    }

    /// SIGTERM, wait up to the grace period, then SIGKILL.
    async fn terminate(&self, child: &mut Child, foreground: bool) {
        #[cfg(unix)]
        if let Some(raw_pid) = child.id() {
            use nix::sys::signal::{Signal, kill, killpg};
            use nix::unistd::Pid;

            let pid = Pid::from_raw(raw_pid as i32);
            let send = |signal: Signal| {
                let _ = if foreground {
                    kill(pid, signal)
                } else {
                    killpg(pid, signal)
                };
            };

            send(Signal::SIGTERM);
            if tokio::time::timeout(self.kill_grace, child.wait())
                .await
                .is_ok()
            {
                if !foreground {
                    // The leader is gone; make sure nothing else in its group survives.
                    let _ = killpg(pid, Signal::SIGKILL);
                }
                return;
            }
            send(Signal::SIGKILL);
        }

        let _ = child.kill().await;
    }
}

impl ProcessRunner for NativeRunner {
    fn run(
        &self,
        cmd: &CommandSpec,
        timeout: Option<Duration>,
    ) -> Result<ProcessOutput, RunnerError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| RunnerError::RuntimeUnavailable {
                reason: e.to_string(),
            })?;

        runtime.block_on(self.run_async(cmd, timeout))
    }
}
