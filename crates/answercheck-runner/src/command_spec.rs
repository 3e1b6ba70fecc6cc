use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command as TokioCommand;

// ============================================================================
// CommandSpec - Secure Process Execution Specification
// ============================================================================

/// How the child's standard streams are wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StdioMode {
    /// Child shares the parent's terminal (stdin, stdout, stderr).
    #[default]
    Inherit,
    /// stdin is closed; stdout and stderr are captured into [`ProcessOutput`](crate::ProcessOutput).
    Capture,
    /// Like `Inherit`, but the child's stdout is written to our stderr so our
    /// own stdout stays machine-readable.
    StdoutToStderr,
}

/// Specification for a command to execute.
///
/// All process execution goes through this type to ensure argv-style invocation.
/// Arguments cross the trust boundary as discrete `OsString` elements; there is no
/// `sh -c` anywhere in answercheck.
///
/// # Example
///
/// ```rust
/// use answercheck_runner::CommandSpec;
/// use std::ffi::OsString;
///
/// let cmd = CommandSpec::new("python3")
///     .args(["-m", "subiquity.cmd.tui"])
///     .arg("--dry-run")
///     .env("LANG", "C.UTF-8")
///     .cwd("/srv/installer");
///
/// assert_eq!(cmd.program, OsString::from("python3"));
/// assert_eq!(cmd.args.len(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// The program to execute
    pub program: OsString,
    /// Arguments as discrete elements (NOT shell strings)
    pub args: Vec<OsString>,
    /// Optional working directory
    pub cwd: Option<PathBuf>,
    /// Optional environment overrides, applied on top of the inherited environment
    pub env: Option<BTreeMap<OsString, OsString>>,
    /// Stream wiring
    pub stdio: StdioMode,
    /// Keep the child in our process group so it can read the terminal.
    ///
    /// When false the child leads a new process group and timeouts signal the
    /// whole group.
    pub foreground: bool,
}

impl CommandSpec {
    /// Create a new `CommandSpec` for `program` with no arguments.
    #[must_use]
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: None,
            stdio: StdioMode::Inherit,
            foreground: true,
        }
    }

    /// Build a spec from an argv vector (`argv[0]` is the program).
    ///
    /// Returns `None` for an empty vector.
    #[must_use]
    pub fn from_argv<S: AsRef<str>>(argv: &[S]) -> Option<Self> {
        let (program, rest) = argv.split_first()?;
        Some(Self::new(program.as_ref()).args(rest.iter().map(AsRef::as_ref)))
    }

    /// Add a single argument to the command.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments to the command.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory for the command.
    #[must_use]
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Set an environment variable for the command.
    #[must_use]
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Choose how the child's streams are wired.
    #[must_use]
    pub fn stdio(mut self, stdio: StdioMode) -> Self {
        self.stdio = stdio;
        self
    }

    /// Run the child in the caller's process group (`true`) or its own (`false`).
    #[must_use]
    pub fn foreground(mut self, foreground: bool) -> Self {
        self.foreground = foreground;
        self
    }

    /// Program name for logs and error messages.
    #[must_use]
    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    /// Render the command as a single line: env overrides, program, args.
    ///
    /// Arguments containing whitespace or quotes are single-quoted. The result is for
    /// display only and is never handed to a shell.
    #[must_use]
    pub fn display_line(&self) -> String {
        let mut parts = Vec::new();
        if let Some(env) = &self.env {
            for (key, value) in env {
                parts.push(format!(
                    "{}={}",
                    key.to_string_lossy(),
                    quote_for_display(&value.to_string_lossy())
                ));
            }
        }
        parts.push(quote_for_display(&self.program.to_string_lossy()));
        for arg in &self.args {
            parts.push(quote_for_display(&arg.to_string_lossy()));
        }
        parts.join(" ")
    }

    /// Convert this `CommandSpec` into a `tokio::process::Command`.
    ///
    /// This is used for execution with timeout support.
    #[must_use]
    pub fn to_tokio_command(&self) -> TokioCommand {
        let mut cmd = TokioCommand::new(&self.program);
        cmd.args(&self.args);

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        if let Some(ref env) = self.env {
            for (key, value) in env {
                cmd.env(key, value);
            }
        }

        match self.stdio {
            StdioMode::Inherit => {
                cmd.stdin(Stdio::inherit())
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::inherit());
            }
            StdioMode::Capture => {
                cmd.stdin(Stdio::null())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped());
            }
            StdioMode::StdoutToStderr => {
                cmd.stdin(Stdio::inherit())
                    .stdout(Stdio::from(std::io::stderr()))
                    .stderr(Stdio::inherit());
            }
        }

        #[cfg(unix)]
        if !self.foreground {
            cmd.process_group(0);
        }

        cmd
    }
}

fn quote_for_display(s: &str) -> String {
    if !s.is_empty()
        && !s
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '\'' | '"' | '$' | '`' | '\\'))
    {
        return s.to_string();
    }
    format!("'{}'", s.replace('\'', r"'\''"))
}
