//! Process execution for answercheck stages
//!
//! Every child process answercheck spawns (readiness check, unit tests,
//! installer, external validator) goes through this crate.
//!
//! # Security Model
//!
//! All process execution goes through [`CommandSpec`] to ensure argv-style invocation.
//! Arguments are passed as discrete elements rather than shell strings, so fixture
//! paths containing shell metacharacters are never interpreted.

pub mod command_spec;
pub mod error;
pub mod native;
pub mod process;

pub use command_spec::{CommandSpec, StdioMode};
pub use error::RunnerError;
pub use native::NativeRunner;
pub use process::{ProcessOutput, ProcessRunner};
