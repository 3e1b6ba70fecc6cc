//! Command-line interface for answercheck
//!
//! - `args`: clap argument definitions
//! - `run`: entry point and dispatch
//! - `commands`: command implementations

pub mod args;
mod commands;
mod run;


pub use args::{Cli, Commands, build_cli};
pub use run::run;
