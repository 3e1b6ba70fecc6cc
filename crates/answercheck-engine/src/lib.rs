//! Fail-fast orchestration for answercheck
//!
//! [`Orchestrator`] waits for readiness, runs the unit tests, then drives every
//! answers fixture through the installer and checks what it leaves behind.

pub mod fixtures;
pub mod orchestrator;
pub mod report;

pub use fixtures::{Fixture, FixtureSet, clean_stale_artifacts};
pub use orchestrator::{Orchestrator, PlannedStep, RunOutcome};
pub use report::{FixtureRecord, RunReport, StageRecord, StageStatus};
