//! In-memory record of a run, emitted as JSON with `--json`

use chrono::{DateTime, Utc};
use serde::Serialize;

use answercheck_utils::error::CheckError;
use answercheck_utils::exit_codes::{ExitCode, error_to_exit_code_and_kind};
use answercheck_utils::types::{ErrorKind, Stage};

pub const REPORT_SCHEMA_VERSION: &str = "1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Passed,
    Failed,
    Skipped,
}

/// Outcome of one stage, in execution order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageRecord {
    pub stage: Stage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixture: Option<String>,
    pub status: StageStatus,
    pub duration_ms: u64,
    /// Error message (masked) for failures, or a short note
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Outcome of one fixture across its per-fixture stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixtureRecord {
    pub fixture: String,
    pub passed: bool,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub schema_version: String,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub root: String,
    pub stages: Vec<StageRecord>,
    pub fixtures: Vec<FixtureRecord>,
    pub ok: bool,
    pub exit_code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunReport {
    #[must_use]
    pub fn start(root: impl Into<String>) -> Self {
        Self {
            schema_version: REPORT_SCHEMA_VERSION.to_string(),
            started_at: Utc::now(),
            finished_at: None,
            root: root.into(),
            stages: Vec::new(),
            fixtures: Vec::new(),
            ok: false,
            exit_code: ExitCode::SUCCESS.as_i32(),
            error_kind: None,
            error: None,
        }
    }

    pub fn record_stage(&mut self, record: StageRecord) {
        self.stages.push(record);
    }

    pub fn record_fixture(&mut self, record: FixtureRecord) {
        self.fixtures.push(record);
    }

    /// Stamp the finish time and the overall result.
    ///
    /// `error_message` should already be masked by the caller.
    pub fn finish(&mut self, error: Option<&CheckError>, error_message: Option<String>) {
        self.finished_at = Some(Utc::now());
        match error {
            None => {
                self.ok = true;
                self.exit_code = ExitCode::SUCCESS.as_i32();
            }
            Some(err) => {
                let (code, kind) = error_to_exit_code_and_kind(err);
                self.ok = false;
                self.exit_code = code.as_i32();
                self.error_kind = Some(kind);
                self.error = error_message;
            }
        }
    }

    /// Stages of a given kind, for assertions and summaries.
    pub fn stages_of(&self, stage: Stage) -> impl Iterator<Item = &StageRecord> {
        self.stages.iter().filter(move |r| r.stage == stage)
    }

    /// Serialize to pretty JSON.
    ///
    /// # Errors
    ///
    /// Fails only if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
