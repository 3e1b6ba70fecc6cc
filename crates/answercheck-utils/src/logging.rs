//! Logging infrastructure for answercheck
//!
//! Tracing output always goes to stderr. Stdout carries only the diagnostics a
//! reader of the CI log looks for (`log file not created`, masked leak lines,
//! reports), so it stays stable regardless of verbosity.

use answercheck_leakscan::LeakScanner;
use tracing::{Level, error, info, span};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::types::Stage;

/// Filter used when `RUST_LOG` is unset.
#[must_use]
pub const fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "answercheck=debug,answercheck_engine=debug,answercheck_utils=debug,info"
    } else {
        "answercheck=info,answercheck_engine=info,answercheck_utils=info,warn"
    }
}

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins when set. Otherwise verbose mode logs answercheck at debug
/// level and closes spans with their durations; the default only shows warnings
/// plus answercheck's own info lines.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter(verbose)))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    if verbose {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_thread_names(false)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_thread_names(false)
                    .with_ansi(false)
                    .compact(),
            )
            .try_init()?;
    }

    Ok(())
}

/// Span covering one stage, optionally scoped to a fixture
#[must_use]
pub fn stage_span(stage: Stage, fixture: Option<&str>) -> tracing::Span {
    span!(
        Level::INFO,
        "stage",
        stage = %stage,
        fixture = fixture.unwrap_or("-"),
    )
}

pub fn log_stage_start(stage: Stage, fixture: Option<&str>) {
    info!(
        stage = %stage,
        fixture = fixture.unwrap_or("-"),
        "Starting stage"
    );
}

pub fn log_stage_complete(stage: Stage, fixture: Option<&str>, duration_ms: u128) {
    info!(
        stage = %stage,
        fixture = fixture.unwrap_or("-"),
        duration_ms = %duration_ms,
        "Stage completed"
    );
}

/// Log a stage failure.
///
/// The message is masked with `scanner` so a leaking log line quoted in an error
/// never reaches the tracing output verbatim.
pub fn log_stage_error(
    stage: Stage,
    fixture: Option<&str>,
    message: &str,
    duration_ms: u128,
    scanner: &LeakScanner,
) {
    let sanitized = scanner.mask(message);
    error!(
        stage = %stage,
        fixture = fixture.unwrap_or("-"),
        duration_ms = %duration_ms,
        error = %sanitized,
        "Stage failed"
    );
}
