//! Configuration model, discovery, and validation for answercheck
//!
//! Configuration is layered CLI > `.answercheck/config.toml` > built-in defaults,
//! and every effective key remembers its source.

mod builder;
mod discovery;
mod model;
mod sources;
mod validation;

pub use builder::ConfigBuilder;
pub use discovery::CliArgs;
pub use model::{
    ArtifactsConfig, CONFIG_DIR, CONFIG_FILE, Config, DEFAULT_DEBUG_LOG, DEFAULT_FIXTURE_PATTERN,
    DEFAULT_INSTALL_CONFIG, DEFAULT_KILL_GRACE_SECS, DEFAULT_TIMEOUT_SECS,
    DEFAULT_UPDATING_MARKER, FixturesConfig, InstallerConfig, LeakScanConfig,
    StageCommandConfig, ValidatorConfig, ValidatorMode,
};
pub use sources::EffectiveEntry;
