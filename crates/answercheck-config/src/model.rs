use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use answercheck_leakscan::{DEFAULT_ALLOWED_MARKERS, DEFAULT_TOKEN, LeakPolicyProvider};
use answercheck_utils::types::ConfigSource;

/// Name of the per-project configuration directory
pub const CONFIG_DIR: &str = ".answercheck";

/// Name of the configuration file inside [`CONFIG_DIR`]
pub const CONFIG_FILE: &str = "config.toml";

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_KILL_GRACE_SECS: u64 = 5;
pub const DEFAULT_FIXTURE_PATTERN: &str = "examples/answers*.yaml";
pub const DEFAULT_INSTALL_CONFIG: &str = ".subiquity/subiquity-curtin-install.conf";
pub const DEFAULT_DEBUG_LOG: &str = ".subiquity/subiquity-debug.log";
pub const DEFAULT_UPDATING_MARKER: &str = ".subiquity/run/subiquity/updating";

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

/// A pre-flight command that can be switched off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCommandConfig {
    pub enabled: bool,
    /// argv of the command; never passed through a shell
    pub command: Vec<String>,
}

impl StageCommandConfig {
    #[must_use]
    pub fn readiness() -> Self {
        Self {
            enabled: true,
            command: strings(&["cloud-init", "status", "--wait"]),
        }
    }

    #[must_use]
    pub fn unit_tests() -> Self {
        Self {
            enabled: true,
            command: strings(&["python3", "-m", "unittest", "discover"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixturesConfig {
    /// Shell-style glob relative to the project root
    pub pattern: String,
}

impl Default for FixturesConfig {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_FIXTURE_PATTERN.to_string(),
        }
    }
}

/// How the installer is invoked for each fixture.
///
/// The fixture path is appended after `answers_flag`, or as a trailing positional
/// argument when `answers_flag` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallerConfig {
    pub command: Vec<String>,
    pub answers_flag: String,
    pub timeout_secs: u64,
    pub kill_grace_secs: u64,
    /// Keep the installer in our process group so it can use the terminal
    pub foreground: bool,
    pub lang: String,
    pub timescale_var: String,
    pub timescale: String,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            command: strings(&[
                "python3",
                "-m",
                "subiquity.cmd.tui",
                "--dry-run",
                "--snaps-from-examples",
                "--machine-config",
                "examples/mwhudson.json",
            ]),
            answers_flag: "--answers".to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            kill_grace_secs: DEFAULT_KILL_GRACE_SECS,
            foreground: true,
            lang: "C.UTF-8".to_string(),
            timescale_var: "SUBIQUITY_REPLAY_TIMESCALE".to_string(),
            timescale: "100".to_string(),
        }
    }
}

/// Files the installer leaves behind, relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactsConfig {
    /// Deleted before every fixture
    pub stale: Vec<String>,
    pub install_config: String,
    pub debug_log: String,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            stale: strings(&[
                DEFAULT_INSTALL_CONFIG,
                DEFAULT_DEBUG_LOG,
                DEFAULT_UPDATING_MARKER,
            ]),
            install_config: DEFAULT_INSTALL_CONFIG.to_string(),
            debug_log: DEFAULT_DEBUG_LOG.to_string(),
        }
    }
}

/// Which validator checks the produced install config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidatorMode {
    /// Run `validator.command` with the config path appended
    #[default]
    External,
    /// Check `storage.config` in-process
    Builtin,
}

impl fmt::Display for ValidatorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::External => write!(f, "external"),
            Self::Builtin => write!(f, "builtin"),
        }
    }
}

impl FromStr for ValidatorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "external" => Ok(Self::External),
            "builtin" => Ok(Self::Builtin),
            other => Err(format!(
                "unknown validator mode '{other}' (expected 'external' or 'builtin')"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    pub mode: ValidatorMode,
    pub command: Vec<String>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            mode: ValidatorMode::External,
            command: strings(&["python3", "scripts/validate-yaml.py"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeakScanConfig {
    pub token: String,
    pub allowed_markers: Vec<String>,
}

impl Default for LeakScanConfig {
    fn default() -> Self {
        Self {
            token: DEFAULT_TOKEN.to_string(),
            allowed_markers: strings(DEFAULT_ALLOWED_MARKERS),
        }
    }
}

/// Effective configuration for answercheck.
///
/// `Config` is layered: CLI arguments > config file > built-in defaults. The
/// defaults reproduce the stock subiquity dry-run check exactly.
///
/// # Discovery
///
/// [`Config::discover()`] searches for `.answercheck/config.toml` upward from the
/// current directory, stopping at a repository root.
///
/// # Source Attribution
///
/// Every key records where its value came from (`cli`, `config`, `programmatic`
/// or `default`); see [`Config::effective_config()`].
///
/// # Example
///
/// ```rust,no_run
/// use answercheck_config::{CliArgs, Config};
///
/// let config = Config::discover(&CliArgs::default())?;
/// println!("installer timeout: {:?}", config.installer_timeout());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Project root every relative path is resolved against
    pub root: PathBuf,
    /// Config file that was loaded, if any
    pub config_path: Option<PathBuf>,
    pub readiness: StageCommandConfig,
    pub unit_tests: StageCommandConfig,
    pub fixtures: FixturesConfig,
    pub installer: InstallerConfig,
    pub artifacts: ArtifactsConfig,
    pub validator: ValidatorConfig,
    pub leak_scan: LeakScanConfig,
    pub source_attribution: HashMap<String, ConfigSource>,
}

impl Default for Config {
    fn default() -> Self {
        let mut config = Self {
            root: PathBuf::from("."),
            config_path: None,
            readiness: StageCommandConfig::readiness(),
            unit_tests: StageCommandConfig::unit_tests(),
            fixtures: FixturesConfig::default(),
            installer: InstallerConfig::default(),
            artifacts: ArtifactsConfig::default(),
            validator: ValidatorConfig::default(),
            leak_scan: LeakScanConfig::default(),
            source_attribution: HashMap::new(),
        };
        for key in Self::KEYS {
            config
                .source_attribution
                .insert((*key).to_string(), ConfigSource::Default);
        }
        config
    }
}

impl Config {
    /// Every attributed key, in display order.
    pub const KEYS: &'static [&'static str] = &[
        "root",
        "readiness.enabled",
        "readiness.command",
        "unit_tests.enabled",
        "unit_tests.command",
        "fixtures.pattern",
        "installer.command",
        "installer.answers_flag",
        "installer.timeout_secs",
        "installer.kill_grace_secs",
        "installer.foreground",
        "installer.lang",
        "installer.timescale_var",
        "installer.timescale",
        "artifacts.stale",
        "artifacts.install_config",
        "artifacts.debug_log",
        "validator.mode",
        "validator.command",
        "leak_scan.token",
        "leak_scan.allowed_markers",
    ];

    /// Resolve a configured relative path against the project root.
    #[must_use]
    pub fn resolve(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    #[must_use]
    pub fn installer_timeout(&self) -> Duration {
        Duration::from_secs(self.installer.timeout_secs)
    }

    #[must_use]
    pub fn kill_grace(&self) -> Duration {
        Duration::from_secs(self.installer.kill_grace_secs)
    }

    #[must_use]
    pub fn debug_log_path(&self) -> PathBuf {
        self.resolve(&self.artifacts.debug_log)
    }

    #[must_use]
    pub fn install_config_path(&self) -> PathBuf {
        self.resolve(&self.artifacts.install_config)
    }

    #[must_use]
    pub fn stale_artifact_paths(&self) -> Vec<PathBuf> {
        self.artifacts
            .stale
            .iter()
            .map(|path| self.resolve(path))
            .collect()
    }

    /// Source of an attributed key, defaulting to [`ConfigSource::Default`].
    #[must_use]
    pub fn source_of(&self, key: &str) -> ConfigSource {
        self.source_attribution
            .get(key)
            .cloned()
            .unwrap_or(ConfigSource::Default)
    }
}

impl LeakPolicyProvider for Config {
    fn leak_token(&self) -> &str {
        &self.leak_scan.token
    }

    fn allowed_markers(&self) -> &[String] {
        &self.leak_scan.allowed_markers
    }
}
