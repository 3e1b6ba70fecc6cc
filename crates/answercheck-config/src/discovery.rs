use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use answercheck_utils::error::ConfigError;
use answercheck_utils::types::ConfigSource;

use crate::model::{CONFIG_DIR, CONFIG_FILE, Config, ValidatorMode};

/// Command-line overrides, applied on top of the config file.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config_path: Option<PathBuf>,
    pub root: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub token: Option<String>,
    pub pattern: Option<String>,
    pub validator_mode: Option<ValidatorMode>,
    pub skip_readiness: bool,
    pub skip_unit_tests: bool,
}

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    readiness: Option<TomlStageCommand>,
    unit_tests: Option<TomlStageCommand>,
    fixtures: Option<TomlFixtures>,
    installer: Option<TomlInstaller>,
    artifacts: Option<TomlArtifacts>,
    validator: Option<TomlValidator>,
    leak_scan: Option<TomlLeakScan>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlStageCommand {
    enabled: Option<bool>,
    command: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlFixtures {
    pattern: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlInstaller {
    command: Option<Vec<String>>,
    answers_flag: Option<String>,
    timeout_secs: Option<u64>,
    kill_grace_secs: Option<u64>,
    foreground: Option<bool>,
    lang: Option<String>,
    timescale_var: Option<String>,
    timescale: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlArtifacts {
    stale: Option<Vec<String>>,
    install_config: Option<String>,
    debug_log: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlValidator {
    mode: Option<ValidatorMode>,
    command: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlLeakScan {
    token: Option<String>,
    allowed_markers: Option<Vec<String>>,
}

/// Records each overridden value together with its source.
struct Layer<'a> {
    attribution: &'a mut HashMap<String, ConfigSource>,
    source: ConfigSource,
}

impl Layer<'_> {
    fn set<T>(&mut self, target: &mut T, value: Option<T>, key: &str) {
        if let Some(value) = value {
            *target = value;
            self.attribution.insert(key.to_string(), self.source.clone());
        }
    }
}

impl Config {
    /// Discover and load configuration with precedence: CLI > file > defaults
    ///
    /// Uses the current working directory for discovery when no explicit path is
    /// provided in `cli_args`.
    ///
    /// # Errors
    ///
    /// Returns an error if the working directory is unavailable, the config file
    /// cannot be read or parsed, or the effective configuration is invalid.
    pub fn discover(cli_args: &CliArgs) -> Result<Self, ConfigError> {
        let start_dir = std::env::current_dir().map_err(|e| ConfigError::DiscoveryFailed {
            reason: format!("failed to get current directory: {e}"),
        })?;
        Self::discover_from(&start_dir, cli_args)
    }

    /// Discover and load configuration starting from a specific directory
    ///
    /// This is the path-driven variant used by tests to avoid process-global state.
    ///
    /// # Errors
    ///
    /// Same as [`Config::discover`].
    pub fn discover_from(start_dir: &Path, cli_args: &CliArgs) -> Result<Self, ConfigError> {
        let mut config = Config {
            root: start_dir.to_path_buf(),
            ..Config::default()
        };

        let config_path = match &cli_args.config_path {
            Some(explicit) => {
                if !explicit.is_file() {
                    return Err(ConfigError::NotFound {
                        path: explicit.display().to_string(),
                    });
                }
                Some(explicit.clone())
            }
            None => Self::discover_config_file_from(start_dir),
        };

        if let Some(path) = &config_path {
            debug!(path = %path.display(), "loading config file");
            let file_config = Self::load_config_file(path)?;
            config.apply_file(file_config);

            // A discovered `.answercheck/config.toml` anchors the project root
            if let Some(project_dir) = path
                .parent()
                .filter(|dir| dir.file_name().is_some_and(|name| name == CONFIG_DIR))
                .and_then(Path::parent)
            {
                config.root = project_dir.to_path_buf();
                config
                    .source_attribution
                    .insert("root".to_string(), ConfigSource::Config);
            }
            config.config_path = Some(path.clone());
        }

        config.apply_cli(cli_args);
        config.validate()?;
        Ok(config)
    }

    /// Discover config file by searching upward from a specific directory
    ///
    /// Searches for `.answercheck/config.toml` starting from `start_dir`, stopping
    /// at repository root markers (.git, .hg, .svn) or the filesystem root.
    #[must_use]
    pub fn discover_config_file_from(start_dir: &Path) -> Option<PathBuf> {
        let mut current_dir = start_dir;

        loop {
            let config_path = current_dir.join(CONFIG_DIR).join(CONFIG_FILE);
            if config_path.is_file() {
                return Some(config_path);
            }

            if current_dir.join(".git").exists()
                || current_dir.join(".hg").exists()
                || current_dir.join(".svn").exists()
            {
                // Stop at repository root if no config found
                return None;
            }

            current_dir = current_dir.parent()?;
        }
    }

    fn load_config_file(path: &Path) -> Result<TomlConfig, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::InvalidFile(format!("failed to read {}: {e}", path.display()))
        })?;
        toml::from_str(&content)
            .map_err(|e| ConfigError::InvalidFile(format!("{}: {e}", path.display())))
    }

    fn apply_file(&mut self, file: TomlConfig) {
        let mut layer = Layer {
            attribution: &mut self.source_attribution,
            source: ConfigSource::Config,
        };

        if let Some(section) = file.readiness {
            layer.set(&mut self.readiness.enabled, section.enabled, "readiness.enabled");
            layer.set(&mut self.readiness.command, section.command, "readiness.command");
        }
        if let Some(section) = file.unit_tests {
            layer.set(&mut self.unit_tests.enabled, section.enabled, "unit_tests.enabled");
            layer.set(&mut self.unit_tests.command, section.command, "unit_tests.command");
        }
        if let Some(section) = file.fixtures {
            layer.set(&mut self.fixtures.pattern, section.pattern, "fixtures.pattern");
        }
        if let Some(section) = file.installer {
            let installer = &mut self.installer;
            layer.set(&mut installer.command, section.command, "installer.command");
            layer.set(
                &mut installer.answers_flag,
                section.answers_flag,
                "installer.answers_flag",
            );
            layer.set(
                &mut installer.timeout_secs,
                section.timeout_secs,
                "installer.timeout_secs",
            );
            layer.set(
                &mut installer.kill_grace_secs,
                section.kill_grace_secs,
                "installer.kill_grace_secs",
            );
            layer.set(
                &mut installer.foreground,
                section.foreground,
                "installer.foreground",
            );
            layer.set(&mut installer.lang, section.lang, "installer.lang");
            layer.set(
                &mut installer.timescale_var,
                section.timescale_var,
                "installer.timescale_var",
            );
            layer.set(&mut installer.timescale, section.timescale, "installer.timescale");
        }
        if let Some(section) = file.artifacts {
            layer.set(&mut self.artifacts.stale, section.stale, "artifacts.stale");
            layer.set(
                &mut self.artifacts.install_config,
                section.install_config,
                "artifacts.install_config",
            );
            layer.set(
                &mut self.artifacts.debug_log,
                section.debug_log,
                "artifacts.debug_log",
            );
        }
        if let Some(section) = file.validator {
            layer.set(&mut self.validator.mode, section.mode, "validator.mode");
            layer.set(&mut self.validator.command, section.command, "validator.command");
        }
        if let Some(section) = file.leak_scan {
            layer.set(&mut self.leak_scan.token, section.token, "leak_scan.token");
            layer.set(
                &mut self.leak_scan.allowed_markers,
                section.allowed_markers,
                "leak_scan.allowed_markers",
            );
        }
    }

    fn apply_cli(&mut self, cli: &CliArgs) {
        let mut layer = Layer {
            attribution: &mut self.source_attribution,
            source: ConfigSource::Cli,
        };

        layer.set(&mut self.root, cli.root.clone(), "root");
        layer.set(
            &mut self.installer.timeout_secs,
            cli.timeout_secs,
            "installer.timeout_secs",
        );
        layer.set(&mut self.leak_scan.token, cli.token.clone(), "leak_scan.token");
        layer.set(&mut self.fixtures.pattern, cli.pattern.clone(), "fixtures.pattern");
        layer.set(&mut self.validator.mode, cli.validator_mode, "validator.mode");
        layer.set(
            &mut self.readiness.enabled,
            cli.skip_readiness.then_some(false),
            "readiness.enabled",
        );
        layer.set(
            &mut self.unit_tests.enabled,
            cli.skip_unit_tests.then_some(false),
            "unit_tests.enabled",
        );
    }
}
