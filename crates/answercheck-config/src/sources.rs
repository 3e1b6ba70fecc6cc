use serde::Serialize;

use answercheck_leakscan::MASK;

use crate::model::Config;

/// One effective configuration value and where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveEntry {
    pub key: String,
    pub value: String,
    pub source: String,
}

fn join_argv(argv: &[String]) -> String {
    argv.join(" ")
}

fn join_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("\"{item}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Config {
    /// Get effective configuration as key/value pairs with source attribution,
    /// in [`Config::KEYS`] order.
    ///
    /// The leak token is shown masked so the output is safe to paste into CI logs.
    #[must_use]
    pub fn effective_config(&self) -> Vec<EffectiveEntry> {
        Self::KEYS
            .iter()
            .map(|key| EffectiveEntry {
                key: (*key).to_string(),
                value: self.display_value(key),
                source: self.source_of(key).as_str().to_string(),
            })
            .collect()
    }

    fn display_value(&self, key: &str) -> String {
        match key {
            "root" => self.root.display().to_string(),
            "readiness.enabled" => self.readiness.enabled.to_string(),
            "readiness.command" => join_argv(&self.readiness.command),
            "unit_tests.enabled" => self.unit_tests.enabled.to_string(),
            "unit_tests.command" => join_argv(&self.unit_tests.command),
            "fixtures.pattern" => self.fixtures.pattern.clone(),
            "installer.command" => join_argv(&self.installer.command),
            "installer.answers_flag" => self.installer.answers_flag.clone(),
            "installer.timeout_secs" => self.installer.timeout_secs.to_string(),
            "installer.kill_grace_secs" => self.installer.kill_grace_secs.to_string(),
            "installer.foreground" => self.installer.foreground.to_string(),
            "installer.lang" => self.installer.lang.clone(),
            "installer.timescale_var" => self.installer.timescale_var.clone(),
            "installer.timescale" => self.installer.timescale.clone(),
            "artifacts.stale" => join_list(&self.artifacts.stale),
            "artifacts.install_config" => self.artifacts.install_config.clone(),
            "artifacts.debug_log" => self.artifacts.debug_log.clone(),
            "validator.mode" => self.validator.mode.to_string(),
            "validator.command" => join_argv(&self.validator.command),
            "leak_scan.token" => MASK.to_string(),
            "leak_scan.allowed_markers" => join_list(&self.leak_scan.allowed_markers),
            _ => String::new(),
        }
    }
}
