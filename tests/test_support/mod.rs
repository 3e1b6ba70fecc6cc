//! Throwaway project trees with a shell-script installer.
//!
//! Each fixture carries a `# mode: <name>` line that tells the stub installer
//! what to leave behind:
//!
//! - `ok`: valid install config, debug log with the token only on allowed lines
//! - `nolog`: valid install config, no debug log
//! - `leak`: debug log with the token on an ordinary line
//! - `badconfig`: install config whose partition sits on a disk without a table
//! - `fail`: exit 3 without writing anything
//! - `hang`: sleep well past any test timeout

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

const INSTALLER: &str = r#"#!/bin/sh
answers="$2"
echo "$answers" >> calls.log
echo "LANG=$LANG SCALE=$SUBIQUITY_REPLAY_TIMESCALE" >> env.log
mode=$(sed -n 's/^# mode: //p' "$answers")
mkdir -p .subiquity
case "$mode" in
  hang) exec sleep 30 ;;
  fail) exit 3 ;;
esac
if [ "$mode" = badconfig ]; then
  cat > .subiquity/subiquity-curtin-install.conf <<'YAML'
storage:
  config:
  - {type: disk, id: disk-sda, path: /dev/sda}
  - {type: partition, id: part-1, device: disk-sda, size: 1G}
YAML
else
  cat > .subiquity/subiquity-curtin-install.conf <<'YAML'
storage:
  config:
  - {type: disk, id: disk-sda, ptable: gpt, path: /dev/sda}
  - {type: partition, id: part-1, device: disk-sda, size: 1G}
  - {type: format, id: fmt-1, volume: part-1, fstype: ext4}
  - {type: mount, id: mnt-1, device: fmt-1, path: /}
YAML
fi
case "$mode" in
  nolog) ;;
  leak)
    echo "Loaded answers from $answers: password passw0rd" > .subiquity/subiquity-debug.log
    echo "identity: setting password to passw0rd" >> .subiquity/subiquity-debug.log
    ;;
  *)
    echo "Loaded answers from $answers: password passw0rd" > .subiquity/subiquity-debug.log
    echo "answers_action Identity password=passw0rd" >> .subiquity/subiquity-debug.log
    echo "install finished" >> .subiquity/subiquity-debug.log
    ;;
esac
"#;

const VALIDATOR: &str = r#"#!/bin/sh
echo "$1" >> validator.log
[ -f "$1" ]
"#;

pub struct Project {
    dir: TempDir,
}

impl Project {
    /// A project with stub commands for every stage and the given fixtures.
    pub fn new(fixtures: &[(&str, &str)]) -> Self {
        let dir = tempfile::tempdir().expect("create temp project");
        let project = Self { dir };

        // Keep config discovery inside the project
        fs::create_dir(project.path().join(".git")).expect("create .git");
        project.write("installer.sh", INSTALLER);
        project.write("validate.sh", VALIDATOR);
        project.write_config("");
        for (name, mode) in fixtures {
            project.fixture(name, mode);
        }
        project
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn join(&self, relative: &str) -> PathBuf {
        self.path().join(relative)
    }

    pub fn write(&self, relative: &str, content: &str) {
        let path = self.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(path, content).expect("write file");
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.join(relative)).unwrap_or_default()
    }

    pub fn fixture(&self, name: &str, mode: &str) {
        self.write(
            &format!("examples/{name}"),
            &format!("# mode: {mode}\nIdentity:\n  realname: Ubuntu\n  password: passw0rd\n"),
        );
    }

    /// Write `.answercheck/config.toml`, with `extra` appended after the base
    /// settings.
    pub fn write_config(&self, extra: &str) {
        let base = r#"[readiness]
command = ["sh", "-c", "true"]

[unit_tests]
command = ["sh", "-c", "true"]

[installer]
command = ["sh", "installer.sh"]
answers_flag = "--answers"
foreground = false
kill_grace_secs = 1

[validator]
mode = "external"
command = ["sh", "validate.sh"]
"#;
        self.write(".answercheck/config.toml", &format!("{base}{extra}"));
    }

    /// Fixtures the installer was invoked with, in order.
    pub fn installer_calls(&self) -> Vec<String> {
        self.read("calls.log").lines().map(str::to_string).collect()
    }

    pub fn command(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("answercheck"));
        cmd.current_dir(self.path());
        cmd.env_remove("RUST_LOG");
        cmd
    }
}
