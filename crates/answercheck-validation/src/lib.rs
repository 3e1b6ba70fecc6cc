//! Storage validation for installer-produced install configs
//!
//! The installer writes a curtin-style config whose `storage.config` list is a
//! sequence of actions (`disk`, `partition`, `format`, `mount`, ...) that refer
//! to each other by `id`. [`StorageChecker`] walks that list in order and checks
//! that every reference points at an action declared earlier, that required keys
//! are present, and that every swap format ends up mounted.

use serde::Serialize;
use serde_yaml::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

pub use answercheck_utils::error::ValidationError;

/// Counts collected while checking a config, reported on success.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StorageSummary {
    /// Number of storage actions checked
    pub actions: usize,
    /// Actions per `type`
    pub by_type: BTreeMap<String, usize>,
    /// Swap formats that were mounted
    pub swap_mounts: usize,
}

/// Ordered checker for `storage.config` actions.
#[derive(Debug, Default)]
pub struct StorageChecker {
    actions: HashMap<String, Value>,
    unmounted_swap_ids: BTreeSet<String>,
    summary: StorageSummary,
}

impl StorageChecker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check one action against the actions recorded so far, then record it.
    ///
    /// # Errors
    ///
    /// Returns the first rule the action violates.
    pub fn check(&mut self, action: &Value) -> Result<(), ValidationError> {
        let action_type = scalar_string(required(action, "type", "<unknown>")?).ok_or_else(|| {
            ValidationError::MissingKey {
                action: "<unknown>".to_string(),
                key: "type".to_string(),
            }
        })?;
        let id = scalar_string(required(action, "id", &action_type)?).ok_or_else(|| {
            ValidationError::MissingKey {
                action: action_type.clone(),
                key: "id".to_string(),
            }
        })?;

        match action_type.as_str() {
            "partition" => self.check_partition(&id, action)?,
            "format" => self.check_format(&id, action)?,
            "mount" => self.check_mount(&id, action)?,
            "raid" => self.check_raid(&id, action)?,
            "lvm_volgroup" => self.check_lvm_volgroup(&id, action)?,
            "lvm_partition" => self.check_lvm_partition(&id, action)?,
            _ => {}
        }

        debug!(id = %id, action_type = %action_type, "storage action ok");
        *self.summary.by_type.entry(action_type).or_insert(0) += 1;
        self.summary.actions += 1;
        self.actions.insert(id, action.clone());
        Ok(())
    }

    /// Checks that need the whole list.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnmountedSwap`] if a swap format was never mounted.
    pub fn finish(self) -> Result<StorageSummary, ValidationError> {
        if !self.unmounted_swap_ids.is_empty() {
            return Err(ValidationError::UnmountedSwap {
                ids: self.unmounted_swap_ids.into_iter().collect(),
            });
        }
        Ok(self.summary)
    }

    fn check_partition(&self, id: &str, action: &Value) -> Result<(), ValidationError> {
        required(action, "size", id)?;
        let (device, target) = self.reference(id, action, "device")?;
        if target.get("ptable").is_none() {
            return Err(ValidationError::NoPartitionTable {
                action: id.to_string(),
                device,
            });
        }
        Ok(())
    }

    fn check_format(&mut self, id: &str, action: &Value) -> Result<(), ValidationError> {
        self.reference(id, action, "volume")?;
        let fstype = required(action, "fstype", id)?;
        if fstype.as_str() == Some("swap") {
            self.unmounted_swap_ids.insert(id.to_string());
        }
        Ok(())
    }

    fn check_mount(&mut self, id: &str, action: &Value) -> Result<(), ValidationError> {
        let (device, target) = self.reference(id, action, "device")?;
        if has_path(action) {
            return Ok(());
        }

        if target.get("fstype").and_then(Value::as_str) != Some("swap") {
            return Err(ValidationError::PathlessMountNotSwap {
                action: id.to_string(),
                device,
            });
        }
        if !self.unmounted_swap_ids.remove(&device) {
            return Err(ValidationError::SwapAlreadyMounted {
                action: id.to_string(),
                device,
            });
        }
        self.summary.swap_mounts += 1;
        Ok(())
    }

    fn check_raid(&self, id: &str, action: &Value) -> Result<(), ValidationError> {
        required(action, "raidlevel", id)?;
        self.references(id, action, "devices")
    }

    fn check_lvm_volgroup(&self, id: &str, action: &Value) -> Result<(), ValidationError> {
        required(action, "name", id)?;
        self.references(id, action, "devices")
    }

    fn check_lvm_partition(&self, id: &str, action: &Value) -> Result<(), ValidationError> {
        required(action, "name", id)?;
        if !required(action, "size", id)?.is_string() {
            return Err(ValidationError::SizeNotString {
                action: id.to_string(),
            });
        }
        self.reference(id, action, "volgroup")?;
        Ok(())
    }

    /// Resolve `action[key]` to a recorded action.
    fn reference<'a>(
        &'a self,
        id: &str,
        action: &Value,
        key: &str,
    ) -> Result<(String, &'a Value), ValidationError> {
        let value = required(action, key, id)?;
        self.resolve(id, key, value)
    }

    fn references(&self, id: &str, action: &Value, key: &str) -> Result<(), ValidationError> {
        let devices = required(action, key, id)?
            .as_sequence()
            .ok_or_else(|| ValidationError::MissingKey {
                action: id.to_string(),
                key: format!("{key} (list)"),
            })?;
        for device in devices {
            self.resolve(id, key, device)?;
        }
        Ok(())
    }

    fn resolve<'a>(
        &'a self,
        id: &str,
        key: &str,
        value: &Value,
    ) -> Result<(String, &'a Value), ValidationError> {
        let target_id = scalar_string(value).unwrap_or_else(|| format!("{value:?}"));
        match self.actions.get(&target_id) {
            Some(target) => Ok((target_id, target)),
            None => Err(ValidationError::UnknownReference {
                action: id.to_string(),
                key: key.to_string(),
                target: target_id,
            }),
        }
    }
}

fn required<'a>(action: &'a Value, key: &str, id: &str) -> Result<&'a Value, ValidationError> {
    action.get(key).ok_or_else(|| ValidationError::MissingKey {
        action: id.to_string(),
        key: key.to_string(),
    })
}

/// Ids may be written as YAML numbers or booleans; compare them as text.
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn has_path(action: &Value) -> bool {
    match action.get("path") {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

/// Check the `storage.config` list of YAML `content`.
///
/// # Errors
///
/// Returns the first violation, or a parse error.
pub fn validate_str(content: &str, name: &str) -> Result<StorageSummary, ValidationError> {
    let doc: Value = serde_yaml::from_str(content).map_err(|e| ValidationError::Parse {
        path: name.to_string(),
        reason: e.to_string(),
    })?;

    let actions = doc
        .get("storage")
        .and_then(|storage| storage.get("config"))
        .and_then(Value::as_sequence)
        .ok_or(ValidationError::MissingStorage)?;

    let mut checker = StorageChecker::new();
    for (index, action) in actions.iter().enumerate() {
        if !action.is_mapping() {
            return Err(ValidationError::NotAMapping { index });
        }
        if let Err(err) = checker.check(action) {
            warn!(index, file = %name, "checking storage action failed");
            return Err(err);
        }
    }
    checker.finish()
}

/// Read and check an install config file.
///
/// # Errors
///
/// Returns [`ValidationError::Read`] if the file cannot be read, otherwise as
/// [`validate_str`].
pub fn validate_install_config(path: &Path) -> Result<StorageSummary, ValidationError> {
    let content = fs::read_to_string(path).map_err(|e| ValidationError::Read {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    validate_str(&content, &path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
storage:
  version: 1
  config:
  - {type: disk, id: disk-sda, ptable: gpt, path: /dev/sda}
  - {type: partition, id: partition-0, device: disk-sda, size: 1048576, flag: bios_grub}
  - {type: partition, id: partition-1, device: disk-sda, size: 1073741824}
  - {type: partition, id: partition-2, device: disk-sda, size: 2147483648}
  - {type: format, id: format-0, volume: partition-1, fstype: ext4}
  - {type: format, id: format-1, volume: partition-2, fstype: swap}
  - {type: mount, id: mount-0, device: format-0, path: /}
  - {type: mount, id: mount-1, device: format-1, path: ''}
"#;

    fn err(content: &str) -> ValidationError {
        validate_str(content, "test.conf").unwrap_err()
    }

    #[test]
    fn test_valid_config_summary() {
        let summary = validate_str(VALID, "test.conf").unwrap();
        assert_eq!(summary.actions, 8);
        assert_eq!(summary.by_type["partition"], 3);
        assert_eq!(summary.swap_mounts, 1);
    }

    #[test]
    fn test_lvm_and_raid_config() {
        let content = r#"
storage:
  config:
  - {type: disk, id: disk-a, ptable: gpt}
  - {type: disk, id: disk-b, ptable: gpt}
  - {type: partition, id: part-a, device: disk-a, size: 100}
  - {type: partition, id: part-b, device: disk-b, size: 100}
  - {type: raid, id: md0, raidlevel: raid1, devices: [part-a, part-b]}
  - {type: lvm_volgroup, id: vg0, name: vg0, devices: [md0]}
  - {type: lvm_partition, id: lv0, name: root, volgroup: vg0, size: 50G}
  - {type: format, id: fmt-root, volume: lv0, fstype: xfs}
  - {type: mount, id: mnt-root, device: fmt-root, path: /}
"#;
        let summary = validate_str(content, "lvm.conf").unwrap();
        assert_eq!(summary.actions, 9);
        assert_eq!(summary.swap_mounts, 0);
    }

    #[test]
    fn test_unknown_types_are_recorded() {
        let content = r#"
storage:
  config:
  - {type: dm_crypt, id: crypt0}
  - {type: format, id: fmt0, volume: crypt0, fstype: ext4}
"#;
        assert!(validate_str(content, "crypt.conf").is_ok());
    }

    #[test]
    fn test_missing_storage() {
        assert_eq!(err("network: {}\n"), ValidationError::MissingStorage);
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(err("storage: [unclosed"), ValidationError::Parse { .. }));
    }

    #[test]
    fn test_action_without_id() {
        let e = err("storage:\n  config:\n  - {type: disk}\n");
        assert_eq!(
            e,
            ValidationError::MissingKey {
                action: "disk".to_string(),
                key: "id".to_string()
            }
        );
    }

    #[test]
    fn test_action_not_a_mapping() {
        assert_eq!(
            err("storage:\n  config:\n  - just-a-string\n"),
            ValidationError::NotAMapping { index: 0 }
        );
    }

    #[test]
    fn test_partition_without_ptable() {
        let content = r#"
storage:
  config:
  - {type: disk, id: disk-sda}
  - {type: partition, id: p0, device: disk-sda, size: 100}
"#;
        assert!(matches!(err(content), ValidationError::NoPartitionTable { .. }));
    }

    #[test]
    fn test_partition_forward_reference() {
        let content = r#"
storage:
  config:
  - {type: partition, id: p0, device: disk-sda, size: 100}
  - {type: disk, id: disk-sda, ptable: gpt}
"#;
        assert_eq!(
            err(content),
            ValidationError::UnknownReference {
                action: "p0".to_string(),
                key: "device".to_string(),
                target: "disk-sda".to_string()
            }
        );
    }

    #[test]
    fn test_format_without_fstype() {
        let content = r#"
storage:
  config:
  - {type: disk, id: d, ptable: gpt}
  - {type: format, id: f, volume: d}
"#;
        assert!(matches!(err(content), ValidationError::MissingKey { key, .. } if key == "fstype"));
    }

    #[test]
    fn test_unmounted_swap() {
        let content = r#"
storage:
  config:
  - {type: disk, id: d, ptable: gpt}
  - {type: partition, id: p, device: d, size: 100}
  - {type: format, id: swap0, volume: p, fstype: swap}
"#;
        assert_eq!(
            err(content),
            ValidationError::UnmountedSwap {
                ids: vec!["swap0".to_string()]
            }
        );
    }

    #[test]
    fn test_pathless_mount_of_non_swap() {
        let content = r#"
storage:
  config:
  - {type: disk, id: d, ptable: gpt}
  - {type: partition, id: p, device: d, size: 100}
  - {type: format, id: f, volume: p, fstype: ext4}
  - {type: mount, id: m, device: f}
"#;
        assert!(matches!(err(content), ValidationError::PathlessMountNotSwap { .. }));
    }

    #[test]
    fn test_swap_mounted_twice() {
        let content = r#"
storage:
  config:
  - {type: disk, id: d, ptable: gpt}
  - {type: partition, id: p, device: d, size: 100}
  - {type: format, id: s, volume: p, fstype: swap}
  - {type: mount, id: m0, device: s}
  - {type: mount, id: m1, device: s}
"#;
        assert!(matches!(err(content), ValidationError::SwapAlreadyMounted { .. }));
    }

    #[test]
    fn test_lvm_partition_size_must_be_string() {
        let content = r#"
storage:
  config:
  - {type: disk, id: d, ptable: gpt}
  - {type: lvm_volgroup, id: vg, name: vg, devices: [d]}
  - {type: lvm_partition, id: lv, name: lv, volgroup: vg, size: 1024}
"#;
        assert_eq!(
            err(content),
            ValidationError::SizeNotString {
                action: "lv".to_string()
            }
        );
    }

    #[test]
    fn test_raid_unknown_member() {
        let content = r#"
storage:
  config:
  - {type: disk, id: d, ptable: gpt}
  - {type: raid, id: md0, raidlevel: raid1, devices: [d, ghost]}
"#;
        assert!(matches!(err(content), ValidationError::UnknownReference { target, .. } if target == "ghost"));
    }

    #[test]
    fn test_numeric_ids_compare_as_text() {
        let content = r#"
storage:
  config:
  - {type: disk, id: 1, ptable: msdos}
  - {type: partition, id: 2, device: 1, size: 100}
"#;
        assert!(validate_str(content, "ids.conf").is_ok());
    }

    #[test]
    fn test_validate_install_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subiquity-curtin-install.conf");
        fs::write(&path, VALID).unwrap();
        assert_eq!(validate_install_config(&path).unwrap().actions, 8);

        let missing = validate_install_config(&dir.path().join("absent.conf"));
        assert!(matches!(missing, Err(ValidationError::Read { .. })));
    }
}
