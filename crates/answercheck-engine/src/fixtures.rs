//! Fixture discovery and stale artifact cleanup

use globset::{GlobBuilder, GlobMatcher};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use answercheck_utils::error::{CheckError, ConfigError};

/// One answers file, addressed relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fixture {
    /// Root-relative path with `/` separators, as passed to the installer
    pub relative: String,
    /// Absolute (or root-joined) path on disk
    #[serde(skip)]
    pub path: PathBuf,
}

/// Fixtures matching a glob, in run order.
#[derive(Debug, Clone)]
pub struct FixtureSet {
    pattern: String,
    fixtures: Vec<Fixture>,
}

impl FixtureSet {
    /// Enumerate regular files under `root` matching `pattern`.
    ///
    /// Matching follows shell glob rules: `*` and `?` never cross a `/`, and
    /// entries whose name starts with `.` are skipped unless the pattern spells
    /// out a leading dot itself. Results are sorted by relative path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for a malformed pattern and an I/O
    /// error if a directory cannot be listed.
    pub fn discover(root: &Path, pattern: &str) -> Result<Self, CheckError> {
        let matcher = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| {
                CheckError::Config(ConfigError::InvalidValue {
                    key: "fixtures.pattern".to_string(),
                    value: e.to_string(),
                })
            })?
            .compile_matcher();

        let components: Vec<&str> = pattern.split('/').filter(|c| !c.is_empty()).collect();
        let literal_depth = components
            .iter()
            .take_while(|c| !has_glob_meta(c))
            .count()
            .min(components.len().saturating_sub(1));
        let base_rel: Vec<&str> = components[..literal_depth].to_vec();
        let max_depth = if components.iter().any(|c| c.contains("**")) {
            None
        } else {
            Some(components.len() - literal_depth)
        };
        let allow_dot = components[literal_depth..]
            .iter()
            .any(|c| c.starts_with('.'));

        let mut walker = Walker {
            matcher: &matcher,
            max_depth,
            allow_dot,
            found: Vec::new(),
        };

        let base_dir = base_rel.iter().fold(root.to_path_buf(), |dir, c| dir.join(c));
        if base_dir.is_dir() {
            walker.walk(&base_dir, &base_rel.join("/"), 1)?;
        }

        let mut fixtures: Vec<Fixture> = walker
            .found
            .into_iter()
            .map(|relative| Fixture {
                path: root.join(&relative),
                relative,
            })
            .collect();
        fixtures.sort_by(|a, b| a.relative.cmp(&b.relative));

        debug!(pattern, count = fixtures.len(), "discovered fixtures");
        Ok(Self {
            pattern: pattern.to_string(),
            fixtures,
        })
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fixtures.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fixtures.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Fixture> {
        self.fixtures.iter()
    }

    /// Fail with [`CheckError::NoFixtures`] when nothing matched.
    ///
    /// # Errors
    ///
    /// See above.
    pub fn require_any(self) -> Result<Self, CheckError> {
        if self.fixtures.is_empty() {
            return Err(CheckError::NoFixtures {
                pattern: self.pattern,
            });
        }
        Ok(self)
    }
}

impl<'a> IntoIterator for &'a FixtureSet {
    type Item = &'a Fixture;
    type IntoIter = std::slice::Iter<'a, Fixture>;

    fn into_iter(self) -> Self::IntoIter {
        self.fixtures.iter()
    }
}

fn has_glob_meta(component: &str) -> bool {
    component.contains(['*', '?', '[', '{'])
}

struct Walker<'a> {
    matcher: &'a GlobMatcher,
    max_depth: Option<usize>,
    allow_dot: bool,
    found: Vec<String>,
}

impl Walker<'_> {
    fn walk(&mut self, dir: &Path, rel_dir: &str, depth: usize) -> io::Result<()> {
        if self.max_depth.is_some_and(|max| depth > max) {
            return Ok(());
        }

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                warn!(path = %entry.path().display(), "skipping name that is not valid UTF-8");
                continue;
            };
            if name.starts_with('.') && !self.allow_dot {
                continue;
            }

            let relative = if rel_dir.is_empty() {
                name.to_string()
            } else {
                format!("{rel_dir}/{name}")
            };

            // Directory symlinks are not followed, so a link cycle cannot recurse
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                self.walk(&entry.path(), &relative, depth + 1)?;
            } else if self.matcher.is_match(&relative) && entry.path().is_file() {
                self.found.push(relative);
            }
        }
        Ok(())
    }
}

/// Remove each stale artifact, ignoring ones that do not exist.
///
/// Returns the paths that were actually removed.
///
/// # Errors
///
/// Any error other than "not found" aborts the cleanup.
pub fn clean_stale_artifacts(paths: &[PathBuf]) -> io::Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for path in paths {
        match fs::remove_file(path) {
            Ok(()) => {
                debug!(path = %path.display(), "removed stale artifact");
                removed.push(path.clone());
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(io::Error::new(
                    e.kind(),
                    format!("failed to remove {}: {e}", path.display()),
                ));
            }
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "Identity:\n  password: passw0rd\n").unwrap();
    }

    fn relatives(set: &FixtureSet) -> Vec<&str> {
        set.iter().map(|f| f.relative.as_str()).collect()
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_non_utf8_names_are_skipped() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "examples/answers.yaml");
        let odd = dir
            .path()
            .join("examples")
            .join(OsStr::from_bytes(b"answers-\xff.yaml"));
        fs::write(odd, "Identity: {}\n").unwrap();

        let set = FixtureSet::discover(dir.path(), "examples/answers*.yaml").unwrap();

        assert_eq!(relatives(&set), ["examples/answers.yaml"]);
    }

    #[test]
    fn test_discover_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "examples/answers-tpm.yaml");
        touch(dir.path(), "examples/answers.yaml");
        touch(dir.path(), "examples/answers-bond.yaml");
        touch(dir.path(), "examples/autoinstall.yaml");
        touch(dir.path(), "examples/answers.json");

        let set = FixtureSet::discover(dir.path(), "examples/answers*.yaml").unwrap();

        assert_eq!(
            relatives(&set),
            [
                "examples/answers-bond.yaml",
                "examples/answers-tpm.yaml",
                "examples/answers.yaml"
            ]
        );
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_star_does_not_cross_directories() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "examples/answers.yaml");
        touch(dir.path(), "examples/nested/answers-deep.yaml");

        let set = FixtureSet::discover(dir.path(), "examples/answers*.yaml").unwrap();
        assert_eq!(relatives(&set), ["examples/answers.yaml"]);

        let set = FixtureSet::discover(dir.path(), "examples/*/answers*.yaml").unwrap();
        assert_eq!(relatives(&set), ["examples/nested/answers-deep.yaml"]);
    }

    #[test]
    fn test_dotfiles_skipped() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "examples/.answers-hidden.yaml");
        touch(dir.path(), "examples/answers.yaml");

        let set = FixtureSet::discover(dir.path(), "examples/*.yaml").unwrap();
        assert_eq!(relatives(&set), ["examples/answers.yaml"]);

        let set = FixtureSet::discover(dir.path(), "examples/.answers*.yaml").unwrap();
        assert_eq!(relatives(&set), ["examples/.answers-hidden.yaml"]);
    }

    #[test]
    fn test_directories_are_not_fixtures() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("examples/answers-dir.yaml")).unwrap();
        touch(dir.path(), "examples/answers.yaml");

        let set = FixtureSet::discover(dir.path(), "examples/answers*.yaml").unwrap();
        assert_eq!(relatives(&set), ["examples/answers.yaml"]);
    }

    #[test]
    fn test_missing_base_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let set = FixtureSet::discover(dir.path(), "examples/answers*.yaml").unwrap();
        assert!(set.is_empty());
        assert!(matches!(
            set.require_any(),
            Err(CheckError::NoFixtures { pattern }) if pattern == "examples/answers*.yaml"
        ));
    }

    #[test]
    fn test_invalid_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let result = FixtureSet::discover(dir.path(), "examples/answers[.yaml");
        assert!(matches!(result, Err(CheckError::Config(_))));
    }

    #[test]
    fn test_pattern_at_root() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "answers.yaml");
        touch(dir.path(), "sub/answers.yaml");

        let set = FixtureSet::discover(dir.path(), "answers*.yaml").unwrap();
        assert_eq!(relatives(&set), ["answers.yaml"]);
    }

    #[test]
    fn test_clean_stale_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join(".subiquity/subiquity-debug.log");
        fs::create_dir_all(present.parent().unwrap()).unwrap();
        fs::write(&present, "old log").unwrap();
        let absent = dir.path().join(".subiquity/run/subiquity/updating");

        let removed = clean_stale_artifacts(&[present.clone(), absent]).unwrap();

        assert_eq!(removed, vec![present.clone()]);
        assert!(!present.exists());
    }

    #[test]
    fn test_clean_stale_artifacts_propagates_other_errors() {
        let dir = tempfile::tempdir().unwrap();
        let directory = dir.path().join("not-a-file");
        fs::create_dir(&directory).unwrap();

        assert!(clean_stale_artifacts(&[directory]).is_err());
    }
}
