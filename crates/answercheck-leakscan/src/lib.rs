//! Leak detection for installer debug logs
//!
//! The installer is driven with answers fixtures that carry a placeholder password.
//! After each run its debug log must not contain that password, except on lines the
//! installer is known to log the raw answers on (for example `Loaded answers ...`).
//!
//! This is a literal, case-sensitive three-way filter: a line leaks when it contains
//! the token and none of the allowed markers. It is not a general secret scanner.

use std::fs;
use std::path::Path;
use thiserror::Error;

/// Token the stock answers fixtures use for every password field.
pub const DEFAULT_TOKEN: &str = "passw0rd";

/// Log lines containing any of these substrings may legitimately echo the answers.
pub const DEFAULT_ALLOWED_MARKERS: &[&str] = &["Loaded answers", "answers_action"];

/// Replacement used whenever a line is shown to the user.
pub const MASK: &str = "[REDACTED]";

/// Configuration provider for leak scanning.
///
/// Keeps `LeakScanner` decoupled from the concrete config type while allowing
/// `Config` to opt in via an impl in the config crate.
pub trait LeakPolicyProvider {
    fn leak_token(&self) -> &str;
    fn allowed_markers(&self) -> &[String];
}

#[derive(Error, Debug)]
pub enum LeakScanError {
    #[error("Leak token must not be empty")]
    EmptyToken,

    #[error("Allowed marker #{index} is empty")]
    EmptyMarker { index: usize },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// A log line that contains the token outside every allowed marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeakMatch {
    /// File the line came from
    pub file_path: String,
    /// Line number (1-based)
    pub line_number: usize,
    /// Byte range of the first token occurrence within the line
    pub column_range: (usize, usize),
    /// Context around the match (never includes the token)
    pub context: String,
    /// The whole line with every token occurrence masked
    pub masked_line: String,
}

/// Scanner for one token and its allowed markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeakScanner {
    token: String,
    allowed_markers: Vec<String>,
}

impl Default for LeakScanner {
    fn default() -> Self {
        Self {
            token: DEFAULT_TOKEN.to_string(),
            allowed_markers: DEFAULT_ALLOWED_MARKERS
                .iter()
                .map(|m| (*m).to_string())
                .collect(),
        }
    }
}

impl LeakScanner {
    /// Create a scanner for `token`, exempting lines that contain any of `allowed_markers`.
    ///
    /// # Errors
    ///
    /// Returns an error if the token or any marker is empty. An empty marker would
    /// exempt every line and silently disable the check.
    pub fn new<I, S>(token: impl Into<String>, allowed_markers: I) -> Result<Self, LeakScanError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let token = token.into();
        if token.is_empty() {
            return Err(LeakScanError::EmptyToken);
        }

        let allowed_markers: Vec<String> = allowed_markers.into_iter().map(Into::into).collect();
        if let Some(index) = allowed_markers.iter().position(String::is_empty) {
            return Err(LeakScanError::EmptyMarker { index });
        }

        Ok(Self {
            token,
            allowed_markers,
        })
    }

    /// Create a scanner from configuration.
    ///
    /// # Errors
    ///
    /// Same as [`LeakScanner::new`].
    pub fn from_policy<T: LeakPolicyProvider>(policy: &T) -> Result<Self, LeakScanError> {
        Self::new(
            policy.leak_token(),
            policy.allowed_markers().iter().cloned(),
        )
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    #[must_use]
    pub fn allowed_markers(&self) -> &[String] {
        &self.allowed_markers
    }

    /// True when `line` contains the token and no allowed marker.
    #[must_use]
    pub fn is_leak(&self, line: &str) -> bool {
        line.contains(&self.token) && !self.is_allowed(line)
    }

    fn is_allowed(&self, line: &str) -> bool {
        self.allowed_markers
            .iter()
            .any(|marker| line.contains(marker.as_str()))
    }

    /// Scan content line by line and return every leaking line.
    #[must_use]
    pub fn scan(&self, content: &str, file_path: &str) -> Vec<LeakMatch> {
        content
            .lines()
            .enumerate()
            .filter(|(_, line)| self.is_leak(line))
            .filter_map(|(index, line)| {
                let start = line.find(&self.token)?;
                let end = start + self.token.len();
                Some(LeakMatch {
                    file_path: file_path.to_string(),
                    line_number: index + 1,
                    column_range: (start, end),
                    context: self.create_safe_context(line, start, end),
                    masked_line: self.mask(line),
                })
            })
            .collect()
    }

    /// Read `path` (decoding invalid UTF-8 lossily) and scan it.
    ///
    /// # Errors
    ///
    /// Returns [`LeakScanError::Read`] if the file cannot be read.
    pub fn scan_file(&self, path: &Path) -> Result<Vec<LeakMatch>, LeakScanError> {
        let bytes = fs::read(path).map_err(|source| LeakScanError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let content = String::from_utf8_lossy(&bytes);
        Ok(self.scan(&content, &path.display().to_string()))
    }

    /// Replace every token occurrence in `line` with [`MASK`].
    #[must_use]
    pub fn mask(&self, line: &str) -> String {
        line.replace(&self.token, MASK)
    }

    /// Context around a match without revealing the token
    fn create_safe_context(&self, line: &str, start: usize, end: usize) -> String {
        let before_len = 24;
        let after_len = 24;

        let context_start = floor_char_boundary(line, start.saturating_sub(before_len));
        let context_end = ceil_char_boundary(line, (end + after_len).min(line.len()));

        let before = &line[context_start..start];
        let after = self.mask(&line[end..context_end]);

        format!("{before}{MASK}{after}")
    }
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    while index > 0 && !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_char_boundary(s: &str, mut index: usize) -> usize {
    while index < s.len() && !s.is_char_boundary(index) {
        index += 1;
    }
    index
}
