//! Moira error-code table.
//!
//! Error codes are compiled into the server's `mr_et.h` header as
//! `#define NAME (CODE)` lines. The table is read once, lazily, and treated
//! as immutable afterwards.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex_lite::Regex;
use tracing::{debug, warn};

static DEFINE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*#\s*define\s+([A-Za-z0-9_]+)\s+.*?([0-9]+)")
        .expect("error table pattern compiles")
});

/// Name → numeric code map of Moira errors (e.g. `MR_PERM`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorCodeTable {
    codes: HashMap<String, i64>,
}

impl ErrorCodeTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses every `#define` line of a C header.
    pub fn parse_header(text: &str) -> Self {
        let mut table = Self::new();
        table.extend_from_header(text);
        table
    }

    /// Adds the definitions found in `text`, overwriting earlier ones.
    ///
    /// Lines that are not `#define NAME ... DIGITS` are skipped, as are codes
    /// too large for an `i64`.
    pub fn extend_from_header(&mut self, text: &str) {
        for line in text.lines() {
            let Some(captures) = DEFINE_LINE.captures(line) else {
                continue;
            };
            let (Some(name), Some(code)) = (captures.get(1), captures.get(2)) else {
                continue;
            };
            if let Ok(code) = code.as_str().parse::<i64>() {
                self.codes.insert(name.as_str().to_string(), code);
            }
        }
    }

    /// Reads every existing header in `paths`, in order.
    ///
    /// Missing files are skipped silently; unreadable ones are skipped with a
    /// warning. An installation without headers yields an empty table.
    pub async fn load(paths: &[PathBuf]) -> Self {
        let mut table = Self::new();
        for path in paths {
            match tokio::fs::read_to_string(path).await {
                Ok(text) => {
                    table.extend_from_header(&text);
                    debug!(path = %path.display(), codes = table.len(), "error table read");
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "error table unreadable, skipping");
                }
            }
        }
        table
    }

    /// Returns the code registered under `name`.
    pub fn get(&self, name: &str) -> Option<i64> {
        self.codes.get(name).copied()
    }

    /// Number of known codes.
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Returns `true` if no codes are known.
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Iterates `(name, code)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.codes.iter().map(|(name, code)| (name.as_str(), *code))
    }
}

impl FromIterator<(String, i64)> for ErrorCodeTable {
    fn from_iter<I: IntoIterator<Item = (String, i64)>>(iter: I) -> Self {
        Self {
            codes: iter.into_iter().collect(),
        }
    }
}
