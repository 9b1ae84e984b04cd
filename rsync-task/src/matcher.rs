//! Regex-backed extraction of fields from single output lines

use std::sync::LazyLock;

use regex::Regex;

use crate::error::Result;

/// Percentage token, e.g. `10%`
pub static PROGRESS: LazyLock<Matcher> = LazyLock::new(|| Matcher::known(r"(\d+%)"));

/// Transfer rate, e.g. `92.23MB/s`
pub static SPEED: LazyLock<Matcher> = LazyLock::new(|| Matcher::known(r"(\d+\.\d+.{2}/s)"));

/// Bytes transferred so far, at the start of a progress line
pub static TOTAL: LazyLock<Matcher> = LazyLock::new(|| Matcher::known(r"^\s*(\d+.\d+[A-Za-z]*)"));

/// Remaining time, `h:mm:ss`
pub static TIME_REMAINING: LazyLock<Matcher> = LazyLock::new(|| Matcher::known(r"(\d+:){2}\d+"));

/// A compiled line pattern with match and extract helpers.
///
/// Matchers are immutable once built and can be shared freely between threads.
#[derive(Debug, Clone)]
pub struct Matcher {
    regex: Regex,
}

impl Matcher {
    /// Compile a new matcher from a pattern
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }

    // Only for the literal patterns above.
    fn known(pattern: &str) -> Self {
        Self {
            regex: Regex::new(pattern).expect("Invalid regex pattern"),
        }
    }

    /// Whether the pattern matches anywhere in the line
    pub fn is_match(&self, line: &str) -> bool {
        self.regex.is_match(line)
    }

    /// Text of the first capture group of the first match, or an empty string
    pub fn extract(&self, line: &str) -> String {
        self.regex
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default()
    }

    /// Full text of every non-overlapping match
    pub fn extract_all(&self, line: &str) -> Vec<String> {
        self.regex
            .find_iter(line)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    /// Capture groups of up to `limit` matches.
    ///
    /// Each inner vector holds groups 1..n of one match; groups that did not
    /// take part in the match are returned as empty strings.
    pub fn extract_all_groups(&self, line: &str, limit: usize) -> Vec<Vec<String>> {
        self.regex
            .captures_iter(line)
            .take(limit)
            .map(|caps| {
                caps.iter()
                    .skip(1)
                    .map(|group| group.map(|m| m.as_str().to_string()).unwrap_or_default())
                    .collect()
            })
            .collect()
    }

    /// The underlying pattern
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}
