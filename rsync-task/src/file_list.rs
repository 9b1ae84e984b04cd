//! Parsing of `--list-only` output

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::matcher::Matcher;

// rsync pads the size column, so fields are split on any run of whitespace.
static LISTING: LazyLock<Matcher> = LazyLock::new(|| {
    Matcher::new(r"([rwx-]{10})\s+(\d[\d.,]*[A-Za-z]?)\s+(\d+/\d+/\d+)\s+(\d+:\d+:\d+)\s+(.*)")
        .expect("Invalid regex pattern")
});

/// One entry of an rsync file listing, as printed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub permissions: String,
    pub size: String,
    pub date: String,
    pub time: String,
    pub name: String,
}

impl FileRecord {
    /// The five fields in listing order
    pub fn fields(&self) -> [&str; 5] {
        [
            &self.permissions,
            &self.size,
            &self.date,
            &self.time,
            &self.name,
        ]
    }

    /// Parse a single listing line
    pub fn parse(line: &str) -> Option<Self> {
        let groups = LISTING.extract_all_groups(line, 1).into_iter().next()?;
        let [permissions, size, date, time, name]: [String; 5] = groups.try_into().ok()?;
        Some(Self {
            permissions,
            size,
            date,
            time,
            name,
        })
    }
}

/// Records for every listing line in `stdout`, in order. Other lines are skipped.
pub fn parse_file_list(stdout: &str) -> Vec<FileRecord> {
    stdout.lines().filter_map(FileRecord::parse).collect()
}
