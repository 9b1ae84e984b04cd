//! Progress state and captured output of a task

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::StreamKind;
use crate::matcher::{PROGRESS, SPEED, TIME_REMAINING, TOTAL};

/// Latest progress figures reported by rsync.
///
/// Each field holds the most recent value seen on stdout. Fields that have not
/// been reported yet stay empty (or zero for `progress`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    /// Time remaining, `h:mm:ss`
    #[serde(rename = "remain")]
    pub time_remaining: String,
    /// Amount transferred so far, as printed (e.g. `15.17G`)
    #[serde(rename = "total")]
    pub downloaded_total: String,
    /// Transfer rate, as printed (e.g. `92.23MB/s`)
    pub speed: String,
    /// Progress of the current file in percent, 0-100
    pub progress: u8,
}

impl State {
    /// Overwrite the fields present in `update`, keeping the rest
    pub fn apply(&mut self, update: ProgressUpdate) {
        if let Some(total) = update.downloaded_total {
            self.downloaded_total = total;
        }
        if let Some(progress) = update.progress {
            self.progress = progress;
        }
        if let Some(remaining) = update.time_remaining {
            self.time_remaining = remaining;
        }
        if let Some(speed) = update.speed {
            self.speed = speed;
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>3}% {:>10} {:>12} {:>9}",
            self.progress, self.downloaded_total, self.speed, self.time_remaining
        )
    }
}

/// Fields extracted from one stdout line; `None` where the line had no match
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub downloaded_total: Option<String>,
    pub progress: Option<u8>,
    pub time_remaining: Option<String>,
    pub speed: Option<String>,
}

impl ProgressUpdate {
    /// Extract progress fields from a line such as
    /// `15.17G  10%   92.23MB/s    0:23:54`.
    ///
    /// A percentage that does not parse as an integer is dropped; anything
    /// above 100 is clamped.
    pub fn parse(line: &str) -> Self {
        let mut update = Self::default();

        if TOTAL.is_match(line) {
            update.downloaded_total = Some(TOTAL.extract(line));
        }

        if PROGRESS.is_match(line) {
            update.progress = PROGRESS
                .extract(line)
                .trim_end_matches('%')
                .parse::<u32>()
                .ok()
                .map(|percent| percent.min(100) as u8);
        }

        if TIME_REMAINING.is_match(line) {
            update.time_remaining = TIME_REMAINING.extract_all(line).into_iter().next();
        }

        if SPEED.is_match(line) {
            let speed = SPEED
                .extract_all_groups(line, 2)
                .into_iter()
                .next()
                .and_then(|groups| groups.into_iter().next())
                .unwrap_or_default();
            update.speed = Some(speed);
        }

        update
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Raw output captured from both streams, one `\n`-terminated line at a time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    pub stderr: String,
    pub stdout: String,
}

impl Log {
    /// Append a line and its terminator to the given stream's transcript
    pub fn append(&mut self, stream: StreamKind, line: &str) {
        let transcript = match stream {
            StreamKind::Stdout => &mut self.stdout,
            StreamKind::Stderr => &mut self.stderr,
        };
        transcript.push_str(line);
        transcript.push('\n');
    }
}

/// State and log guarded together by the task's lock
#[derive(Debug, Default)]
pub(crate) struct Snapshot {
    pub state: State,
    pub log: Log,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_parse_full_progress_line() {
        let update = ProgressUpdate::parse("     15.17G  10%   92.23MB/s    0:23:54");

        assert_eq!(update.downloaded_total.as_deref(), Some("15.17G"));
        assert_eq!(update.progress, Some(10));
        assert_eq!(update.speed.as_deref(), Some("92.23MB/s"));
        assert_eq!(update.time_remaining.as_deref(), Some("0:23:54"));
    }

    #[test]
    fn test_parse_final_progress_line() {
        let update =
            ProgressUpdate::parse("        1.05M 100%  998.47kB/s    0:00:01 (xfr#1, to-chk=0/1)");

        assert_eq!(update.downloaded_total.as_deref(), Some("1.05M"));
        assert_eq!(update.progress, Some(100));
        assert_eq!(update.speed.as_deref(), Some("998.47kB/s"));
        assert_eq!(update.time_remaining.as_deref(), Some("0:00:01"));
    }

    #[rstest]
    #[case("sending incremental file list")]
    #[case("")]
    #[case("dir/file.txt")]
    fn test_unrelated_lines_update_nothing(#[case] line: &str) {
        assert!(ProgressUpdate::parse(line).is_empty());
    }

    #[rstest]
    #[case("  1.00K 250%", Some(100))]
    #[case("  1.00K 99999999999%", None)]
    #[case("  1.00K 0%", Some(0))]
    fn test_progress_is_clamped_or_dropped(#[case] line: &str, #[case] expected: Option<u8>) {
        assert_eq!(ProgressUpdate::parse(line).progress, expected);
    }

    #[test]
    fn test_missing_fields_keep_previous_values() {
        let mut state = State::default();
        state.apply(ProgressUpdate::parse("     15.17G  10%   92.23MB/s    0:23:54"));
        state.apply(ProgressUpdate::parse("     16.00G  11%"));

        assert_eq!(state.downloaded_total, "16.00G");
        assert_eq!(state.progress, 11);
        assert_eq!(state.speed, "92.23MB/s");
        assert_eq!(state.time_remaining, "0:23:54");
    }

    #[test]
    fn test_state_serializes_with_short_keys() {
        let state = State {
            time_remaining: "0:23:54".to_string(),
            downloaded_total: "15.17G".to_string(),
            speed: "92.23MB/s".to_string(),
            progress: 10,
        };

        let json = serde_json::to_value(&state).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "remain": "0:23:54",
                "total": "15.17G",
                "speed": "92.23MB/s",
                "progress": 10
            })
        );
    }

    #[test]
    fn test_log_append_terminates_lines() {
        let mut log = Log::default();
        log.append(StreamKind::Stdout, "a");
        log.append(StreamKind::Stdout, "");
        log.append(StreamKind::Stderr, "oops");

        assert_eq!(log.stdout, "a\n\n");
        assert_eq!(log.stderr, "oops\n");
    }
}
