//! rsync Task Library
//!
//! Runs rsync as a child process and turns its output into something a program
//! can poll:
//! - Concurrent draining of stdout and stderr
//! - Line framing that understands rsync's carriage-return progress redraws
//! - Regex extraction of progress, rate, transferred total and time remaining
//! - Lock-protected `State` and `Log` snapshots readable during the run
//! - File record parsing for `--list-only` runs
//! - Cancellation of in-flight runs

pub mod command;
pub mod error;
pub mod file_list;
pub mod framer;
pub mod matcher;
pub mod options;
pub mod process;
mod processor;
pub mod state;
pub mod task;

// Re-export main types and functions
pub use command::RsyncCommand;
pub use error::{Result, StreamKind, TaskError};
pub use file_list::{parse_file_list, FileRecord};
pub use framer::LineCodec;
pub use matcher::Matcher;
pub use options::{RsyncOptions, TaskConfig};
pub use process::{OutputStream, ProcessHandle};
pub use state::{Log, ProgressUpdate, State};
pub use task::Task;

/// Run rsync with the given configuration and return the final state and log.
///
/// The log is returned alongside the error too, since it usually explains it.
pub async fn run_rsync(config: TaskConfig) -> std::result::Result<(State, Log), (TaskError, Log)> {
    let task = Task::new(config);
    match task.run().await {
        Ok(()) => Ok(task.snapshot()),
        Err(e) => Err((e, task.log())),
    }
}

#[cfg(test)]
mod framer_property_tests;
