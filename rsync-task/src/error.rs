//! Error types for the rsync task library

use std::process::ExitStatus;

/// Result type alias for task operations
pub type Result<T> = std::result::Result<T, TaskError>;

/// Which output stream of the child process an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamKind::Stdout => write!(f, "stdout"),
            StreamKind::Stderr => write!(f, "stderr"),
        }
    }
}

/// Errors surfaced by a task run
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// A stream handle could not be acquired before start
    #[error("Failed to acquire {stream} pipe: {source}")]
    Pipe {
        stream: StreamKind,
        #[source]
        source: std::io::Error,
    },

    /// The process could not be started
    #[error("Failed to start process: {0}")]
    Start(#[source] std::io::Error),

    /// Waiting for the process failed
    #[error("Failed to wait for process: {0}")]
    Wait(#[source] std::io::Error),

    /// The process exited unsuccessfully or was killed by a signal
    #[error("Process exited unsuccessfully: {0}")]
    Exit(ExitStatus),

    /// The run was cancelled before the process finished
    #[error("Task was cancelled")]
    Cancelled,

    /// A task supervises a single run
    #[error("Task has already been run")]
    AlreadyRun,

    /// A line pattern failed to compile
    #[error("Invalid line pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl TaskError {
    /// Create a new pipe acquisition error
    pub fn pipe_error(stream: StreamKind, source: std::io::Error) -> Self {
        Self::Pipe { stream, source }
    }

    /// Create a new configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Exit code of the process, when it exited normally with a failure code
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Exit(status) => status.code(),
            _ => None,
        }
    }
}
