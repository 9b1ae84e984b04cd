//! A supervised rsync run with live progress snapshots

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::command::RsyncCommand;
use crate::error::{Result, StreamKind, TaskError};
use crate::file_list::{parse_file_list, FileRecord};
use crate::options::TaskConfig;
use crate::process::ProcessHandle;
use crate::processor::{process_stderr, process_stdout, SharedSnapshot};
use crate::state::{Log, Snapshot, State};

/// Runs one process to completion while exposing its progress.
///
/// `state` and `log` may be called from any thread at any time, including
/// while `run` is in flight; both read under the same lock the output
/// processors write under, so each call sees one consistent point in time.
/// A task supervises a single run.
pub struct Task<P = RsyncCommand> {
    process: Mutex<Option<P>>,
    shared: SharedSnapshot,
    cancel: CancellationToken,
}

impl Task<RsyncCommand> {
    /// Create an rsync task.
    ///
    /// Human-readable sizes, partial transfers and progress output are always
    /// enabled since the progress parser depends on that output format.
    pub fn new(mut config: TaskConfig) -> Self {
        config.options.force_progress_output();
        Self::with_process(RsyncCommand::new(&config))
    }

    /// The command line the task will execute, if it has not run yet
    pub fn argv(&self) -> Option<Vec<String>> {
        self.process.lock().as_ref().map(RsyncCommand::argv)
    }
}

impl<P: ProcessHandle> Task<P> {
    /// Supervise an arbitrary process handle
    pub fn with_process(process: P) -> Self {
        Self {
            process: Mutex::new(Some(process)),
            shared: Arc::new(Mutex::new(Snapshot::default())),
            cancel: CancellationToken::new(),
        }
    }

    /// Start the process and wait until it exits and its output is drained.
    ///
    /// Returns an error if a pipe cannot be acquired, the process fails to
    /// start, exits unsuccessfully, or the task is cancelled. The state and log
    /// stay readable afterwards either way.
    pub async fn run(&self) -> Result<()> {
        let mut process = self.process.lock().take().ok_or(TaskError::AlreadyRun)?;

        info!("task started");
        let result = self.supervise(&mut process).await;
        match &result {
            Ok(()) => info!("task completed"),
            Err(e) => warn!(error = %e, "task failed"),
        }
        result
    }

    async fn supervise(&self, process: &mut P) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(TaskError::Cancelled);
        }

        let stdout = process
            .stdout_pipe()
            .map_err(|e| TaskError::pipe_error(StreamKind::Stdout, e))?;
        // Dropping `stdout` on this error path closes it.
        let stderr = process
            .stderr_pipe()
            .map_err(|e| TaskError::pipe_error(StreamKind::Stderr, e))?;

        // Readers go first so nothing the child writes early can fill a pipe.
        let processors = self.cancel.child_token();
        let stdout_worker = tokio::spawn(process_stdout(stdout, self.shared.clone(), processors.clone()));
        let stderr_worker = tokio::spawn(process_stderr(stderr, self.shared.clone(), processors.clone()));

        // A cancel that lands while the pipes are set up must not spawn the child.
        if self.cancel.is_cancelled() {
            join_processors(stdout_worker, stderr_worker).await;
            return Err(TaskError::Cancelled);
        }

        if let Err(e) = process.start().await {
            processors.cancel();
            join_processors(stdout_worker, stderr_worker).await;
            return Err(TaskError::Start(e));
        }

        let (stdout_lines, stderr_lines) = join_processors(stdout_worker, stderr_worker).await;
        debug!(stdout_lines, stderr_lines, "process output drained");

        if self.cancel.is_cancelled() {
            return Err(terminate(process).await);
        }

        let status = tokio::select! {
            status = process.wait() => status.map_err(TaskError::Wait)?,
            _ = self.cancel.cancelled() => return Err(terminate(process).await),
        };

        debug!(%status, "process exited");
        if status.success() {
            Ok(())
        } else {
            Err(TaskError::Exit(status))
        }
    }

    /// Snapshot of the latest progress figures
    pub fn state(&self) -> State {
        self.shared.lock().state.clone()
    }

    /// Snapshot of the output captured so far
    pub fn log(&self) -> Log {
        self.shared.lock().log.clone()
    }

    /// State and log taken together under one lock
    pub fn snapshot(&self) -> (State, Log) {
        let snapshot = self.shared.lock();
        (snapshot.state.clone(), snapshot.log.clone())
    }

    /// Files printed by a `list_only` run.
    ///
    /// Fields are returned as rsync printed them: permissions, size, date,
    /// time and name.
    pub fn file_list(&self) -> Vec<FileRecord> {
        parse_file_list(&self.log().stdout)
    }

    /// Stop the output processors and kill the process.
    ///
    /// A pending or later `run` returns [`TaskError::Cancelled`].
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token that cancels this task when triggered
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

async fn join_processors(stdout: JoinHandle<usize>, stderr: JoinHandle<usize>) -> (usize, usize) {
    let (stdout, stderr) = tokio::join!(stdout, stderr);
    let lines = |joined: std::result::Result<usize, tokio::task::JoinError>, stream: StreamKind| {
        joined.unwrap_or_else(|e| {
            warn!(%stream, error = %e, "output processor did not finish cleanly");
            0
        })
    };
    (lines(stdout, StreamKind::Stdout), lines(stderr, StreamKind::Stderr))
}

async fn terminate<P: ProcessHandle>(process: &mut P) -> TaskError {
    if let Err(e) = process.kill().await {
        debug!(error = %e, "failed to kill cancelled process");
    }
    if let Err(e) = process.wait().await {
        debug!(error = %e, "failed to reap cancelled process");
    }
    TaskError::Cancelled
}
