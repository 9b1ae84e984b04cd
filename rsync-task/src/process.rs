//! The child process seam a task drives

use std::process::ExitStatus;

use async_trait::async_trait;
use tokio::io::AsyncRead;

/// A boxed readable end of one of the child's output streams
pub type OutputStream = Box<dyn AsyncRead + Send + Unpin>;

/// A launchable process with separately readable stdout and stderr.
///
/// Both pipes must be requested before [`ProcessHandle::start`]. Once the
/// process has exited and every write end is closed, the pipes report end of
/// stream. If `start` fails, the implementation must release its write ends so
/// readers do not block forever.
#[async_trait]
pub trait ProcessHandle: Send {
    /// Readable end of the child's standard output
    fn stdout_pipe(&mut self) -> std::io::Result<OutputStream>;

    /// Readable end of the child's standard error
    fn stderr_pipe(&mut self) -> std::io::Result<OutputStream>;

    /// Launch the process
    async fn start(&mut self) -> std::io::Result<()>;

    /// Wait for the process to exit
    async fn wait(&mut self) -> std::io::Result<ExitStatus>;

    /// Forcefully terminate a started process
    async fn kill(&mut self) -> std::io::Result<()>;
}
