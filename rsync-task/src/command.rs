//! Launching rsync as a child process

use std::io;
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tracing::debug;

use crate::error::StreamKind;
use crate::options::TaskConfig;
use crate::process::{OutputStream, ProcessHandle};

const RSYNC: &str = "rsync";
const SSHPASS: &str = "sshpass";

/// An rsync invocation whose output pipes exist before the process does.
///
/// Pipes are plain OS pipes created on request, so the output processors can
/// start reading before `start` spawns the child.
pub struct RsyncCommand {
    program: String,
    args: Vec<String>,
    command: Option<Command>,
    child: Option<Child>,
}

impl RsyncCommand {
    /// Build the command line for a task configuration
    pub fn new(config: &TaskConfig) -> Self {
        let (program, args) = command_line(config);

        let mut command = Command::new(&program);
        command
            .args(&args)
            .stdin(Stdio::null())
            // Keep the decimal point rsync prints in sizes and rates parseable.
            .env("LC_NUMERIC", "C")
            .kill_on_drop(true);

        Self {
            program,
            args,
            command: Some(command),
            child: None,
        }
    }

    /// Program that will be executed
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments passed to the program
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Program followed by its arguments
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }

    fn pending_command(&mut self) -> io::Result<&mut Command> {
        self.command
            .as_mut()
            .ok_or_else(|| io::Error::other("pipes must be requested before the process starts"))
    }

    fn child(&mut self) -> io::Result<&mut Child> {
        self.child
            .as_mut()
            .ok_or_else(|| io::Error::other("process has not been started"))
    }
}

fn command_line(config: &TaskConfig) -> (String, Vec<String>) {
    let rsync = config.rsync_binary.as_deref().unwrap_or(RSYNC);
    let mut args = Vec::new();
    let program = if config.use_sshpass {
        args.push("-e".to_string());
        args.push(rsync.to_string());
        SSHPASS
    } else {
        rsync
    };

    args.extend(config.options.to_args());
    if config.create_dir {
        args.push("--mkpath".to_string());
    }
    args.push(config.source.clone());
    // With no destination rsync lists the source instead of copying it
    if !config.destination.is_empty() {
        args.push(config.destination.clone());
    }

    (program.to_string(), args)
}

#[cfg(unix)]
fn open_pipe(command: &mut Command, stream: StreamKind) -> io::Result<OutputStream> {
    use std::os::fd::OwnedFd;
    use tokio::net::unix::pipe;

    let (reader, writer) = io::pipe()?;
    match stream {
        StreamKind::Stdout => command.stdout(writer),
        StreamKind::Stderr => command.stderr(writer),
    };
    let receiver = pipe::Receiver::from_owned_fd(OwnedFd::from(reader))?;
    Ok(Box::new(receiver))
}

#[cfg(not(unix))]
fn open_pipe(_command: &mut Command, stream: StreamKind) -> io::Result<OutputStream> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("{stream} pipes are only available on unix"),
    ))
}

#[async_trait]
impl ProcessHandle for RsyncCommand {
    fn stdout_pipe(&mut self) -> io::Result<OutputStream> {
        open_pipe(self.pending_command()?, StreamKind::Stdout)
    }

    fn stderr_pipe(&mut self) -> io::Result<OutputStream> {
        open_pipe(self.pending_command()?, StreamKind::Stderr)
    }

    async fn start(&mut self) -> io::Result<()> {
        let mut command = self
            .command
            .take()
            .ok_or_else(|| io::Error::other("process has already been started"))?;

        let spawned = command.spawn();
        // The command holds our copies of the pipe write ends; readers only see
        // end of stream once these are gone, whether or not the spawn worked.
        drop(command);

        let child = spawned?;
        debug!(program = %self.program, pid = ?child.id(), "rsync process started");
        self.child = Some(child);
        Ok(())
    }

    async fn wait(&mut self) -> io::Result<ExitStatus> {
        self.child()?.wait().await
    }

    async fn kill(&mut self) -> io::Result<()> {
        match self.child.as_mut() {
            Some(child) => child.kill().await,
            None => Ok(()),
        }
    }
}
