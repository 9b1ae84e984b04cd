use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use rsync_task::{Log, Task, TaskConfig, TaskError};

mod config;
mod output;
mod telemetry;

use config::{CliConfig, OutputFormat};

#[derive(Parser)]
#[command(name = "rsync-task")]
#[command(about = "Run rsync with live progress reporting")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Output format for results
    #[arg(short, long, global = true, value_enum)]
    format: Option<OutputFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Transfer SOURCE to DESTINATION, reporting progress while it runs
    Run {
        /// Source path or remote location; falls back to [task].source
        source: Option<String>,
        /// Destination path or remote location; falls back to [task].destination
        destination: Option<String>,
        #[command(flatten)]
        flags: RunFlags,
        /// Do not draw the progress line
        #[arg(short, long)]
        quiet: bool,
    },
    /// List the files under SOURCE without transferring anything
    List {
        /// Source path or remote location
        source: String,
        #[command(flatten)]
        flags: RunFlags,
    },
    /// Print the command line that `run` would execute
    Args {
        source: Option<String>,
        destination: Option<String>,
        #[command(flatten)]
        flags: RunFlags,
    },
}

/// Options that override the configuration file
#[derive(Args, Debug, Default)]
struct RunFlags {
    /// Archive mode
    #[arg(short, long)]
    archive: bool,
    /// Compress file data during the transfer
    #[arg(short = 'z', long)]
    compress: bool,
    /// Show what would be transferred without changing anything
    #[arg(short = 'n', long)]
    dry_run: bool,
    /// Delete extraneous files from the destination
    #[arg(long)]
    delete: bool,
    /// Exclude files matching PATTERN
    #[arg(long, value_name = "PATTERN")]
    exclude: Vec<String>,
    /// Read the ssh password from SSHPASS
    #[arg(long)]
    sshpass: bool,
    /// Create missing destination path components
    #[arg(long)]
    mkpath: bool,
    /// rsync executable to run
    #[arg(long, value_name = "PATH")]
    rsync_binary: Option<String>,
}

impl RunFlags {
    fn apply(self, config: &mut CliConfig) {
        let rsync = &mut config.rsync;
        rsync.archive |= self.archive;
        rsync.compress |= self.compress;
        rsync.dry_run |= self.dry_run;
        rsync.delete |= self.delete;
        rsync.exclude.extend(self.exclude);

        config.task.use_sshpass |= self.sshpass;
        config.task.create_dir |= self.mkpath;
        if self.rsync_binary.is_some() {
            config.task.rsync_binary = self.rsync_binary;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = CliConfig::load_or_default(cli.config.as_ref()).await?;
    let guard = telemetry::init_logging(&config.cli, cli.log_level.as_deref())?;
    if let Some(path) = &cli.config {
        debug!("Loaded configuration from {}", path.display());
    }
    let format = cli.format.unwrap_or(config.cli.format);

    let code = match cli.command {
        Commands::Run { source, destination, flags, quiet } => {
            flags.apply(&mut config);
            let task_config = config.task_config(source, destination)?;
            run_task(task_config, &config, format, quiet).await?
        }
        Commands::List { source, flags } => {
            flags.apply(&mut config);
            config.rsync.list_only = true;
            // The destination is left empty so rsync prints the listing
            let mut task_config = config.task_config(Some(source), Some(String::new()))?;
            task_config.create_dir = false;
            list_files(task_config, format).await?
        }
        Commands::Args { source, destination, flags } => {
            flags.apply(&mut config);
            let task = Task::new(config.task_config(source, destination)?);
            let argv = task.argv().context("Task has no command line")?;
            println!("{}", argv.join(" "));
            0
        }
    };

    // Flush the log file before a failing exit skips destructors
    drop(guard);
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

async fn run_task(task_config: TaskConfig, config: &CliConfig, format: OutputFormat, quiet: bool) -> Result<i32> {
    info!("Syncing from {} to {}", task_config.source, task_config.destination);

    let task = Arc::new(Task::new(task_config));
    let mut runner = tokio::spawn({
        let task = Arc::clone(&task);
        async move { task.run().await }
    });

    let mut ticker = tokio::time::interval(config.cli.refresh_interval);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    let result = loop {
        tokio::select! {
            joined = &mut runner => break joined.context("Task panicked")?,
            _ = ticker.tick(), if !quiet => {
                eprint!("\r{}", task.state());
            }
            _ = &mut ctrl_c, if !interrupted => {
                warn!("Interrupted, stopping rsync");
                interrupted = true;
                task.cancel();
            }
        }
    };
    if !quiet {
        eprintln!();
    }

    let (state, log) = task.snapshot();
    match result {
        Ok(()) => {
            println!("{}", output::render_state(&state, format)?);
            Ok(0)
        }
        Err(e) => Ok(report_failure(&e, &log)),
    }
}

/// Print the captured stderr and the error; returns the exit code to use
fn report_failure(error: &TaskError, log: &Log) -> i32 {
    eprint!("{}", log.stderr);
    eprintln!("rsync failed: {error}");
    error.exit_code().unwrap_or(1)
}

async fn list_files(task_config: TaskConfig, format: OutputFormat) -> Result<i32> {
    info!("Listing {}", task_config.source);

    let task = Task::new(task_config);
    if let Err(e) = task.run().await {
        return Ok(report_failure(&e, &task.log()));
    }

    let records = task.file_list();
    debug!("Parsed {} listing entries", records.len());
    println!("{}", output::render_file_list(&records, format)?);
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_extend_config() {
        let cli = Cli::try_parse_from([
            "rsync-task", "run", "src/", "dst/", "-az", "--delete", "--exclude", "*.tmp", "--mkpath",
        ])
        .unwrap();
        let Commands::Run { source, destination, flags, .. } = cli.command else {
            panic!("expected run command");
        };

        let mut config = CliConfig::default();
        config.rsync.exclude.push("cache/".to_string());
        flags.apply(&mut config);

        assert!(config.rsync.archive);
        assert!(config.rsync.compress);
        assert!(config.rsync.delete);
        assert!(!config.rsync.dry_run);
        assert_eq!(config.rsync.exclude, vec!["cache/", "*.tmp"]);
        assert!(config.task.create_dir);
        assert_eq!(source.as_deref(), Some("src/"));
        assert_eq!(destination.as_deref(), Some("dst/"));
    }

    #[test]
    fn test_args_command_line() {
        let cli = Cli::try_parse_from(["rsync-task", "args", "a/", "b/", "--rsync-binary", "/opt/rsync"]).unwrap();
        let Commands::Args { source, destination, flags } = cli.command else {
            panic!("expected args command");
        };

        let mut config = CliConfig::default();
        flags.apply(&mut config);
        let task = Task::new(config.task_config(source, destination).unwrap());
        let argv = task.argv().unwrap();

        assert_eq!(argv.first().map(String::as_str), Some("/opt/rsync"));
        assert!(argv.contains(&"--progress".to_string()));
        assert_eq!(&argv[argv.len() - 2..], ["a/", "b/"]);
    }

    #[test]
    fn test_failure_exit_code() {
        assert_eq!(report_failure(&TaskError::Cancelled, &Log::default()), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_run_returns_exit_code() {
        let mut task_config = TaskConfig::new("a", "b");
        task_config.rsync_binary = Some("false".to_string());

        let code = run_task(task_config, &CliConfig::default(), OutputFormat::Text, true)
            .await
            .unwrap();

        assert_eq!(code, 1);
    }

    #[test]
    fn test_global_format_flag() {
        let cli = Cli::try_parse_from(["rsync-task", "list", "host:/srv", "--format", "yaml"]).unwrap();
        assert_eq!(cli.format, Some(OutputFormat::Yaml));
    }
}
