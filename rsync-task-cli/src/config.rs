//! Configuration file loading for the command line tool

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use rsync_task::{RsyncOptions, TaskConfig};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub task: TaskSettings,
    #[serde(default)]
    pub rsync: RsyncOptions,
    #[serde(default)]
    pub cli: CliSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskSettings {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub use_sshpass: bool,
    #[serde(default)]
    pub create_dir: bool,
    #[serde(default)]
    pub rsync_binary: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliSettings {
    #[serde(with = "humantime_serde", default = "default_refresh_interval")]
    pub refresh_interval: Duration,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub json_logging: bool,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    #[serde(default)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

impl Default for CliSettings {
    fn default() -> Self {
        Self {
            refresh_interval: default_refresh_interval(),
            log_level: default_log_level(),
            json_logging: false,
            log_file: None,
            format: OutputFormat::default(),
        }
    }
}

impl CliConfig {
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: CliConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub async fn load_or_default(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path).await,
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.cli.refresh_interval.is_zero() {
            anyhow::bail!("cli.refresh_interval must be greater than zero");
        }
        if self.rsync.ipv4 && self.rsync.ipv6 {
            anyhow::bail!("rsync.ipv4 and rsync.ipv6 are mutually exclusive");
        }
        if let Some(level) = self.rsync.compress_level {
            if level > 22 {
                anyhow::bail!("rsync.compress_level must be between 0 and 22");
            }
        }
        Ok(())
    }

    /// Merge file settings with command-line paths into a task configuration
    pub fn task_config(&self, source: Option<String>, destination: Option<String>) -> Result<TaskConfig> {
        let source = source
            .or_else(|| self.task.source.clone())
            .context("No source given on the command line or in [task]")?;
        let destination = destination
            .or_else(|| self.task.destination.clone())
            .context("No destination given on the command line or in [task]")?;

        Ok(TaskConfig {
            source,
            destination,
            use_sshpass: self.task.use_sshpass,
            create_dir: self.task.create_dir,
            rsync_binary: self.task.rsync_binary.clone(),
            options: self.rsync.clone(),
        })
    }
}

// Default value functions
fn default_refresh_interval() -> Duration { Duration::from_millis(500) }
fn default_log_level() -> String { "warn".to_string() }
