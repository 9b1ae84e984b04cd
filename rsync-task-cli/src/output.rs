//! Rendering of task results for the terminal

use anyhow::Result;
use serde::Serialize;

use rsync_task::{FileRecord, State};

use crate::config::OutputFormat;

/// Serialize `value` in the machine-readable formats, or fall back to `text`
pub fn render<T: Serialize>(value: &T, format: OutputFormat, text: impl FnOnce() -> String) -> Result<String> {
    Ok(match format {
        OutputFormat::Text => text(),
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
    })
}

pub fn render_state(state: &State, format: OutputFormat) -> Result<String> {
    render(state, format, || state.to_string())
}

pub fn render_file_list(records: &[FileRecord], format: OutputFormat) -> Result<String> {
    render(&records, format, || {
        records
            .iter()
            .map(|r| r.fields().join("  "))
            .collect::<Vec<_>>()
            .join("\n")
    })
}
