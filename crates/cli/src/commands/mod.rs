pub mod agent;
pub mod chat;
pub mod config;
pub mod diagram;
pub mod doctor;
pub mod export;
pub mod log;
pub mod migrate;
pub mod run;

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use serde_json::Value;
use tokio::runtime::Runtime;

use veritas_core::domain::agent::split_lines;
use veritas_core::ApplicationError;

use crate::bootstrap::BootstrapError;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with_data(command, message, None::<Value>)
    }

    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: impl Into<Option<Value>>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data: data.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub fn from_bootstrap(command: &str, error: &BootstrapError) -> Self {
        Self::failure(command, error.error_class(), error.to_string(), error.exit_code())
    }

    pub fn from_application(command: &str, error: &ApplicationError) -> Self {
        Self::failure(command, error.error_class(), error.to_string(), error.exit_code())
    }

    pub fn invalid_input(command: &str, message: impl Into<String>) -> Self {
        Self::failure(command, "invalid_input", message, 6)
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Multi-threaded so a run's agents can make progress in parallel.
pub(crate) fn build_runtime(command: &str) -> Result<Runtime, CommandResult> {
    tokio::runtime::Builder::new_multi_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            3,
        )
    })
}

/// Inline text wins over the file; neither yields `None`.
pub(crate) fn read_text(inline: Option<&str>, file: Option<&Path>) -> anyhow::Result<Option<String>> {
    if let Some(text) = inline {
        return Ok(Some(text.to_string()));
    }
    match file {
        Some(path) => fs::read_to_string(path)
            .map(Some)
            .with_context(|| format!("could not read input file `{}`", path.display())),
        None => Ok(None),
    }
}

/// Repeated inline values plus the non-empty trimmed lines of `file`.
pub(crate) fn read_lines(inline: &[String], file: Option<&Path>) -> anyhow::Result<Vec<String>> {
    let mut lines: Vec<String> = inline
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    if let Some(path) = file {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("could not read input file `{}`", path.display()))?;
        lines.extend(split_lines(&raw));
    }
    Ok(lines)
}

pub(crate) fn write_file(path: &Path, contents: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("could not create directory `{}`", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("could not write `{}`", path.display()))
}
