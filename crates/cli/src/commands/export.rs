use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Args;
use serde_json::json;

use veritas_core::config::LoadOptions;
use veritas_core::export::{self, archive_dir_name, latest_outputs, report_file_name};
use veritas_core::{ApplicationError, LogRecord};

use crate::bootstrap::bootstrap;
use crate::commands::{build_runtime, write_file, CommandResult};

#[derive(Debug, Clone, Args)]
pub struct ExportArgs {
    #[arg(long, value_name = "DIR", help = "Directory that receives the report and the archive")]
    pub out: PathBuf,
}

/// Writes `<dir>/veritas360_report_<ts>.txt` and returns its path.
pub(crate) fn write_report(dir: &Path, report: &str, at: DateTime<Utc>) -> anyhow::Result<PathBuf> {
    let path = dir.join(report_file_name(at));
    write_file(&path, report)?;
    Ok(path)
}

/// Writes one `<agent>.txt` per agent under `<dir>/veritas360_outputs_<ts>/`.
pub(crate) fn write_archive(
    dir: &Path,
    records: &[LogRecord],
    at: DateTime<Utc>,
) -> anyhow::Result<PathBuf> {
    let archive_dir = dir.join(archive_dir_name(at));
    for entry in export::archive_entries(records) {
        write_file(&archive_dir.join(&entry.file_name), &entry.contents)
            .with_context(|| format!("could not archive {}", entry.file_name))?;
    }
    Ok(archive_dir)
}

pub fn run(options: LoadOptions, args: &ExportArgs) -> CommandResult {
    let runtime = match build_runtime("export") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    runtime.block_on(async {
        let app = match bootstrap(options).await {
            Ok(app) => app,
            Err(error) => return CommandResult::from_bootstrap("export", &error),
        };

        let records = match app.memory.fetch_all().await {
            Ok(records) => records,
            Err(error) => {
                return CommandResult::from_application(
                    "export",
                    &ApplicationError::Persistence(error.to_string()),
                )
            }
        };
        if records.is_empty() {
            return CommandResult::success("export", "memory log is empty; nothing exported");
        }

        let now = Utc::now();
        let report = export::render_report(latest_outputs(&records));
        let written = write_report(&args.out, &report, now)
            .and_then(|report_path| Ok((report_path, write_archive(&args.out, &records, now)?)));

        match written {
            Ok((report_path, archive_dir)) => CommandResult::success_with_data(
                "export",
                format!("exported {} log records", records.len()),
                json!({
                    "report_path": report_path.display().to_string(),
                    "archive_dir": archive_dir.display().to_string(),
                    "records": records.len(),
                }),
            ),
            Err(error) => CommandResult::failure("export", "export_write", format!("{error:#}"), 4),
        }
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    use veritas_core::LogRecord;

    use super::{write_archive, write_report};

    #[test]
    fn archive_holds_one_file_per_agent() {
        let dir = TempDir::new().expect("tempdir");
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).single().expect("timestamp");
        let records = vec![
            LogRecord::new(1, "SchemaAgent", "task", "Entity: Customer"),
            LogRecord::new(2, "UsecaseAgent", "task", "rationale"),
            LogRecord::new(3, "SchemaAgent", "task 2", "Entity: Account"),
        ];

        let archive_dir = write_archive(dir.path(), &records, at).expect("archive");

        assert!(archive_dir.ends_with("veritas360_outputs_20240309_140507"));
        let schema = fs::read_to_string(archive_dir.join("SchemaAgent.txt")).expect("schema file");
        assert_eq!(
            schema,
            "Input: task\nOutput: Entity: Customer\n\nInput: task 2\nOutput: Entity: Account\n\n"
        );
        assert!(archive_dir.join("UsecaseAgent.txt").exists());
        assert!(!archive_dir.join("ChatbotAgent.txt").exists());
    }

    #[test]
    fn report_lands_in_timestamped_file() {
        let dir = TempDir::new().expect("tempdir");
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).single().expect("timestamp");

        let path = write_report(&dir.path().join("reports"), "### SchemaAgent Output\nx", at)
            .expect("report");

        assert!(path.ends_with("veritas360_report_20240309_140507.txt"));
        assert_eq!(fs::read_to_string(path).expect("read"), "### SchemaAgent Output\nx");
    }
}
