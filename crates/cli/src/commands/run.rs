use std::path::PathBuf;

use chrono::Utc;
use clap::Args;
use serde_json::{json, Value};

use veritas_agent::{AgentStatus, RunReport};
use veritas_core::config::LoadOptions;
use veritas_core::{extract_entities, render_diagram, AgentKind, ApplicationError, DomainError};

use crate::bootstrap::bootstrap;
use crate::commands::export::{write_archive, write_report};
use crate::commands::{build_runtime, read_lines, read_text, CommandResult};

#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    #[arg(long, help = "Business use case handed to the authoring agents")]
    pub task: Option<String>,
    #[arg(long, value_name = "PATH", conflicts_with = "task")]
    pub task_file: Option<PathBuf>,
    #[arg(long = "feedback", value_name = "TEXT", help = "Customer feedback line (repeatable)")]
    pub feedback: Vec<String>,
    #[arg(long, value_name = "PATH")]
    pub feedback_file: Option<PathBuf>,
    #[arg(long = "query", value_name = "TEXT", help = "Customer question (repeatable)")]
    pub queries: Vec<String>,
    #[arg(long, value_name = "PATH")]
    pub query_file: Option<PathBuf>,
    #[arg(long, value_name = "DIR", help = "Write the aggregate report into DIR")]
    pub report: Option<PathBuf>,
    #[arg(long, value_name = "DIR", help = "Write the per-agent archive into DIR")]
    pub archive: Option<PathBuf>,
    #[arg(long, help = "Render the schema agent's output as an entity diagram")]
    pub diagram: bool,
}

struct RunInputs {
    task: String,
    feedback: Vec<String>,
    queries: Vec<String>,
}

fn gather_inputs(args: &RunArgs) -> Result<RunInputs, CommandResult> {
    let task = read_text(args.task.as_deref(), args.task_file.as_deref())
        .map_err(|error| CommandResult::invalid_input("run", format!("{error:#}")))?
        .filter(|task| !task.trim().is_empty())
        .ok_or_else(|| {
            CommandResult::from_application(
                "run",
                &ApplicationError::from(DomainError::EmptyInput {
                    agent: "run".to_string(),
                    reason: "a task is required (--task or --task-file)".to_string(),
                }),
            )
        })?;
    let feedback = read_lines(&args.feedback, args.feedback_file.as_deref())
        .map_err(|error| CommandResult::invalid_input("run", format!("{error:#}")))?;
    let queries = read_lines(&args.queries, args.query_file.as_deref())
        .map_err(|error| CommandResult::invalid_input("run", format!("{error:#}")))?;

    Ok(RunInputs { task: task.trim().to_string(), feedback, queries })
}

pub fn run(options: LoadOptions, args: &RunArgs) -> CommandResult {
    let inputs = match gather_inputs(args) {
        Ok(inputs) => inputs,
        Err(result) => return result,
    };
    let runtime = match build_runtime("run") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    runtime.block_on(async {
        let app = match bootstrap(options).await {
            Ok(app) => app,
            Err(error) => return CommandResult::from_bootstrap("run", &error),
        };

        let report = app.orchestrator.run_all(&inputs.task, &inputs.feedback, &inputs.queries).await;
        let mut data = json!({
            "run_id": report.run_id,
            "results": &report.results,
        });

        let now = Utc::now();
        if let Some(dir) = &args.report {
            match write_report(dir, &report.render_report(), now) {
                Ok(path) => data["report_path"] = Value::from(path.display().to_string()),
                Err(error) => {
                    return CommandResult::failure("run", "export_write", format!("{error:#}"), 4)
                }
            }
        }

        if let Some(dir) = &args.archive {
            let records = match app.memory.fetch_all().await {
                Ok(records) => records,
                Err(error) => {
                    return CommandResult::from_application(
                        "run",
                        &ApplicationError::Persistence(error.to_string()),
                    )
                }
            };
            match write_archive(dir, &records, now) {
                Ok(path) => data["archive_dir"] = Value::from(path.display().to_string()),
                Err(error) => {
                    return CommandResult::failure("run", "export_write", format!("{error:#}"), 4)
                }
            }
        }

        if args.diagram {
            let schema = report.output(AgentKind::Schema).unwrap_or_default();
            data["diagram"] = Value::from(render_diagram(&extract_entities(schema)));
        }

        CommandResult::success_with_data("run", summarize(&report), data)
    })
}

fn summarize(report: &RunReport) -> String {
    let count = |status: AgentStatus| {
        report.results.iter().filter(|result| result.status == status).count()
    };
    format!(
        "{} agents finished: {} completed, {} degraded, {} failed",
        report.results.len(),
        count(AgentStatus::Completed),
        count(AgentStatus::Degraded),
        count(AgentStatus::Failed)
    )
}
