use clap::Args;
use serde_json::json;

use veritas_core::config::{LoadOptions, MemoryBackend};
use veritas_core::{AgentKind, ApplicationError};

use crate::bootstrap::bootstrap;
use crate::commands::{build_runtime, CommandResult};

#[derive(Debug, Clone, Default, Args)]
pub struct LogArgs {
    #[arg(long, help = "Only show records written by this agent")]
    pub agent: Option<String>,
}

pub fn run(options: LoadOptions, args: &LogArgs) -> CommandResult {
    let agent = match args.agent.as_deref().map(str::parse::<AgentKind>).transpose() {
        Ok(agent) => agent,
        Err(error) => return CommandResult::from_application("log", &error.into()),
    };

    let runtime = match build_runtime("log") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    runtime.block_on(async {
        let app = match bootstrap(options).await {
            Ok(app) => app,
            Err(error) => return CommandResult::from_bootstrap("log", &error),
        };

        let fetched = match agent {
            Some(agent) => app.memory.fetch(agent.as_str()).await,
            None => app.memory.fetch_all().await,
        };
        let records = match fetched {
            Ok(records) => records,
            Err(error) => {
                return CommandResult::from_application(
                    "log",
                    &ApplicationError::Persistence(error.to_string()),
                )
            }
        };

        let mut message = format!("{} log records", records.len());
        if app.config.memory.backend == MemoryBackend::InMemory {
            message.push_str(" (in-memory backend keeps nothing between invocations)");
        }
        CommandResult::success_with_data("log", message, json!({ "records": records }))
    })
}
