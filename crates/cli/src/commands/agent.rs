use std::path::PathBuf;

use clap::Args;
use serde_json::json;

use veritas_agent::AgentStatus;
use veritas_core::config::LoadOptions;
use veritas_core::{AgentKind, ApplicationError, DomainError};

use crate::bootstrap::bootstrap;
use crate::commands::{build_runtime, read_text, CommandResult};

#[derive(Debug, Clone, Args)]
pub struct AgentArgs {
    #[arg(help = "Agent to invoke: usecase|schema|mapping|certifier|sentiment|chatbot")]
    pub name: String,
    #[arg(long, help = "Task text, or newline-separated items for sentiment/chatbot")]
    pub input: Option<String>,
    #[arg(long, value_name = "PATH", conflicts_with = "input")]
    pub input_file: Option<PathBuf>,
}

pub fn run(options: LoadOptions, args: &AgentArgs) -> CommandResult {
    let agent = match args.name.parse::<AgentKind>() {
        Ok(agent) => agent,
        Err(error) => return CommandResult::from_application("agent", &error.into()),
    };
    let input = match read_text(args.input.as_deref(), args.input_file.as_deref()) {
        Ok(Some(input)) if !input.trim().is_empty() => input,
        Ok(_) => {
            let error = DomainError::EmptyInput {
                agent: agent.to_string(),
                reason: "provide --input or --input-file".to_string(),
            };
            return CommandResult::from_application("agent", &error.into());
        }
        Err(error) => return CommandResult::invalid_input("agent", format!("{error:#}")),
    };

    let runtime = match build_runtime("agent") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    runtime.block_on(async {
        let app = match bootstrap(options).await {
            Ok(app) => app,
            Err(error) => return CommandResult::from_bootstrap("agent", &error),
        };

        let result = match app.orchestrator.run_named(agent.as_str(), &input).await {
            Ok(result) => result,
            Err(error) => return CommandResult::from_application("agent", &error.into()),
        };

        if result.status == AgentStatus::Failed {
            return CommandResult::from_application(
                "agent",
                &ApplicationError::Persistence(result.output),
            );
        }
        CommandResult::success_with_data(
            "agent",
            format!("{agent} finished: {}", result.status.as_str()),
            json!(result),
        )
    })
}
