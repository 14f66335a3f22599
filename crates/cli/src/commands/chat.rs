use std::io::{self, BufRead};

use serde::Serialize;
use serde_json::json;

use veritas_agent::{AgentStatus, ChatSession};
use veritas_core::config::LoadOptions;

use crate::bootstrap::bootstrap;
use crate::commands::{build_runtime, CommandResult};

#[derive(Debug, Serialize)]
struct Exchange {
    question: String,
    status: AgentStatus,
    answer: String,
}

pub fn run(options: LoadOptions) -> CommandResult {
    let stdin = io::stdin();
    run_with_reader(options, stdin.lock())
}

/// One question per input line; blank lines are skipped.
pub fn run_with_reader(options: LoadOptions, reader: impl BufRead) -> CommandResult {
    let mut questions = Vec::new();
    for line in reader.lines() {
        match line {
            Ok(line) => questions.push(line),
            Err(error) => {
                return CommandResult::invalid_input("chat", format!("could not read input: {error}"))
            }
        }
    }

    let runtime = match build_runtime("chat") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    runtime.block_on(async {
        let app = match bootstrap(options).await {
            Ok(app) => app,
            Err(error) => return CommandResult::from_bootstrap("chat", &error),
        };

        let mut session = ChatSession::new(app.orchestrator);
        let mut exchanges = Vec::new();
        for question in &questions {
            let Some(result) = session.ask(question).await else {
                continue;
            };
            let answer = session
                .history()
                .recent()
                .next()
                .map(|turn| turn.message.clone())
                .unwrap_or_default();
            exchanges.push(Exchange { question: question.trim().to_string(), status: result.status, answer });
        }

        let history: Vec<_> = session.history().recent().cloned().collect();
        CommandResult::success_with_data(
            "chat",
            format!("answered {} questions", exchanges.len()),
            json!({
                "exchanges": exchanges,
                "history": history,
                "transcript": session.history().render(),
            }),
        )
    })
}
