pub mod bootstrap;
pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use veritas_core::config::{AppConfig, LoadOptions, LogFormat};

use crate::commands::agent::AgentArgs;
use crate::commands::diagram::DiagramArgs;
use crate::commands::export::ExportArgs;
use crate::commands::log::LogArgs;
use crate::commands::run::RunArgs;

#[derive(Debug, Parser)]
#[command(
    name = "veritas360",
    about = "Veritas360 Customer 360 agent orchestrator",
    long_about = "Run the Customer 360 agents over a business use case, inspect the memory log, export reports and render schema diagrams.",
    after_help = "Examples:\n  veritas360 run --task \"Reduce churn for premium cardholders\" --feedback \"App is slow\" --diagram\n  veritas360 agent schema --input \"Household view of retail customers\"\n  veritas360 diagram --file schema.txt\n  veritas360 doctor --json"
)]
pub struct Cli {
    #[arg(long, global = true, value_name = "PATH", help = "Config file (defaults to veritas.toml or config/veritas.toml)")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Dispatch every agent over one task, feedback set and query set")]
    Run(RunArgs),
    #[command(about = "Invoke a single agent")]
    Agent(AgentArgs),
    #[command(about = "List memory log records, optionally for one agent")]
    Log(LogArgs),
    #[command(about = "Write the latest-output report and the per-agent archive from the memory log")]
    Export(ExportArgs),
    #[command(about = "Render schema text as an entity diagram")]
    Diagram(DiagramArgs),
    #[command(about = "Answer questions read from stdin, one per line")]
    Chat,
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, storage connectivity and the completion endpoint")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = LoadOptions { config_path: cli.config, ..LoadOptions::default() };

    if let Ok(config) = AppConfig::load(options.clone()) {
        init_logging(&config);
    }

    let result = match cli.command {
        Command::Run(args) => commands::run::run(options, &args),
        Command::Agent(args) => commands::agent::run(options, &args),
        Command::Log(args) => commands::log::run(options, &args),
        Command::Export(args) => commands::export::run(options, &args),
        Command::Diagram(args) => commands::diagram::run(&args),
        Command::Chat => commands::chat::run(options),
        Command::Migrate => commands::migrate::run(options),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(options) }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(options, json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so stdout carries only command output.
fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    match config.logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}
