use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use veritas_agent::{
    AgentContext, AgentRegistry, CompletionError, OllamaClient, Orchestrator, PromptError,
    PromptLibrary,
};
use veritas_core::config::{AppConfig, ConfigError, LoadOptions, MemoryBackend};
use veritas_db::{connect_with_settings, migrations, InMemoryMemoryLog, MemoryLog, SqlMemoryLog};

/// Everything a command needs, built once per invocation.
pub struct Application {
    pub config: AppConfig,
    pub memory: Arc<dyn MemoryLog>,
    pub orchestrator: Arc<Orchestrator>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("completion client could not be built: {0}")]
    Completion(#[source] CompletionError),
    #[error(transparent)]
    Prompts(#[from] PromptError),
}

impl BootstrapError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Config(_) => "config_validation",
            Self::DatabaseConnect(_) => "db_connectivity",
            Self::Migration(_) => "migration",
            Self::Completion(_) | Self::Prompts(_) => "runtime_init",
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            Self::DatabaseConnect(_) => 4,
            Self::Migration(_) => 5,
            Self::Completion(_) | Self::Prompts(_) => 3,
        }
    }
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        backend = ?config.memory.backend,
        "starting application bootstrap"
    );

    let memory = open_memory_log(&config).await?;

    let llm = OllamaClient::from_config(&config.llm).map_err(BootstrapError::Completion)?;
    info!(
        event_name = "system.bootstrap.llm_ready",
        correlation_id = "bootstrap",
        endpoint = llm.endpoint(),
        model = llm.model(),
        "completion client configured"
    );

    let prompts = PromptLibrary::new()?;
    let context = AgentContext::new(Arc::new(llm), Arc::clone(&memory), Arc::new(prompts));
    let orchestrator = Orchestrator::new(
        AgentRegistry::standard(context),
        config.orchestrator.max_concurrency,
    );

    Ok(Application { config, memory, orchestrator: Arc::new(orchestrator) })
}

async fn open_memory_log(config: &AppConfig) -> Result<Arc<dyn MemoryLog>, BootstrapError> {
    match config.memory.backend {
        MemoryBackend::InMemory => Ok(Arc::new(InMemoryMemoryLog::new())),
        MemoryBackend::Sqlite => {
            let pool = connect_with_settings(
                &config.database.url,
                config.database.max_connections,
                config.database.timeout_secs,
            )
            .await
            .map_err(BootstrapError::DatabaseConnect)?;
            info!(
                event_name = "system.bootstrap.database_connected",
                correlation_id = "bootstrap",
                "database connection established"
            );

            migrations::run_pending(&pool).await.map_err(BootstrapError::Migration)?;
            info!(
                event_name = "system.bootstrap.migrations_applied",
                correlation_id = "bootstrap",
                "database migrations applied"
            );

            Ok(Arc::new(SqlMemoryLog::new(pool)))
        }
    }
}
