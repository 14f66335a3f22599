use async_trait::async_trait;
use thiserror::Error;

use veritas_core::domain::memory::LogRecord;

pub mod agent_output;
pub mod memory;

pub use agent_output::SqlMemoryLog;
pub use memory::InMemoryMemoryLog;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Append-only store of agent exchanges.
///
/// Records are never updated or deleted; a correction is a new record. Every
/// fetch issued after `store` returns observes the stored record.
#[async_trait]
pub trait MemoryLog: Send + Sync {
    async fn store(
        &self,
        agent: &str,
        input: &str,
        output: &str,
    ) -> Result<LogRecord, RepositoryError>;

    /// Records for one agent, in insertion order. Unknown agents yield an empty list.
    async fn fetch(&self, agent: &str) -> Result<Vec<LogRecord>, RepositoryError>;

    /// Every record, in global insertion order.
    async fn fetch_all(&self) -> Result<Vec<LogRecord>, RepositoryError>;
}
