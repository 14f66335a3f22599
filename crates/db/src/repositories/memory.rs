use chrono::Utc;
use tokio::sync::RwLock;

use veritas_core::domain::memory::LogRecord;

use super::{MemoryLog, RepositoryError};

/// Process-lifetime memory log. Appends are serialized by the write lock, so
/// sequence numbers are dense and match vector order.
#[derive(Default)]
pub struct InMemoryMemoryLog {
    records: RwLock<Vec<LogRecord>>,
}

impl InMemoryMemoryLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl MemoryLog for InMemoryMemoryLog {
    async fn store(
        &self,
        agent: &str,
        input: &str,
        output: &str,
    ) -> Result<LogRecord, RepositoryError> {
        let mut records = self.records.write().await;
        let record = LogRecord {
            sequence: records.len() as i64 + 1,
            agent: agent.to_string(),
            input: input.to_string(),
            output: output.to_string(),
            recorded_at: Utc::now(),
        };
        records.push(record.clone());
        Ok(record)
    }

    async fn fetch(&self, agent: &str) -> Result<Vec<LogRecord>, RepositoryError> {
        let records = self.records.read().await;
        Ok(records.iter().filter(|record| record.agent == agent).cloned().collect())
    }

    async fn fetch_all(&self) -> Result<Vec<LogRecord>, RepositoryError> {
        let records = self.records.read().await;
        Ok(records.clone())
    }
}
