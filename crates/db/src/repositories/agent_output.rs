use chrono::{DateTime, Utc};
use sqlx::Row;
use tokio::sync::Mutex;
use tracing::debug;

use veritas_core::domain::memory::LogRecord;

use super::{MemoryLog, RepositoryError};
use crate::DbPool;

/// Durable memory log backed by the `outputs` table.
///
/// Writers in this process take `write_lock` so appends are applied one at a
/// time; SQLite's own locking covers other processes sharing the file.
pub struct SqlMemoryLog {
    pool: DbPool,
    write_lock: Mutex<()>,
}

impl SqlMemoryLog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool, write_lock: Mutex::new(()) }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<LogRecord, RepositoryError> {
    let sequence: i64 = row.try_get("seq").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let agent: String = row.try_get("agent").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let input: String = row.try_get("task").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let output: String =
        row.try_get("response").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let recorded_at_str: String =
        row.try_get("recorded_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let recorded_at = DateTime::parse_from_rfc3339(&recorded_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("recorded_at `{recorded_at_str}`: {e}")))?;

    Ok(LogRecord { sequence, agent, input, output, recorded_at })
}

#[async_trait::async_trait]
impl MemoryLog for SqlMemoryLog {
    async fn store(
        &self,
        agent: &str,
        input: &str,
        output: &str,
    ) -> Result<LogRecord, RepositoryError> {
        let recorded_at = Utc::now();
        let _guard = self.write_lock.lock().await;

        let result = sqlx::query(
            "INSERT INTO outputs (agent, task, response, recorded_at) VALUES (?, ?, ?, ?)",
        )
        .bind(agent)
        .bind(input)
        .bind(output)
        .bind(recorded_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        let sequence = result.last_insert_rowid();
        debug!(event_name = "memory_log.stored", agent, sequence, "memory log record appended");

        Ok(LogRecord {
            sequence,
            agent: agent.to_string(),
            input: input.to_string(),
            output: output.to_string(),
            recorded_at,
        })
    }

    async fn fetch(&self, agent: &str) -> Result<Vec<LogRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT seq, agent, task, response, recorded_at
             FROM outputs
             WHERE agent = ?
             ORDER BY seq ASC",
        )
        .bind(agent)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_record).collect()
    }

    async fn fetch_all(&self) -> Result<Vec<LogRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT seq, agent, task, response, recorded_at
             FROM outputs
             ORDER BY seq ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_record).collect()
    }
}
