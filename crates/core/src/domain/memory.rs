use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One immutable `(agent, input, output)` exchange in the memory log.
///
/// `sequence` is the global append order, starting at 1.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub sequence: i64,
    pub agent: String,
    pub input: String,
    pub output: String,
    pub recorded_at: DateTime<Utc>,
}

impl LogRecord {
    pub fn new(
        sequence: i64,
        agent: impl Into<String>,
        input: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            sequence,
            agent: agent.into(),
            input: input.into(),
            output: output.into(),
            recorded_at: Utc::now(),
        }
    }
}
