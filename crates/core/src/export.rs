//! Aggregate report and per-agent archive rendering.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::agent::AgentKind;
use crate::domain::memory::LogRecord;

pub const REPORT_PREFIX: &str = "veritas360_report";
pub const ARCHIVE_PREFIX: &str = "veritas360_outputs";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ArchiveEntry {
    pub file_name: String,
    pub contents: String,
}

/// `### <agent> Output\n<output>` blocks separated by blank lines.
pub fn render_report<'a, I>(outputs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    outputs
        .into_iter()
        .map(|(agent, output)| format!("### {agent} Output\n{output}"))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// One `<agent>.txt` entry per known agent that has records, in agent order.
/// Records for names outside the registry follow, in first-seen order.
pub fn archive_entries(records: &[LogRecord]) -> Vec<ArchiveEntry> {
    let mut agent_names: Vec<&str> = AgentKind::ALL.iter().map(AgentKind::as_str).collect();
    for record in records {
        if !agent_names.contains(&record.agent.as_str()) {
            agent_names.push(record.agent.as_str());
        }
    }

    agent_names
        .into_iter()
        .filter_map(|agent| {
            let contents: String = records
                .iter()
                .filter(|record| record.agent == agent)
                .map(|record| format!("Input: {}\nOutput: {}\n\n", record.input, record.output))
                .collect();
            (!contents.is_empty())
                .then(|| ArchiveEntry { file_name: format!("{agent}.txt"), contents })
        })
        .collect()
}

/// Latest output per agent, in agent order, for rebuilding a report from the log.
pub fn latest_outputs(records: &[LogRecord]) -> Vec<(&str, &str)> {
    AgentKind::ALL
        .iter()
        .filter_map(|kind| {
            records
                .iter()
                .rev()
                .find(|record| record.agent == kind.as_str())
                .map(|record| (kind.as_str(), record.output.as_str()))
        })
        .collect()
}

pub fn report_file_name(at: DateTime<Utc>) -> String {
    format!("{REPORT_PREFIX}_{}.txt", at.format("%Y%m%d_%H%M%S"))
}

pub fn archive_dir_name(at: DateTime<Utc>) -> String {
    format!("{ARCHIVE_PREFIX}_{}", at.format("%Y%m%d_%H%M%S"))
}
