//! Domain model, configuration and pure transforms for Veritas360.
//!
//! Nothing in this crate performs I/O beyond reading the config file: the
//! sentiment rule, the schema visualizer and export rendering are plain
//! functions over text so the agent and CLI crates can share them.

pub mod config;
pub mod domain;
pub mod errors;
pub mod export;
pub mod schema;
pub mod sentiment;

pub use domain::agent::{AgentInput, AgentKind, InputShape};
pub use domain::memory::LogRecord;
pub use errors::{ApplicationError, DomainError};
pub use export::{archive_entries, render_report, ArchiveEntry};
pub use schema::{extract_entities, render_diagram, SchemaEntity, SchemaGraph};
pub use sentiment::{classify, SentimentLabel};
