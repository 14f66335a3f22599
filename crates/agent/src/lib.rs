//! Agent runtime for Veritas360.
//!
//! Six agents share one completion client, one memory log and one prompt
//! library through [`agents::AgentContext`]. The [`orchestrator::Orchestrator`]
//! fans a run out to every registered agent and always returns one slot per
//! agent, whatever the individual agents did.
//!
//! - `llm` - completion client for an Ollama-style endpoint
//! - `prompts` - Tera templates for the completion-backed agents
//! - `agents` - the agent trait, the six agents and their registry
//! - `orchestrator` - concurrent dispatch with per-agent failure isolation
//! - `chat` - question answering with a capped recent history

pub mod agents;
pub mod chat;
pub mod llm;
pub mod orchestrator;
pub mod prompts;

pub use agents::{Agent, AgentContext, AgentError, AgentRegistry, AgentReply};
pub use chat::{ChatHistory, ChatSession, Speaker};
pub use llm::{CompletionError, LlmClient, OllamaClient};
pub use orchestrator::{AgentResult, AgentStatus, Orchestrator, RunReport};
pub use prompts::{PromptError, PromptLibrary};
