use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{error, warn};

use veritas_core::sentiment;
use veritas_core::{AgentInput, AgentKind};
use veritas_db::repositories::{MemoryLog, RepositoryError};

use crate::llm::LlmClient;
use crate::prompts::PromptLibrary;

/// Text produced by one agent invocation. `degraded` is set when a completion
/// or prompt failure was captured into `output` instead of a real answer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentReply {
    pub output: String,
    pub degraded: bool,
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("memory log write failed for {agent}: {source}")]
    Storage {
        agent: AgentKind,
        #[source]
        source: RepositoryError,
    },
}

#[async_trait]
pub trait Agent: Send + Sync {
    fn kind(&self) -> AgentKind;

    /// Produces the agent's text and records exactly one memory log entry.
    ///
    /// Completion failures are folded into the reply; only a failed log write
    /// is returned as an error.
    async fn respond(&self, input: &AgentInput) -> Result<AgentReply, AgentError>;
}

/// Collaborators shared by every agent.
#[derive(Clone)]
pub struct AgentContext {
    pub llm: Arc<dyn LlmClient>,
    pub memory: Arc<dyn MemoryLog>,
    pub prompts: Arc<PromptLibrary>,
}

impl AgentContext {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        memory: Arc<dyn MemoryLog>,
        prompts: Arc<PromptLibrary>,
    ) -> Self {
        Self { llm, memory, prompts }
    }

    async fn record(
        &self,
        agent: AgentKind,
        input: &AgentInput,
        reply: AgentReply,
    ) -> Result<AgentReply, AgentError> {
        match self.memory.store(agent.as_str(), &input.render(), &reply.output).await {
            Ok(_) => Ok(reply),
            Err(source) => {
                error!(
                    event_name = "agent.memory_log.failed",
                    agent = %agent,
                    error = %source,
                    "memory log write failed"
                );
                Err(AgentError::Storage { agent, source })
            }
        }
    }

    async fn complete_or_describe(&self, agent: AgentKind, prompt: &str) -> AgentReply {
        match self.llm.complete(prompt).await {
            Ok(output) => AgentReply { output, degraded: false },
            Err(fault) => {
                warn!(
                    event_name = "agent.completion.failed",
                    agent = %agent,
                    error = %fault,
                    "completion failed; error text recorded as output"
                );
                AgentReply { output: fault.to_string(), degraded: true }
            }
        }
    }
}

/// Use case, schema, mapping and certifier agents: one templated prompt, one
/// completion.
pub struct PromptedAgent {
    kind: AgentKind,
    context: AgentContext,
}

impl PromptedAgent {
    pub fn new(kind: AgentKind, context: AgentContext) -> Self {
        Self { kind, context }
    }
}

#[async_trait]
impl Agent for PromptedAgent {
    fn kind(&self) -> AgentKind {
        self.kind
    }

    async fn respond(&self, input: &AgentInput) -> Result<AgentReply, AgentError> {
        let reply = match self.context.prompts.render_task(self.kind, &input.as_task()) {
            Ok(prompt) => self.context.complete_or_describe(self.kind, &prompt).await,
            Err(fault) => AgentReply { output: format!("Exception: {fault}"), degraded: true },
        };
        self.context.record(self.kind, input, reply).await
    }
}

pub struct SentimentAgent {
    context: AgentContext,
}

impl SentimentAgent {
    pub fn new(context: AgentContext) -> Self {
        Self { context }
    }
}

#[async_trait]
impl Agent for SentimentAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Sentiment
    }

    async fn respond(&self, input: &AgentInput) -> Result<AgentReply, AgentError> {
        let output = sentiment::label_all(&input.as_lines());
        self.context.record(AgentKind::Sentiment, input, AgentReply { output, degraded: false }).await
    }
}

/// Answers each question independently, preserving question order.
pub struct ChatbotAgent {
    context: AgentContext,
}

impl ChatbotAgent {
    pub fn new(context: AgentContext) -> Self {
        Self { context }
    }

    async fn answer(&self, query: &str) -> AgentReply {
        match self.context.prompts.render_question(query) {
            Ok(prompt) => self.context.complete_or_describe(AgentKind::Chatbot, &prompt).await,
            Err(fault) => AgentReply { output: format!("Exception: {fault}"), degraded: true },
        }
    }
}

#[async_trait]
impl Agent for ChatbotAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Chatbot
    }

    async fn respond(&self, input: &AgentInput) -> Result<AgentReply, AgentError> {
        let mut blocks = Vec::new();
        let mut degraded = false;
        for query in input.as_lines() {
            let answer = self.answer(&query).await;
            degraded |= answer.degraded;
            blocks.push(format!("{query}\n→ {}", answer.output));
        }

        let reply = AgentReply { output: blocks.join("\n\n"), degraded };
        self.context.record(AgentKind::Chatbot, input, reply).await
    }
}

/// Agents keyed by their stable identifier.
#[derive(Default)]
pub struct AgentRegistry {
    agents: BTreeMap<AgentKind, Arc<dyn Agent>>,
}

impl AgentRegistry {
    /// All six agents wired to the same collaborators.
    pub fn standard(context: AgentContext) -> Self {
        let mut registry = Self::default();
        for kind in [AgentKind::Usecase, AgentKind::Schema, AgentKind::Mapping, AgentKind::Certifier]
        {
            registry.register(PromptedAgent::new(kind, context.clone()));
        }
        registry.register(SentimentAgent::new(context.clone()));
        registry.register(ChatbotAgent::new(context));
        registry
    }

    pub fn register<T>(&mut self, agent: T)
    where
        T: Agent + 'static,
    {
        self.agents.insert(agent.kind(), Arc::new(agent));
    }

    pub fn get(&self, kind: AgentKind) -> Option<Arc<dyn Agent>> {
        self.agents.get(&kind).cloned()
    }

    pub fn kinds(&self) -> impl Iterator<Item = AgentKind> + '_ {
        self.agents.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}


#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use veritas_core::{AgentInput, AgentKind};
    use veritas_db::repositories::MemoryLog;

    use super::test_support::{context_with, ScriptedLlm};
    use super::{Agent, AgentRegistry, ChatbotAgent, PromptedAgent, SentimentAgent};

    #[tokio::test]
    async fn prompted_agent_logs_task_and_completion() {
        let llm = Arc::new(ScriptedLlm::default());
        let (context, memory) = context_with(llm.clone());
        let agent = PromptedAgent::new(AgentKind::Mapping, context);

        let reply = agent.respond(&AgentInput::task("Onboard credit card customers")).await.expect("respond");

        assert!(!reply.degraded);
        assert_eq!(llm.call_count(), 1);
        let records = memory.fetch("MappingAgent").await.expect("fetch");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].input, "Onboard credit card customers");
        assert_eq!(records[0].output, reply.output);
    }

    #[tokio::test]
    async fn completion_failure_is_captured_and_still_logged() {
        let llm = Arc::new(ScriptedLlm::failing_on("banking expert"));
        let (context, memory) = context_with(llm);
        let agent = PromptedAgent::new(AgentKind::Usecase, context);

        let reply = agent.respond(&AgentInput::task("task")).await.expect("respond");

        assert!(reply.degraded);
        assert_eq!(reply.output, "Error: 503 - busy");
        let records = memory.fetch("UsecaseAgent").await.expect("fetch");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].output, "Error: 503 - busy");
    }

    #[tokio::test]
    async fn sentiment_agent_never_calls_completion_service() {
        let llm = Arc::new(ScriptedLlm::default());
        let (context, memory) = context_with(llm.clone());
        let agent = SentimentAgent::new(context);

        let reply = agent
            .respond(&AgentInput::lines([
                "Great support, very helpful",
                "The process was slow and confusing",
            ]))
            .await
            .expect("respond");

        assert_eq!(llm.call_count(), 0);
        assert_eq!(
            reply.output,
            "Great support, very helpful → Positive\nThe process was slow and confusing → Negative"
        );
        let records = memory.fetch("SentimentAgent").await.expect("fetch");
        assert_eq!(
            records[0].input,
            "Great support, very helpful\nThe process was slow and confusing"
        );
    }

    #[tokio::test]
    async fn chatbot_answers_each_query_in_order() {
        let llm = Arc::new(ScriptedLlm::default());
        let (context, memory) = context_with(llm.clone());
        let agent = ChatbotAgent::new(context);
        let queries = ["How do I reset my password?", "Where are my statements?", "Savings rate?"];

        let reply = agent.respond(&AgentInput::lines(queries)).await.expect("respond");

        assert_eq!(llm.call_count(), 3);
        let blocks: Vec<&str> = reply.output.split("\n\n").collect();
        assert_eq!(blocks.len(), 3);
        for (block, query) in blocks.iter().zip(queries) {
            assert!(block.starts_with(&format!("{query}\n→ ")), "block `{block}` out of order");
        }
        assert_eq!(memory.fetch_all().await.expect("fetch").len(), 1);
    }

    #[tokio::test]
    async fn chatbot_marks_reply_degraded_when_any_answer_fails() {
        let llm = Arc::new(ScriptedLlm::failing_on("second"));
        let (context, _memory) = context_with(llm);
        let agent = ChatbotAgent::new(context);

        let reply = agent.respond(&AgentInput::lines(["first", "second"])).await.expect("respond");

        assert!(reply.degraded);
        assert!(reply.output.contains("second\n→ Error: 503 - busy"));
        assert!(reply.output.starts_with("first\n→ answer to:"));
    }

    #[test]
    fn standard_registry_holds_all_six_agents() {
        let (context, _memory) = context_with(Arc::new(ScriptedLlm::default()));

        let registry = AgentRegistry::standard(context);

        assert_eq!(registry.len(), 6);
        assert_eq!(registry.kinds().collect::<Vec<_>>(), AgentKind::ALL.to_vec());
        assert_eq!(registry.get(AgentKind::Chatbot).map(|agent| agent.kind()), Some(AgentKind::Chatbot));
    }
}
