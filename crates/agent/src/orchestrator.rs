use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};
use tracing::{error, info, Instrument};
use uuid::Uuid;

use veritas_core::domain::agent::split_lines;
use veritas_core::export;
use veritas_core::{AgentInput, AgentKind, DomainError, InputShape};

use crate::agents::AgentRegistry;

const ABORTED: &str = "Exception: agent task aborted";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Completed,
    Degraded,
    Failed,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Degraded => "degraded",
            Self::Failed => "failed",
        }
    }
}

/// One agent's slot in a run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AgentResult {
    pub agent: AgentKind,
    pub status: AgentStatus,
    pub output: String,
}

impl AgentResult {
    fn failed(agent: AgentKind, output: impl Into<String>) -> Self {
        Self { agent, status: AgentStatus::Failed, output: output.into() }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub results: Vec<AgentResult>,
}

impl RunReport {
    pub fn get(&self, agent: AgentKind) -> Option<&AgentResult> {
        self.results.iter().find(|result| result.agent == agent)
    }

    pub fn output(&self, agent: AgentKind) -> Option<&str> {
        self.get(agent).map(|result| result.output.as_str())
    }

    pub fn all_completed(&self) -> bool {
        self.results.iter().all(|result| result.status == AgentStatus::Completed)
    }

    /// Aggregate `### <agent> Output` report over every slot.
    pub fn render_report(&self) -> String {
        export::render_report(
            self.results.iter().map(|result| (result.agent.as_str(), result.output.as_str())),
        )
    }
}

/// Fans work out to registered agents and joins every dispatch before
/// returning. A failing agent only affects its own slot.
pub struct Orchestrator {
    registry: Arc<AgentRegistry>,
    limiter: Arc<Semaphore>,
}

impl Orchestrator {
    pub fn new(registry: AgentRegistry, max_concurrency: usize) -> Self {
        Self {
            registry: Arc::new(registry),
            limiter: Arc::new(Semaphore::new(max_concurrency.max(1))),
        }
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// Dispatches every registered agent once: the task to the authoring
    /// agents, `feedback` to the sentiment agent and `queries` to the chatbot.
    pub async fn run_all(&self, task: &str, feedback: &[String], queries: &[String]) -> RunReport {
        let dispatches = self
            .registry
            .kinds()
            .map(|kind| {
                let input = match kind {
                    AgentKind::Sentiment => AgentInput::Lines(feedback.to_vec()),
                    AgentKind::Chatbot => AgentInput::Lines(queries.to_vec()),
                    _ => AgentInput::Task(task.to_string()),
                };
                (kind, input)
            })
            .collect();

        self.run_selected(dispatches).await
    }

    pub async fn run_selected(&self, dispatches: BTreeMap<AgentKind, AgentInput>) -> RunReport {
        let run_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!("orchestrator.run", correlation_id = %run_id);
        let results = self.dispatch(dispatches).instrument(span).await;
        RunReport { run_id, results }
    }

    /// Single dispatch under its own run span.
    pub async fn run_one(&self, agent: AgentKind, input: AgentInput) -> AgentResult {
        let report = self.run_selected(BTreeMap::from([(agent, input)])).await;
        report
            .results
            .into_iter()
            .next()
            .unwrap_or_else(|| AgentResult::failed(agent, ABORTED))
    }

    /// `run_one` addressed by agent name. Text handed to a list agent is split
    /// into lines.
    pub async fn run_named(&self, name: &str, input: &str) -> Result<AgentResult, DomainError> {
        let agent: AgentKind = name.parse()?;
        let input = match agent.input_shape() {
            InputShape::Task => AgentInput::task(input),
            InputShape::Lines => AgentInput::Lines(split_lines(input)),
        };
        Ok(self.run_one(agent, input).await)
    }

    async fn dispatch(&self, dispatches: BTreeMap<AgentKind, AgentInput>) -> Vec<AgentResult> {
        info!(
            event_name = "orchestrator.dispatch.start",
            agents = dispatches.len(),
            "dispatching agents"
        );

        let mut results: BTreeMap<AgentKind, AgentResult> = BTreeMap::new();
        let mut pending: HashMap<task::Id, AgentKind> = HashMap::new();
        let mut tasks = JoinSet::new();

        for (kind, input) in dispatches {
            let Some(agent) = self.registry.get(kind) else {
                results.insert(
                    kind,
                    AgentResult::failed(kind, format!("Exception: agent {kind} is not registered")),
                );
                continue;
            };

            let limiter = Arc::clone(&self.limiter);
            let handle = tasks.spawn(
                async move {
                    let _permit = limiter.acquire_owned().await.ok();
                    agent.respond(&input).await
                }
                .in_current_span(),
            );
            pending.insert(handle.id(), kind);
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            let (id, outcome) = match joined {
                Ok((id, outcome)) => (id, Ok(outcome)),
                Err(join_error) => (join_error.id(), Err(join_error)),
            };
            let Some(kind) = pending.remove(&id) else {
                continue;
            };

            match outcome {
                Ok(Ok(reply)) => {
                    let status =
                        if reply.degraded { AgentStatus::Degraded } else { AgentStatus::Completed };
                    info!(
                        event_name = "orchestrator.agent.finished",
                        agent = %kind,
                        status = ?status,
                        "agent finished"
                    );
                    results.insert(kind, AgentResult { agent: kind, status, output: reply.output });
                }
                Ok(Err(fault)) => {
                    results.insert(kind, AgentResult::failed(kind, format!("Exception: {fault}")));
                }
                Err(join_error) => {
                    error!(
                        event_name = "orchestrator.agent.aborted",
                        agent = %kind,
                        error = %join_error,
                        "agent task did not complete"
                    );
                    results.insert(kind, AgentResult::failed(kind, ABORTED));
                }
            }
        }

        for kind in pending.into_values() {
            results.insert(kind, AgentResult::failed(kind, ABORTED));
        }

        let results: Vec<AgentResult> = results.into_values().collect();
        info!(
            event_name = "orchestrator.dispatch.finished",
            failed = results.iter().filter(|result| result.status == AgentStatus::Failed).count(),
            degraded = results.iter().filter(|result| result.status == AgentStatus::Degraded).count(),
            "dispatch finished"
        );
        results
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;

    use veritas_core::{AgentInput, AgentKind, DomainError, LogRecord};
    use veritas_db::repositories::{InMemoryMemoryLog, MemoryLog, RepositoryError};

    use super::{AgentStatus, Orchestrator};
    use crate::agents::test_support::{context_with, ScriptedLlm};
    use crate::agents::{Agent, AgentContext, AgentError, AgentRegistry, AgentReply};
    use crate::llm::{CompletionError, LlmClient};
    use crate::prompts::PromptLibrary;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[tokio::test]
    async fn run_all_fills_one_slot_per_agent_in_order() {
        let (context, memory) = context_with(Arc::new(ScriptedLlm::default()));
        let orchestrator = Orchestrator::new(AgentRegistry::standard(context), 6);

        let report = orchestrator
            .run_all(
                "Improve retention for salary-account holders",
                &lines(&["Great support, very helpful"]),
                &lines(&["How do I reset my password?"]),
            )
            .await;

        let agents: Vec<AgentKind> = report.results.iter().map(|result| result.agent).collect();
        assert_eq!(agents, AgentKind::ALL.to_vec());
        assert!(report.all_completed());
        assert_eq!(
            report.output(AgentKind::Sentiment),
            Some("Great support, very helpful → Positive")
        );
        assert_eq!(memory.fetch_all().await.expect("fetch all").len(), 6);
        let schema_log = memory.fetch("SchemaAgent").await.expect("fetch schema");
        assert_eq!(schema_log[0].input, "Improve retention for salary-account holders");
    }

    #[tokio::test]
    async fn completion_failure_is_isolated_to_its_slot() {
        let (context, _memory) = context_with(Arc::new(ScriptedLlm::failing_on("source systems")));
        let orchestrator = Orchestrator::new(AgentRegistry::standard(context), 6);

        let report = orchestrator.run_all("task", &[], &lines(&["q1"])).await;

        assert_eq!(report.results.len(), 6);
        let mapping = report.get(AgentKind::Mapping).expect("mapping slot");
        assert_eq!(mapping.status, AgentStatus::Degraded);
        assert_eq!(mapping.output, "Error: 503 - busy");
        for result in report.results.iter().filter(|result| result.agent != AgentKind::Mapping) {
            assert_eq!(result.status, AgentStatus::Completed, "{} should complete", result.agent);
        }
    }

    /// Rejects writes for one agent name and delegates everything else.
    struct RejectingLog {
        rejected_agent: &'static str,
        inner: InMemoryMemoryLog,
    }

    #[async_trait]
    impl MemoryLog for RejectingLog {
        async fn store(
            &self,
            agent: &str,
            input: &str,
            output: &str,
        ) -> Result<LogRecord, RepositoryError> {
            if agent == self.rejected_agent {
                return Err(RepositoryError::Decode("disk full".to_string()));
            }
            self.inner.store(agent, input, output).await
        }

        async fn fetch(&self, agent: &str) -> Result<Vec<LogRecord>, RepositoryError> {
            self.inner.fetch(agent).await
        }

        async fn fetch_all(&self) -> Result<Vec<LogRecord>, RepositoryError> {
            self.inner.fetch_all().await
        }
    }

    #[tokio::test]
    async fn storage_fault_fails_only_that_slot() {
        let memory = Arc::new(RejectingLog {
            rejected_agent: "SchemaAgent",
            inner: InMemoryMemoryLog::new(),
        });
        let context = AgentContext::new(
            Arc::new(ScriptedLlm::default()),
            memory.clone(),
            Arc::new(PromptLibrary::new().expect("templates compile")),
        );
        let orchestrator = Orchestrator::new(AgentRegistry::standard(context), 3);

        let report = orchestrator.run_all("task", &lines(&["ok"]), &lines(&["q"])).await;

        let schema = report.get(AgentKind::Schema).expect("schema slot");
        assert_eq!(schema.status, AgentStatus::Failed);
        assert!(schema.output.contains("memory log write failed for SchemaAgent"));
        assert_eq!(
            report.results.iter().filter(|result| result.status == AgentStatus::Completed).count(),
            5
        );
        assert_eq!(memory.fetch_all().await.expect("fetch all").len(), 5);
    }

    struct PanickingAgent;

    #[async_trait]
    impl Agent for PanickingAgent {
        fn kind(&self) -> AgentKind {
            AgentKind::Certifier
        }

        async fn respond(&self, _input: &AgentInput) -> Result<AgentReply, AgentError> {
            panic!("certifier exploded");
        }
    }

    #[tokio::test]
    async fn panicking_agent_does_not_abort_the_run() {
        let (context, _memory) = context_with(Arc::new(ScriptedLlm::default()));
        let mut registry = AgentRegistry::standard(context);
        registry.register(PanickingAgent);
        let orchestrator = Orchestrator::new(registry, 6);

        let report = orchestrator.run_all("task", &[], &[]).await;

        assert_eq!(report.results.len(), 6);
        let certifier = report.get(AgentKind::Certifier).expect("certifier slot");
        assert_eq!(certifier.status, AgentStatus::Failed);
        assert_eq!(certifier.output, "Exception: agent task aborted");
        assert_eq!(report.get(AgentKind::Usecase).map(|result| result.status), Some(AgentStatus::Completed));
    }

    #[tokio::test]
    async fn run_one_maps_a_panicked_task_back_to_its_agent() {
        let (context, memory) = context_with(Arc::new(ScriptedLlm::default()));
        let mut registry = AgentRegistry::standard(context);
        registry.register(PanickingAgent);
        let orchestrator = Orchestrator::new(registry, 2);

        let result = orchestrator.run_one(AgentKind::Certifier, AgentInput::task("task")).await;

        assert_eq!(result.agent, AgentKind::Certifier);
        assert_eq!(result.status, AgentStatus::Failed);
        assert_eq!(result.output, "Exception: agent task aborted");
        assert!(memory.fetch_all().await.expect("fetch all").is_empty());
    }

    /// Sleeps on every call and tracks the peak number of calls in flight.
    #[derive(Default)]
    struct GaugedLlm {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl LlmClient for GaugedLlm {
        async fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok("done".to_string())
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrency_is_bounded_by_the_limiter() {
        let llm = Arc::new(GaugedLlm::default());
        let (context, _memory) = context_with(llm.clone());
        let orchestrator = Orchestrator::new(AgentRegistry::standard(context), 2);

        let report = orchestrator.run_all("task", &[], &lines(&["q"])).await;

        assert!(report.all_completed());
        assert!(llm.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn agents_run_concurrently_when_permitted() {
        let llm = Arc::new(GaugedLlm::default());
        let (context, _memory) = context_with(llm.clone());
        let orchestrator = Orchestrator::new(AgentRegistry::standard(context), 6);

        orchestrator.run_all("task", &[], &lines(&["q"])).await;

        assert!(llm.peak.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test]
    async fn run_named_splits_text_for_list_agents() {
        let (context, memory) = context_with(Arc::new(ScriptedLlm::default()));
        let orchestrator = Orchestrator::new(AgentRegistry::standard(context), 6);

        let result = orchestrator
            .run_named("sentiment", "Card never received\n\n  Very helpful staff ")
            .await
            .expect("known agent");

        assert_eq!(result.agent, AgentKind::Sentiment);
        assert_eq!(
            result.output,
            "Card never received → Negative\nVery helpful staff → Positive"
        );
        assert_eq!(memory.fetch("SentimentAgent").await.expect("fetch").len(), 1);
    }

    #[tokio::test]
    async fn run_named_rejects_unknown_agents() {
        let (context, _memory) = context_with(Arc::new(ScriptedLlm::default()));
        let orchestrator = Orchestrator::new(AgentRegistry::standard(context), 6);

        let result = orchestrator.run_named("forecast", "task").await;

        assert_eq!(result, Err(DomainError::UnknownAgent("forecast".to_string())));
    }

    #[tokio::test]
    async fn unregistered_agent_gets_failed_slot() {
        let orchestrator = Orchestrator::new(AgentRegistry::default(), 1);

        let report = orchestrator
            .run_selected(BTreeMap::from([(AgentKind::Schema, AgentInput::task("t"))]))
            .await;

        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].status, AgentStatus::Failed);
        assert!(report.results[0].output.contains("not registered"));
    }

    #[tokio::test]
    async fn report_text_concatenates_slots() {
        let (context, _memory) = context_with(Arc::new(ScriptedLlm::default()));
        let orchestrator = Orchestrator::new(AgentRegistry::standard(context), 6);

        let report = orchestrator.run_all("task", &lines(&["bad"]), &[]).await;
        let text = report.render_report();

        assert!(text.starts_with("### UsecaseAgent Output\n"));
        assert!(text.contains("\n\n### SentimentAgent Output\nbad → Negative"));
        assert_eq!(text.matches("### ").count(), 6);
    }
}
