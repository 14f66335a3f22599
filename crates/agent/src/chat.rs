//! Interactive question answering on top of the chatbot agent.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use veritas_core::{AgentInput, AgentKind};

use crate::orchestrator::{AgentResult, Orchestrator};

pub const HISTORY_CAPACITY: usize = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Speaker {
    You,
    V360,
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::You => f.write_str("You"),
            Self::V360 => f.write_str("V360"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatTurn {
    pub speaker: Speaker,
    pub message: String,
}

/// Most recent turns only; the oldest turn is dropped once the buffer is full.
#[derive(Clone, Debug)]
pub struct ChatHistory {
    turns: VecDeque<ChatTurn>,
    capacity: usize,
}

impl Default for ChatHistory {
    fn default() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }
}

impl ChatHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { turns: VecDeque::with_capacity(capacity), capacity }
    }

    pub fn push(&mut self, speaker: Speaker, message: impl Into<String>) {
        if self.turns.len() == self.capacity {
            self.turns.pop_front();
        }
        self.turns.push_back(ChatTurn { speaker, message: message.into() });
    }

    /// Newest first.
    pub fn recent(&self) -> impl Iterator<Item = &ChatTurn> {
        self.turns.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn render(&self) -> String {
        self.recent()
            .map(|turn| format!("{}: {}", turn.speaker, turn.message))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub struct ChatSession {
    orchestrator: Arc<Orchestrator>,
    history: ChatHistory,
}

impl ChatSession {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator, history: ChatHistory::default() }
    }

    /// Answers one question through the chatbot agent and records both turns.
    /// Blank questions are ignored.
    pub async fn ask(&mut self, question: &str) -> Option<AgentResult> {
        let question = question.trim();
        if question.is_empty() {
            return None;
        }

        let result = self
            .orchestrator
            .run_one(AgentKind::Chatbot, AgentInput::lines([question]))
            .await;
        let answer = answer_text(question, &result.output);

        self.history.push(Speaker::You, question);
        self.history.push(Speaker::V360, answer);
        Some(result)
    }

    pub fn history(&self) -> &ChatHistory {
        &self.history
    }
}

/// Strips the `"<query>\n→ "` block prefix the chatbot adds.
fn answer_text(question: &str, output: &str) -> String {
    output
        .strip_prefix(question)
        .and_then(|rest| rest.strip_prefix("\n→ "))
        .unwrap_or(output)
        .to_string()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use veritas_db::repositories::MemoryLog;

    use super::{ChatHistory, ChatSession, Speaker};
    use crate::agents::test_support::{context_with, ScriptedLlm};
    use crate::agents::AgentRegistry;
    use crate::orchestrator::{AgentStatus, Orchestrator};

    #[test]
    fn history_keeps_six_most_recent_turns() {
        let mut history = ChatHistory::default();
        for index in 1..=8 {
            history.push(Speaker::You, format!("turn {index}"));
        }

        assert_eq!(history.len(), 6);
        let messages: Vec<&str> = history.recent().map(|turn| turn.message.as_str()).collect();
        assert_eq!(messages, ["turn 8", "turn 7", "turn 6", "turn 5", "turn 4", "turn 3"]);
    }

    #[test]
    fn render_lists_newest_first() {
        let mut history = ChatHistory::with_capacity(4);
        history.push(Speaker::You, "hi");
        history.push(Speaker::V360, "hello");

        assert_eq!(history.render(), "V360: hello\nYou: hi");
    }

    #[tokio::test]
    async fn session_answers_and_records_both_turns() {
        let (context, memory) = context_with(Arc::new(ScriptedLlm::default()));
        let orchestrator = Arc::new(Orchestrator::new(AgentRegistry::standard(context), 2));
        let mut session = ChatSession::new(orchestrator);

        let result = session.ask("  How do I block my card?  ").await.expect("non-blank question");

        assert_eq!(result.status, AgentStatus::Completed);
        let turns: Vec<_> = session.history().recent().cloned().collect();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].speaker, Speaker::You);
        assert_eq!(turns[1].message, "How do I block my card?");
        assert_eq!(turns[0].speaker, Speaker::V360);
        assert!(turns[0].message.starts_with("answer to: "));
        assert_eq!(memory.fetch("ChatbotAgent").await.expect("fetch").len(), 1);
    }

    #[tokio::test]
    async fn blank_questions_are_skipped() {
        let (context, memory) = context_with(Arc::new(ScriptedLlm::default()));
        let orchestrator = Arc::new(Orchestrator::new(AgentRegistry::standard(context), 2));
        let mut session = ChatSession::new(orchestrator);

        assert!(session.ask("   ").await.is_none());
        assert!(session.history().is_empty());
        assert!(memory.fetch_all().await.expect("fetch").is_empty());
    }
}
