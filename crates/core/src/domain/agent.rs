use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Stable identifier for each registered agent.
///
/// Declaration order is the presentation order used by reports, archives and
/// run results.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AgentKind {
    #[serde(rename = "UsecaseAgent")]
    Usecase,
    #[serde(rename = "SchemaAgent")]
    Schema,
    #[serde(rename = "MappingAgent")]
    Mapping,
    #[serde(rename = "CertifierAgent")]
    Certifier,
    #[serde(rename = "SentimentAgent")]
    Sentiment,
    #[serde(rename = "ChatbotAgent")]
    Chatbot,
}

/// What an agent expects to receive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputShape {
    Task,
    Lines,
}

impl AgentKind {
    pub const ALL: [AgentKind; 6] = [
        AgentKind::Usecase,
        AgentKind::Schema,
        AgentKind::Mapping,
        AgentKind::Certifier,
        AgentKind::Sentiment,
        AgentKind::Chatbot,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Usecase => "UsecaseAgent",
            Self::Schema => "SchemaAgent",
            Self::Mapping => "MappingAgent",
            Self::Certifier => "CertifierAgent",
            Self::Sentiment => "SentimentAgent",
            Self::Chatbot => "ChatbotAgent",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Usecase => "Understands business goals",
            Self::Schema => "Designs entity schema",
            Self::Mapping => "Links source data to targets",
            Self::Certifier => "Verifies quality & governance",
            Self::Sentiment => "Analyzes user feedback",
            Self::Chatbot => "Responds to user queries",
        }
    }

    pub fn input_shape(&self) -> InputShape {
        match self {
            Self::Sentiment | Self::Chatbot => InputShape::Lines,
            _ => InputShape::Task,
        }
    }

    pub fn calls_completion_service(&self) -> bool {
        !matches!(self, Self::Sentiment)
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentKind {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        let short = normalized.strip_suffix("agent").unwrap_or(&normalized);
        match short {
            "usecase" => Ok(Self::Usecase),
            "schema" => Ok(Self::Schema),
            "mapping" => Ok(Self::Mapping),
            "certifier" => Ok(Self::Certifier),
            "sentiment" => Ok(Self::Sentiment),
            "chatbot" => Ok(Self::Chatbot),
            _ => Err(DomainError::UnknownAgent(value.trim().to_string())),
        }
    }
}

/// Input handed to a single agent invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AgentInput {
    Task(String),
    Lines(Vec<String>),
}

impl AgentInput {
    pub fn task(text: impl Into<String>) -> Self {
        Self::Task(text.into())
    }

    pub fn lines<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Lines(items.into_iter().map(Into::into).collect())
    }

    /// Text view used by the authoring agents. Line lists are joined with `\n`.
    pub fn as_task(&self) -> String {
        match self {
            Self::Task(text) => text.clone(),
            Self::Lines(lines) => lines.join("\n"),
        }
    }

    /// Item view used by the list agents. A task is split into its non-empty
    /// trimmed lines.
    pub fn as_lines(&self) -> Vec<String> {
        match self {
            Self::Task(text) => split_lines(text),
            Self::Lines(lines) => lines.clone(),
        }
    }

    /// Literal rendering recorded as the memory log input.
    pub fn render(&self) -> String {
        self.as_task()
    }
}

pub fn split_lines(text: &str) -> Vec<String> {
    text.lines().map(str::trim).filter(|line| !line.is_empty()).map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::{AgentInput, AgentKind, InputShape};
    use crate::errors::DomainError;

    #[test]
    fn parses_canonical_and_short_names() {
        assert_eq!("SchemaAgent".parse::<AgentKind>(), Ok(AgentKind::Schema));
        assert_eq!("chatbot".parse::<AgentKind>(), Ok(AgentKind::Chatbot));
        assert_eq!(" Usecase ".parse::<AgentKind>(), Ok(AgentKind::Usecase));
        assert_eq!(
            "ForecastAgent".parse::<AgentKind>(),
            Err(DomainError::UnknownAgent("ForecastAgent".to_string()))
        );
    }

    #[test]
    fn canonical_names_round_trip_through_display() {
        for kind in AgentKind::ALL {
            assert_eq!(kind.to_string().parse::<AgentKind>(), Ok(kind));
        }
    }

    #[test]
    fn only_feedback_and_chat_agents_take_lines() {
        let line_agents: Vec<_> = AgentKind::ALL
            .into_iter()
            .filter(|kind| kind.input_shape() == InputShape::Lines)
            .collect();
        assert_eq!(line_agents, vec![AgentKind::Sentiment, AgentKind::Chatbot]);
        assert!(!AgentKind::Sentiment.calls_completion_service());
    }

    #[test]
    fn task_input_splits_into_trimmed_non_empty_lines() {
        let input = AgentInput::task("  first \n\n second\n   ");
        assert_eq!(input.as_lines(), vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn line_input_renders_newline_joined() {
        let input = AgentInput::lines(["a, b", "c"]);
        assert_eq!(input.render(), "a, b\nc");
        assert_eq!(input.as_task(), "a, b\nc");
    }

    #[test]
    fn serializes_under_canonical_names() {
        for kind in AgentKind::ALL {
            let json = serde_json::to_string(&kind).expect("serialize");
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
            assert_eq!(serde_json::from_str::<AgentKind>(&json).expect("deserialize"), kind);
        }
    }
}
