//! Prompt templates for the completion-backed agents.

use tera::{Context, Tera};
use thiserror::Error;

use veritas_core::AgentKind;

const USECASE_TEMPLATE: &str = "You are a banking expert. Please analyze and expand on the following use case:\n\n{{ task }}\n\nExplain how a Customer 360 system would help solve this use case, including key benefits, required capabilities, and possible challenges.";

const SCHEMA_TEMPLATE: &str = "Design a data product schema for the following business use case:\n\n{{ task }}\n\nList the entities (e.g., Customer, Account), attributes (e.g., customer_id, transaction_date), and relationships. Format as a clear schema: start each entity on its own line as `Entity: <Name>` followed by one `- <attribute>` line per attribute.";

const MAPPING_TEMPLATE: &str = "For the business use case:\n\n{{ task }}\n\nSuggest the source systems (like CRM, Core Banking) and generate a source-to-target mapping. Include field mappings and transformation logic where needed.";

const CERTIFIER_TEMPLATE: &str = "Based on this Customer 360 data product:\n\n{{ task }}\n\nDefine the ingress (data input) and egress (data output) flows, data quality rules, and how search/discovery can be enabled. Explain how to certify this data product against typical data governance standards.";

const CHATBOT_TEMPLATE: &str =
    "You are a customer support assistant. Answer this banking question: {{ query }}";

const CHATBOT_TEMPLATE_NAME: &str = "chatbot.txt";

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("no prompt template is registered for {0}")]
    MissingTemplate(AgentKind),
    #[error("prompt template error: {0}")]
    Template(#[from] tera::Error),
}

/// Compiled prompt templates, built once at startup and shared by all agents.
pub struct PromptLibrary {
    tera: Tera,
}

impl PromptLibrary {
    pub fn new() -> Result<Self, PromptError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            ("usecase.txt", USECASE_TEMPLATE),
            ("schema.txt", SCHEMA_TEMPLATE),
            ("mapping.txt", MAPPING_TEMPLATE),
            ("certifier.txt", CERTIFIER_TEMPLATE),
            (CHATBOT_TEMPLATE_NAME, CHATBOT_TEMPLATE),
        ])?;
        Ok(Self { tera })
    }

    fn task_template(kind: AgentKind) -> Option<&'static str> {
        match kind {
            AgentKind::Usecase => Some("usecase.txt"),
            AgentKind::Schema => Some("schema.txt"),
            AgentKind::Mapping => Some("mapping.txt"),
            AgentKind::Certifier => Some("certifier.txt"),
            AgentKind::Sentiment | AgentKind::Chatbot => None,
        }
    }

    /// Prompt for one of the four task-authoring agents, embedding `task` verbatim.
    pub fn render_task(&self, kind: AgentKind, task: &str) -> Result<String, PromptError> {
        let name = Self::task_template(kind).ok_or(PromptError::MissingTemplate(kind))?;
        let mut context = Context::new();
        context.insert("task", task);
        Ok(self.tera.render(name, &context)?)
    }

    pub fn render_question(&self, query: &str) -> Result<String, PromptError> {
        let mut context = Context::new();
        context.insert("query", query);
        Ok(self.tera.render(CHATBOT_TEMPLATE_NAME, &context)?)
    }
}
