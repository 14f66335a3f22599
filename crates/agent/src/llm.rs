use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use veritas_core::config::LlmConfig;

/// Completion failure. The `Display` form is the user-visible text an agent
/// substitutes for its output.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CompletionError {
    #[error("Error: {status} - {body}")]
    Status { status: u16, body: String },
    #[error("Exception: {0}")]
    Transport(String),
    #[error("Exception: completion timed out after {0}s")]
    Timeout(u64),
    #[error("Exception: invalid completion payload: {0}")]
    Decode(String),
}

impl CompletionError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Client for an Ollama-style `/api/generate` endpoint.
pub struct OllamaClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<SecretString>,
    timeout: Duration,
    max_retries: u32,
}

impl OllamaClient {
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self, CompletionError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| CompletionError::Transport(error.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/generate", base_url.trim_end_matches('/')),
            model: model.into(),
            api_key: None,
            timeout,
            max_retries,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, CompletionError> {
        let mut client = Self::new(
            &config.base_url,
            config.model.clone(),
            Duration::from_secs(config.timeout_secs),
            config.max_retries,
        )?;
        client.api_key = config.api_key.clone();
        Ok(client)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send_once(&self, prompt: &str) -> Result<String, CompletionError> {
        let payload = GenerateRequest { model: &self.model, prompt, stream: false };
        let mut request = self.client.post(&self.endpoint).json(&payload);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response = request.send().await.map_err(|error| self.map_transport(error))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status { status: status.as_u16(), body });
        }

        let body = response.text().await.map_err(|error| self.map_transport(error))?;
        let parsed: GenerateResponse = serde_json::from_str(&body)
            .map_err(|error| CompletionError::Decode(error.to_string()))?;
        Ok(parsed.response)
    }

    fn map_transport(&self, error: reqwest::Error) -> CompletionError {
        if error.is_timeout() {
            CompletionError::Timeout(self.timeout.as_secs())
        } else {
            CompletionError::Transport(error.to_string())
        }
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let outcome = match tokio::time::timeout(self.timeout, self.send_once(prompt)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(CompletionError::Timeout(self.timeout.as_secs())),
            };

            match outcome {
                Ok(text) => {
                    debug!(
                        event_name = "llm.completion.succeeded",
                        model = %self.model,
                        attempt,
                        response_len = text.len(),
                        "completion succeeded"
                    );
                    return Ok(text);
                }
                Err(error) if error.is_retryable() && attempt <= self.max_retries => {
                    warn!(
                        event_name = "llm.completion.retry",
                        model = %self.model,
                        attempt,
                        error = %error,
                        "completion transport failure, retrying"
                    );
                }
                Err(error) => return Err(error),
            }
        }
    }
}
