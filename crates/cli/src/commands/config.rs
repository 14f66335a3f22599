use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use veritas_core::config::{resolve_config_path, AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

pub fn run(options: LoadOptions) -> String {
    let config_file_path = resolve_config_path(options.config_path.as_deref());
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let api_key = config
        .llm
        .api_key
        .as_ref()
        .map(|key| redact_token(key.expose_secret()))
        .unwrap_or_else(|| "<unset>".to_string());

    let fields: [(&str, String, &[&str]); 12] = [
        (
            "memory.backend",
            format!("{:?}", config.memory.backend),
            &["VERITAS_MEMORY_BACKEND"],
        ),
        ("database.url", config.database.url.clone(), &["VERITAS_DATABASE_URL"]),
        (
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["VERITAS_DATABASE_MAX_CONNECTIONS"],
        ),
        (
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["VERITAS_DATABASE_TIMEOUT_SECS"],
        ),
        ("llm.base_url", config.llm.base_url.clone(), &["VERITAS_LLM_BASE_URL"]),
        ("llm.model", config.llm.model.clone(), &["VERITAS_LLM_MODEL"]),
        ("llm.api_key", api_key, &["VERITAS_LLM_API_KEY"]),
        ("llm.timeout_secs", config.llm.timeout_secs.to_string(), &["VERITAS_LLM_TIMEOUT_SECS"]),
        ("llm.max_retries", config.llm.max_retries.to_string(), &["VERITAS_LLM_MAX_RETRIES"]),
        (
            "orchestrator.max_concurrency",
            config.orchestrator.max_concurrency.to_string(),
            &["VERITAS_ORCHESTRATOR_MAX_CONCURRENCY"],
        ),
        (
            "logging.level",
            config.logging.level.clone(),
            &["VERITAS_LOGGING_LEVEL", "VERITAS_LOG_LEVEL"],
        ),
        (
            "logging.format",
            format!("{:?}", config.logging.format),
            &["VERITAS_LOGGING_FORMAT", "VERITAS_LOG_FORMAT"],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_keys) in fields {
        let source =
            field_source(key, env_keys, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(key, &value, source));
    }

    lines.join("\n")
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|env_key| env::var_os(env_key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps a `sk-` style prefix visible and hides the rest.
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}
