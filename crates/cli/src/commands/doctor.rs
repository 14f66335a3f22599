use std::time::Duration;

use serde::Serialize;

use veritas_core::config::{AppConfig, LoadOptions, MemoryBackend};
use veritas_core::AgentKind;
use veritas_db::connect_with_settings;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

pub fn run(options: LoadOptions, json_output: bool) -> String {
    let report = build_report(options);

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report(options: LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => {
                    checks.push(runtime.block_on(check_storage(&config)));
                    checks.push(runtime.block_on(check_completion_endpoint(&config)));
                }
                Err(error) => {
                    let details = format!("failed to initialize async runtime: {error}");
                    checks.push(DoctorCheck {
                        name: "storage_connectivity",
                        status: CheckStatus::Fail,
                        details: details.clone(),
                    });
                    checks.push(DoctorCheck {
                        name: "completion_endpoint",
                        status: CheckStatus::Fail,
                        details,
                    });
                }
            }
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["storage_connectivity", "completion_endpoint"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    checks.push(describe_agents());

    let all_pass = checks.iter().all(|check| check.status != CheckStatus::Fail);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

async fn check_storage(config: &AppConfig) -> DoctorCheck {
    if config.memory.backend == MemoryBackend::InMemory {
        return DoctorCheck {
            name: "storage_connectivity",
            status: CheckStatus::Skipped,
            details: "in-memory backend selected; no database is used".to_string(),
        };
    }

    let result = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await;

    match result {
        Ok(pool) => {
            pool.close().await;
            DoctorCheck {
                name: "storage_connectivity",
                status: CheckStatus::Pass,
                details: format!("connected using `{}`", config.database.url),
            }
        }
        Err(error) => DoctorCheck {
            name: "storage_connectivity",
            status: CheckStatus::Fail,
            details: format!("failed to connect to database: {error}"),
        },
    }
}

/// Any HTTP answer from the base URL counts as reachable.
async fn check_completion_endpoint(config: &AppConfig) -> DoctorCheck {
    let client = match reqwest::Client::builder().timeout(PROBE_TIMEOUT).build() {
        Ok(client) => client,
        Err(error) => {
            return DoctorCheck {
                name: "completion_endpoint",
                status: CheckStatus::Fail,
                details: format!("could not build http client: {error}"),
            }
        }
    };

    match client.get(&config.llm.base_url).send().await {
        Ok(response) => DoctorCheck {
            name: "completion_endpoint",
            status: CheckStatus::Pass,
            details: format!(
                "`{}` answered with {} (model `{}`)",
                config.llm.base_url,
                response.status(),
                config.llm.model
            ),
        },
        Err(error) => DoctorCheck {
            name: "completion_endpoint",
            status: CheckStatus::Fail,
            details: format!("`{}` is unreachable: {error}", config.llm.base_url),
        },
    }
}

/// Lists the agents a run dispatches and whether each one needs the
/// completion endpoint.
fn describe_agents() -> DoctorCheck {
    let agents: Vec<String> = AgentKind::ALL
        .iter()
        .map(|kind| {
            let backend = if kind.calls_completion_service() { "completion" } else { "local" };
            format!("{kind} ({}, {backend})", kind.description())
        })
        .collect();

    DoctorCheck { name: "agent_registry", status: CheckStatus::Pass, details: agents.join("; ") }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
