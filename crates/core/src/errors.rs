use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("unknown agent `{0}` (expected one of usecase|schema|mapping|certifier|sentiment|chatbot)")]
    UnknownAgent(String),
    #[error("empty input for {agent}: {reason}")]
    EmptyInput { agent: String, reason: String },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    /// Stable machine-readable class used in command output envelopes.
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Domain(DomainError::UnknownAgent(_)) => "unknown_agent",
            Self::Domain(DomainError::EmptyInput { .. }) => "empty_input",
            Self::Persistence(_) => "storage",
            Self::Integration(_) => "completion",
            Self::Configuration(_) => "config_validation",
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Domain(_) => 6,
            Self::Persistence(_) => 4,
            Self::Integration(_) => 7,
            Self::Configuration(_) => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{ApplicationError, DomainError};

    #[test]
    fn unknown_agent_maps_to_input_class() {
        let error = ApplicationError::from(DomainError::UnknownAgent("Forecast".to_owned()));

        assert_eq!(error.error_class(), "unknown_agent");
        assert_eq!(error.exit_code(), 6);
        assert!(error.to_string().contains("unknown agent `Forecast`"));
    }

    #[test]
    fn persistence_error_maps_to_storage_class() {
        let error = ApplicationError::Persistence("database is locked".to_owned());

        assert_eq!(error.error_class(), "storage");
        assert_eq!(error.exit_code(), 4);
    }

    #[test]
    fn configuration_error_maps_to_config_class() {
        let error = ApplicationError::Configuration("llm.base_url missing".to_owned());

        assert_eq!(error.error_class(), "config_validation");
        assert_eq!(error.exit_code(), 2);
    }
}
