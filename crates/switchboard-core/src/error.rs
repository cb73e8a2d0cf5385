use std::fmt;

use thiserror::Error;

/// Unified error type for the Switchboard gateway.
#[derive(Error, Debug)]
pub enum SwitchboardError {
    // ── Routing errors ─────────────────────────────────────────
    /// A single attempt against one provider failed. The router recovers
    /// from this by moving on to the next provider.
    #[error("provider {provider} failed: {cause}")]
    Provider { provider: String, cause: String },

    #[error("no healthy provider available for model '{model}'")]
    NoProviderAvailable { model: String },

    #[error("all retries failed for model '{model}': [{}]", summarize(.failures))]
    AllProvidersFailed {
        model: String,
        failures: Vec<AttemptFailure>,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    // ── Config errors ──────────────────────────────────────────
    #[error("config error: {0}")]
    Config(String),

    #[error("config validation failed: {field}: {reason}")]
    ConfigValidation { field: String, reason: String },

    // ── Generic wrappers ───────────────────────────────────────
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl SwitchboardError {
    /// Build a [`SwitchboardError::Provider`] from any displayable cause.
    pub fn provider(provider: impl Into<String>, cause: impl fmt::Display) -> Self {
        Self::Provider {
            provider: provider.into(),
            cause: cause.to_string(),
        }
    }
}

/// Summary of one failed attempt, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptFailure {
    pub provider: String,
    pub error: String,
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.provider, self.error)
    }
}

fn summarize(failures: &[AttemptFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, SwitchboardError>;
