//! Result and error types for the core library

use thiserror::Error;

/// Core library error type
#[derive(Error, Debug)]
pub enum Error {
    /// A single provider payload is missing a required field or has the wrong type.
    /// Skipped and reported; never aborts a batch.
    #[error("Malformed payload{}: {reason}", .id.as_deref().map(|i| format!(" ({i})")).unwrap_or_default())]
    MalformedPayload { id: Option<String>, reason: String },

    /// An `amount_condition` string could not be parsed into operator + threshold
    #[error("Invalid rule condition '{condition}': {reason}")]
    InvalidRuleCondition { condition: String, reason: String },

    /// Two payloads in one fetch share the same transaction id
    #[error("Duplicate transaction id '{0}' in fetch; keeping the later payload")]
    IdentityCollision(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    /// Create a malformed payload error
    pub fn malformed(id: Option<&str>, reason: impl Into<String>) -> Self {
        Self::MalformedPayload {
            id: id.map(str::to_string),
            reason: reason.into(),
        }
    }

    /// Create an invalid rule condition error
    pub fn invalid_condition(condition: &str, reason: impl Into<String>) -> Self {
        Self::InvalidRuleCondition {
            condition: condition.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a provider error
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;
