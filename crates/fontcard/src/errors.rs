use thiserror::Error;

/// Message reported to the caller when a failure carries nothing more specific
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to process chat request";

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Request to model backend failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Model backend returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Could not decode model stream: {0}")]
    Decode(String),
}

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum AgentError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Tool call {0} ended before its arguments were complete")]
    IncompleteToolCall(String),

    #[error("Model referenced unknown tool call {0}")]
    UnknownToolCall(String),
}

impl AgentError {
    /// The message surfaced to the caller, preferring what the backend said
    pub fn user_message(&self) -> String {
        let message = match self {
            AgentError::Provider(ProviderError::Api { message, .. }) => message.clone(),
            other => other.to_string(),
        };
        if message.trim().is_empty() {
            GENERIC_FAILURE_MESSAGE.to_string()
        } else {
            message
        }
    }
}

pub type AgentResult<T> = Result<T, AgentError>;
