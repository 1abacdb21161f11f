//! Error Types for the Assistant

use thiserror::Error;

use agent_core::AgentError;

pub type Result<T> = std::result::Result<T, AssistantError>;

#[derive(Error, Debug)]
pub enum AssistantError {
    /// Missing or unreadable file or notebook
    #[error("{0}")]
    File(String),

    /// Notebook content that could not be interpreted
    #[error("Invalid notebook: {0}")]
    Notebook(String),

    /// Model/parameter/data generation failed
    #[error("{0}")]
    Generation(String),

    /// Notebook could not be written
    #[error("An error occurred while writing the notebook: {0}")]
    Write(String),

    /// Vector store or embeddings service unreachable
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AssistantError {
    /// Read failure for `path`
    pub fn file(path: &std::path::Path, err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::File(format!("File not found: {}", path.display())),
            _ => Self::File(format!("Cannot read {}: {}", path.display(), err)),
        }
    }
}

impl From<reqwest::Error> for AssistantError {
    fn from(err: reqwest::Error) -> Self {
        Self::Connectivity(err.to_string())
    }
}

impl From<AssistantError> for AgentError {
    fn from(err: AssistantError) -> Self {
        match err {
            AssistantError::Config(msg) => AgentError::Config(msg),
            other => AgentError::ToolExecution(other.to_string()),
        }
    }
}
