//! Assistant configuration from the environment
//!
//! The LLM config list itself is loaded by `agent_runtime::config`.

use std::path::PathBuf;

use crate::error::{AssistantError, Result};

/// Env var holding the LLM config list (inline JSON or a path)
pub const LLM_CONFIG_VAR: &str = "GLOTARAN_LLM_CONFIG";

/// Fallback LLM config file
pub const DEFAULT_LLM_CONFIG_PATH: &str = "config.json";

/// Deployment settings for the assistant
#[derive(Clone, Debug)]
pub struct AssistantConfig {
    /// Chroma server base URL
    pub chroma_url: String,

    /// Knowledge-base collection name
    pub collection: String,

    /// Directory with the `*.txt` knowledge files
    pub docs_path: PathBuf,

    /// Embedding model for queries and upserts
    pub embedding_model: String,

    pub openai_api_key: Option<String>,

    /// Round ceiling for one group conversation
    pub max_round: usize,

    /// Root that relative tool file paths resolve against
    pub workspace_dir: PathBuf,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            chroma_url: "http://localhost:8000".into(),
            collection: "pyglotaran-knowledge-base".into(),
            docs_path: PathBuf::from("./knowledge_base/files"),
            embedding_model: "text-embedding-3-small".into(),
            openai_api_key: None,
            max_round: 7,
            workspace_dir: PathBuf::from("."),
        }
    }
}

impl AssistantConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        let max_round = match var("MAX_ROUND") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(AssistantError::Config(format!(
                        "MAX_ROUND must be a positive integer, got {}",
                        raw
                    )));
                }
            },
            None => defaults.max_round,
        };

        Ok(Self {
            chroma_url: var("CHROMA_URL").unwrap_or(defaults.chroma_url),
            collection: var("KB_COLLECTION").unwrap_or(defaults.collection),
            docs_path: var("KB_DOCS_PATH").map_or(defaults.docs_path, PathBuf::from),
            embedding_model: var("EMBEDDING_MODEL").unwrap_or(defaults.embedding_model),
            openai_api_key: var("OPENAI_API_KEY"),
            max_round,
            workspace_dir: var("WORKSPACE_DIR").map_or(defaults.workspace_dir, PathBuf::from),
        })
    }
}
