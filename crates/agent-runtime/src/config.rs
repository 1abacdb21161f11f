//! LLM configuration list
//!
//! An ordered list of model endpoints. The variable named by the caller
//! holds either the JSON list itself or a path to a file containing it,
//! with a fallback file when the variable is unset:
//!
//! ```json
//! [
//!   {"model": "gpt-4o-mini", "api_key": "sk-..."},
//!   {"model": "llama3.2", "base_url": "http://localhost:11434", "api_type": "ollama"}
//! ]
//! ```
//!
//! Entries become providers in a failover [`ProviderChain`], first entry
//! first.

use std::path::Path;
use std::sync::Arc;

use agent_core::{
    error::{AgentError, Result},
    provider::{LlmProvider, ProviderChain},
};
use serde::{Deserialize, Serialize};

#[cfg(feature = "ollama")]
use crate::ollama::{OllamaConfig, OllamaProvider};
use crate::openai::{OpenAiConfig, OpenAiProvider};

/// One model endpoint
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmConfigEntry {
    pub model: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub base_url: Option<String>,

    /// `ollama` or anything OpenAI-compatible (default)
    #[serde(default)]
    pub api_type: Option<String>,
}

impl LlmConfigEntry {
    pub fn is_ollama(&self) -> bool {
        self.api_type
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case("ollama"))
    }
}

/// Ordered endpoints, tried first to last
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LlmConfigList(pub Vec<LlmConfigEntry>);

impl LlmConfigList {
    pub fn from_json(json: &str) -> Result<Self> {
        let list: Self = serde_json::from_str(json)
            .map_err(|e| AgentError::Config(format!("Invalid LLM config list: {}", e)))?;
        if list.0.is_empty() {
            return Err(AgentError::Config("LLM config list is empty".into()));
        }
        Ok(list)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            AgentError::Config(format!("Cannot read LLM config {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    /// `var` holds the JSON list or a path to it; `default_path` is read
    /// when `var` is unset
    pub fn from_env_or_file(var: &str, default_path: impl AsRef<Path>) -> Result<Self> {
        match std::env::var(var) {
            Ok(value) => Self::parse_value(&value),
            Err(_) => Self::from_file(default_path),
        }
    }

    fn parse_value(value: &str) -> Result<Self> {
        if value.trim_start().starts_with('[') {
            Self::from_json(value)
        } else {
            Self::from_file(value.trim())
        }
    }

    pub fn first_model(&self) -> Option<&str> {
        self.0.first().map(|e| e.model.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Provider for a single entry, pinned to the entry's model
pub fn build_provider(entry: &LlmConfigEntry) -> Result<Arc<dyn LlmProvider>> {
    if entry.is_ollama() {
        return build_ollama(entry);
    }
    let config = OpenAiConfig {
        api_key: entry.api_key.clone(),
        base_url: entry
            .base_url
            .clone()
            .unwrap_or_else(|| crate::openai::DEFAULT_BASE_URL.into()),
        model: Some(entry.model.clone()),
        ..Default::default()
    };
    Ok(Arc::new(OpenAiProvider::new(config)?))
}

#[cfg(feature = "ollama")]
fn build_ollama(entry: &LlmConfigEntry) -> Result<Arc<dyn LlmProvider>> {
    let mut config = OllamaConfig {
        model: Some(entry.model.clone()),
        ..OllamaConfig::from_env()
    };
    if let Some(base) = &entry.base_url {
        let url = reqwest::Url::parse(base)
            .map_err(|e| AgentError::Config(format!("Invalid base_url {}: {}", base, e)))?;
        let host = url
            .host_str()
            .ok_or_else(|| AgentError::Config(format!("base_url {} has no host", base)))?;
        config.host = format!("{}://{}", url.scheme(), host);
        config.port = url.port_or_known_default().unwrap_or(config.port);
    }
    Ok(Arc::new(OllamaProvider::from_config(config)?))
}

#[cfg(not(feature = "ollama"))]
fn build_ollama(_entry: &LlmConfigEntry) -> Result<Arc<dyn LlmProvider>> {
    Err(AgentError::Config("Built without Ollama support".into()))
}

/// Failover chain over every entry
pub fn build_chain(list: &LlmConfigList) -> Result<ProviderChain> {
    if list.is_empty() {
        return Err(AgentError::Config("LLM config list is empty".into()));
    }
    let providers = list
        .0
        .iter()
        .map(build_provider)
        .collect::<Result<Vec<_>>>()?;
    tracing::info!(providers = providers.len(), first = ?list.first_model(), "LLM provider chain ready");
    Ok(ProviderChain::new(providers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const LIST: &str = r#"[
        {"model": "gpt-4o-mini", "api_key": "sk-test"},
        {"model": "llama3.2", "base_url": "http://gpu-box:11434", "api_type": "ollama"}
    ]"#;

    #[test]
    fn test_parse_inline_json() {
        let list = LlmConfigList::parse_value(LIST).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list.first_model(), Some("gpt-4o-mini"));
        assert!(!list.0[0].is_ollama());
        assert!(list.0[1].is_ollama());
    }

    #[test]
    fn test_parse_file_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(LIST.as_bytes()).unwrap();

        let list = LlmConfigList::parse_value(file.path().to_str().unwrap()).unwrap();
        assert_eq!(list.0[1].base_url.as_deref(), Some("http://gpu-box:11434"));
    }

    #[test]
    fn test_empty_and_invalid_lists() {
        assert!(matches!(LlmConfigList::from_json("[]"), Err(AgentError::Config(_))));
        assert!(matches!(LlmConfigList::from_json("[{}]"), Err(AgentError::Config(_))));
        assert!(LlmConfigList::parse_value("/no/such/file.json").is_err());
    }

    #[test]
    fn test_build_chain() {
        let chain = build_chain(&LlmConfigList::from_json(LIST).unwrap()).unwrap();
        assert_eq!(chain.len(), 2);
        assert!(build_chain(&LlmConfigList::default()).is_err());
    }
}
