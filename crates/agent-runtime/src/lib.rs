//! # agent-runtime
//!
//! Concrete LLM providers for the agent engine.
//!
//! ## Providers
//!
//! - **OpenAI**: any OpenAI-compatible `/chat/completions` endpoint
//! - **Ollama** (default feature): local inference via Ollama
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_runtime::config::{LlmConfigList, build_chain};
//!
//! let list = LlmConfigList::from_env_or_file("GLOTARAN_LLM_CONFIG", "config.json")?;
//! let provider = Arc::new(build_chain(&list)?);
//! ```

pub mod config;
#[cfg(feature = "ollama")]
pub mod ollama;
pub mod openai;

pub use config::{LlmConfigEntry, LlmConfigList, build_chain, build_provider};
#[cfg(feature = "ollama")]
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

// Re-export core types for convenience
pub use agent_core::{AgentError, LlmProvider, Message, Result, Role};
