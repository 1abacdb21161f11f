//! # glotaran-assistant
//!
//! A multi-agent assistant for pyglotaran users.
//!
//! ## Agents
//!
//! | Agent | Role |
//! |-------|------|
//! | `generic_agent` | Entry point: retrieval, file generation, notebooks, termination |
//! | `debugger_agent` | Error analysis; reads files and notebooks |
//! | `user_proxy` | Executes the tool calls of the others |
//! | `retrieval_user_proxy` | Knowledge-base retrieval, reachable only via `retrieve_content` |
//!
//! ## Usage
//!
//! ```rust,ignore
//! use glotaran_assistant::{AssistantConfig, AssistantGroup, connect_retriever};
//!
//! let config = AssistantConfig::from_env()?;
//! let retriever = connect_retriever(&config).await?;
//! let facade = AssistantGroup::new(provider, retriever, &config).into_facade();
//! let answer = facade.ask("How do I define a sequential model?").await?;
//! ```

pub mod assistant;
pub mod config;
pub mod error;
pub mod knowledge;
pub mod prompts;
pub mod retrieval;
pub mod simulation;
pub mod tools;

#[cfg(test)]
mod testing;

use std::sync::Arc;

pub use assistant::AssistantGroup;
pub use config::{AssistantConfig, DEFAULT_LLM_CONFIG_PATH, LLM_CONFIG_VAR};
pub use error::{AssistantError, Result};
pub use knowledge::{ChromaClient, ChromaRetriever, KnowledgeBase, OpenAiEmbeddings, Retriever};
pub use retrieval::RetrievalAgent;

/// Embedding function configured from `config`
pub fn embeddings(config: &AssistantConfig) -> Result<Arc<OpenAiEmbeddings>> {
    let api_key = config
        .openai_api_key
        .clone()
        .ok_or_else(|| AssistantError::Config("OPENAI_API_KEY is required for embeddings".into()))?;
    Ok(Arc::new(OpenAiEmbeddings::new(api_key, &config.embedding_model)))
}

/// Chroma-backed retriever for the configured collection
pub async fn connect_retriever(config: &AssistantConfig) -> Result<Arc<dyn Retriever>> {
    let client = ChromaClient::new(&config.chroma_url);
    let retriever = ChromaRetriever::connect(client, &config.collection, embeddings(config)?).await?;
    Ok(Arc::new(retriever))
}
