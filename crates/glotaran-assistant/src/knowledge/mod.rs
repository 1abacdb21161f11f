//! Knowledge Base Retrieval
//!
//! Vector-store lookups that feed the retrieval agent, plus the loader
//! that fills the store from the bundled text files.

mod chroma;
mod embeddings;
mod knowledge_base;

pub use chroma::{ChromaClient, ChromaRetriever, Collection, UpsertRequest};
pub use embeddings::{EmbeddingFunction, OpenAiEmbeddings};
pub use knowledge_base::{Document, KnowledgeBase, collect_documents, document_id};

use async_trait::async_trait;

use crate::error::Result;

/// One document chunk returned by a similarity query
#[derive(Clone, Debug, PartialEq)]
pub struct RetrievedChunk {
    pub id: String,
    pub document: String,
    /// `file_name` metadata, when present
    pub source: Option<String>,
    pub distance: Option<f64>,
}

/// Similarity search over the knowledge base
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Nearest chunks to `text`, closest first
    async fn query(&self, text: &str, n_results: usize) -> Result<Vec<RetrievedChunk>>;

    fn name(&self) -> &str;
}
