//! Knowledge base loader

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::json;
use sha2::{Digest, Sha256};

use super::chroma::UpsertRequest;
use super::{ChromaClient, EmbeddingFunction};
use crate::error::{AssistantError, Result};

/// A text file ready for upsert
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub id: String,
    pub file_name: String,
    pub content: String,
}

/// Hex SHA-256 of the file name
pub fn document_id(file_name: &str) -> String {
    hex::encode(Sha256::digest(file_name.as_bytes()))
}

/// All `*.txt` files directly inside `dir`, sorted by path
pub async fn collect_documents(dir: &Path) -> Result<Vec<Document>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| AssistantError::file(dir, &e))?;

    let mut paths: Vec<PathBuf> = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|e| AssistantError::file(dir, &e))? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "txt") && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| AssistantError::file(&path, &e))?;
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        documents.push(Document { id: document_id(&name), file_name: stem, content });
    }
    Ok(documents)
}

/// Fills a Chroma collection from a directory of text files
pub struct KnowledgeBase {
    client: ChromaClient,
    collection_name: String,
    embeddings: Arc<dyn EmbeddingFunction>,
}

impl KnowledgeBase {
    pub fn new(
        client: ChromaClient,
        collection_name: impl Into<String>,
        embeddings: Arc<dyn EmbeddingFunction>,
    ) -> Self {
        Self { client, collection_name: collection_name.into(), embeddings }
    }

    /// Upsert every `*.txt` file in `dir`; returns the collection size
    pub async fn upsert_dir(&self, dir: &Path) -> Result<usize> {
        self.client
            .heartbeat()
            .await
            .map_err(|e| AssistantError::Connectivity(format!("Client can't connect to the db: {}", e)))?;

        let collection = self.client.get_or_create_collection(&self.collection_name).await?;
        let documents = collect_documents(dir).await?;

        if documents.is_empty() {
            tracing::warn!(dir = %dir.display(), "No knowledge files found");
        } else {
            let texts: Vec<String> = documents.iter().map(|d| d.content.clone()).collect();
            let embeddings = self.embeddings.embed(&texts).await?;

            let request = UpsertRequest {
                ids: documents.iter().map(|d| d.id.clone()).collect(),
                embeddings,
                metadatas: documents.iter().map(|d| json!({ "file_name": d.file_name })).collect(),
                documents: texts,
            };
            self.client.upsert(&collection, &request).await?;
            tracing::info!(
                collection = %collection.name,
                documents = documents.len(),
                "Knowledge base upserted"
            );
        }

        self.client.count(&collection).await
    }
}
