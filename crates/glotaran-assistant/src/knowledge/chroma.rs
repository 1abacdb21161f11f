//! Chroma REST client
//!
//! Talks to a Chroma server over its v1 HTTP API. Embeddings are computed
//! client side and sent with every upsert and query.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{EmbeddingFunction, RetrievedChunk, Retriever};
use crate::error::{AssistantError, Result};

/// Server-side collection handle
#[derive(Clone, Debug, Deserialize)]
pub struct Collection {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    ids: Vec<Vec<String>>,
    #[serde(default)]
    documents: Option<Vec<Vec<Option<String>>>>,
    #[serde(default)]
    metadatas: Option<Vec<Vec<Option<Value>>>>,
    #[serde(default)]
    distances: Option<Vec<Vec<Option<f64>>>>,
}

impl QueryResponse {
    /// Flatten the single-query result into chunks
    fn into_chunks(self) -> Vec<RetrievedChunk> {
        let Some(ids) = self.ids.into_iter().next() else {
            return Vec::new();
        };
        let documents = self.documents.and_then(|d| d.into_iter().next()).unwrap_or_default();
        let metadatas = self.metadatas.and_then(|m| m.into_iter().next()).unwrap_or_default();
        let distances = self.distances.and_then(|d| d.into_iter().next()).unwrap_or_default();

        ids.into_iter()
            .enumerate()
            .filter_map(|(i, id)| {
                let document = documents.get(i).cloned().flatten()?;
                let source = metadatas
                    .get(i)
                    .and_then(Option::as_ref)
                    .and_then(|m| m.get("file_name"))
                    .and_then(Value::as_str)
                    .map(str::to_string);
                let distance = distances.get(i).copied().flatten();
                Some(RetrievedChunk { id, document, source, distance })
            })
            .collect()
    }
}

/// Upsert payload
#[derive(Debug, Serialize)]
pub struct UpsertRequest {
    pub ids: Vec<String>,
    pub embeddings: Vec<Vec<f32>>,
    pub metadatas: Vec<Value>,
    pub documents: Vec<String>,
}

/// Thin client over the Chroma HTTP API
#[derive(Clone)]
pub struct ChromaClient {
    client: reqwest::Client,
    base_url: String,
}

impl ChromaClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    async fn check(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(AssistantError::Connectivity(format!("Chroma {} failed ({}): {}", what, status, body)))
    }

    pub async fn heartbeat(&self) -> Result<()> {
        let response = self.client.get(self.url("/heartbeat")).send().await?;
        Self::check(response, "heartbeat").await?;
        Ok(())
    }

    pub async fn get_or_create_collection(&self, name: &str) -> Result<Collection> {
        let response = self
            .client
            .post(self.url("/collections"))
            .json(&json!({ "name": name, "get_or_create": true }))
            .send()
            .await?;
        let collection: Collection = Self::check(response, "collection lookup").await?.json().await?;
        tracing::debug!(collection = %collection.name, id = %collection.id, "Collection ready");
        Ok(collection)
    }

    pub async fn upsert(&self, collection: &Collection, request: &UpsertRequest) -> Result<()> {
        let response = self
            .client
            .post(self.url(&format!("/collections/{}/upsert", collection.id)))
            .json(request)
            .send()
            .await?;
        Self::check(response, "upsert").await?;
        Ok(())
    }

    pub async fn count(&self, collection: &Collection) -> Result<usize> {
        let response = self
            .client
            .get(self.url(&format!("/collections/{}/count", collection.id)))
            .send()
            .await?;
        Ok(Self::check(response, "count").await?.json().await?)
    }

    pub async fn query(
        &self,
        collection: &Collection,
        embedding: Vec<f32>,
        n_results: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        let response = self
            .client
            .post(self.url(&format!("/collections/{}/query", collection.id)))
            .json(&json!({
                "query_embeddings": [embedding],
                "n_results": n_results,
                "include": ["documents", "metadatas", "distances"],
            }))
            .send()
            .await?;
        let parsed: QueryResponse = Self::check(response, "query").await?.json().await?;
        Ok(parsed.into_chunks())
    }
}

/// `Retriever` backed by one Chroma collection
pub struct ChromaRetriever {
    client: ChromaClient,
    collection: Collection,
    embeddings: Arc<dyn EmbeddingFunction>,
}

impl ChromaRetriever {
    /// Resolve (or create) the collection and return a ready retriever
    pub async fn connect(
        client: ChromaClient,
        collection_name: &str,
        embeddings: Arc<dyn EmbeddingFunction>,
    ) -> Result<Self> {
        let collection = client.get_or_create_collection(collection_name).await?;
        Ok(Self { client, collection, embeddings })
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }
}

#[async_trait]
impl Retriever for ChromaRetriever {
    async fn query(&self, text: &str, n_results: usize) -> Result<Vec<RetrievedChunk>> {
        let embedding = self
            .embeddings
            .embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AssistantError::Connectivity("Embedding service returned nothing".into()))?;

        let chunks = self.client.query(&self.collection, embedding, n_results).await?;
        tracing::debug!(
            collection = %self.collection.name,
            requested = n_results,
            returned = chunks.len(),
            "Knowledge base queried"
        );
        Ok(chunks)
    }

    fn name(&self) -> &str {
        "chroma"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{LengthEmbeddings, MockChroma};

    #[test]
    fn test_query_response_flattened() {
        let raw = r#"{
            "ids": [["a", "b", "c"]],
            "documents": [["first", null, "third"]],
            "metadatas": [[{"file_name": "intro"}, null, null]],
            "distances": [[0.1, 0.2, 0.3]]
        }"#;
        let parsed: QueryResponse = serde_json::from_str(raw).unwrap();
        let chunks = parsed.into_chunks();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].id, "a");
        assert_eq!(chunks[0].source.as_deref(), Some("intro"));
        assert_eq!(chunks[0].distance, Some(0.1));
        assert_eq!(chunks[1].document, "third");
        assert_eq!(chunks[1].source, None);
    }

    #[test]
    fn test_empty_query_response() {
        let parsed: QueryResponse = serde_json::from_str(r#"{"ids": []}"#).unwrap();
        assert!(parsed.into_chunks().is_empty());
    }

    #[tokio::test]
    async fn test_retriever_queries_collection() {
        let chroma = MockChroma::start().await;
        let retriever = ChromaRetriever::connect(
            ChromaClient::new(&chroma.url),
            "pyglotaran-knowledge-base",
            Arc::new(LengthEmbeddings),
        )
        .await
        .unwrap();
        assert_eq!(retriever.collection().id, "col-1");

        let chunks = retriever.query("What is a megacomplex?", 3).await.unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].document, "Megacomplexes group decays.");
        assert_eq!(chunks[1].source.as_deref(), Some("parameters"));

        let queries = chroma.log.queries.lock().unwrap();
        assert_eq!(queries[0]["n_results"], 3);
        assert_eq!(queries[0]["query_embeddings"][0][0], 22.0);
    }

    #[tokio::test]
    async fn test_failed_status_is_connectivity_error() {
        let chroma = MockChroma::start().await;
        let client = ChromaClient::new(&chroma.url);
        // upsert only accepts POST, so this answers 405
        let response = client.client.get(client.url("/collections/col-1/upsert")).send().await.unwrap();
        let err = ChromaClient::check(response, "upsert").await.unwrap_err();
        assert!(matches!(err, AssistantError::Connectivity(_)));
        assert!(err.to_string().contains("405"));
    }

    #[test]
    fn test_urls() {
        let client = ChromaClient::new("http://localhost:8000/");
        assert_eq!(client.url("/heartbeat"), "http://localhost:8000/api/v1/heartbeat");
    }
}
