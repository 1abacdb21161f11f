//! Embedding functions

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::error::{AssistantError, Result};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Turns texts into vectors, one per input, in order
#[async_trait]
pub trait EmbeddingFunction: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// OpenAI `/embeddings` endpoint
pub struct OpenAiEmbeddings {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

impl OpenAiEmbeddings {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

fn order_embeddings(mut data: Vec<EmbeddingData>, expected: usize) -> Result<Vec<Vec<f32>>> {
    if data.len() != expected {
        return Err(AssistantError::Connectivity(format!(
            "Embedding service returned {} vectors for {} inputs",
            data.len(),
            expected
        )));
    }
    data.sort_by_key(|d| d.index);
    Ok(data.into_iter().map(|d| d.embedding).collect())
}

#[async_trait]
impl EmbeddingFunction for OpenAiEmbeddings {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({ "model": self.model, "input": texts }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AssistantError::Connectivity(format!(
                "Embedding request failed ({}): {}",
                status, body
            )));
        }

        let parsed: EmbeddingResponse = response.json().await?;
        tracing::debug!(model = %self.model, inputs = texts.len(), "Embeddings computed");
        order_embeddings(parsed.data, texts.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embeddings_reordered_by_index() {
        let raw = r#"{"data": [
            {"embedding": [0.2], "index": 1},
            {"embedding": [0.1], "index": 0}
        ]}"#;
        let parsed: EmbeddingResponse = serde_json::from_str(raw).unwrap();
        let ordered = order_embeddings(parsed.data, 2).unwrap();
        assert_eq!(ordered, vec![vec![0.1], vec![0.2]]);
    }

    #[test]
    fn test_count_mismatch_is_error() {
        let data = vec![EmbeddingData { embedding: vec![1.0], index: 0 }];
        assert!(order_embeddings(data, 2).is_err());
    }

    #[test]
    fn test_base_url_trimmed() {
        let embeddings = OpenAiEmbeddings::new("key", "text-embedding-3-small")
            .with_base_url("http://localhost:9999/v1/");
        assert_eq!(embeddings.base_url, "http://localhost:9999/v1");
        assert_eq!(embeddings.model(), "text-embedding-3-small");
    }
}
