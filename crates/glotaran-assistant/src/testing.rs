//! Test doubles for this crate's unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use serde_json::{Value, json};

use agent_core::provider::{Completion, CompletionStream, ModelInfo, ProviderInfo, StreamChunk};
use agent_core::{GenerationOptions, LlmProvider, Message, Result as CoreResult};

use crate::error::Result;
use crate::knowledge::{EmbeddingFunction, RetrievedChunk, Retriever};

/// Retriever over `count` fixed chunks, ranked by index.
pub struct FakeRetriever {
    count: usize,
    queries: Mutex<Vec<String>>,
}

impl FakeRetriever {
    pub fn numbered(count: usize) -> Self {
        Self { count, queries: Mutex::new(Vec::new()) }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl Retriever for FakeRetriever {
    async fn query(&self, text: &str, n_results: usize) -> Result<Vec<RetrievedChunk>> {
        self.queries.lock().unwrap().push(text.to_string());
        Ok((0..self.count.min(n_results))
            .map(|i| RetrievedChunk {
                id: format!("id_{}", i),
                document: format!("doc {}", i),
                source: Some(format!("file_{}", i)),
                distance: Some(i as f64 / 10.0),
            })
            .collect())
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Provider that replays canned replies in order and records prompts.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<String>>,
    pub prompts: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedProvider {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn info(&self) -> CoreResult<ProviderInfo> {
        Ok(ProviderInfo {
            name: "Scripted".into(),
            version: None,
            models: Vec::new(),
            supports_streaming: true,
            supports_tools: false,
        })
    }

    async fn health_check(&self) -> CoreResult<bool> {
        Ok(true)
    }

    async fn complete(&self, messages: &[Message], options: &GenerationOptions) -> CoreResult<Completion> {
        self.prompts.lock().unwrap().push(messages.to_vec());
        let reply = self.replies.lock().unwrap().pop_front().unwrap_or_default();
        Ok(Completion::text(reply, options.model.clone()))
    }

    async fn complete_stream(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> CoreResult<CompletionStream> {
        let completion = self.complete(messages, options).await?;
        let chunk = StreamChunk { delta: completion.content, done: true, usage: None };
        Ok(Box::pin(futures::stream::iter(vec![Ok(chunk)])))
    }

    async fn list_models(&self) -> CoreResult<Vec<ModelInfo>> {
        Ok(Vec::new())
    }
}

/// Embeds each text as `[len, 1.0]`
pub struct LengthEmbeddings;

#[async_trait]
impl EmbeddingFunction for LengthEmbeddings {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
    }
}

/// Requests a [`MockChroma`] received
#[derive(Default)]
pub struct ChromaLog {
    pub collections: Mutex<Vec<String>>,
    pub upserts: Mutex<Vec<Value>>,
    pub queries: Mutex<Vec<Value>>,
}

/// In-process server speaking the Chroma v1 endpoints the client uses
pub struct MockChroma {
    pub url: String,
    pub log: Arc<ChromaLog>,
}

impl MockChroma {
    pub async fn start() -> Self {
        let log = Arc::new(ChromaLog::default());
        let app = Router::new()
            .route("/api/v1/heartbeat", get(|| async { Json(json!({ "nanosecond heartbeat": 1 })) }))
            .route("/api/v1/collections", post(create_collection))
            .route("/api/v1/collections/{id}/upsert", post(upsert))
            .route("/api/v1/collections/{id}/count", get(count))
            .route("/api/v1/collections/{id}/query", post(query))
            .with_state(log.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { url, log }
    }

    /// Address nothing listens on
    pub async fn unreachable_url() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        format!("http://{}", listener.local_addr().unwrap())
    }
}

async fn create_collection(State(log): State<Arc<ChromaLog>>, Json(body): Json<Value>) -> Json<Value> {
    let name = body["name"].as_str().unwrap_or_default().to_string();
    log.collections.lock().unwrap().push(name.clone());
    Json(json!({ "id": "col-1", "name": name, "metadata": null }))
}

async fn upsert(
    State(log): State<Arc<ChromaLog>>,
    Path(_id): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    log.upserts.lock().unwrap().push(body);
    Json(json!(true))
}

async fn count(State(log): State<Arc<ChromaLog>>, Path(_id): Path<String>) -> Json<usize> {
    let upserts = log.upserts.lock().unwrap();
    Json(upserts.iter().map(|u| u["ids"].as_array().map_or(0, Vec::len)).sum())
}

async fn query(
    State(log): State<Arc<ChromaLog>>,
    Path(_id): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    log.queries.lock().unwrap().push(body);
    Json(json!({
        "ids": [["a", "b"]],
        "documents": [["Megacomplexes group decays.", "Parameters live in a CSV."]],
        "metadatas": [[{ "file_name": "megacomplex" }, { "file_name": "parameters" }]],
        "distances": [[0.12, 0.34]],
    }))
}
