//! Load the knowledge base
//!
//! Upserts every `*.txt` file under `KB_DOCS_PATH` (or the first argument)
//! into the configured Chroma collection.

use std::path::PathBuf;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use glotaran_assistant::{AssistantConfig, ChromaClient, KnowledgeBase, knowledge::EmbeddingFunction};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config = AssistantConfig::from_env()?;
    let docs = std::env::args().nth(1).map_or_else(|| config.docs_path.clone(), PathBuf::from);

    let embeddings: std::sync::Arc<dyn EmbeddingFunction> = glotaran_assistant::embeddings(&config)?;
    let kb = KnowledgeBase::new(ChromaClient::new(&config.chroma_url), &config.collection, embeddings);

    let count = kb.upsert_dir(&docs).await?;
    tracing::info!(collection = %config.collection, documents = count, "Knowledge base ready");
    println!("{}", count);

    Ok(())
}
