//! pyglotaran assistant HTTP server
//!
//! Axum server exposing the multi-agent assistant (`/api/chat`), the
//! single-cell observe command (`/api/observe`) and a WebSocket chat.

mod handlers;
mod state;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_core::{GenerationOptions, LlmProvider};
use agent_runtime::{LlmConfigList, build_chain};
use glotaran_assistant::{
    AssistantConfig, AssistantGroup, DEFAULT_LLM_CONFIG_PATH, LLM_CONFIG_VAR, connect_retriever,
};

use crate::handlers::{chat_handler, chat_stream_handler, health_check, list_models, observe_handler};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    // LLM providers from the config list
    let llm_config = LlmConfigList::from_env_or_file(LLM_CONFIG_VAR, DEFAULT_LLM_CONFIG_PATH)?;
    let options = GenerationOptions {
        model: llm_config.first_model().unwrap_or_default().to_string(),
        ..Default::default()
    };
    let provider: Arc<dyn LlmProvider> = Arc::new(build_chain(&llm_config)?);

    match provider.health_check().await {
        Ok(true) => tracing::info!(model = %options.model, "LLM reachable"),
        Ok(false) | Err(_) => tracing::warn!("LLM not reachable - requests will fail until it is"),
    }

    // Knowledge base
    let config = AssistantConfig::from_env()?;
    let retriever = connect_retriever(&config).await?;
    tracing::info!(
        chroma = %config.chroma_url,
        collection = %config.collection,
        workspace = %config.workspace_dir.display(),
        "Knowledge base connected"
    );

    let facade = AssistantGroup::new(provider.clone(), retriever, &config)
        .with_options(options.clone())
        .into_facade();
    let state = AppState::new(provider, facade, options);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/api/models", get(list_models))
        .route("/api/chat", post(chat_handler))
        .route("/api/chat/stream", get(chat_stream_handler))
        .route("/api/observe", post(observe_handler))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
        .with_state(state);

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("pyglotaran assistant listening on http://{}", addr);
    tracing::info!("  GET  /health           - Health check");
    tracing::info!("  GET  /api/models       - List models");
    tracing::info!("  POST /api/chat         - Ask the assistant");
    tracing::info!("  GET  /api/chat/stream  - WebSocket chat");
    tracing::info!("  POST /api/observe      - Explain a notebook cell");

    axum::serve(listener, app).await?;

    Ok(())
}
