//! HTTP/WebSocket Handlers

use axum::{
    Json,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message as WsMessage, WebSocket},
    },
    http::StatusCode,
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};

use agent_core::{
    AgentError, GenerationOptions, LlmProvider, Message, SessionId, SessionStore,
    provider::ModelInfo,
};
use glotaran_assistant::prompts;

use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub llm_connected: bool,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub message: String,
    pub conversation_id: String,
    pub model: String,
}

#[derive(Debug, Deserialize)]
pub struct ObserveRequest {
    pub cell_source: String,
    #[serde(default)]
    pub cell_output: String,
    #[serde(default)]
    pub extra_instructions: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ObserveResponse {
    pub message: String,
    pub model: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, code: &str, err: &AgentError) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: err.user_message(),
            code: code.into(),
        }),
    )
}

fn bad_request(message: &str) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.into(),
            code: "BAD_REQUEST".into(),
        }),
    )
}

/// Options for an `/observe` completion
pub fn observe_options(base: &GenerationOptions) -> GenerationOptions {
    GenerationOptions {
        stop_sequences: vec![prompts::OBSERVE_STOP.into()],
        ..base.clone()
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let llm_connected = state.provider.health_check().await.unwrap_or(false);

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        llm_connected,
    })
}

/// The assistant followed by the base models
pub async fn list_models(
    State(state): State<AppState>,
) -> Result<Json<Vec<ModelInfo>>, ApiError> {
    let mut models = state
        .facade_provider
        .list_models()
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, "MODELS_ERROR", &e))?;

    match state.provider.list_models().await {
        Ok(base) => models.extend(base),
        Err(e) => tracing::warn!(error = %e, "Base model listing failed"),
    }

    Ok(Json(models))
}

/// Ask the agent ensemble; earlier turns of the conversation are history
pub async fn chat_handler(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if payload.message.trim().is_empty() {
        return Err(bad_request("Message must not be empty"));
    }

    let id = payload
        .conversation_id
        .filter(|id| !id.trim().is_empty())
        .map_or_else(SessionId::new, SessionId::from_string);

    let history = state
        .sessions
        .load(&id)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, "SESSION_ERROR", &e))?
        .map(|session| session.history)
        .unwrap_or_default();

    tracing::info!(conversation = %id, turns = history.len() / 2, "Chat request");

    let answer = state
        .facade
        .ask_with_history(&history, &payload.message)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Assistant error");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "AGENT_ERROR", &e)
        })?;

    state
        .sessions
        .push_turn(&id, &payload.message, &answer)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, "SESSION_ERROR", &e))?;

    Ok(Json(ChatResponse {
        message: answer,
        conversation_id: id.to_string(),
        model: state.facade.name().to_string(),
    }))
}

/// Explain one notebook cell with the base model
pub async fn observe_handler(
    State(state): State<AppState>,
    Json(payload): Json<ObserveRequest>,
) -> Result<Json<ObserveResponse>, ApiError> {
    let prompt = prompts::observe_prompt(
        &payload.cell_source,
        &payload.cell_output,
        payload.extra_instructions.as_deref(),
    );
    let options = observe_options(&state.options);

    let completion = state
        .provider
        .complete(&[Message::user(prompt)], &options)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Observe failed");
            api_error(StatusCode::BAD_GATEWAY, "LLM_ERROR", &e)
        })?;

    Ok(Json(ObserveResponse {
        message: completion.content.trim().to_string(),
        model: completion.model,
    }))
}

/// WebSocket chat through the facade provider
pub async fn chat_stream_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_stream(socket, state))
}

async fn handle_stream(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    // History of this socket's conversation
    let mut messages: Vec<Message> = Vec::new();

    while let Some(msg) = receiver.next().await {
        let msg = match msg {
            Ok(WsMessage::Text(text)) => text,
            Ok(WsMessage::Close(_)) => break,
            Err(e) => {
                tracing::error!(error = %e, "WebSocket error");
                break;
            }
            _ => continue,
        };

        let request: ChatRequest = match serde_json::from_str(&msg) {
            Ok(r) => r,
            Err(e) => {
                let error = serde_json::json!({"type": "error", "error": e.to_string()});
                let _ = sender.send(WsMessage::Text(error.to_string().into())).await;
                continue;
            }
        };

        messages.push(Message::user(&request.message));
        let mut answer = String::new();

        match state.facade_provider.complete_stream(&messages, &state.options).await {
            Ok(mut stream) => {
                while let Some(result) = stream.next().await {
                    match result {
                        Ok(chunk) => {
                            answer.push_str(&chunk.delta);
                            let response = serde_json::json!({
                                "type": "chunk",
                                "content": chunk.delta,
                                "done": chunk.done,
                            });
                            if sender.send(WsMessage::Text(response.to_string().into())).await.is_err() {
                                return;
                            }
                        }
                        Err(e) => {
                            let error = serde_json::json!({"type": "error", "error": e.user_message()});
                            let _ = sender.send(WsMessage::Text(error.to_string().into())).await;
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                let error = serde_json::json!({"type": "error", "error": e.user_message()});
                let _ = sender.send(WsMessage::Text(error.to_string().into())).await;
            }
        }

        settle_turn(&mut messages, answer);
    }
}

/// Close the pending user turn with `answer`, or drop it when nothing came back
fn settle_turn(messages: &mut Vec<Message>, answer: String) {
    if answer.is_empty() {
        messages.pop();
    } else {
        messages.push(Message::assistant(answer));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use agent_core::provider::{Completion, CompletionStream, ProviderInfo, StreamChunk};
    use glotaran_assistant::knowledge::RetrievedChunk;
    use glotaran_assistant::{AssistantConfig, AssistantGroup, Retriever};

    use super::*;

    /// Answers every prompt the same way and keeps the prompts
    #[derive(Default)]
    struct RecordingProvider {
        prompts: Mutex<Vec<Vec<Message>>>,
    }

    impl RecordingProvider {
        fn prompts(&self) -> Vec<Vec<Message>> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmProvider for RecordingProvider {
        async fn info(&self) -> agent_core::Result<ProviderInfo> {
            Ok(ProviderInfo {
                name: "Recording".into(),
                version: None,
                models: Vec::new(),
                supports_streaming: true,
                supports_tools: false,
            })
        }

        async fn health_check(&self) -> agent_core::Result<bool> {
            Ok(true)
        }

        async fn complete(
            &self,
            messages: &[Message],
            options: &GenerationOptions,
        ) -> agent_core::Result<Completion> {
            self.prompts.lock().unwrap().push(messages.to_vec());
            Ok(Completion::text("Sequential models chain species. TERMINATE", options.model.clone()))
        }

        async fn complete_stream(
            &self,
            messages: &[Message],
            options: &GenerationOptions,
        ) -> agent_core::Result<CompletionStream> {
            let completion = self.complete(messages, options).await?;
            let chunk = StreamChunk {
                delta: completion.content,
                done: true,
                usage: None,
            };
            Ok(Box::pin(futures::stream::iter(vec![Ok(chunk)])))
        }

        async fn list_models(&self) -> agent_core::Result<Vec<ModelInfo>> {
            Ok(Vec::new())
        }
    }

    struct EmptyRetriever;

    #[async_trait]
    impl Retriever for EmptyRetriever {
        async fn query(&self, _text: &str, _n: usize) -> glotaran_assistant::Result<Vec<RetrievedChunk>> {
            Ok(Vec::new())
        }

        fn name(&self) -> &str {
            "empty"
        }
    }

    fn test_state(provider: Arc<RecordingProvider>) -> AppState {
        let base: Arc<dyn LlmProvider> = provider;
        let facade = AssistantGroup::new(base.clone(), Arc::new(EmptyRetriever), &AssistantConfig::default())
            .into_facade();
        AppState::new(base, facade, GenerationOptions::default())
    }

    fn ask(message: &str, conversation_id: Option<&str>) -> Json<ChatRequest> {
        Json(ChatRequest {
            message: message.into(),
            conversation_id: conversation_id.map(Into::into),
        })
    }

    fn prompt_text(prompt: &[Message]) -> String {
        prompt.iter().map(|m| m.content.as_str()).collect::<Vec<_>>().join("\n")
    }

    #[tokio::test]
    async fn test_conversation_history_reaches_the_facade() {
        let provider = Arc::new(RecordingProvider::default());
        let state = test_state(provider.clone());

        let first = chat_handler(State(state.clone()), ask("What is a zebrafish model?", Some("conv-1")))
            .await
            .unwrap();
        assert_eq!(first.conversation_id, "conv-1");
        assert_eq!(first.message, "Sequential models chain species.");

        chat_handler(State(state.clone()), ask("And with three species?", Some("conv-1")))
            .await
            .unwrap();

        // entry-point turn and response preparer per request
        let prompts = provider.prompts();
        assert_eq!(prompts.len(), 4);

        // the inner discussion starts from the new question alone
        assert!(!prompt_text(&prompts[2]).contains("zebrafish"));

        // the earlier exchange reaches the response preparer
        let preparer = prompt_text(&prompts[3]);
        assert!(preparer.contains("Human: What is a zebrafish model?"));
        assert!(preparer.contains("AI: Sequential models chain species."));
        assert!(preparer.contains("Human: And with three species?"));

        let session = state.sessions.load(&SessionId::from_string("conv-1")).unwrap().unwrap();
        assert_eq!(session.message_count(), 4);
    }

    #[tokio::test]
    async fn test_new_conversation_gets_an_id_and_empty_message_is_rejected() {
        let provider = Arc::new(RecordingProvider::default());
        let state = test_state(provider.clone());

        let response = chat_handler(State(state.clone()), ask("Hello", None)).await.unwrap();
        assert!(!response.conversation_id.is_empty());
        let id = SessionId::from_string(response.conversation_id.clone());
        assert!(state.sessions.load(&id).unwrap().is_some());

        let (status, _) = chat_handler(State(state), ask("  ", None)).await.unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(provider.prompts().len(), 2);
    }

    #[test]
    fn test_failed_stream_turn_leaves_no_empty_answer() {
        let mut messages = vec![Message::user("What is a megacomplex?")];
        settle_turn(&mut messages, "A group of decays.".into());
        assert_eq!(messages.len(), 2);

        messages.push(Message::user("And a dataset?"));
        settle_turn(&mut messages, String::new());
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].content, "A group of decays.");
        assert!(messages.iter().all(|m| !m.content.is_empty()));
    }

    #[test]
    fn test_observe_options_add_stop_sequence() {
        let base = GenerationOptions {
            model: "llama3.2".into(),
            ..Default::default()
        };
        let options = observe_options(&base);
        assert_eq!(options.model, "llama3.2");
        assert_eq!(options.stop_sequences, vec!["\nHuman:".to_string()]);
    }

    #[test]
    fn test_requests_deserialize_with_defaults() {
        let chat: ChatRequest = serde_json::from_str(r#"{"message": "hi"}"#).unwrap();
        assert!(chat.conversation_id.is_none());

        let observe: ObserveRequest = serde_json::from_str(r#"{"cell_source": "x = 1"}"#).unwrap();
        assert_eq!(observe.cell_output, "");
        assert!(observe.extra_instructions.is_none());
    }
}
