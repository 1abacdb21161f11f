//! OpenAI-compatible Chat Completions provider
//!
//! Works against api.openai.com and any server exposing the same
//! `/chat/completions` surface.

use std::time::Duration;

use agent_core::{
    error::{AgentError, Result},
    message::{Message, Role},
    provider::{
        Completion, CompletionStream, FinishReason, GenerationOptions, LlmProvider, ModelInfo,
        ProviderInfo, StreamChunk, TokenUsage,
    },
};
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{Value, json};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI provider configuration
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    /// Model pinned to this provider; overrides the per-request model
    pub model: Option<String>,
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.into(),
            model: None,
            timeout_secs: 120,
        }
    }
}

impl OpenAiConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            base_url: std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into()),
            ..Default::default()
        }
    }
}

pub struct OpenAiProvider {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Config(format!("HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn model<'a>(&'a self, options: &'a GenerationOptions) -> &'a str {
        self.config.model.as_deref().unwrap_or(&options.model)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    fn build_body(&self, messages: &[Message], options: &GenerationOptions, stream: bool) -> Value {
        let mut body = json!({
            "model": self.model(options),
            "messages": messages.iter().map(message_to_openai).collect::<Vec<_>>(),
            "temperature": options.temperature,
            "top_p": options.top_p,
            "max_tokens": options.max_tokens,
            "stream": stream,
        });
        if !options.stop_sequences.is_empty() {
            body["stop"] = json!(options.stop_sequences);
        }
        body
    }

    async fn post(&self, body: &Value) -> Result<reqwest::Response> {
        let response = self
            .request(self.client.post(self.url("chat/completions")))
            .json(body)
            .send()
            .await
            .map_err(|e| AgentError::ProviderUnavailable(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let text = response.text().await.unwrap_or_default();
            return Err(status_to_error(status, &text));
        }
        Ok(response)
    }
}

fn status_to_error(status: u16, body: &str) -> AgentError {
    match status {
        401 | 403 => AgentError::Auth(body.to_string()),
        429 => AgentError::RateLimited(body.to_string()),
        500..=599 => AgentError::ProviderUnavailable(format!("{}: {}", status, body)),
        _ => AgentError::Provider(format!("{}: {}", status, body)),
    }
}

fn parse_finish_reason(s: &str) -> Option<FinishReason> {
    match s {
        "stop" => Some(FinishReason::Stop),
        "length" => Some(FinishReason::Length),
        "tool_calls" | "function_call" => Some(FinishReason::ToolUse),
        "content_filter" => Some(FinishReason::ContentFilter),
        _ => None,
    }
}

/// Names must match `^[a-zA-Z0-9_-]+$`
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}

fn message_to_openai(msg: &Message) -> Value {
    // Tool results travel as text; there is no native tool_calls pairing.
    let role = match msg.role {
        Role::System => "system",
        Role::User | Role::Tool => "user",
        Role::Assistant => "assistant",
    };
    let mut value = json!({ "role": role, "content": msg.content });
    if let Some(name) = msg.name.as_deref().filter(|n| !n.is_empty()) {
        value["name"] = json!(sanitize_name(name));
    }
    value
}

impl From<OpenAiUsage> for TokenUsage {
    fn from(u: OpenAiUsage) -> Self {
        TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }
    }
}

enum SseEvent {
    Skip,
    Done,
    Chunk(StreamChunk),
}

/// Interpret the `data` of one server-sent event
fn parse_sse_data(data: &str) -> SseEvent {
    let data = data.trim();
    if data == "[DONE]" {
        return SseEvent::Done;
    }
    let Ok(chunk) = serde_json::from_str::<OpenAiStreamChunk>(data) else {
        return SseEvent::Skip;
    };
    let usage = chunk.usage.map(TokenUsage::from);
    match chunk.choices.into_iter().next() {
        Some(choice) => SseEvent::Chunk(StreamChunk {
            delta: choice.delta.content.unwrap_or_default(),
            done: choice.finish_reason.is_some(),
            usage,
        }),
        None if usage.is_some() => SseEvent::Chunk(StreamChunk {
            delta: String::new(),
            done: true,
            usage,
        }),
        None => SseEvent::Skip,
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn info(&self) -> Result<ProviderInfo> {
        let models = self.list_models().await.unwrap_or_default();
        Ok(ProviderInfo {
            name: "OpenAI".into(),
            version: None,
            models,
            supports_streaming: true,
            supports_tools: false,
        })
    }

    async fn health_check(&self) -> Result<bool> {
        match self.list_models().await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!("OpenAI health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn complete(&self, messages: &[Message], options: &GenerationOptions) -> Result<Completion> {
        let body = self.build_body(messages, options, false);
        tracing::debug!(model = self.model(options), messages = messages.len(), "OpenAI complete");

        let data: OpenAiChatResponse = self
            .post(&body)
            .await?
            .json()
            .await
            .map_err(|e| AgentError::Provider(format!("Malformed response: {}", e)))?;

        let choice = data
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Provider("No choices in response".into()))?;
        let finish_reason = choice.finish_reason.as_deref().and_then(parse_finish_reason);

        Ok(Completion {
            content: choice.message.content.unwrap_or_default(),
            model: data.model.unwrap_or_else(|| self.model(options).to_string()),
            usage: data.usage.map(TokenUsage::from),
            truncated: finish_reason == Some(FinishReason::Length),
            finish_reason,
        })
    }

    async fn complete_stream(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<CompletionStream> {
        let body = self.build_body(messages, options, true);
        let events = Box::pin(self.post(&body).await?.bytes_stream().eventsource());

        let stream = futures::stream::unfold((events, false), |(mut events, finished)| async move {
            if finished {
                return None;
            }
            loop {
                match events.next().await? {
                    Ok(event) => match parse_sse_data(&event.data) {
                        SseEvent::Skip => continue,
                        SseEvent::Done => {
                            let last = StreamChunk { delta: String::new(), done: true, usage: None };
                            return Some((Ok(last), (events, true)));
                        }
                        SseEvent::Chunk(chunk) => return Some((Ok(chunk), (events, false))),
                    },
                    Err(e) => {
                        return Some((Err(AgentError::Provider(e.to_string())), (events, true)));
                    }
                }
            }
        });

        Ok(Box::pin(stream))
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let response = self
            .request(self.client.get(self.url("models")))
            .send()
            .await
            .map_err(|e| AgentError::ProviderUnavailable(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let text = response.text().await.unwrap_or_default();
            return Err(status_to_error(status, &text));
        }

        let list: OpenAiModelList = response
            .json()
            .await
            .map_err(|e| AgentError::Provider(format!("Malformed model list: {}", e)))?;

        Ok(list
            .data
            .into_iter()
            .map(|m| ModelInfo {
                name: m.id.clone(),
                id: m.id,
                context_length: None,
                supports_vision: false,
            })
            .collect())
    }
}

#[derive(Deserialize)]
struct OpenAiChatResponse {
    model: Option<String>,
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Deserialize)]
struct OpenAiStreamChunk {
    choices: Vec<OpenAiStreamChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Deserialize)]
struct OpenAiStreamChoice {
    delta: OpenAiStreamDelta,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiStreamDelta {
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiModelList {
    data: Vec<OpenAiModel>,
}

#[derive(Deserialize)]
struct OpenAiModel {
    id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(model: Option<&str>) -> OpenAiProvider {
        OpenAiProvider::new(OpenAiConfig {
            api_key: Some("sk-test".into()),
            model: model.map(Into::into),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_body_uses_pinned_model_and_stop() {
        let options = GenerationOptions {
            stop_sequences: vec!["\nHuman:".into()],
            ..Default::default()
        };
        let messages = vec![
            Message::system("persona"),
            Message::user("debugger_agent:\nread it").with_name("debugger agent"),
            Message::tool("[Tool 'read_file' returned]\nx = 1", Some("call-1".into())),
        ];

        let body = provider(Some("gpt-4o")).build_body(&messages, &options, false);
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["stop"][0], "\nHuman:");
        assert_eq!(body["messages"][1]["name"], "debugger_agent");
        assert_eq!(body["messages"][2]["role"], "user");
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(status_to_error(401, "no"), AgentError::Auth(_)));
        assert!(matches!(status_to_error(429, "slow"), AgentError::RateLimited(_)));
        assert!(status_to_error(503, "down").is_retryable());
        assert!(matches!(status_to_error(400, "bad"), AgentError::Provider(_)));
    }

    #[test]
    fn test_sse_data() {
        let data = r#"{"choices":[{"delta":{"content":"Hel"},"finish_reason":null}]}"#;
        match parse_sse_data(data) {
            SseEvent::Chunk(chunk) => {
                assert_eq!(chunk.delta, "Hel");
                assert!(!chunk.done);
            }
            _ => panic!("expected chunk"),
        }
        assert!(matches!(parse_sse_data("[DONE]"), SseEvent::Done));
        assert!(matches!(parse_sse_data("not json"), SseEvent::Skip));
    }

    /// Serve one raw HTTP response whose body is written in `parts`
    async fn serve_in_parts(parts: Vec<Vec<u8>>) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();

            // drain the request: headers, then `content-length` bytes of body
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if let Some(end) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                    let head = String::from_utf8_lossy(&request[..end]).to_lowercase();
                    let length = head
                        .lines()
                        .find_map(|l| l.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if request.len() >= end + 4 + length {
                        break;
                    }
                }
            }

            socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\nconnection: close\r\n\r\n")
                .await
                .unwrap();
            for part in parts {
                socket.write_all(&part).await.unwrap();
                socket.flush().await.unwrap();
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        });
        url
    }

    #[tokio::test]
    async fn test_stream_keeps_characters_split_across_reads() {
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"caf\u{e9}\"},\"finish_reason\":null}]}\n\n",
            "data: [DONE]\n\n",
        )
        .as_bytes()
        .to_vec();
        // split inside the two-byte encoding of `é`
        let split = body.iter().position(|b| *b == 0xC3).unwrap() + 1;
        let url = serve_in_parts(vec![body[..split].to_vec(), body[split..].to_vec()]).await;

        let provider = OpenAiProvider::new(OpenAiConfig {
            base_url: url,
            model: Some("gpt-4o-mini".into()),
            ..Default::default()
        })
        .unwrap();
        let mut stream = provider
            .complete_stream(&[Message::user("coffee?")], &GenerationOptions::default())
            .await
            .unwrap();

        let mut text = String::new();
        let mut done = false;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.unwrap();
            text.push_str(&chunk.delta);
            done |= chunk.done;
        }
        assert_eq!(text, "café");
        assert!(done);
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{"model":"gpt-4o-mini","choices":[{"message":{"content":"hi"},"finish_reason":"length"}],
                      "usage":{"prompt_tokens":3,"completion_tokens":1,"total_tokens":4}}"#;
        let data: OpenAiChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(data.choices[0].message.content.as_deref(), Some("hi"));
        assert_eq!(
            data.choices[0].finish_reason.as_deref().and_then(parse_finish_reason),
            Some(FinishReason::Length)
        );
    }
}
