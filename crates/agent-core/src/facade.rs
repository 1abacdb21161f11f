//! Facade Agent
//!
//! Presents a whole group conversation as one question/answer exchange.
//! Every call builds a fresh [`GroupChat`], runs it to completion, and
//! reduces the discussion to a single standalone answer. Tool calls, tool
//! results and automatic replies never reach the caller.
//!
//! [`FacadeProvider`] goes one step further and exposes the facade through
//! the [`LlmProvider`] trait, so the ensemble can stand in for a model.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::group::{GroupChat, GroupRun};
use crate::message::{Message, Role};
use crate::provider::{
    Completion, CompletionStream, GenerationOptions, LlmProvider, ModelInfo, ProviderInfo,
    StreamChunk,
};
use crate::termination::{DEFAULT_AUTO_REPLY, strip_termination};

/// Instructions for turning the discussion into the final answer
pub const RESPONSE_PREPARER: &str = r#"Output a standalone response to the original request, without mentioning any of the intermediate discussion.

This is the structure of the conversation you will receive:
* Previous conversation between the Human and the AI comes before the last "Human: ". This is usually not relevant here and is mostly noise.
* The Human's query THIS time is after the last "Human:". This is important!
* DISCUSSION == is followed by the conversation between the agents that work for the AI. This is important!

So, your main focus should be on the QUESTION and the DISCUSSION. Your standalone response should come from the DISCUSSION and
should either answer or further clarify the QUESTION."#;

const TRANSCRIPT_INTRO: &str = "Earlier you were asked to fulfill a request. You and your team worked diligently to address that request. Here is a transcript of that conversation:";

const NO_ANSWER: &str = "I could not find an answer to that request. Could you provide more information?";

/// Builds a fresh conversation session per request
pub trait GroupFactory: Send + Sync {
    fn build(&self) -> Result<GroupChat>;
}

impl<F> GroupFactory for F
where
    F: Fn() -> Result<GroupChat> + Send + Sync,
{
    fn build(&self) -> Result<GroupChat> {
        self()
    }
}

/// Single-call wrapper around a group conversation
pub struct FacadeAgent {
    name: String,
    factory: Arc<dyn GroupFactory>,
    provider: Arc<dyn LlmProvider>,
    options: GenerationOptions,
    response_preparer: String,
}

impl FacadeAgent {
    pub fn new(
        name: impl Into<String>,
        factory: Arc<dyn GroupFactory>,
        provider: Arc<dyn LlmProvider>,
        options: GenerationOptions,
    ) -> Self {
        Self {
            name: name.into(),
            factory,
            provider,
            options,
            response_preparer: RESPONSE_PREPARER.into(),
        }
    }

    pub fn with_response_preparer(mut self, preparer: impl Into<String>) -> Self {
        self.response_preparer = preparer.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    /// Ask a question with no prior context
    pub async fn ask(&self, message: &str) -> Result<String> {
        self.ask_with_history(&[], message).await
    }

    /// Ask a question; `history` only informs the final answer, the inner
    /// discussion starts from `message` alone
    pub async fn ask_with_history(&self, history: &[Message], message: &str) -> Result<String> {
        let chat = self.factory.build()?;
        let run = chat.run(&[], Message::user(message).with_name("user")).await;
        tracing::debug!(facade = %self.name, rounds = run.rounds, stop = ?run.stop, "Inner discussion done");
        Ok(self.reduce(history, message, &run).await)
    }

    /// Collapse a finished run into exactly one answer
    pub async fn reduce(&self, history: &[Message], question: &str, run: &GroupRun) -> String {
        let discussion: Vec<(&str, &str)> = run
            .discussion()
            .iter()
            .filter(|m| !is_meta(m))
            .map(|m| (m.name.as_deref().unwrap_or("agent"), strip_termination(&m.content)))
            .collect();

        let fallback = discussion
            .last()
            .map_or_else(|| NO_ANSWER.to_string(), |(_, content)| content.to_string());

        if discussion.is_empty() {
            return fallback;
        }

        let mut body = String::new();
        for msg in history.iter().filter(|m| m.role != Role::System) {
            let speaker = if msg.role == Role::User { "Human" } else { "AI" };
            body.push_str(&format!("{}: {}\n", speaker, msg.content));
        }
        body.push_str(&format!("\nHuman: {}\n\nDISCUSSION ==\n", question));
        for (name, content) in &discussion {
            body.push_str(&format!("{}:\n{}\n\n", name, content));
        }

        let messages = vec![
            Message::system(TRANSCRIPT_INTRO),
            Message::user(body),
            Message::system(&self.response_preparer),
        ];

        match self.provider.complete(&messages, &self.options).await {
            Ok(completion) => {
                let answer = strip_termination(&completion.content);
                if answer.is_empty() {
                    fallback
                } else {
                    answer.to_string()
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Response preparer failed, using last discussion message");
                fallback
            }
        }
    }
}

/// Internal bookkeeping the outer caller never sees
fn is_meta(message: &Message) -> bool {
    message.role == Role::Tool
        || message.role == Role::System
        || message.tool_call.is_some()
        || message.content.trim() == DEFAULT_AUTO_REPLY
        || strip_termination(&message.content).is_empty()
}

/// The facade exposed as a single model
pub struct FacadeProvider {
    facade: Arc<FacadeAgent>,
}

impl FacadeProvider {
    pub fn new(facade: Arc<FacadeAgent>) -> Self {
        Self { facade }
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            id: self.facade.name().to_string(),
            name: self.facade.name().to_string(),
            context_length: None,
            supports_vision: false,
        }
    }

    /// Split a chat request into prior history and the current question
    fn split_request(messages: &[Message]) -> (Vec<Message>, String) {
        let Some(pos) = messages.iter().rposition(|m| m.role == Role::User) else {
            return (Vec::new(), String::new());
        };
        let history = messages[..pos]
            .iter()
            .filter(|m| m.role != Role::System)
            .cloned()
            .collect();
        (history, messages[pos].content.clone())
    }
}

#[async_trait]
impl LlmProvider for FacadeProvider {
    async fn info(&self) -> Result<ProviderInfo> {
        Ok(ProviderInfo {
            name: self.facade.name().to_string(),
            version: None,
            models: vec![self.model_info()],
            supports_streaming: false,
            supports_tools: false,
        })
    }

    async fn health_check(&self) -> Result<bool> {
        self.facade.provider().health_check().await
    }

    async fn complete(&self, messages: &[Message], _options: &GenerationOptions) -> Result<Completion> {
        let (history, question) = Self::split_request(messages);
        let answer = self.facade.ask_with_history(&history, &question).await?;
        Ok(Completion::text(answer, self.facade.name()))
    }

    async fn complete_stream(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<CompletionStream> {
        let completion = self.complete(messages, options).await?;
        let chunk = StreamChunk {
            delta: completion.content,
            done: true,
            usage: None,
        };
        Ok(Box::pin(futures::stream::iter(vec![Ok(chunk)])))
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        Ok(vec![self.model_info()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentConfig, ChatAgent, LlmAgent, ProxyExecutor};
    use crate::group::GroupChatConfig;
    use crate::roster::{AgentRoster, RosterMember};
    use crate::selector::SpeakerSelector;
    use crate::testing::ScriptedProvider;
    use crate::tool::ToolRegistry;
    use crate::message::Transcript;
    use futures::StreamExt;

    struct FirstCandidate;

    #[async_trait]
    impl SpeakerSelector for FirstCandidate {
        async fn select(&self, candidates: &[&RosterMember], _t: &Transcript) -> Result<String> {
            Ok(candidates[0].name().to_string())
        }
    }

    fn facade(generic: Vec<&'static str>, preparer: Arc<ScriptedProvider>, max_round: usize) -> FacadeAgent {
        let factory = move || -> Result<GroupChat> {
            let generic: Arc<dyn ChatAgent> = Arc::new(LlmAgent::new(
                Arc::new(ScriptedProvider::new(generic.clone())),
                AgentConfig::new("generic_agent", "persona"),
            ));
            let debugger: Arc<dyn ChatAgent> = Arc::new(LlmAgent::new(
                Arc::new(ScriptedProvider::new(vec!["Not my ownership."; 10])),
                AgentConfig::new("debugger_agent", "persona"),
            ));
            let roster = AgentRoster::builder()
                .specialist(debugger)
                .executor(Arc::new(ProxyExecutor::new(
                    "user_proxy",
                    "runs tools",
                    Arc::new(ToolRegistry::new()),
                )))
                .entry_point(generic)
                .build()?;
            Ok(GroupChat::new(
                Arc::new(roster),
                Arc::new(FirstCandidate),
                GroupChatConfig { max_round, ..Default::default() },
            ))
        };
        FacadeAgent::new(
            "glotaran-assistant",
            Arc::new(factory),
            preparer,
            GenerationOptions::default(),
        )
    }

    #[tokio::test]
    async fn test_answer_comes_from_preparer() {
        let preparer = Arc::new(ScriptedProvider::new(["pyglotaran is a global target analysis package."]));
        let facade = facade(
            vec!["It is a package for global and target analysis. TERMINATE"],
            preparer.clone(),
            7,
        );

        let answer = facade.ask("What is pyglotaran?").await.unwrap();
        assert_eq!(answer, "pyglotaran is a global target analysis package.");

        let prompts = preparer.prompts.lock().unwrap();
        let body = &prompts[0][1].content;
        assert!(body.contains("Human: What is pyglotaran?"));
        assert!(body.contains("DISCUSSION =="));
        assert!(body.contains("generic_agent:\nIt is a package for global and target analysis."));
        assert!(!body.contains("TERMINATE"));
    }

    #[tokio::test]
    async fn test_ceiling_still_gives_best_effort_answer() {
        let preparer = Arc::new(ScriptedProvider::failing());
        let facade = facade(vec!["Try fitting with a sequential scheme."; 10], preparer, 7);

        let answer = facade.ask("How do I fit?").await.unwrap();
        // Round 7 belongs to generic_agent: generic, debugger, proxy, generic, ...
        assert_eq!(answer, "Try fitting with a sequential scheme.");
    }

    #[tokio::test]
    async fn test_meta_messages_are_suppressed() {
        let preparer = Arc::new(ScriptedProvider::new(["final"]));
        let facade = facade(vec!["Looking into it.", "Done. TERMINATE"], preparer.clone(), 7);

        facade.ask("Help").await.unwrap();
        let prompts = preparer.prompts.lock().unwrap();
        let body = &prompts[0][1].content;
        assert!(!body.contains(DEFAULT_AUTO_REPLY));
        assert!(body.contains("Looking into it."));
        assert!(body.contains("debugger_agent:\nNot my ownership."));
    }

    #[tokio::test]
    async fn test_provider_adapter_splits_history() {
        let preparer = Arc::new(ScriptedProvider::new(["second answer"]));
        let provider = FacadeProvider::new(Arc::new(facade(vec!["ok TERMINATE"], preparer.clone(), 7)));

        let messages = vec![
            Message::system("ignored"),
            Message::user("first question"),
            Message::assistant("first answer"),
            Message::user("second question"),
        ];
        let mut stream = provider
            .complete_stream(&messages, &GenerationOptions::default())
            .await
            .unwrap();
        let chunk = stream.next().await.unwrap().unwrap();
        assert_eq!(chunk.delta, "second answer");
        assert!(chunk.done);

        let prompts = preparer.prompts.lock().unwrap();
        let body = &prompts[0][1].content;
        assert!(body.starts_with("Human: first question\nAI: first answer\n"));
        assert!(body.contains("Human: second question"));
    }
}
