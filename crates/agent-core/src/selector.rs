//! Auto speaker selection
//!
//! Resolves [`RoutingDecision::Auto`](crate::router::RoutingDecision::Auto)
//! by asking an LLM to play a role-matching game over the eligible agents.
//! The session only ever hands over eligible candidates; the selector's job
//! is to pick one of them by name.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{AgentError, Result};
use crate::message::{Message, Transcript};
use crate::provider::{GenerationOptions, LlmProvider};
use crate::roster::RosterMember;

/// Role-play prompt; `{roles}` and `{agentlist}` are substituted.
pub const SELECT_SPEAKER_TEMPLATE: &str = "You are in a role play game. \
The following roles are available:\n{roles}.\n\
Read the following conversation.\n\
Then select the next role from {agentlist} to play. Only return the role.";

const SELECT_SPEAKER_PROMPT: &str = "Read the above conversation. \
Then select the next role from {agentlist} to play. Only return the role.";

/// Generic speaker selection mechanism
#[async_trait]
pub trait SpeakerSelector: Send + Sync {
    /// Choose one of `candidates` (never empty) by name
    async fn select(&self, candidates: &[&RosterMember], transcript: &Transcript) -> Result<String>;
}

/// LLM-driven role matching
pub struct LlmSpeakerSelector {
    provider: Arc<dyn LlmProvider>,
    options: GenerationOptions,
    template: String,
}

impl LlmSpeakerSelector {
    pub fn new(provider: Arc<dyn LlmProvider>, options: GenerationOptions) -> Self {
        Self {
            provider,
            options,
            template: SELECT_SPEAKER_TEMPLATE.into(),
        }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    fn build_messages(&self, candidates: &[&RosterMember], transcript: &Transcript) -> Vec<Message> {
        let roles = candidates
            .iter()
            .map(|m| format!("{}: {}", m.name(), m.agent.description().trim()))
            .collect::<Vec<_>>()
            .join("\n");
        let agentlist = format!(
            "[{}]",
            candidates.iter().map(|m| m.name()).collect::<Vec<_>>().join(", ")
        );

        let mut messages = vec![Message::system(
            self.template
                .replace("{roles}", &roles)
                .replace("{agentlist}", &agentlist),
        )];
        for msg in transcript.messages() {
            let content = match &msg.name {
                Some(name) => format!("{}:\n{}", name, msg.content),
                None => msg.content.clone(),
            };
            messages.push(Message::user(content));
        }
        messages.push(Message::system(
            SELECT_SPEAKER_PROMPT.replace("{agentlist}", &agentlist),
        ));
        messages
    }
}

/// Match a free-form selector reply against candidate names
pub fn match_candidate(reply: &str, candidates: &[&RosterMember]) -> Option<String> {
    let reply = reply.trim();
    if let Some(exact) = candidates.iter().find(|m| m.name() == reply) {
        return Some(exact.name().to_string());
    }

    let lowered = reply.to_lowercase();
    let mentioned: Vec<_> = candidates
        .iter()
        .filter(|m| lowered.contains(&m.name().to_lowercase()))
        .collect();
    match mentioned.as_slice() {
        [only] => Some(only.name().to_string()),
        _ => None,
    }
}

#[async_trait]
impl SpeakerSelector for LlmSpeakerSelector {
    async fn select(&self, candidates: &[&RosterMember], transcript: &Transcript) -> Result<String> {
        if let [only] = candidates {
            return Ok(only.name().to_string());
        }

        let messages = self.build_messages(candidates, transcript);
        let completion = self.provider.complete(&messages, &self.options).await?;

        match_candidate(&completion.content, candidates).ok_or_else(|| {
            AgentError::Selection(format!("no single role in reply: {}", completion.content.trim()))
        })
    }
}
