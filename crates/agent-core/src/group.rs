//! Conversation Session
//!
//! The group chat run loop. Each round asks the [`TurnRouter`] who speaks
//! next, resolves `Auto` through the [`SpeakerSelector`], lets that agent
//! act on the transcript and, when it asks for a tool, has the proxy
//! executor answer before the round ends.
//!
//! Invariants held here rather than trusted to collaborators:
//! - the transcript is append-only and has a single writer (this loop);
//! - every tool call request is followed by exactly one tool result;
//! - the same agent is never picked twice in a row, whatever the router or
//!   selector return;
//! - at most `max_round` rounds run.

use std::sync::Arc;

use crate::agent::{ChatAgent, TurnContext};
use crate::error::AgentError;
use crate::message::{Message, Transcript};
use crate::roster::AgentRoster;
use crate::router::{RoutingDecision, TurnRouter};
use crate::selector::SpeakerSelector;
use crate::termination;
use crate::tool::ToolResult;

/// Session configuration
#[derive(Clone, Debug)]
pub struct GroupChatConfig {
    /// Hard ceiling on the number of rounds
    pub max_round: usize,

    /// Prepend a system message introducing every roster member
    pub send_introductions: bool,

    /// Predicate evaluated against the newest message after each round
    pub is_termination_msg: fn(&Message) -> bool,
}

impl Default for GroupChatConfig {
    fn default() -> Self {
        Self {
            max_round: 7,
            send_introductions: true,
            is_termination_msg: termination::is_termination_msg,
        }
    }
}

/// Why a session stopped
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The termination predicate matched
    Terminated,
    /// The round ceiling was reached
    MaxRounds,
}

/// Outcome of a completed session
#[derive(Clone, Debug)]
pub struct GroupRun {
    /// Full transcript including the seed messages
    pub transcript: Transcript,

    /// Index of the first message produced by an agent
    pub discussion_start: usize,

    /// Rounds executed
    pub rounds: usize,

    /// Agents in the order they spoke (tool executions included)
    pub speakers: Vec<String>,

    pub stop: StopReason,
}

impl GroupRun {
    /// Messages produced by the agents
    pub fn discussion(&self) -> &[Message] {
        self.transcript.since(self.discussion_start)
    }
}

/// One multi-agent conversation session
pub struct GroupChat {
    roster: Arc<AgentRoster>,
    router: TurnRouter,
    selector: Arc<dyn SpeakerSelector>,
    config: GroupChatConfig,
}

impl GroupChat {
    pub fn new(
        roster: Arc<AgentRoster>,
        selector: Arc<dyn SpeakerSelector>,
        config: GroupChatConfig,
    ) -> Self {
        Self {
            router: roster.router(),
            roster,
            selector,
            config,
        }
    }

    pub fn roster(&self) -> &AgentRoster {
        &self.roster
    }

    pub fn config(&self) -> &GroupChatConfig {
        &self.config
    }

    /// Run a full session for `request`.
    ///
    /// `history` is earlier conversation context; it is visible to the
    /// agents but never routed.
    pub async fn run(&self, history: &[Message], request: Message) -> GroupRun {
        let mut transcript = Transcript::new();
        if self.config.send_introductions {
            transcript.push(Message::system(self.roster.introductions()));
        }
        for message in history {
            transcript.push(message.clone());
        }
        transcript.push(request);
        let discussion_start = transcript.len();

        let mut last_speaker: Option<String> = None;
        let mut speakers = Vec::new();
        let mut rounds = 0;
        let mut stop = StopReason::MaxRounds;

        while rounds < self.config.max_round {
            rounds += 1;

            let decision = self.router.route(last_speaker.as_deref(), &transcript);
            let speaker = self
                .resolve(decision, last_speaker.as_deref(), &transcript)
                .await;
            tracing::debug!(round = rounds, agent = %speaker, "Speaker selected");

            let message = self.dispatch(&speaker, &transcript).await;
            let pending = message.tool_call.clone();
            transcript.push(message);
            speakers.push(speaker.clone());
            last_speaker = Some(speaker.clone());

            let executor = self.roster.executor();
            if let Some(call) = pending.filter(|_| speaker != executor.name()) {
                let result = if self.roster.is_permitted(&speaker, &call.name) {
                    self.dispatch(executor.name(), &transcript).await
                } else {
                    let err = AgentError::ToolNotPermitted {
                        agent: speaker.clone(),
                        tool: call.name.clone(),
                    };
                    tracing::warn!(agent = %speaker, tool = %call.name, "Tool call refused");
                    let mut refused = ToolResult::failure(&call.name, format!("Error: {}", err));
                    refused.id = call.id.clone();
                    executor.result_message(&refused)
                };
                transcript.push(result);
                speakers.push(executor.name().to_string());
                last_speaker = Some(executor.name().to_string());
            }

            if transcript.last().is_some_and(|m| self.is_termination(m)) {
                stop = StopReason::Terminated;
                break;
            }
        }

        tracing::info!(rounds, stop = ?stop, messages = transcript.len(), "Group chat finished");

        GroupRun {
            transcript,
            discussion_start,
            rounds,
            speakers,
            stop,
        }
    }

    /// The session predicate, or the predicate of the message's author
    fn is_termination(&self, message: &Message) -> bool {
        (self.config.is_termination_msg)(message)
            || message
                .name
                .as_deref()
                .and_then(|name| self.roster.get(name))
                .is_some_and(|member| member.agent.is_termination_msg(message))
    }

    /// Turn a routing decision into a concrete, non-repeating speaker
    async fn resolve(
        &self,
        decision: RoutingDecision,
        previous: Option<&str>,
        transcript: &Transcript,
    ) -> String {
        if let RoutingDecision::Agent(name) = decision {
            if Some(name.as_str()) != previous && self.roster.contains(&name) {
                return name;
            }
            tracing::warn!(agent = %name, "Routed speaker rejected, falling back to auto selection");
        }

        let candidates = self.roster.candidates(previous);
        let Some(first) = candidates.first() else {
            return self.roster.entry_point().to_string();
        };

        match self.selector.select(&candidates, transcript).await {
            Ok(name) if candidates.iter().any(|m| m.name() == name) => name,
            Ok(name) => {
                tracing::warn!(agent = %name, "Selector chose an ineligible speaker");
                first.name().to_string()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Speaker selection failed");
                first.name().to_string()
            }
        }
    }

    /// Let `speaker` act; failures become messages attributed to it
    async fn dispatch(&self, speaker: &str, transcript: &Transcript) -> Message {
        let Some(member) = self.roster.get(speaker) else {
            return Message::assistant(format!("Error: {}", AgentError::UnknownAgent(speaker.into())))
                .with_name(speaker);
        };

        let ctx = TurnContext {
            transcript,
            tools: self.roster.tools_for(speaker),
        };
        let mut message = match member.agent.act(&ctx).await {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(agent = %speaker, error = %e, "Agent turn failed");
                Message::assistant(format!("Error: {}", e))
            }
        };
        message.name = Some(speaker.to_string());
        message
    }
}
