//! Agents
//!
//! A [`ChatAgent`] is one role in a group conversation: it reads the shared
//! transcript and produces the next message. Two implementations live here:
//!
//! - [`LlmAgent`]: a persona backed by an LLM. It may request tool calls by
//!   emitting a fenced `tool` JSON block.
//! - [`ProxyExecutor`]: runs the tool call pending on the newest message and
//!   reports the result. It never talks to an LLM.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::message::{Message, Role, Transcript};
use crate::provider::{GenerationOptions, LlmProvider};
use crate::termination::{self, DEFAULT_AUTO_REPLY};
use crate::tool::{ToolCall, ToolRegistry, ToolResult, ToolSchema, prompt_section};

/// Read-only view handed to an agent for one turn
pub struct TurnContext<'a> {
    /// The conversation so far
    pub transcript: &'a Transcript,

    /// Schemas of the tools this agent may request
    pub tools: &'a [ToolSchema],
}

/// One role in a group conversation
#[async_trait]
pub trait ChatAgent: Send + Sync {
    /// Unique name within the roster
    fn name(&self) -> &str;

    /// Short description used for introductions and auto speaker selection
    fn description(&self) -> &str;

    /// Produce this agent's next message
    async fn act(&self, ctx: &TurnContext<'_>) -> Result<Message>;

    /// Whether this agent considers its own `message` final.
    ///
    /// Consulted by the session alongside its configured predicate.
    fn is_termination_msg(&self, message: &Message) -> bool {
        termination::is_termination_msg(message)
    }
}

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Agent name (unique in the roster)
    pub name: String,

    /// Description shown to other agents and the speaker selector
    pub description: String,

    /// Persona / system prompt
    pub system_prompt: String,

    /// Generation options
    pub generation: GenerationOptions,

    /// Reply used when the model returns nothing
    pub default_auto_reply: String,
}

impl AgentConfig {
    pub fn new(name: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            system_prompt: system_prompt.into(),
            generation: GenerationOptions::default(),
            default_auto_reply: DEFAULT_AUTO_REPLY.into(),
        }
    }
}

/// An LLM-backed persona
pub struct LlmAgent {
    provider: Arc<dyn LlmProvider>,
    config: AgentConfig,
}

impl LlmAgent {
    pub fn new(provider: Arc<dyn LlmProvider>, config: AgentConfig) -> Self {
        Self { provider, config }
    }

    /// Build the full system prompt including granted tool descriptions
    fn build_system_prompt(&self, tools: &[ToolSchema]) -> String {
        let mut prompt = self.config.system_prompt.trim().to_string();

        if !tools.is_empty() {
            prompt.push_str("\n\n");
            prompt.push_str(&prompt_section(tools));
        }

        prompt
    }

    /// Present the shared transcript from this agent's point of view
    fn build_messages(&self, ctx: &TurnContext<'_>) -> Vec<Message> {
        let mut messages = Vec::with_capacity(ctx.transcript.len() + 1);
        messages.push(Message::system(self.build_system_prompt(ctx.tools)));

        for msg in ctx.transcript.messages() {
            let converted = match (&msg.role, msg.name.as_deref()) {
                (Role::System, _) => Message::system(&msg.content),
                (Role::Tool, _) => Message::tool(
                    &msg.content,
                    msg.metadata.as_ref().and_then(|m| m.tool_call_id.clone()),
                ),
                (_, Some(name)) if name == self.config.name => Message::assistant(&msg.content),
                (_, Some(name)) => Message::user(format!("{}:\n{}", name, msg.content)),
                (_, None) => Message::user(&msg.content),
            };
            messages.push(converted);
        }

        messages
    }

    /// Get configuration
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}

#[async_trait]
impl ChatAgent for LlmAgent {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn description(&self) -> &str {
        &self.config.description
    }

    async fn act(&self, ctx: &TurnContext<'_>) -> Result<Message> {
        let messages = self.build_messages(ctx);
        let completion = self
            .provider
            .complete(&messages, &self.config.generation)
            .await?;

        let content = if completion.content.trim().is_empty() {
            self.config.default_auto_reply.clone()
        } else {
            completion.content
        };

        let mut message = Message::assistant(&content).with_name(&self.config.name);
        if let Some(call) = parse_tool_call(&content) {
            tracing::debug!(agent = %self.config.name, tool = %call.name, "Tool call requested");
            message = message.with_tool_call(call);
        }
        Ok(message)
    }
}

/// Parse a tool call from an LLM response
pub fn parse_tool_call(content: &str) -> Option<ToolCall> {
    // Look for ```tool ... ``` blocks
    let tool_start = "```tool";
    let tool_end = "```";

    if let Some(start_idx) = content.find(tool_start) {
        let after_marker = &content[start_idx + tool_start.len()..];
        if let Some(end_idx) = after_marker.find(tool_end) {
            let json_str = after_marker[..end_idx].trim();

            if let Ok(call) = serde_json::from_str::<ToolCall>(json_str) {
                return Some(with_call_id(call));
            }
        }
    }

    // Fallback: try to find raw JSON with "tool" key
    parse_inline_tool_call(content).map(with_call_id)
}

fn with_call_id(mut call: ToolCall) -> ToolCall {
    if call.id.is_none() {
        call.id = Some(uuid::Uuid::new_v4().to_string());
    }
    call
}

fn parse_inline_tool_call(content: &str) -> Option<ToolCall> {
    if !content.contains(r#""tool""#) {
        return None;
    }

    let start = content.find('{')?;
    let end = content.rfind('}')?;

    if end <= start {
        return None;
    }

    serde_json::from_str::<ToolCall>(&content[start..=end]).ok()
}

/// Executes tool calls on behalf of the other agents
pub struct ProxyExecutor {
    name: String,
    description: String,
    tools: Arc<ToolRegistry>,
}

impl ProxyExecutor {
    pub fn new(name: impl Into<String>, description: impl Into<String>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            tools,
        }
    }

    /// Execute a tool call, converting every failure into a failure result
    pub async fn execute(&self, call: &ToolCall) -> ToolResult {
        tracing::debug!(tool = %call.name, "Executing tool");
        let mut result = match self.tools.execute(call).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(tool = %call.name, error = %e, "Tool call failed");
                ToolResult::failure(&call.name, format!("Error: {}", e))
            }
        };
        result.id = call.id.clone();
        result
    }

    /// Wrap a tool result as a transcript message from this executor
    pub fn result_message(&self, result: &ToolResult) -> Message {
        Message::tool(result.to_transcript_text(), result.id.clone()).with_name(&self.name)
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }
}

#[async_trait]
impl ChatAgent for ProxyExecutor {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn act(&self, ctx: &TurnContext<'_>) -> Result<Message> {
        match ctx.transcript.last().and_then(|m| m.tool_call.as_ref()) {
            Some(call) => {
                let result = self.execute(call).await;
                Ok(self.result_message(&result))
            }
            None => Ok(Message::user(DEFAULT_AUTO_REPLY).with_name(&self.name)),
        }
    }
}
