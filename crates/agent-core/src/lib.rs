//! # agent-core
//!
//! Multi-agent group conversation engine with a provider-agnostic LLM
//! abstraction and a capability-checked tool system.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         FacadeAgent                              │
//! │  ┌──────────────────────────────────────────────────────────┐    │
//! │  │                      GroupChat                           │    │
//! │  │  ┌────────────┐  ┌─────────────────┐  ┌──────────────┐   │    │
//! │  │  │ TurnRouter │──│ SpeakerSelector │──│ AgentRoster  │   │    │
//! │  │  └────────────┘  └─────────────────┘  └──────┬───────┘   │    │
//! │  │                                              │           │    │
//! │  │          ChatAgent ── ProxyExecutor ── ToolRegistry      │    │
//! │  └──────────────────────────────────────────────────────────┘    │
//! │                          LlmProvider                             │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `LlmProvider` trait enables swapping between Ollama, OpenAI-compatible
//! servers, or the facade itself without changing agent logic.

pub mod agent;
pub mod error;
pub mod facade;
pub mod group;
pub mod message;
pub mod provider;
pub mod roster;
pub mod router;
pub mod selector;
pub mod session;
pub mod termination;
pub mod tool;

#[cfg(test)]
mod testing;

pub use agent::{AgentConfig, ChatAgent, LlmAgent, ProxyExecutor, TurnContext};
pub use error::{AgentError, Result};
pub use facade::{FacadeAgent, FacadeProvider, GroupFactory};
pub use group::{GroupChat, GroupChatConfig, GroupRun, StopReason};
pub use message::{Message, Role, Transcript};
pub use provider::{GenerationOptions, LlmProvider, ProviderChain};
pub use roster::{AgentKind, AgentRoster, CapabilityGrant, RosterMember};
pub use router::{RoutingDecision, TurnRouter};
pub use selector::{LlmSpeakerSelector, SpeakerSelector};
pub use session::{MemorySessionStore, Session, SessionId, SessionStore};
pub use termination::{DEFAULT_AUTO_REPLY, TERMINATE, is_termination_msg};
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult, ToolSchema};
