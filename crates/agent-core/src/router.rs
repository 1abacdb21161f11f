//! Turn Router
//!
//! Decides who speaks next in a group conversation. The policy is a fixed
//! decision table over the previous speaker:
//!
//! | previous speaker | next |
//! |------------------|------|
//! | none (session start) | entry point |
//! | proxy executor | entry point |
//! | anyone else | [`RoutingDecision::Auto`] |
//!
//! The router is total and pure. Speaker identities it does not recognise
//! fall through to `Auto`.

use crate::message::Transcript;

/// Outcome of a routing step
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoutingDecision {
    /// A specific agent speaks next
    Agent(String),

    /// Defer to the generic speaker selector
    Auto,
}

impl RoutingDecision {
    pub fn agent(name: impl Into<String>) -> Self {
        Self::Agent(name.into())
    }
}

/// Three-branch speaker selection policy
#[derive(Clone, Debug)]
pub struct TurnRouter {
    entry_point: String,
    proxy_executor: String,
}

impl TurnRouter {
    pub fn new(entry_point: impl Into<String>, proxy_executor: impl Into<String>) -> Self {
        Self {
            entry_point: entry_point.into(),
            proxy_executor: proxy_executor.into(),
        }
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    pub fn proxy_executor(&self) -> &str {
        &self.proxy_executor
    }

    /// Pick the next speaker.
    ///
    /// The transcript is accepted for signature stability; the table only
    /// depends on `last_speaker`.
    pub fn route(&self, last_speaker: Option<&str>, _transcript: &Transcript) -> RoutingDecision {
        match last_speaker {
            None => RoutingDecision::agent(&self.entry_point),
            Some(name) if name == self.proxy_executor => RoutingDecision::agent(&self.entry_point),
            Some(_) => RoutingDecision::Auto,
        }
    }
}
