//! Retrieval Agent
//!
//! Wraps a [`Retriever`] with the sticky "current problem" used for
//! follow-up queries. The state belongs to one agent instance, and one
//! instance is built per conversation session, so nothing leaks across
//! sessions.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use agent_core::{ChatAgent, Message, Result as CoreResult, TurnContext};

use crate::error::Result;
use crate::knowledge::{RetrievedChunk, Retriever};
use crate::prompts;

pub const DEFAULT_N_RESULTS: usize = 3;

const UPDATE_CONTEXT: &str = "UPDATE CONTEXT";

/// Session-scoped retrieval memory
#[derive(Debug, Default)]
pub struct RetrievalState {
    /// Last question that triggered a fresh query
    pub problem: Option<String>,
    pub n_results: usize,
    /// Chunks already handed out for `problem`
    pub seen_ids: HashSet<String>,
}

/// True when the first or last 20 characters ask for more context
pub fn wants_update_context(message: &str) -> bool {
    let chars: Vec<char> = message.chars().collect();
    let head: String = chars.iter().take(20).collect();
    let tail: String = chars[chars.len().saturating_sub(20)..].iter().collect();
    head.to_uppercase().contains(UPDATE_CONTEXT) || tail.to_uppercase().contains(UPDATE_CONTEXT)
}

pub struct RetrievalAgent {
    name: String,
    description: String,
    retriever: Arc<dyn Retriever>,
    state: Mutex<RetrievalState>,
}

impl RetrievalAgent {
    pub fn new(retriever: Arc<dyn Retriever>) -> Self {
        Self {
            name: prompts::RETRIEVAL_NAME.into(),
            description: prompts::RETRIEVAL_DESCRIPTION.into(),
            retriever,
            state: Mutex::new(RetrievalState { n_results: DEFAULT_N_RESULTS, ..Default::default() }),
        }
    }

    /// Current problem, if any
    pub async fn problem(&self) -> Option<String> {
        self.state.lock().await.problem.clone()
    }

    /// Context-augmented prompt for `message`, or `message` itself when
    /// nothing new was found
    pub async fn retrieve_content(&self, message: &str, n_results: usize) -> Result<String> {
        let n_results = n_results.max(1);
        let mut state = self.state.lock().await;
        state.n_results = n_results;

        let problem = match state.problem.clone() {
            Some(problem) if wants_update_context(message) => {
                tracing::debug!(seen = state.seen_ids.len(), "Updating retrieval context");
                problem
            }
            _ => {
                state.problem = Some(message.to_string());
                state.seen_ids.clear();
                message.to_string()
            }
        };

        let fetch = n_results + state.seen_ids.len();
        let chunks = self.retriever.query(&problem, fetch).await?;
        let fresh: Vec<RetrievedChunk> = chunks
            .into_iter()
            .filter(|c| !state.seen_ids.contains(&c.id))
            .take(n_results)
            .collect();

        if fresh.is_empty() {
            tracing::debug!(retriever = %self.retriever.name(), "No new context retrieved");
            return Ok(message.to_string());
        }

        state.seen_ids.extend(fresh.iter().map(|c| c.id.clone()));

        let context = fresh
            .iter()
            .map(|c| c.document.trim())
            .collect::<Vec<_>>()
            .join("\n\n");
        let mut sources: Vec<&str> = Vec::new();
        for source in fresh.iter().filter_map(|c| c.source.as_deref()) {
            if !sources.contains(&source) {
                sources.push(source);
            }
        }

        tracing::info!(chunks = fresh.len(), "Knowledge base context retrieved");
        Ok(prompts::retrieval_prompt(&problem, &context, &sources.join(", ")))
    }
}

#[async_trait]
impl ChatAgent for RetrievalAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn act(&self, ctx: &TurnContext<'_>) -> CoreResult<Message> {
        let question = ctx.transcript.last().map(|m| m.content.clone()).unwrap_or_default();
        let n_results = self.state.lock().await.n_results;
        let reply = self.retrieve_content(&question, n_results).await?;
        Ok(Message::user(reply).with_name(&self.name))
    }
}
