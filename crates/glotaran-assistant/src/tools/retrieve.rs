//! Retrieve Content Tool

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use agent_core::tool::ParameterSchema;
use agent_core::{Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema};

use super::RETRIEVE_CONTENT;
use crate::retrieval::{DEFAULT_N_RESULTS, RetrievalAgent};

/// Exposes the retrieval agent as a tool of the entry-point agent
pub struct RetrieveContentTool {
    agent: Arc<RetrievalAgent>,
}

impl RetrieveContentTool {
    pub fn new(agent: Arc<RetrievalAgent>) -> Self {
        Self { agent }
    }
}

#[async_trait]
impl Tool for RetrieveContentTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: RETRIEVE_CONTENT.into(),
            description: "Search the pyglotaran knowledge base. Use for questions or code generation about \
                pyglotaran, its models, parameters and datasets. Send `UPDATE CONTEXT` to get more context \
                for the previous question."
                .into(),
            parameters: vec![
                ParameterSchema::required(
                    "message",
                    "string",
                    "Refined message which keeps the original meaning and can be used to retrieve content for question answering.",
                ),
                ParameterSchema::optional("n_results", "integer", "number of results", Some(json!(DEFAULT_N_RESULTS))),
            ],
            category: Some("knowledge".into()),
            has_side_effects: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let message = call.required_str("message")?;
        let n_results: usize = call.typed_arg("n_results")?.unwrap_or(DEFAULT_N_RESULTS);
        let content = self.agent.retrieve_content(message, n_results).await?;
        Ok(ToolResult::success(RETRIEVE_CONTENT, content))
    }
}
