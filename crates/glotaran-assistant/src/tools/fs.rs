//! Read File Tool

use async_trait::async_trait;

use agent_core::tool::ParameterSchema;
use agent_core::{Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema};

use super::{READ_FILE, Workspace};
use crate::error::AssistantError;

/// Returns the text of a non-notebook file
pub struct ReadFileTool {
    workspace: Workspace,
}

impl ReadFileTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: READ_FILE.into(),
            description: "Read a code file (not a Jupyter notebook) for debugging. Returns the file contents.".into(),
            parameters: vec![ParameterSchema::required(
                "file_path",
                "string",
                "The relative file path of the file to read",
            )],
            category: Some("files".into()),
            has_side_effects: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let path = self.workspace.resolve(call.required_str("file_path")?);
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| AssistantError::file(&path, &e))?;

        tracing::debug!(path = %path.display(), bytes = content.len(), "File read");
        Ok(ToolResult::success(READ_FILE, content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_reads_relative_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("fit.py"), "import glotaran\n").unwrap();

        let tool = ReadFileTool::new(Workspace::new(dir.path()));
        let result = tool
            .execute(&ToolCall::new(READ_FILE).arg("file_path", json!("fit.py")))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.output, "import glotaran\n");
    }

    #[tokio::test]
    async fn test_missing_file_is_file_error() {
        let dir = tempfile::tempdir().unwrap();
        let tool = ReadFileTool::new(Workspace::new(dir.path()));
        let err = tool
            .execute(&ToolCall::new(READ_FILE).arg("file_path", json!("nope.py")))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("File not found"));
    }
}
