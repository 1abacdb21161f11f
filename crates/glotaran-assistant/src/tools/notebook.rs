//! Notebook Tools
//!
//! Reading code cells and outputs from an `.ipynb` file, and creating an
//! empty notebook.

use std::path::Path;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::io::AsyncWriteExt;

use agent_core::tool::ParameterSchema;
use agent_core::{Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema};

use super::{CREATE_NOTEBOOK, READ_NOTEBOOK, Workspace};
use crate::error::{AssistantError, Result};

const SEPARATOR: &str = "_____________________________________________";

pub const ALREADY_EXISTS: &str = "A notebook with that name already exists.";

/// nbformat multiline strings are either a string or a list of lines
fn text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(lines)) => lines.iter().filter_map(Value::as_str).collect(),
        _ => String::new(),
    }
}

fn render_output(output: &Value) -> Option<String> {
    match output.get("output_type").and_then(Value::as_str) {
        Some("stream") => Some(text(output.get("text")).trim().to_string()),
        Some("execute_result") => {
            Some(text(output.get("data").and_then(|d| d.get("text/plain"))).trim().to_string())
        }
        Some("error") => {
            let traceback: Vec<&str> = output
                .get("traceback")
                .and_then(Value::as_array)
                .map(|lines| lines.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default();
            Some(traceback.join("\n").trim().to_string())
        }
        _ => None,
    }
}

/// Render the first `max_cells` cells (all when `None` or zero)
pub fn render_notebook(notebook: &Value, max_cells: Option<usize>) -> Result<String> {
    let cells = notebook
        .get("cells")
        .and_then(Value::as_array)
        .ok_or_else(|| AssistantError::Notebook("missing cells".into()))?;

    let limit = match max_cells {
        Some(n) if n > 0 => n.min(cells.len()),
        _ => cells.len(),
    };

    let mut lines: Vec<String> = Vec::new();
    for (index, cell) in cells.iter().take(limit).enumerate() {
        lines.push(SEPARATOR.into());

        if cell.get("cell_type").and_then(Value::as_str) == Some("code") {
            lines.push(format!("CELL INPUT {}:", index + 1));
            lines.push(text(cell.get("source")).trim().to_string());

            if let Some(outputs) = cell.get("outputs") {
                lines.push(format!("CELL OUTPUT {}:", index + 1));
                let outputs = outputs
                    .as_array()
                    .ok_or_else(|| AssistantError::Notebook(format!("cell {} outputs", index + 1)))?;
                lines.extend(outputs.iter().filter_map(render_output));
            }
        }

        lines.push(SEPARATOR.into());
        lines.push(String::new());
    }

    Ok(lines.join("\n"))
}

pub async fn read_notebook_content(path: &Path, max_cells: Option<usize>) -> Result<String> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| AssistantError::file(path, &e))?;
    let notebook: Value = serde_json::from_str(&raw).map_err(|e| AssistantError::Notebook(e.to_string()))?;
    render_notebook(&notebook, max_cells)
}

/// Empty nbformat 4.5 notebook
fn empty_notebook() -> Value {
    json!({
        "cells": [],
        "metadata": {},
        "nbformat": 4,
        "nbformat_minor": 5
    })
}

/// Create `name` (`.ipynb` appended when missing); `Ok(None)` when written,
/// `Ok(Some(msg))` when a notebook of that name exists
pub async fn create_empty_notebook(workspace: &Workspace, name: &str) -> Result<Option<String>> {
    let name = name.trim();
    let file_name = if name.ends_with(".ipynb") { name.to_string() } else { format!("{}.ipynb", name) };
    let path = workspace.resolve(&file_name);

    if path.exists() {
        return Ok(Some(ALREADY_EXISTS.into()));
    }

    let body = serde_json::to_string_pretty(&empty_notebook())?;
    let mut file = match tokio::fs::OpenOptions::new().write(true).create_new(true).open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(Some(ALREADY_EXISTS.into())),
        Err(e) => return Err(AssistantError::Write(e.to_string())),
    };
    file.write_all(body.as_bytes())
        .await
        .map_err(|e| AssistantError::Write(e.to_string()))?;
    file.write_all(b"\n").await.map_err(|e| AssistantError::Write(e.to_string()))?;
    file.flush().await.map_err(|e| AssistantError::Write(e.to_string()))?;

    tracing::info!(path = %path.display(), "Notebook created");
    Ok(None)
}

pub struct ReadNotebookTool {
    workspace: Workspace,
}

impl ReadNotebookTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for ReadNotebookTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: READ_NOTEBOOK.into(),
            description: "Read the code cells of a Jupyter notebook and their outputs for debugging.".into(),
            parameters: vec![
                ParameterSchema::required("notebook_path", "string", "The relative path to the notebook file"),
                ParameterSchema::optional(
                    "max_cells",
                    "integer",
                    "Maximum number of cells to include (inclusive); all cells when omitted",
                    None,
                ),
            ],
            category: Some("files".into()),
            has_side_effects: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let path = self.workspace.resolve(call.required_str("notebook_path")?);
        let max_cells: Option<usize> = call.typed_arg("max_cells")?;
        let content = read_notebook_content(&path, max_cells).await?;
        Ok(ToolResult::success(READ_NOTEBOOK, content))
    }
}

pub struct CreateNotebookTool {
    workspace: Workspace,
}

impl CreateNotebookTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for CreateNotebookTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: CREATE_NOTEBOOK.into(),
            description: "Create a new, empty Jupyter notebook.".into(),
            parameters: vec![ParameterSchema::required(
                "notebook_name",
                "string",
                "The name of the notebook without the .ipynb extension",
            )],
            category: Some("notebooks".into()),
            has_side_effects: true,
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let name = call.required_str("notebook_name")?;
        let output = match create_empty_notebook(&self.workspace, name).await? {
            Some(message) => message,
            None => format!("Notebook '{}' created.", name.trim()),
        };
        Ok(ToolResult::success(CREATE_NOTEBOOK, output))
    }
}
