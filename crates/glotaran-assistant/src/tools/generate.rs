//! Model / Parameter / Data File Generation Tool

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::json;

use agent_core::tool::ParameterSchema;
use agent_core::{AgentError, Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema};

use super::{GENERATE_FILES, Workspace};
use crate::simulation::{FileNames, SimulationConfig, generate_files};

pub struct GenerateFilesTool {
    workspace: Workspace,
}

impl GenerateFilesTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

fn required<T: DeserializeOwned>(call: &ToolCall, key: &str) -> CoreResult<T> {
    call.typed_arg(key)?
        .ok_or_else(|| AgentError::ToolValidation(format!("Missing {}", key)))
}

fn file_name(call: &ToolCall, key: &str, default: String) -> CoreResult<String> {
    let name: Option<String> = call.typed_arg(key)?;
    Ok(name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()).unwrap_or(default))
}

#[async_trait]
impl Tool for GenerateFilesTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: GENERATE_FILES.into(),
            description: "Generate pyglotaran model, parameter and data files from simulation parameters. \
                kinetic_parameters = {\"decay_rates\": [..]}; \
                spectral_parameters = {\"amplitude\": [..], \"location\": [..], \"width\": [..], \"skewness\": [..]} with one entry per decay rate; \
                coordinates = {\"time\": {\"min\", \"max\", \"step\"} or [..], \"spectral\": {\"min\", \"max\", \"step\"} or [..]}; \
                settings = {\"stdev_noise\", \"seed\", \"add_gaussian_irf\", \"use_sequential_scheme\"}; \
                irf = {\"center\", \"width\"}."
                .into(),
            parameters: vec![
                ParameterSchema::required("kinetic_parameters", "object", "Kinetic parameters for the simulation."),
                ParameterSchema::required("spectral_parameters", "object", "Spectral parameters for the simulation."),
                ParameterSchema::required(
                    "coordinates",
                    "object",
                    "Combined time and spectral coordinates for the simulation.",
                ),
                ParameterSchema::required("settings", "object", "Other settings for the simulation."),
                ParameterSchema::required(
                    "irf",
                    "object",
                    "Instrument Response Function (IRF) settings for the simulation.",
                ),
                ParameterSchema::optional(
                    "model_file_name",
                    "string",
                    "The name of the file to save the model.",
                    Some(json!("model.yaml")),
                ),
                ParameterSchema::optional(
                    "parameter_file_name",
                    "string",
                    "The name of the file to save the parameters.",
                    Some(json!("parameter.csv")),
                ),
                ParameterSchema::optional(
                    "data_file_name",
                    "string",
                    "The name of the file to save the data.",
                    Some(json!("dataset.nc")),
                ),
            ],
            category: Some("simulation".into()),
            has_side_effects: true,
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let config = SimulationConfig {
            kinetic_parameters: required(call, "kinetic_parameters")?,
            spectral_parameters: required(call, "spectral_parameters")?,
            coordinates: required(call, "coordinates")?,
            settings: required(call, "settings")?,
            irf: required(call, "irf")?,
        };
        let defaults = FileNames::default();
        let names = FileNames {
            model: file_name(call, "model_file_name", defaults.model)?,
            parameters: file_name(call, "parameter_file_name", defaults.parameters)?,
            data: file_name(call, "data_file_name", defaults.data)?,
        };

        let written = generate_files(&config, self.workspace.root(), &names).await?;
        let listing = written
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(", ");

        Ok(ToolResult::success(GENERATE_FILES, format!("Files created: {}", listing)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call() -> ToolCall {
        ToolCall::new(GENERATE_FILES)
            .arg("kinetic_parameters", json!({"decay_rates": [0.5, 0.05]}))
            .arg(
                "spectral_parameters",
                json!({
                    "amplitude": [1.0, 0.8],
                    "location": [620, 680],
                    "width": [40, 50],
                    "skewness": [0.0, 0.1]
                }),
            )
            .arg(
                "coordinates",
                json!({
                    "time": {"min": -1, "max": 20, "step": 0.5},
                    "spectral": {"min": 600, "max": 700, "step": 10}
                }),
            )
            .arg("settings", json!({"stdev_noise": 0.01, "seed": 7, "add_gaussian_irf": true}))
            .arg("irf", json!({"center": 0.0, "width": 0.1}))
    }

    #[tokio::test]
    async fn test_generates_named_files() {
        let dir = tempfile::tempdir().unwrap();
        let tool = GenerateFilesTool::new(Workspace::new(dir.path()));

        let result = tool
            .execute(&call().arg("data_file_name", json!("sim.nc")))
            .await
            .unwrap();
        assert_eq!(result.output, "Files created: model.yaml, parameter.csv, sim.nc");
        assert!(dir.path().join("sim.nc").exists());
        assert!(!dir.path().join("dataset.nc").exists());
    }

    #[tokio::test]
    async fn test_generation_failure_message() {
        let dir = tempfile::tempdir().unwrap();
        let tool = GenerateFilesTool::new(Workspace::new(dir.path()));

        let bad = call().arg("kinetic_parameters", json!({"decay_rates": [0.5]}));
        let err = tool.execute(&bad).await.unwrap_err();
        assert!(err.to_string().contains("Files could not be created."));
    }

    #[tokio::test]
    async fn test_malformed_argument_is_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let tool = GenerateFilesTool::new(Workspace::new(dir.path()));

        let bad = call().arg("irf", json!("narrow"));
        let err = tool.execute(&bad).await.unwrap_err();
        assert!(matches!(err, AgentError::ToolValidation(_)));
    }
}
