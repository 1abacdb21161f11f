//! # Simulation
//!
//! Backs the `generate_model_parameter_data_files` tool: a pyglotaran
//! model definition, its starting parameters and a simulated dataset.

pub mod files;
pub mod kinetics;
pub mod model;
pub mod netcdf;

use std::path::{Path, PathBuf};

pub use kinetics::{Dataset, simulate};
pub use model::{Axis, Coordinates, Irf, KineticParameters, Settings, SimulationConfig, SpectralParameters};

use crate::error::{AssistantError, Result};

/// Output file names
#[derive(Clone, Debug)]
pub struct FileNames {
    pub model: String,
    pub parameters: String,
    pub data: String,
}

impl Default for FileNames {
    fn default() -> Self {
        Self {
            model: "model.yaml".into(),
            parameters: "parameter.csv".into(),
            data: "dataset.nc".into(),
        }
    }
}

async fn write_all(config: &SimulationConfig, dir: &Path, names: &FileNames) -> Result<Vec<PathBuf>> {
    config.validate()?;
    let model = files::model_yaml(config)?;
    let parameters = files::parameters_csv(config);
    let data = netcdf::encode_dataset(&simulate(config)?)?;

    let outputs = [
        (dir.join(&names.model), model.into_bytes()),
        (dir.join(&names.parameters), parameters.into_bytes()),
        (dir.join(&names.data), data),
    ];

    let mut written = Vec::with_capacity(outputs.len());
    for (path, bytes) in outputs {
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| AssistantError::Generation(format!("{}: {}", path.display(), e)))?;
        written.push(path);
    }
    Ok(written)
}

/// Write model, parameter and data files into `dir`
///
/// Any failure collapses into `Files could not be created.`; the cause is
/// logged.
pub async fn generate_files(config: &SimulationConfig, dir: &Path, names: &FileNames) -> Result<Vec<PathBuf>> {
    match write_all(config, dir, names).await {
        Ok(paths) => {
            tracing::info!(files = paths.len(), dir = %dir.display(), "Simulation files written");
            Ok(paths)
        }
        Err(e) => {
            tracing::error!(error = %e, "File generation failed");
            Err(AssistantError::Generation("Files could not be created.".into()))
        }
    }
}
