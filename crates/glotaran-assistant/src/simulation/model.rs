//! Simulation Inputs
//!
//! The parameter groups an agent supplies when asking for model, parameter
//! and data files. Field names match what the LLM sees in the tool schema.

use serde::{Deserialize, Serialize};

use crate::error::{AssistantError, Result};

/// Upper bound on points along a single axis
const MAX_AXIS_POINTS: usize = 100_000;

/// Upper bound on `time × spectral` points in the simulated dataset
pub const MAX_DATA_POINTS: usize = 10_000_000;

/// Decay rates, one per species
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KineticParameters {
    pub decay_rates: Vec<f64>,
}

/// Skewed-gaussian spectral shape per species
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpectralParameters {
    pub amplitude: Vec<f64>,
    pub location: Vec<f64>,
    pub width: Vec<f64>,
    pub skewness: Vec<f64>,
}

/// Either explicit values or an `arange`-style range (end exclusive)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Axis {
    Values(Vec<f64>),
    Range { min: f64, max: f64, step: f64 },
}

impl Axis {
    /// Number of points, checked without materialising the axis
    pub fn point_count(&self) -> Result<usize> {
        match self {
            Axis::Values(values) => {
                if values.is_empty() {
                    return Err(AssistantError::Generation("Axis has no values".into()));
                }
                Ok(values.len())
            }
            Axis::Range { min, max, step } => {
                if !(*step > 0.0) || !(max > min) {
                    return Err(AssistantError::Generation(format!(
                        "Invalid axis range {}..{} step {}",
                        min, max, step
                    )));
                }
                let count = ((max - min) / step).ceil();
                if !(count <= MAX_AXIS_POINTS as f64) {
                    return Err(AssistantError::Generation(format!(
                        "Axis has {} points, limit is {}",
                        count, MAX_AXIS_POINTS
                    )));
                }
                Ok(count as usize)
            }
        }
    }

    pub fn values(&self) -> Result<Vec<f64>> {
        let count = self.point_count()?;
        match self {
            Axis::Values(values) => Ok(values.clone()),
            Axis::Range { min, step, .. } => Ok((0..count).map(|i| min + i as f64 * step).collect()),
        }
    }
}

/// Time and spectral axes of the dataset
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub time: Axis,
    pub spectral: Axis,
}

/// Other simulation settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Standard deviation of the added gaussian noise
    #[serde(default)]
    pub stdev_noise: f64,

    #[serde(default)]
    pub seed: u64,

    #[serde(default)]
    pub add_gaussian_irf: bool,

    /// Sequential (A -> B -> C) instead of parallel decays
    #[serde(default)]
    pub use_sequential_scheme: bool,
}

/// Gaussian instrument response function
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Irf {
    pub center: f64,
    pub width: f64,
}

/// Everything needed to build the three output files
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub kinetic_parameters: KineticParameters,
    pub spectral_parameters: SpectralParameters,
    pub coordinates: Coordinates,
    pub settings: Settings,
    pub irf: Irf,
}

impl SimulationConfig {
    /// Number of species
    pub fn species(&self) -> usize {
        self.kinetic_parameters.decay_rates.len()
    }

    pub fn validate(&self) -> Result<()> {
        let n = self.species();
        if n == 0 {
            return Err(AssistantError::Generation("At least one decay rate is required".into()));
        }
        let spectral = &self.spectral_parameters;
        for (name, len) in [
            ("amplitude", spectral.amplitude.len()),
            ("location", spectral.location.len()),
            ("width", spectral.width.len()),
            ("skewness", spectral.skewness.len()),
        ] {
            if len != n {
                return Err(AssistantError::Generation(format!(
                    "{} has {} entries, expected one per decay rate ({})",
                    name, len, n
                )));
            }
        }
        if self.kinetic_parameters.decay_rates.iter().any(|k| !k.is_finite() || *k < 0.0) {
            return Err(AssistantError::Generation("Decay rates must be finite and non-negative".into()));
        }
        if spectral.width.iter().any(|w| !(*w > 0.0)) {
            return Err(AssistantError::Generation("Spectral widths must be positive".into()));
        }
        if self.settings.add_gaussian_irf && !(self.irf.width > 0.0) {
            return Err(AssistantError::Generation("IRF width must be positive".into()));
        }
        if !(self.settings.stdev_noise >= 0.0) {
            return Err(AssistantError::Generation("Noise deviation must be non-negative".into()));
        }
        let time = self.coordinates.time.point_count()?;
        let spectral = self.coordinates.spectral.point_count()?;
        match time.checked_mul(spectral) {
            Some(points) if points <= MAX_DATA_POINTS => Ok(()),
            _ => Err(AssistantError::Generation(format!(
                "Dataset of {} x {} points exceeds the limit of {}",
                time, spectral, MAX_DATA_POINTS
            ))),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn two_species(sequential: bool) -> SimulationConfig {
        SimulationConfig {
            kinetic_parameters: KineticParameters { decay_rates: vec![0.5, 0.05] },
            spectral_parameters: SpectralParameters {
                amplitude: vec![1.0, 0.8],
                location: vec![620.0, 680.0],
                width: vec![40.0, 50.0],
                skewness: vec![0.0, 0.1],
            },
            coordinates: Coordinates {
                time: Axis::Range { min: -1.0, max: 20.0, step: 0.5 },
                spectral: Axis::Range { min: 600.0, max: 700.0, step: 10.0 },
            },
            settings: Settings {
                stdev_noise: 0.0,
                seed: 42,
                add_gaussian_irf: true,
                use_sequential_scheme: sequential,
            },
            irf: Irf { center: 0.0, width: 0.1 },
        }
    }
}
