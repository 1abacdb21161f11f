//! Dataset Simulation
//!
//! `data(t, λ) = Σ_i c_i(t) · s_i(λ) + noise`, where `c_i` are species
//! concentrations from first-order decays (optionally convolved with a
//! gaussian IRF) and `s_i` are skewed-gaussian spectra.

use rand::{Rng, SeedableRng, rngs::StdRng};

use super::model::SimulationConfig;
use crate::error::{AssistantError, Result};

/// Simulated dataset on a `time × spectral` grid
#[derive(Clone, Debug)]
pub struct Dataset {
    pub time: Vec<f64>,
    pub spectral: Vec<f64>,
    /// Row-major, one row per time point
    pub data: Vec<f64>,
}

impl Dataset {
    pub fn get(&self, t: usize, s: usize) -> f64 {
        self.data[t * self.spectral.len() + s]
    }
}

/// Complementary error function (Numerical Recipes `erfcc`, |ε| < 1.2e-7)
fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let poly = -z * z - 1.265_512_23
        + t * (1.000_023_68
            + t * (0.374_091_96
                + t * (0.096_784_18
                    + t * (-0.186_288_06
                        + t * (0.278_868_07
                            + t * (-1.135_203_98
                                + t * (1.488_515_87 + t * (-0.822_152_23 + t * 0.170_872_77))))))));
    let r = t * poly.exp();
    if x >= 0.0 { r } else { 2.0 - r }
}

/// `exp(-k t)` for `t ≥ 0`, optionally convolved with a gaussian IRF
fn decay(k: f64, t: f64, irf: Option<(f64, f64)>) -> f64 {
    match irf {
        None => {
            if t < 0.0 {
                0.0
            } else {
                (-k * t).exp()
            }
        }
        Some((mu, sigma)) => {
            let arg = (mu + k * sigma * sigma - t) / (std::f64::consts::SQRT_2 * sigma);
            let value = 0.5 * (k * (mu - t) + 0.5 * k * k * sigma * sigma).exp() * erfc(arg);
            if value.is_finite() { value } else { 0.0 }
        }
    }
}

/// Bateman coefficients: `c_j = Σ_{i≤j} b[j][i] · e_i`
fn sequential_coefficients(rates: &[f64]) -> Result<Vec<Vec<f64>>> {
    let n = rates.len();
    let mut b = vec![vec![0.0; n]; n];
    for j in 0..n {
        let feed: f64 = rates[..j].iter().product();
        for i in 0..=j {
            let mut denom = 1.0;
            for (m, k_m) in rates.iter().enumerate().take(j + 1) {
                if m != i {
                    let diff = k_m - rates[i];
                    if diff.abs() < 1e-12 {
                        return Err(AssistantError::Generation(
                            "Sequential scheme needs distinct decay rates".into(),
                        ));
                    }
                    denom *= diff;
                }
            }
            b[j][i] = feed / denom;
        }
    }
    Ok(b)
}

/// pyglotaran's skewed gaussian shape
pub fn skewed_gaussian(x: f64, amplitude: f64, location: f64, width: f64, skewness: f64) -> f64 {
    let ln2 = std::f64::consts::LN_2;
    if skewness.abs() < f64::EPSILON {
        let u = 2.0 * (x - location) / width;
        return amplitude * (-ln2 * u * u).exp();
    }
    let log_arg = 1.0 + 2.0 * skewness * (x - location) / width;
    if log_arg <= 0.0 {
        return 0.0;
    }
    let u = log_arg.ln() / skewness;
    amplitude * (-ln2 * u * u).exp()
}

/// Concentration matrix, row-major `time × species`
pub fn concentrations(config: &SimulationConfig, time: &[f64]) -> Result<Vec<f64>> {
    let rates = &config.kinetic_parameters.decay_rates;
    let n = rates.len();
    let irf = config
        .settings
        .add_gaussian_irf
        .then_some((config.irf.center, config.irf.width));

    let coefficients = if config.settings.use_sequential_scheme {
        Some(sequential_coefficients(rates)?)
    } else {
        None
    };

    let mut matrix = Vec::with_capacity(time.len() * n);
    for &t in time {
        let decays: Vec<f64> = rates.iter().map(|&k| decay(k, t, irf)).collect();
        match &coefficients {
            None => matrix.extend_from_slice(&decays),
            Some(b) => {
                for row in b {
                    matrix.push(row.iter().zip(&decays).map(|(b, e)| b * e).sum());
                }
            }
        }
    }
    Ok(matrix)
}

/// Spectra matrix, row-major `species × spectral`
pub fn spectra(config: &SimulationConfig, spectral: &[f64]) -> Vec<f64> {
    let p = &config.spectral_parameters;
    let mut matrix = Vec::with_capacity(config.species() * spectral.len());
    for i in 0..config.species() {
        for &x in spectral {
            matrix.push(skewed_gaussian(x, p.amplitude[i], p.location[i], p.width[i], p.skewness[i]));
        }
    }
    matrix
}

/// Standard normal sample via Box-Muller
fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = 1.0 - rng.r#gen::<f64>();
    let u2: f64 = rng.r#gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

/// Run the full simulation
pub fn simulate(config: &SimulationConfig) -> Result<Dataset> {
    config.validate()?;
    let time = config.coordinates.time.values()?;
    let spectral = config.coordinates.spectral.values()?;
    let n = config.species();

    let c = concentrations(config, &time)?;
    let s = spectra(config, &spectral);

    let mut rng = StdRng::seed_from_u64(config.settings.seed);
    let noise = config.settings.stdev_noise;

    let mut data = Vec::with_capacity(time.len() * spectral.len());
    for t in 0..time.len() {
        for l in 0..spectral.len() {
            let mut value: f64 = (0..n).map(|i| c[t * n + i] * s[i * spectral.len() + l]).sum();
            if noise > 0.0 {
                value += noise * standard_normal(&mut rng);
            }
            data.push(value);
        }
    }

    tracing::debug!(
        species = n,
        time_points = time.len(),
        spectral_points = spectral.len(),
        sequential = config.settings.use_sequential_scheme,
        "Dataset simulated"
    );

    Ok(Dataset { time, spectral, data })
}
