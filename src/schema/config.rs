//! Configuration types for reaction-diffusion simulation parameters.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Default convergence threshold on the per-batch change metric.
pub const DEFAULT_CONVERGENCE_THRESHOLD: f32 = 1e-5;

fn default_convergence_threshold() -> f32 {
    DEFAULT_CONVERGENCE_THRESHOLD
}

fn default_divergence_guard() -> bool {
    true
}

/// Top-level simulation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Grid width in cells.
    pub width: usize,
    /// Grid height in cells.
    pub height: usize,
    /// Integration parameters (may be edited between batches).
    pub params: SimulationParameters,
    /// Runs stop as converged once the change metric drops below this.
    #[serde(default = "default_convergence_threshold")]
    pub convergence_threshold: f32,
    /// Surface NaN/Inf after a batch as an error instead of stepping on.
    #[serde(default = "default_divergence_guard")]
    pub divergence_guard: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            width: 200,
            height: 200,
            params: SimulationParameters::default(),
            convergence_threshold: DEFAULT_CONVERGENCE_THRESHOLD,
            divergence_guard: true,
        }
    }
}

/// Parameters read by every integrator call.
///
/// Owned by the caller. The engine never keeps a copy between batches, so any
/// field can be changed while a run is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationParameters {
    /// Diffusion coefficient of the activator `A`.
    pub da: f32,
    /// Diffusion coefficient of the inhibitor `B` (typically much larger than `da`).
    pub db: f32,
    /// Constant reaction offset for `A`.
    pub alpha: f32,
    /// Coupling rate of `B` towards `A`.
    pub beta: f32,
    /// Time step.
    pub dt: f32,
    /// Spatial step.
    pub dx: f32,
    /// Micro-steps per driving iteration.
    pub steps_per_frame: u32,
    /// Hard cap on the total number of micro-steps.
    pub max_steps: u64,
    /// Threshold for rendering and contouring.
    pub bias: f32,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            da: 1.0,
            db: 100.0,
            alpha: -0.005,
            beta: 10.0,
            dt: 0.001,
            dx: 1.0,
            steps_per_frame: 50,
            max_steps: 50_000,
            bias: 0.0,
        }
    }
}

impl SimulationParameters {
    /// Largest `dt` for which explicit Euler diffusion stays stable:
    /// `dx² / (4 * max(da, db))`.
    ///
    /// Infinite when neither species diffuses.
    pub fn stability_limit(&self) -> f32 {
        let d_max = self.da.max(self.db);
        if d_max <= 0.0 {
            return f32::INFINITY;
        }
        self.dx * self.dx / (4.0 * d_max)
    }

    /// Check `dt` against [`stability_limit`](Self::stability_limit).
    #[inline]
    pub fn is_stable(&self) -> bool {
        self.dt <= self.stability_limit()
    }

    /// Validate parameter values.
    ///
    /// The stability bound is deliberately not enforced here.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(ConfigError::InvalidTimeStep(self.dt));
        }
        if !self.dx.is_finite() || self.dx <= 0.0 {
            return Err(ConfigError::InvalidSpatialStep(self.dx));
        }
        let named = [
            ("da", self.da),
            ("db", self.db),
            ("alpha", self.alpha),
            ("beta", self.beta),
            ("bias", self.bias),
        ];
        for (name, value) in named {
            if !value.is_finite() {
                return Err(ConfigError::NonFiniteParameter { name, value });
            }
        }
        Ok(())
    }
}

impl SimulationConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if !self.convergence_threshold.is_finite() || self.convergence_threshold <= 0.0 {
            return Err(ConfigError::InvalidConvergenceThreshold(
                self.convergence_threshold,
            ));
        }
        self.params.validate()
    }

    /// Read and validate a JSON configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Grid dimensions must be non-zero (got {width}x{height})")]
    InvalidDimensions { width: usize, height: usize },
    #[error("Time step must be positive and finite (got {0})")]
    InvalidTimeStep(f32),
    #[error("Spatial step must be positive and finite (got {0})")]
    InvalidSpatialStep(f32),
    #[error("Parameter {name} must be finite (got {value})")]
    NonFiniteParameter { name: &'static str, value: f32 },
    #[error("Convergence threshold must be positive and finite (got {0})")]
    InvalidConvergenceThreshold(f32),
    #[error("Error reading config: {0}")]
    Read(#[from] std::io::Error),
    #[error("Error parsing config: {0}")]
    Parse(#[from] serde_json::Error),
}
