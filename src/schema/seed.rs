//! Seed types for initializing reaction-diffusion simulations.

use serde::{Deserialize, Serialize};

use crate::compute::EngineError;

/// Default noise amplitude for seeding.
pub const DEFAULT_NOISE_AMPLITUDE: f32 = 0.1;

/// Complete seed specification for simulation initialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seed {
    /// Pattern to use for seeding.
    pub pattern: Pattern,
}

impl Default for Seed {
    fn default() -> Self {
        Self {
            pattern: Pattern::Noise {
                amplitude: DEFAULT_NOISE_AMPLITUDE,
                seed: 0,
            },
        }
    }
}

/// Initial condition patterns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Pattern {
    /// Uniform noise in `[-amplitude/2, amplitude/2)` on both species.
    Noise {
        /// Noise amplitude.
        amplitude: f32,
        /// Random seed.
        seed: u64,
    },
    /// Activator taken from a brightness image, inhibitor from noise.
    Image {
        /// Pre-sampled brightness values.
        brightness: BrightnessGrid,
        /// Random seed for the inhibitor noise.
        seed: u64,
    },
}

/// A `width x height` grid of brightness samples in `[0, 1]`, row-major.
///
/// Decoding and resampling an actual image into this grid happens outside the
/// engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrightnessGrid {
    width: usize,
    height: usize,
    values: Vec<f32>,
}

impl BrightnessGrid {
    /// Wrap row-major brightness samples.
    pub fn new(width: usize, height: usize, values: Vec<f32>) -> Result<Self, EngineError> {
        if values.len() != width * height {
            return Err(EngineError::FieldLengthMismatch {
                expected: width * height,
                actual: values.len(),
            });
        }
        Ok(Self {
            width,
            height,
            values,
        })
    }

    /// Build from 8-bit greyscale pixels, mapping 0..=255 to 0.0..=1.0.
    pub fn from_luma8(width: usize, height: usize, pixels: &[u8]) -> Result<Self, EngineError> {
        let values = pixels.iter().map(|&p| p as f32 / 255.0).collect();
        Self::new(width, height, values)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Row-major samples.
    #[inline]
    pub fn values(&self) -> &[f32] {
        &self.values
    }
}
