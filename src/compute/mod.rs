//! Compute module - Numerical engine for reaction-diffusion simulations.

mod contour;
mod convergence;
mod field;
mod integrator;
mod seeder;
mod simulation;

pub use contour::*;
pub use convergence::*;
pub use field::*;
pub use integrator::*;
pub use seeder::*;
pub use simulation::*;

use crate::schema::ConfigError;

/// Error type for engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Seed grid is {actual:?} (width, height), simulation grid is {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("Field has {actual} cells, expected {expected}")]
    FieldLengthMismatch { expected: usize, actual: usize },

    #[error("Simulation diverged: {non_finite} non-finite cells")]
    DivergenceDetected { non_finite: usize },
}
