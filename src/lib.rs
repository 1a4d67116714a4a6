//! Turing patterns - FitzHugh-Nagumo reaction-diffusion on a periodic grid.
//!
//! This crate evolves an activator `A` and an inhibitor `B` with an explicit
//! Euler scheme and traces isolines of the activator as closed polylines for
//! vector export.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Configuration, parameters and seed types
//! - `compute`: Numerical engine (fields, integrator, seeding, convergence,
//!   contour extraction, simulation driver)
//!
//! Rendering, image decoding and file formats are left to the caller: the
//! live fields are exposed as row-major slices and contours as plain
//! serializable data.
//!
//! # Example
//!
//! ```rust,no_run
//! use turing_patterns::{
//!     compute::Simulation,
//!     schema::{Seed, SimulationConfig},
//! };
//!
//! let config = SimulationConfig::default();
//! let mut sim = Simulation::from_config(&config, &Seed::default())?;
//!
//! let decision = sim.run(&config.params)?;
//! println!("Stopped after {} steps: {:?}", sim.state().current_step, decision);
//!
//! let contour = sim.contours(config.params.bias)?;
//! println!("{} closed isolines", contour.len());
//! # Ok::<(), turing_patterns::compute::EngineError>(())
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::{Contour, EngineError, FieldPair, Integrator, RunDecision, Simulation};
pub use schema::{Pattern, Seed, SimulationConfig, SimulationParameters};
