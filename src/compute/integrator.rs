//! Explicit Euler integrator for the FitzHugh-Nagumo reaction-diffusion system.
//!
//! Each micro-step reads the live layer, writes every cell of the scratch layer
//! and swaps. Rows are processed in parallel; a cell only reads the previous
//! state, so the result is identical to a sequential pass.

use rayon::prelude::*;

use super::{EngineError, FieldPair};
use crate::schema::SimulationParameters;

/// Five-point periodic Laplacian of `field` at `(x, y)`, divided by `dx²`.
///
/// `x` and `y` must already be in range.
#[inline]
pub fn laplacian(field: &[f32], width: usize, height: usize, x: usize, y: usize, dx: f32) -> f32 {
    let x_prev = (x + width - 1) % width;
    let x_next = (x + 1) % width;
    let row = y * width;
    let row_prev = ((y + height - 1) % height) * width;
    let row_next = ((y + 1) % height) * width;

    (field[row + x_prev] + field[row + x_next] + field[row_prev + x] + field[row_next + x]
        - 4.0 * field[row + x])
        / (dx * dx)
}

/// Local reaction rates `(Ra, Rb)` for activator `a` and inhibitor `b`.
#[inline]
pub fn reaction(a: f32, b: f32, alpha: f32, beta: f32) -> (f32, f32) {
    (a - a * a * a - b + alpha, (a - b) * beta)
}

/// Per-pass summary, merged across rows.
#[derive(Debug, Clone, Copy, Default)]
struct PassSummary {
    max_delta: f32,
    non_finite: usize,
}

impl PassSummary {
    #[inline]
    fn observe(&mut self, old_a: f32, new_a: f32, old_b: f32, new_b: f32) {
        if new_a.is_finite() && new_b.is_finite() {
            self.max_delta = self
                .max_delta
                .max((new_a - old_a).abs())
                .max((new_b - old_b).abs());
        } else {
            self.non_finite += 1;
        }
    }

    fn merge(self, other: Self) -> Self {
        Self {
            max_delta: self.max_delta.max(other.max_delta),
            non_finite: self.non_finite + other.non_finite,
        }
    }
}

/// Advances a [`FieldPair`] by batches of micro-steps.
///
/// Holds no simulation parameters; they are passed into every call.
#[derive(Debug, Clone, Default)]
pub struct Integrator {
    divergence_guard: bool,
}

impl Integrator {
    /// Create an integrator with the divergence guard disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the non-finite value check after each batch.
    pub fn with_divergence_guard(mut self, enabled: bool) -> Self {
        self.divergence_guard = enabled;
        self
    }

    pub fn divergence_guard(&self) -> bool {
        self.divergence_guard
    }

    /// Run `params.steps_per_frame` micro-steps.
    ///
    /// Returns the largest per-cell change of the last micro-step.
    pub fn step(
        &self,
        fields: &mut FieldPair,
        params: &SimulationParameters,
    ) -> Result<f32, EngineError> {
        self.step_n(fields, params, params.steps_per_frame)
    }

    /// Run exactly `micro_steps` micro-steps.
    ///
    /// Only the last micro-step is measured. Zero micro-steps is a no-op with
    /// metric `0.0`. Non-finite cells either fail with
    /// [`EngineError::DivergenceDetected`] (guard on) or force the metric to
    /// infinity (guard off).
    pub fn step_n(
        &self,
        fields: &mut FieldPair,
        params: &SimulationParameters,
        micro_steps: u32,
    ) -> Result<f32, EngineError> {
        params.validate()?;
        if micro_steps == 0 {
            return Ok(0.0);
        }

        for _ in 1..micro_steps {
            micro_step(fields, params, false);
        }
        let summary = micro_step(fields, params, true);

        if summary.non_finite > 0 {
            if self.divergence_guard {
                return Err(EngineError::DivergenceDetected {
                    non_finite: summary.non_finite,
                });
            }
            log::debug!(
                "{} non-finite cells after batch (guard disabled)",
                summary.non_finite
            );
            return Ok(f32::INFINITY);
        }
        Ok(summary.max_delta)
    }
}

/// One full grid pass followed by a swap.
fn micro_step(fields: &mut FieldPair, params: &SimulationParameters, track: bool) -> PassSummary {
    let width = fields.width();
    let height = fields.height();
    let &SimulationParameters {
        da,
        db,
        alpha,
        beta,
        dt,
        dx,
        ..
    } = params;

    let summary = {
        let (live, scratch) = fields.live_and_scratch();
        let (cur_a, cur_b) = (&live.a, &live.b);

        scratch
            .a
            .par_chunks_mut(width)
            .zip(scratch.b.par_chunks_mut(width))
            .enumerate()
            .map(|(y, (next_a, next_b))| {
                let row = y * width;
                let mut summary = PassSummary::default();

                for x in 0..width {
                    let a = cur_a[row + x];
                    let b = cur_b[row + x];
                    let (ra, rb) = reaction(a, b, alpha, beta);

                    let new_a = a + dt * (da * laplacian(cur_a, width, height, x, y, dx) + ra);
                    let new_b = b + dt * (db * laplacian(cur_b, width, height, x, y, dx) + rb);
                    next_a[x] = new_a;
                    next_b[x] = new_b;

                    if track {
                        summary.observe(a, new_a, b, new_b);
                    }
                }

                summary
            })
            .reduce(PassSummary::default, PassSummary::merge)
    };

    fields.swap();
    summary
}
