//! Simulation driver - owns the fields and run state and drives batches.

use rand::Rng;

use super::{
    Contour, ConvergenceMonitor, EngineError, FieldPair, Integrator, RunDecision, RunState,
    apply_seed, extract, seed_image, seed_noise,
};
use crate::schema::{BrightnessGrid, Seed, SimulationConfig, SimulationParameters};

/// Result of one driving iteration.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BatchReport {
    /// Micro-steps actually taken (the last batch is clamped to `max_steps`).
    pub micro_steps: u32,
    /// Largest per-cell change in the last micro-step.
    pub metric: f32,
    /// Step counter after the batch.
    pub current_step: u64,
    pub decision: RunDecision,
}

/// A single reaction-diffusion run.
///
/// Parameters are supplied to every call rather than stored, so they can be
/// edited between batches.
pub struct Simulation {
    fields: FieldPair,
    integrator: Integrator,
    monitor: ConvergenceMonitor,
    state: RunState,
}

impl Simulation {
    /// Zeroed, paused simulation with default convergence threshold and no
    /// divergence guard.
    pub fn new(width: usize, height: usize) -> Result<Self, EngineError> {
        Ok(Self {
            fields: FieldPair::new(width, height)?,
            integrator: Integrator::new(),
            monitor: ConvergenceMonitor::default(),
            state: RunState::default(),
        })
    }

    /// Build and seed from a validated configuration.
    pub fn from_config(config: &SimulationConfig, seed: &Seed) -> Result<Self, EngineError> {
        config.validate()?;
        if !config.params.is_stable() {
            log::warn!(
                "dt = {} exceeds the diffusion stability limit {}",
                config.params.dt,
                config.params.stability_limit()
            );
        }

        let mut sim = Self::new(config.width, config.height)?
            .with_convergence_threshold(config.convergence_threshold)
            .with_divergence_guard(config.divergence_guard);
        sim.reseed(seed)?;
        Ok(sim)
    }

    pub fn with_convergence_threshold(mut self, threshold: f32) -> Self {
        self.monitor = ConvergenceMonitor::new(threshold);
        self
    }

    pub fn with_divergence_guard(mut self, enabled: bool) -> Self {
        self.integrator = self.integrator.with_divergence_guard(enabled);
        self
    }

    #[inline]
    pub fn fields(&self) -> &FieldPair {
        &self.fields
    }

    /// Direct field access for custom initial conditions. Does not reset the
    /// step counter.
    #[inline]
    pub fn fields_mut(&mut self) -> &mut FieldPair {
        &mut self.fields
    }

    #[inline]
    pub fn state(&self) -> &RunState {
        &self.state
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.state.running
    }

    pub fn start(&mut self) {
        self.state.running = true;
    }

    pub fn pause(&mut self) {
        self.state.running = false;
    }

    /// Reseed from a declarative seed. Resets the step counter only.
    pub fn reseed(&mut self, seed: &Seed) -> Result<(), EngineError> {
        apply_seed(&mut self.fields, seed)?;
        self.state.current_step = 0;
        Ok(())
    }

    /// Reseed both species with noise. Resets the step counter only.
    pub fn reseed_noise<R: Rng + ?Sized>(&mut self, rng: &mut R, amplitude: f32) {
        seed_noise(&mut self.fields, rng, amplitude);
        self.state.current_step = 0;
    }

    /// Reseed from a brightness grid. Resets the step counter only.
    pub fn reseed_image<R: Rng + ?Sized>(
        &mut self,
        brightness: &BrightnessGrid,
        rng: &mut R,
    ) -> Result<(), EngineError> {
        seed_image(&mut self.fields, brightness, rng)?;
        self.state.current_step = 0;
        Ok(())
    }

    /// Run one batch if the simulation is running.
    ///
    /// Returns `None` while paused. Any decision other than
    /// [`RunDecision::Continue`] stops the run, as does a divergence error.
    pub fn advance(
        &mut self,
        params: &SimulationParameters,
    ) -> Result<Option<BatchReport>, EngineError> {
        if !self.state.running {
            return Ok(None);
        }

        let remaining = params.max_steps.saturating_sub(self.state.current_step);
        let micro_steps = remaining.min(params.steps_per_frame as u64) as u32;

        let metric = match self.integrator.step_n(&mut self.fields, params, micro_steps) {
            Ok(metric) => metric,
            Err(e) => {
                self.state.running = false;
                // The batch was applied before the guard tripped.
                if let EngineError::DivergenceDetected { non_finite } = e {
                    self.state.current_step += micro_steps as u64;
                    log::warn!(
                        "Divergence after step {}: {} non-finite cells",
                        self.state.current_step,
                        non_finite
                    );
                }
                return Err(e);
            }
        };
        self.state.current_step += micro_steps as u64;

        let decision = if micro_steps > 0 {
            self.monitor
                .decide(metric, self.state.current_step, params.max_steps)
        } else if remaining == 0 {
            RunDecision::StepLimitReached
        } else {
            // steps_per_frame == 0: nothing changed, which is not convergence.
            RunDecision::Continue
        };

        if decision.is_stop() {
            self.state.running = false;
            log::info!(
                "Stopped at step {}: {:?} (metric {:e})",
                self.state.current_step,
                decision,
                metric
            );
        } else {
            log::debug!("Step {}: metric {:e}", self.state.current_step, metric);
        }

        Ok(Some(BatchReport {
            micro_steps,
            metric,
            current_step: self.state.current_step,
            decision,
        }))
    }

    /// Start and advance until the run stops.
    pub fn run(&mut self, params: &SimulationParameters) -> Result<RunDecision, EngineError> {
        self.run_with_callback(params, |_| {})
    }

    /// Start and advance until the run stops, reporting every batch.
    ///
    /// A batch that takes no micro-steps without reaching the step limit
    /// pauses the run and returns [`RunDecision::Continue`].
    pub fn run_with_callback<F>(
        &mut self,
        params: &SimulationParameters,
        mut callback: F,
    ) -> Result<RunDecision, EngineError>
    where
        F: FnMut(&BatchReport),
    {
        self.start();
        loop {
            let Some(report) = self.advance(params)? else {
                return Ok(RunDecision::Continue);
            };
            callback(&report);

            if report.decision.is_stop() {
                return Ok(report.decision);
            }
            if report.micro_steps == 0 {
                log::warn!("steps_per_frame is 0; pausing instead of spinning");
                self.pause();
                return Ok(RunDecision::Continue);
            }
        }
    }

    /// Isolines of the live activator at `threshold` (usually `bias`).
    pub fn contours(&self, threshold: f32) -> Result<Contour, EngineError> {
        extract(
            self.fields.a(),
            self.fields.width(),
            self.fields.height(),
            threshold,
        )
    }

    pub fn stats(&self) -> FieldStats {
        FieldStats::from_fields(&self.fields)
    }
}

/// Summary statistics of one field.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChannelStats {
    pub min_value: f32,
    pub max_value: f32,
    pub mean_value: f32,
}

impl ChannelStats {
    /// Statistics over the finite values of `values`.
    pub fn from_values(values: &[f32]) -> Self {
        let mut min_value = f32::INFINITY;
        let mut max_value = f32::NEG_INFINITY;
        let mut sum = 0.0f64;
        let mut count = 0usize;

        for &v in values.iter().filter(|v| v.is_finite()) {
            min_value = min_value.min(v);
            max_value = max_value.max(v);
            sum += v as f64;
            count += 1;
        }

        Self {
            min_value,
            max_value,
            mean_value: if count > 0 {
                (sum / count as f64) as f32
            } else {
                f32::NAN
            },
        }
    }
}

/// Field statistics for monitoring.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FieldStats {
    pub a: ChannelStats,
    pub b: ChannelStats,
    /// Cells holding NaN or Inf in either species.
    pub non_finite: usize,
}

impl FieldStats {
    pub fn from_fields(fields: &FieldPair) -> Self {
        let non_finite = fields
            .a()
            .iter()
            .zip(fields.b())
            .filter(|(a, b)| !a.is_finite() || !b.is_finite())
            .count();

        Self {
            a: ChannelStats::from_values(fields.a()),
            b: ChannelStats::from_values(fields.b()),
            non_finite,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::Species;
    use crate::schema::Pattern;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn test_params() -> SimulationParameters {
        SimulationParameters {
            da: 1.0,
            db: 100.0,
            alpha: -0.005,
            beta: 10.0,
            dt: 0.001,
            dx: 1.0,
            steps_per_frame: 5,
            max_steps: 10,
            bias: 0.0,
        }
    }

    fn noisy(width: usize, height: usize, seed: u64) -> Simulation {
        let mut sim = Simulation::new(width, height).unwrap();
        sim.reseed(&Seed {
            pattern: Pattern::Noise {
                amplitude: 0.1,
                seed,
            },
        })
        .unwrap();
        sim
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        assert!(matches!(
            Simulation::new(0, 8),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn test_stops_exactly_at_max_steps() {
        let params = test_params();
        let mut sim = noisy(16, 16, 1);
        let mut batches = 0;

        let decision = sim.run_with_callback(&params, |_| batches += 1).unwrap();

        assert_eq!(decision, RunDecision::StepLimitReached);
        assert_eq!(sim.state().current_step, 10);
        assert!(!sim.is_running());
        assert_eq!(batches, 2);
    }

    #[test]
    fn test_final_batch_clamped() {
        let params = SimulationParameters {
            max_steps: 12,
            ..test_params()
        };
        let mut sim = noisy(8, 8, 2);
        let mut sizes = Vec::new();

        sim.run_with_callback(&params, |r| sizes.push(r.micro_steps))
            .unwrap();

        assert_eq!(sizes, vec![5, 5, 2]);
        assert_eq!(sim.state().current_step, 12);
    }

    #[test]
    fn test_paused_does_not_advance() {
        let params = test_params();
        let mut sim = noisy(8, 8, 3);
        let before = sim.fields().a().to_vec();

        assert_eq!(sim.advance(&params).unwrap(), None);
        assert_eq!(sim.state().current_step, 0);
        assert_eq!(sim.fields().a(), &before[..]);
    }

    #[test]
    fn test_converges_on_fixed_point() {
        // a = b = 0 with alpha = 0 is a steady state.
        let params = SimulationParameters {
            alpha: 0.0,
            max_steps: 1000,
            ..test_params()
        };
        let mut sim = Simulation::new(8, 8).unwrap();

        let decision = sim.run(&params).unwrap();

        assert_eq!(decision, RunDecision::Converged);
        assert_eq!(sim.state().current_step, 5);
    }

    #[test]
    fn test_zero_steps_per_frame_pauses() {
        let params = SimulationParameters {
            steps_per_frame: 0,
            ..test_params()
        };
        let mut sim = noisy(8, 8, 4);

        let decision = sim.run(&params).unwrap();

        assert_eq!(decision, RunDecision::Continue);
        assert!(!sim.is_running());
        assert_eq!(sim.state().current_step, 0);
    }

    #[test]
    fn test_reseed_resets_step_but_not_running() {
        let params = SimulationParameters {
            max_steps: 100,
            ..test_params()
        };
        let mut sim = noisy(8, 8, 5);
        sim.start();
        sim.advance(&params).unwrap();
        assert_eq!(sim.state().current_step, 5);

        sim.reseed_noise(&mut StdRng::seed_from_u64(9), 0.1);
        assert_eq!(sim.state().current_step, 0);
        assert!(sim.is_running());

        sim.pause();
        let grid = BrightnessGrid::new(8, 8, vec![0.5; 64]).unwrap();
        sim.reseed_image(&grid, &mut StdRng::seed_from_u64(9))
            .unwrap();
        assert_eq!(sim.state().current_step, 0);
        assert!(!sim.is_running());
        assert_eq!(sim.fields().get(Species::A, 3, 3), 0.0);
    }

    #[test]
    fn test_seeded_runs_are_identical() {
        let params = SimulationParameters {
            max_steps: 200,
            steps_per_frame: 20,
            ..test_params()
        };
        let mut first = noisy(24, 16, 77);
        let mut second = noisy(24, 16, 77);

        first.run(&params).unwrap();
        second.run(&params).unwrap();

        assert_eq!(first.state(), second.state());
        assert_eq!(first.fields().a(), second.fields().a());
        assert_eq!(first.fields().b(), second.fields().b());
    }

    #[test]
    fn test_parameters_change_between_batches() {
        let mut params = SimulationParameters {
            max_steps: 100,
            ..test_params()
        };
        let mut sim = noisy(8, 8, 6);
        sim.start();
        sim.advance(&params).unwrap();

        params.steps_per_frame = 3;
        let report = sim.advance(&params).unwrap().unwrap();
        assert_eq!(report.micro_steps, 3);
        assert_eq!(sim.state().current_step, 8);
    }

    #[test]
    fn test_divergence_stops_run() {
        let params = SimulationParameters {
            dt: 0.1,
            max_steps: 10_000,
            ..test_params()
        };
        let mut sim = noisy(8, 8, 7).with_divergence_guard(true);

        let err = sim.run(&params).unwrap_err();

        assert!(matches!(err, EngineError::DivergenceDetected { .. }));
        assert!(!sim.is_running());
        assert!(sim.stats().non_finite > 0);
        let steps = sim.state().current_step;
        assert!(steps > 0 && steps % 5 == 0 && steps <= params.max_steps);
    }

    #[test]
    fn test_divergence_counts_applied_batch() {
        let params = SimulationParameters {
            max_steps: 100,
            ..test_params()
        };
        let mut sim = Simulation::new(4, 4).unwrap().with_divergence_guard(true);
        sim.fields_mut().set(Species::A, 1, 1, f32::NAN);

        let err = sim.run(&params).unwrap_err();

        assert!(matches!(err, EngineError::DivergenceDetected { .. }));
        assert_eq!(sim.state().current_step, 5);
        assert!(!sim.is_running());
    }

    #[test]
    fn test_invalid_params_do_not_count_steps() {
        let params = SimulationParameters {
            dt: -1.0,
            ..test_params()
        };
        let mut sim = noisy(4, 4, 9);

        assert!(matches!(sim.run(&params), Err(EngineError::Config(_))));
        assert_eq!(sim.state().current_step, 0);
    }

    #[test]
    fn test_from_config_seeds_fields() {
        let config = SimulationConfig {
            width: 12,
            height: 10,
            ..Default::default()
        };
        let sim = Simulation::from_config(&config, &Seed::default()).unwrap();
        assert_eq!(sim.fields().width(), 12);
        assert_eq!(sim.fields().len(), 120);
        assert!(sim.fields().a().iter().any(|&v| v != 0.0));
        assert!(!sim.is_running());
    }

    #[test]
    fn test_contours_of_live_activator() {
        let mut sim = Simulation::new(6, 6).unwrap();
        for y in 2..4 {
            for x in 2..4 {
                sim.fields_mut().set(Species::A, x, y, 1.0);
            }
        }
        let contour = sim.contours(0.5).unwrap();
        assert_eq!(contour.len(), 1);
        assert_eq!(contour.threshold, 0.5);
    }

    #[test]
    fn test_stats() {
        let mut sim = Simulation::new(2, 1).unwrap();
        sim.fields_mut().set(Species::A, 0, 0, -1.0);
        sim.fields_mut().set(Species::A, 1, 0, 3.0);
        let stats = sim.stats();
        assert_eq!(stats.a.min_value, -1.0);
        assert_eq!(stats.a.max_value, 3.0);
        assert_eq!(stats.a.mean_value, 1.0);
        assert_eq!(stats.non_finite, 0);
    }
}
