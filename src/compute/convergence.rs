//! Run/stop policy for the driving loop.

use serde::{Deserialize, Serialize};

use crate::schema::DEFAULT_CONVERGENCE_THRESHOLD;

/// Outcome of a convergence check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunDecision {
    /// Keep stepping.
    Continue,
    /// The last micro-step changed no cell by more than the threshold.
    Converged,
    /// `max_steps` has been reached.
    StepLimitReached,
}

impl RunDecision {
    /// True for both stop reasons.
    #[inline]
    pub fn is_stop(self) -> bool {
        self != RunDecision::Continue
    }
}

/// Decide whether to keep running.
///
/// Convergence wins when both stop conditions hold for the same batch.
#[inline]
pub fn decide(metric: f32, current_step: u64, max_steps: u64, threshold: f32) -> RunDecision {
    if metric < threshold {
        RunDecision::Converged
    } else if current_step >= max_steps {
        RunDecision::StepLimitReached
    } else {
        RunDecision::Continue
    }
}

/// Holds the convergence threshold for [`decide`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvergenceMonitor {
    pub threshold: f32,
}

impl Default for ConvergenceMonitor {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_CONVERGENCE_THRESHOLD,
        }
    }
}

impl ConvergenceMonitor {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    #[inline]
    pub fn decide(&self, metric: f32, current_step: u64, max_steps: u64) -> RunDecision {
        decide(metric, current_step, max_steps, self.threshold)
    }
}

/// Progress of a driven run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    /// Micro-steps taken since the last (re)seed.
    pub current_step: u64,
    /// Whether the driver advances on the next call.
    pub running: bool,
}
