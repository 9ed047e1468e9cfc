//! Regular-step gradient descent: fixed-length steps along the negative
//! gradient, shrunk whenever the gradient direction reverses.

use std::fmt;

use tracing::debug;

use super::metric::Evaluation;

/// Why the optimizer stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    GradientTolerance,
    StepTolerance,
    MaxIterations,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GradientTolerance => write!(f, "gradient below tolerance"),
            Self::StepTolerance => write!(f, "step below minimum"),
            Self::MaxIterations => write!(f, "iteration budget exhausted"),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct StepSettings {
    pub max_iterations: usize,
    pub max_step: f64,
    pub min_step: f64,
    pub relaxation: f64,
    pub gradient_tolerance: f64,
}

#[derive(Clone, Debug)]
pub(crate) struct OptimizerOutcome {
    /// Best parameters visited.
    pub params: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    pub stop_reason: StopReason,
}

/// Minimize from `start`, whose evaluation `initial` must already be known.
/// Steps into invalid regions (no overlap, non-finite values) are rejected and
/// the step length relaxed.
pub(crate) fn minimize<F>(
    start: Vec<f64>,
    initial: Evaluation,
    settings: &StepSettings,
    evaluate: F,
) -> OptimizerOutcome
where
    F: Fn(&[f64]) -> Option<Evaluation>,
{
    let mut params = start;
    let mut current = initial;
    let mut best_params = params.clone();
    let mut best_value = current.value;
    let mut previous_gradient: Option<Vec<f64>> = None;
    let mut step = settings.max_step;
    let mut iterations = 0usize;

    let stop_reason = loop {
        if iterations >= settings.max_iterations {
            break StopReason::MaxIterations;
        }

        let norm = current.gradient.iter().map(|g| g * g).sum::<f64>().sqrt();
        if norm <= settings.gradient_tolerance {
            break StopReason::GradientTolerance;
        }

        if let Some(prev) = &previous_gradient {
            let dot: f64 = prev.iter().zip(&current.gradient).map(|(p, g)| p * g).sum();
            if dot < 0.0 {
                step *= settings.relaxation;
            }
        }
        if step < settings.min_step {
            break StopReason::StepTolerance;
        }

        let candidate: Vec<f64> = params
            .iter()
            .zip(&current.gradient)
            .map(|(p, g)| p - step * g / norm)
            .collect();
        iterations += 1;

        match evaluate(&candidate) {
            Some(next) => {
                previous_gradient = Some(std::mem::take(&mut current.gradient));
                params = candidate;
                current = next;
                if current.value < best_value {
                    best_value = current.value;
                    best_params.clone_from(&params);
                }
            }
            None => {
                step *= settings.relaxation;
            }
        }
    };

    debug!(
        iterations,
        value = best_value,
        step,
        reason = %stop_reason,
        "optimizer finished"
    );

    OptimizerOutcome {
        params: best_params,
        value: best_value,
        iterations,
        stop_reason,
    }
}
