//! Weighted Euclidean (n-norm) distance from perfect separation.
//!
//! ```text
//! error   = Σ_signal (w / W_signal) · (1 - out)^p + Σ_background (w / W_background) · out^p
//! fitness = 1 - (error / 2)^(1/p)
//! ```
//!
//! Each class contributes at most 1 to `error`, so the fitness lies in `[0, 1]` and is
//! exactly 1 when every signal output is 1 and every background output is 0.

use crate::{
    EvaluationError,
    class_sample::{ClassSample, SampleClass},
    network::CandidateNetwork,
};

use super::{FitnessMetric, scan_outputs};

/// Euclidean separation metric with a configurable norm exponent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EuclideanDistance {
    norm: f64,
}

impl EuclideanDistance {
    pub const DEFAULT_NORM: f64 = 2.0;

    /// Creates the metric with norm exponent `norm`.
    pub fn new(norm: f64) -> Result<Self, EvaluationError> {
        if !(norm.is_finite() && norm > 0.0) {
            return Err(EvaluationError::InvalidConfig {
                reason: format!("norm must be positive, got {norm}"),
            });
        }
        Ok(Self { norm })
    }

    #[must_use]
    pub fn norm(&self) -> f64 {
        self.norm
    }
}

impl Default for EuclideanDistance {
    fn default() -> Self {
        Self {
            norm: Self::DEFAULT_NORM,
        }
    }
}

impl FitnessMetric for EuclideanDistance {
    fn name(&self) -> &'static str {
        "euclidean"
    }

    fn evaluate_candidate(
        &self,
        _candidate: usize,
        network: &mut dyn CandidateNetwork,
        signal: &ClassSample,
        background: &ClassSample,
    ) -> Result<f64, EvaluationError> {
        let signal_yield = signal.checked_total_weight(SampleClass::Signal)?;
        let background_yield = background.checked_total_weight(SampleClass::Background)?;

        let mut error = 0.0;
        scan_outputs(network, signal, SampleClass::Signal, |weight, output| {
            error += weight / signal_yield * (1.0 - output).powf(self.norm);
        })?;
        scan_outputs(network, background, SampleClass::Background, |weight, output| {
            error += weight / background_yield * output.powf(self.norm);
        })?;

        Ok(1.0 - (error / 2.0).powf(self.norm.recip()))
    }
}
