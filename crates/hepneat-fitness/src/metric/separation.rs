//! Histogram separation metric (Schwienhorst–Eller).
//!
//! The outputs of both samples are binned into weighted histograms over `[0, 1]`:
//!
//! ```text
//! fitness = sqrt( Σ_bins s² / (s + b) )        over bins with s + b > 0
//! ```
//!
//! where `s` and `b` are the signal and background weights of a bin. Bins dominated by
//! signal contribute close to `s`; bins shared with background are suppressed.

use crate::{EvaluationError, class_sample::ClassSample, network::CandidateNetwork};

use super::{FitnessMetric, fill_histograms};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchwienhorstEllerSeparation {
    num_bins: usize,
}

impl SchwienhorstEllerSeparation {
    pub const DEFAULT_NUM_BINS: usize = 25;

    pub fn new(num_bins: usize) -> Result<Self, EvaluationError> {
        if num_bins == 0 {
            return Err(EvaluationError::InvalidConfig {
                reason: "nbins must be at least 1".to_owned(),
            });
        }
        Ok(Self { num_bins })
    }

    #[must_use]
    pub fn num_bins(&self) -> usize {
        self.num_bins
    }
}

impl Default for SchwienhorstEllerSeparation {
    fn default() -> Self {
        Self {
            num_bins: Self::DEFAULT_NUM_BINS,
        }
    }
}

impl FitnessMetric for SchwienhorstEllerSeparation {
    fn name(&self) -> &'static str {
        "separation"
    }

    fn evaluate_candidate(
        &self,
        _candidate: usize,
        network: &mut dyn CandidateNetwork,
        signal: &ClassSample,
        background: &ClassSample,
    ) -> Result<f64, EvaluationError> {
        let histograms = fill_histograms(network, signal, background, self.num_bins)?;
        let sum = histograms
            .signal
            .bins()
            .iter()
            .zip(histograms.background.bins())
            .map(|(s, b)| (s.sum_weights, b.sum_weights))
            .filter(|(s, b)| s + b > 0.0)
            .map(|(s, b)| s * s / (s + b))
            .sum::<f64>();
        Ok(sum.sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::test_util::{IdentityNetwork, class_sample};

    fn evaluate(signal: &[(f64, f64)], background: &[(f64, f64)], num_bins: usize) -> f64 {
        SchwienhorstEllerSeparation::new(num_bins)
            .unwrap()
            .evaluate_candidate(
                0,
                &mut IdentityNetwork::default(),
                &class_sample(signal),
                &class_sample(background),
            )
            .unwrap()
    }

    #[test]
    fn test_disjoint_bins() {
        // Signal only in the top bins, background only in the bottom bin: sqrt(Σ s)
        let fitness = evaluate(&[(3.0, 0.95), (1.0, 0.99)], &[(7.0, 0.02)], 25);
        assert!((fitness - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_shared_bin() {
        // s = 2, b = 2 in one bin: sqrt(4 / 4) = 1
        let fitness = evaluate(&[(2.0, 0.5)], &[(2.0, 0.5)], 4);
        assert!((fitness - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_better_separation_scores_higher() {
        let overlapping = evaluate(&[(1.0, 0.6), (1.0, 0.4)], &[(1.0, 0.45), (1.0, 0.55)], 10);
        let separated = evaluate(&[(1.0, 0.9), (1.0, 0.8)], &[(1.0, 0.1), (1.0, 0.2)], 10);
        assert!(separated > overlapping);
    }

    #[test]
    fn test_empty_histograms_score_zero() {
        assert_eq!(evaluate(&[], &[], 25), 0.0);
    }

    #[test]
    fn test_zero_bins_rejected() {
        assert!(SchwienhorstEllerSeparation::new(0).is_err());
    }
}
