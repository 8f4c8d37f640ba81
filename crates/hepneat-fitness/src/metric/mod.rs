//! Fitness metrics: scoring one candidate against the signal and background samples.
//!
//! Every metric implements [`FitnessMetric`]. The metric receives the candidate's
//! network and the two class samples (each carrying its total weight) and returns a
//! scalar where higher means better separation. The metrics share two building blocks:
//!
//! - [`scan_outputs`] runs the network over one sample, resetting it before every
//!   activation and enforcing the arity and output-range contract.
//! - [`fill_histograms`] bins the outputs of both samples into weighted histograms
//!   over `[0, 1]`.

use std::fmt;

use hepneat_stats::histogram::WeightedHistogram;

use crate::{
    EvaluationError,
    class_sample::{ClassSample, SampleClass},
    network::CandidateNetwork,
};

pub mod euclidean;
pub mod separation;
pub mod zscore;

/// Scores candidate networks.
///
/// Implementations are shared by the threads evaluating a generation and must not
/// keep per-candidate mutable state.
pub trait FitnessMetric: fmt::Debug + Send + Sync {
    /// Short name used in logs and reports.
    fn name(&self) -> &'static str;

    /// Computes the fitness of one candidate.
    ///
    /// # Arguments
    ///
    /// * `candidate` - Position of the candidate in its population; metrics drawing
    ///   random numbers derive their streams from it
    /// * `network` - The candidate's network
    /// * `signal` - Signal sample with its total weight
    /// * `background` - Background sample with its total weight
    fn evaluate_candidate(
        &self,
        candidate: usize,
        network: &mut dyn CandidateNetwork,
        signal: &ClassSample,
        background: &ClassSample,
    ) -> Result<f64, EvaluationError>;
}

/// Calls `f(weight, output)` for every event of `sample`.
pub fn scan_outputs<F>(
    network: &mut dyn CandidateNetwork,
    sample: &ClassSample,
    class: SampleClass,
    mut f: F,
) -> Result<(), EvaluationError>
where
    F: FnMut(f64, f64),
{
    let expected = network.num_inputs();
    for (index, event) in sample.events().iter().enumerate() {
        if event.features.len() != expected {
            return Err(EvaluationError::ArityMismatch {
                class,
                index,
                expected,
                found: event.features.len(),
            });
        }
        network.reset();
        let output = network.activate(&event.features);
        if !(0.0..=1.0).contains(&output) {
            return Err(EvaluationError::InvalidOutput {
                class,
                index,
                value: output,
            });
        }
        f(event.weight, output);
    }
    Ok(())
}

/// Output histograms of one candidate, weighted by event weight.
#[derive(Debug, Clone)]
pub struct OutputHistograms {
    pub signal: WeightedHistogram,
    pub background: WeightedHistogram,
}

/// Fills `num_bins`-bin histograms over `[0, 1]` with the network outputs of both samples.
pub fn fill_histograms(
    network: &mut dyn CandidateNetwork,
    signal: &ClassSample,
    background: &ClassSample,
    num_bins: usize,
) -> Result<OutputHistograms, EvaluationError> {
    let mut histograms = OutputHistograms {
        signal: WeightedHistogram::unit(num_bins),
        background: WeightedHistogram::unit(num_bins),
    };
    scan_outputs(network, signal, SampleClass::Signal, |weight, output| {
        histograms.signal.fill(output, weight);
    })?;
    scan_outputs(network, background, SampleClass::Background, |weight, output| {
        histograms.background.fill(output, weight);
    })?;
    Ok(histograms)
}

#[cfg(test)]
pub(crate) mod test_util {
    use crate::{
        class_sample::{ClassSample, WeightedFeatures},
        network::CandidateNetwork,
    };

    /// Returns its single input unchanged.
    #[derive(Debug, Default)]
    pub(crate) struct IdentityNetwork {
        pub(crate) resets: usize,
    }

    impl CandidateNetwork for IdentityNetwork {
        fn num_inputs(&self) -> usize {
            1
        }

        fn reset(&mut self) {
            self.resets += 1;
        }

        fn activate(&mut self, inputs: &[f64]) -> f64 {
            inputs[0]
        }
    }

    pub(crate) fn class_sample(events: &[(f64, f64)]) -> ClassSample {
        ClassSample::new(
            events
                .iter()
                .map(|&(weight, x)| WeightedFeatures {
                    weight,
                    features: vec![x],
                })
                .collect(),
        )
    }
}
