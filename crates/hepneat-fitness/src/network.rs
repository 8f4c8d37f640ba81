//! The candidate network capability.
//!
//! The fitness evaluator does not know how a classifier is represented. All it needs
//! is a function from a feature vector to a discriminator output in `[0, 1]`, plus a
//! way to clear any state an activation leaves behind. Networks are owned by the
//! evolutionary population; the evaluator only calls them.

use serde::{Deserialize, Serialize};

/// A classifier that can be scored by a [`FitnessMetric`](crate::metric::FitnessMetric).
pub trait CandidateNetwork {
    /// Number of features the network expects per event.
    fn num_inputs(&self) -> usize;

    /// Clears internal state. Called immediately before every [`Self::activate`].
    fn reset(&mut self) {}

    /// Computes the discriminator output for one feature vector.
    ///
    /// The result must lie in `[0, 1]`; anything else aborts the evaluation.
    fn activate(&mut self, inputs: &[f64]) -> f64;
}

/// Fully connected network with no hidden nodes and a logistic output.
///
/// This is the topology every NEAT genome starts from before structural mutations.
///
/// # Example
///
/// ```
/// use hepneat_fitness::network::{CandidateNetwork, SigmoidPerceptron};
///
/// let mut network = SigmoidPerceptron::new(vec![2.0, -1.0], 0.0);
/// assert_eq!(network.num_inputs(), 2);
/// assert_eq!(network.activate(&[0.0, 0.0]), 0.5);
/// assert!(network.activate(&[3.0, 0.0]) > 0.99);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SigmoidPerceptron {
    pub weights: Vec<f64>,
    #[serde(default)]
    pub bias: f64,
}

impl SigmoidPerceptron {
    #[must_use]
    pub fn new(weights: Vec<f64>, bias: f64) -> Self {
        Self { weights, bias }
    }
}

impl CandidateNetwork for SigmoidPerceptron {
    fn num_inputs(&self) -> usize {
        self.weights.len()
    }

    fn activate(&mut self, inputs: &[f64]) -> f64 {
        let sum = self.bias
            + self
                .weights
                .iter()
                .zip(inputs)
                .map(|(w, x)| w * x)
                .sum::<f64>();
        1.0 / (1.0 + (-sum).exp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_range() {
        let mut network = SigmoidPerceptron::new(vec![1000.0], 0.0);
        assert_eq!(network.activate(&[1.0]), 1.0);
        assert_eq!(network.activate(&[-1.0]), 0.0);
    }

    #[test]
    fn test_deserialize_without_bias() {
        let network: SigmoidPerceptron = serde_json::from_str(r#"{"weights":[0.5,0.25]}"#).unwrap();
        assert_eq!(network, SigmoidPerceptron::new(vec![0.5, 0.25], 0.0));
    }
}
