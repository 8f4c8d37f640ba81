//! Fitness evaluation of candidate classifiers for signal/background separation.
//!
//! This crate scores a population of candidate networks by how well their output
//! separates a signal sample from a background sample. The score is written back onto
//! each candidate for the external evolutionary loop to select on.
//!
//! # How Evaluation Works
//!
//! ```text
//! Population (candidate networks)
//!     ↓ for each candidate (in parallel)
//! Network output for every signal event, then every background event
//!     ↓ scored by
//! Fitness Metric (euclidean | separation | zscore)
//!     ↓ produces
//! Fitness (higher is better)
//!     ↓ written to
//! Candidate::fitness
//! ```
//!
//! Samples are shared read-only between candidates. Each candidate's outputs are
//! accumulated sequentially by the thread evaluating it.
//!
//! # Fitness Metrics
//!
//! - **Euclidean** ([`metric::euclidean::EuclideanDistance`]) - weighted n-norm distance
//!   from the ideal outputs (1 for signal, 0 for background)
//! - **Separation** ([`metric::separation::SchwienhorstEllerSeparation`]) - chi-square-like
//!   separation of output histograms
//! - **Z-score** ([`metric::zscore::StoufferZScore`]) - Monte-Carlo estimate of the combined
//!   significance of the output histograms
//!
//! All three are selected and parameterized through [`config::FitnessConfig`].
//!
//! # Failure Policy
//!
//! Every candidate must be scored against the identical samples, so a malformed
//! feature vector or an invalid network output aborts the whole generation. No
//! candidate is given a fitness in that case.
//!
//! # Example
//!
//! ```
//! use hepneat_fitness::{
//!     class_sample::{ClassSample, WeightedFeatures},
//!     config::{FitnessConfig, MetricKind},
//!     network::SigmoidPerceptron,
//!     population::Population,
//! };
//!
//! let event = |weight, x| WeightedFeatures { weight, features: vec![x] };
//! let signal = ClassSample::new(vec![event(1.0, 2.0), event(1.0, 1.5)]);
//! let background = ClassSample::new(vec![event(1.0, -2.0), event(1.0, -1.0)]);
//!
//! let config = FitnessConfig {
//!     metric: MetricKind::Euclidean,
//!     ..FitnessConfig::default()
//! };
//! let metric = config.build_metric().unwrap();
//!
//! let mut population = Population::new([
//!     SigmoidPerceptron::new(vec![5.0], 0.0),
//!     SigmoidPerceptron::new(vec![-5.0], 0.0),
//! ]);
//! population
//!     .evaluate_fitness(metric.as_ref(), &signal, &background)
//!     .unwrap();
//!
//! let best = population.best().unwrap();
//! assert_eq!(best.network().weights, [5.0]);
//! assert!(best.fitness().unwrap() > 0.9);
//! ```

use self::class_sample::SampleClass;

pub mod class_sample;
pub mod config;
pub mod metric;
pub mod network;
pub mod population;

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum EvaluationError {
    #[display("{class} event #{index} has {found} features, network expects {expected}")]
    ArityMismatch {
        class: SampleClass,
        index: usize,
        expected: usize,
        found: usize,
    },
    #[display("network output {value} for {class} event #{index} is not in [0, 1]")]
    InvalidOutput {
        class: SampleClass,
        index: usize,
        value: f64,
    },
    #[display("{class} sample is empty")]
    EmptySample { class: SampleClass },
    #[display("{class} sample has non-positive total weight {total_weight}")]
    NonPositiveTotalWeight {
        class: SampleClass,
        total_weight: f64,
    },
    #[display("invalid fitness configuration: {reason}")]
    InvalidConfig { reason: String },
    #[display("cannot build sampling distribution: {reason}")]
    Distribution { reason: String },
    #[display("{metric} metric produced non-finite fitness {value}")]
    NonFiniteFitness { metric: &'static str, value: f64 },
}
