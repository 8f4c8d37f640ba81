//! The population being scored, and the per-generation evaluation driver.
//!
//! A [`Population`] owns the candidate networks of one generation. Evaluating it
//! scores every candidate with a [`FitnessMetric`] and writes the result to
//! [`Candidate::fitness`], where the evolutionary loop picks it up for selection.
//!
//! # Parallelization
//!
//! Candidates are independent, so each one is scored on its own thread. The class
//! samples and the metric are shared read-only; a candidate's outputs and histograms
//! are only touched by the thread scoring it.
//!
//! # Failure Policy
//!
//! If any candidate fails, or its metric returns a non-finite fitness, the generation
//! is rejected as a whole: the error of the lowest-indexed failing candidate is
//! returned and no fitness is written.

use std::{panic, thread, time::Instant};

use hepneat_stats::descriptive::DescriptiveStats;
use log::{debug, info};

use crate::{
    EvaluationError, class_sample::ClassSample, metric::FitnessMetric, network::CandidateNetwork,
};

/// Evaluation of a generation failed because one of its candidates could not be scored.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("cannot evaluate candidate #{candidate}: {source}")]
pub struct GenerationError {
    /// Position of the failing candidate in the population.
    pub candidate: usize,
    pub source: EvaluationError,
}

/// A candidate network and the fitness it was assigned.
#[derive(Debug, Clone)]
pub struct Candidate<N> {
    network: N,
    fitness: Option<f64>,
}

impl<N> Candidate<N> {
    #[must_use]
    pub fn new(network: N) -> Self {
        Self {
            network,
            fitness: None,
        }
    }

    #[must_use]
    pub fn network(&self) -> &N {
        &self.network
    }

    /// Returns the fitness of the last successful evaluation, if any.
    ///
    /// Higher is better.
    #[must_use]
    pub fn fitness(&self) -> Option<f64> {
        self.fitness
    }

    fn sort_key(&self) -> f64 {
        self.fitness.unwrap_or(f64::NEG_INFINITY)
    }
}

/// The candidates of one generation.
#[derive(Debug, Clone)]
pub struct Population<N> {
    candidates: Vec<Candidate<N>>,
}

impl<N> Population<N> {
    /// Creates an unevaluated population.
    pub fn new<I>(networks: I) -> Self
    where
        I: IntoIterator<Item = N>,
    {
        Self {
            candidates: networks.into_iter().map(Candidate::new).collect(),
        }
    }

    #[must_use]
    pub fn candidates(&self) -> &[Candidate<N>] {
        &self.candidates
    }

    #[must_use]
    pub fn into_candidates(self) -> Vec<Candidate<N>> {
        self.candidates
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Returns the candidate with the highest fitness.
    ///
    /// Returns `None` if no candidate has been evaluated.
    #[must_use]
    pub fn best(&self) -> Option<&Candidate<N>> {
        self.candidates
            .iter()
            .filter(|candidate| candidate.fitness.is_some())
            .max_by(|a, b| a.sort_key().total_cmp(&b.sort_key()))
    }

    /// Computes descriptive statistics of the fitness of all evaluated candidates.
    #[must_use]
    pub fn compute_fitness_stats(&self) -> Option<DescriptiveStats> {
        DescriptiveStats::new(self.candidates.iter().filter_map(Candidate::fitness))
    }
}

impl<N> Population<N>
where
    N: CandidateNetwork + Send,
{
    /// Scores all candidates in parallel.
    ///
    /// On success every candidate has a fitness and candidates are sorted by fitness in
    /// descending order (best first). On failure no candidate is modified.
    ///
    /// # Arguments
    ///
    /// * `metric` - Fitness metric to score with
    /// * `signal` - Signal sample with its total weight
    /// * `background` - Background sample with its total weight
    pub fn evaluate_fitness<M>(
        &mut self,
        metric: &M,
        signal: &ClassSample,
        background: &ClassSample,
    ) -> Result<(), GenerationError>
    where
        M: FitnessMetric + ?Sized,
    {
        let start = Instant::now();
        let results = thread::scope(|s| {
            let handles = self
                .candidates
                .iter_mut()
                .enumerate()
                .map(|(index, candidate)| {
                    let network = &mut candidate.network;
                    s.spawn(move || {
                        let fitness =
                            metric.evaluate_candidate(index, network, signal, background)?;
                        if fitness.is_finite() {
                            Ok(fitness)
                        } else {
                            Err(EvaluationError::NonFiniteFitness {
                                metric: metric.name(),
                                value: fitness,
                            })
                        }
                    })
                })
                .collect::<Vec<_>>();
            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|payload| panic::resume_unwind(payload))
                })
                .collect::<Vec<_>>()
        });

        let fitness = results
            .into_iter()
            .enumerate()
            .map(|(candidate, result)| {
                result.map_err(|source| GenerationError { candidate, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        for (index, (candidate, fitness)) in self.candidates.iter_mut().zip(fitness).enumerate() {
            debug!("Candidate #{index}: fitness = {fitness:.6}");
            candidate.fitness = Some(fitness);
        }
        info!(
            "Evaluated {} candidates with {} metric in {:.2?}",
            self.candidates.len(),
            metric.name(),
            start.elapsed()
        );

        // sort by fitness descending
        self.candidates
            .sort_by(|a, b| b.sort_key().total_cmp(&a.sort_key()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        class_sample::SampleClass,
        metric::{euclidean::EuclideanDistance, test_util::class_sample},
    };

    /// Outputs a constant, regardless of input.
    #[derive(Debug, Clone)]
    struct ConstantNetwork(f64);

    impl CandidateNetwork for ConstantNetwork {
        fn num_inputs(&self) -> usize {
            1
        }

        fn activate(&mut self, _inputs: &[f64]) -> f64 {
            self.0
        }
    }

    #[test]
    fn test_evaluate_sorts_best_first() {
        let signal = class_sample(&[(1.0, 0.0), (1.0, 0.0)]);
        let background = class_sample(&[(1.0, 0.0)]);
        let mut population = Population::new([0.0, 0.5, 0.7].map(ConstantNetwork));
        assert!(population.best().is_none());

        population
            .evaluate_fitness(&EuclideanDistance::default(), &signal, &background)
            .unwrap();

        let outputs = population
            .candidates()
            .iter()
            .map(|c| c.network().0)
            .collect::<Vec<_>>();
        // error = (1 - o)^2 + o^2 is smallest at o = 0.5
        assert_eq!(outputs, [0.5, 0.7, 0.0]);
        assert!(population.candidates().iter().all(|c| c.fitness().is_some()));
        assert_eq!(population.best().unwrap().network().0, 0.5);

        let stats = population.compute_fitness_stats().unwrap();
        assert_eq!(stats.count, 3);
        assert!((stats.max - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_failing_candidate_aborts_generation() {
        let signal = class_sample(&[(1.0, 0.0)]);
        let background = class_sample(&[(1.0, 0.0)]);
        let mut population = Population::new([0.2, 1.5, 0.4, -1.0].map(ConstantNetwork));

        let err = population
            .evaluate_fitness(&EuclideanDistance::default(), &signal, &background)
            .unwrap_err();
        assert_eq!(err.candidate, 1);
        assert!(matches!(
            err.source,
            EvaluationError::InvalidOutput {
                class: SampleClass::Signal,
                ..
            }
        ));
        assert!(population.candidates().iter().all(|c| c.fitness().is_none()));
        assert_eq!(population.candidates()[0].network().0, 0.2);
        assert!(population.compute_fitness_stats().is_none());
    }

    /// Scores every candidate with its network's constant output, unchecked.
    #[derive(Debug)]
    struct RawOutputMetric;

    impl FitnessMetric for RawOutputMetric {
        fn name(&self) -> &'static str {
            "raw"
        }

        fn evaluate_candidate(
            &self,
            _candidate: usize,
            network: &mut dyn CandidateNetwork,
            _signal: &ClassSample,
            _background: &ClassSample,
        ) -> Result<f64, EvaluationError> {
            Ok(network.activate(&[0.0]))
        }
    }

    #[test]
    fn test_non_finite_fitness_aborts_generation() {
        let sample = class_sample(&[(1.0, 0.0)]);
        let mut population =
            Population::new([0.7, f64::NAN, 0.9, f64::INFINITY].map(ConstantNetwork));

        let err = population
            .evaluate_fitness(&RawOutputMetric, &sample, &sample)
            .unwrap_err();
        assert_eq!(err.candidate, 1);
        assert!(matches!(
            err.source,
            EvaluationError::NonFiniteFitness { metric: "raw", value } if value.is_nan()
        ));
        assert!(population.candidates().iter().all(|c| c.fitness().is_none()));
        assert!(population.compute_fitness_stats().is_none());
    }

    #[test]
    fn test_empty_population() {
        let signal = class_sample(&[(1.0, 0.0)]);
        let mut population = Population::<ConstantNetwork>::new([]);
        population
            .evaluate_fitness(&EuclideanDistance::default(), &signal, &signal)
            .unwrap();
        assert!(population.is_empty());
        assert!(population.best().is_none());
    }
}
