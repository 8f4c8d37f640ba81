//! Weight-proportional event sampling.
//!
//! Two ways of turning an [`EventSource`] into memory-resident data:
//!
//! - [`materialize`] reads every event once, in order.
//! - [`draw_weighted`] draws a fixed number of events with probability proportional
//!   to their weight and returns only their observables.
//!
//! # Weighted draw
//!
//! ```text
//! C[i] = C[i-1] + w[i]                      (cumulative weights, built once)
//! u    ~ Uniform(0, C[last]]                (one per draw)
//! i    = min { i : C[i] >= u }              (binary search)
//! ```
//!
//! Selected indices are sorted before the events are read, since sources read fastest
//! sequentially. The resulting rows are shuffled afterwards so that consumers reading
//! the subsample in order do not see it ordered by source position.
//!
//! Each draw is independent: an event can be selected more than once, which is what
//! gives heavy events their proportional share, and requesting more events than the
//! source holds is allowed.
//!
//! # Example
//!
//! ```
//! use hepneat_sample::{
//!     event::{Event, Sample},
//!     sampler,
//! };
//!
//! let sample = Sample::new(
//!     vec!["x".to_owned()],
//!     vec![Event::new(1, 1.0, vec![0.5]), Event::new(2, 3.0, vec![1.5])],
//! )
//! .unwrap();
//!
//! let mut rng = rand::rng();
//! let rows = sampler::draw_weighted(&sample, 10, &mut rng).unwrap();
//! assert_eq!(rows.len(), 10);
//! assert!(rows.iter().all(|row| row.len() == 1));
//! ```

use log::info;
use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Serialize};

use crate::{
    event::{Event, Sample},
    source::{EventSource, SourceError},
};

const READ_PROGRESS_INTERVAL: usize = 5000;
const SELECT_PROGRESS_INTERVAL: usize = 1000;

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum SamplingError {
    #[display("cannot draw {requested} events from a population with zero total weight")]
    EmptyPopulation { requested: usize },
    #[display("failed to read events while sampling: {_0}")]
    Source(#[error(source)] SourceError),
}

impl From<SourceError> for SamplingError {
    fn from(err: SourceError) -> Self {
        Self::Source(err)
    }
}

/// Reads every event of `source`, in order.
pub fn materialize<S>(source: &S) -> Result<Vec<Event>, SourceError>
where
    S: EventSource + ?Sized,
{
    let num_events = source.num_events();
    info!("Reading the whole sample of {num_events} events in one step");
    let mut events = Vec::with_capacity(num_events);
    for index in 0..num_events {
        if index % READ_PROGRESS_INTERVAL == 0 && index != 0 {
            info!("Read {index} events");
        }
        events.push(source.read_event(index)?);
    }
    Ok(events)
}

/// Immutable cumulative-weight table over a source.
///
/// Built once per sampling call; drawing from it takes `&self`, so a table can be
/// shared between threads once built.
#[derive(Debug, Clone, PartialEq)]
pub struct CumulativeWeights {
    cumulative: Vec<f64>,
}

impl CumulativeWeights {
    /// Builds the table from the weights of `source`, in source order.
    ///
    /// A negative or non-finite weight is reported as [`SourceError::Malformed`].
    pub fn from_source<S>(source: &S) -> Result<Self, SourceError>
    where
        S: EventSource + ?Sized,
    {
        let num_events = source.num_events();
        info!("Computing weight sums for {num_events} events");
        let weights = (0..num_events)
            .map(|index| {
                let weight = source.read_weight(index)?;
                if !weight.is_finite() || weight < 0.0 {
                    return Err(SourceError::Malformed {
                        index,
                        reason: format!("invalid weight {weight}"),
                    });
                }
                Ok(weight)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let table = Self::from_weights(weights);
        info!("Total yield {:.3}", table.total());
        Ok(table)
    }

    /// Builds the table from non-negative weights.
    #[must_use]
    pub fn from_weights<I>(weights: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let cumulative = weights
            .into_iter()
            .scan(0.0, |sum, weight| {
                *sum += weight;
                Some(*sum)
            })
            .collect();
        Self { cumulative }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cumulative.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cumulative.is_empty()
    }

    /// Sum of all weights (0 for an empty table).
    #[must_use]
    pub fn total(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    /// Returns `true` if the table holds a positive, finite total weight to draw from.
    #[must_use]
    pub fn can_draw(&self) -> bool {
        let total = self.total();
        total > 0.0 && total.is_finite()
    }

    /// Returns the smallest index `i` with `C[i] >= u`, or `None` if `u` exceeds the total.
    #[must_use]
    pub fn search(&self, u: f64) -> Option<usize> {
        let index = self.cumulative.partition_point(|&c| c < u);
        (index < self.cumulative.len()).then_some(index)
    }

    /// Draws one index with probability proportional to its weight.
    ///
    /// Zero-weight events are never selected.
    pub fn draw<R>(&self, rng: &mut R) -> Result<usize, SamplingError>
    where
        R: Rng + ?Sized,
    {
        if !self.can_draw() {
            return Err(SamplingError::EmptyPopulation { requested: 1 });
        }
        let total = self.total();
        // u in (0, total], so that leading zero-weight entries cannot match
        let u = total - rng.random_range(0.0..total);
        Ok(self
            .search(u)
            .unwrap_or_else(|| self.cumulative.len() - 1))
    }
}

/// Draws `count` events with probability proportional to weight.
///
/// Returns the observables of the selected events (identifier and weight stripped), in
/// random order. Requesting zero events always succeeds; requesting more from a source
/// with zero total weight fails with [`SamplingError::EmptyPopulation`].
pub fn draw_weighted<S, R>(
    source: &S,
    count: usize,
    rng: &mut R,
) -> Result<Vec<Vec<f64>>, SamplingError>
where
    S: EventSource + ?Sized,
    R: Rng + ?Sized,
{
    if count == 0 {
        return Ok(vec![]);
    }

    let table = CumulativeWeights::from_source(source)?;
    if !table.can_draw() {
        return Err(SamplingError::EmptyPopulation { requested: count });
    }

    info!("Selecting {count} random events");
    let mut indices = (0..count)
        .map(|_| table.draw(&mut *rng))
        .collect::<Result<Vec<_>, _>>()?;
    indices.sort_unstable();

    let mut rows = Vec::with_capacity(count);
    for (counter, &index) in indices.iter().enumerate() {
        if counter % SELECT_PROGRESS_INTERVAL == 0 && counter != 0 {
            info!("Selected {counter} events");
        }
        rows.push(source.read_event(index)?.values);
    }

    rows.shuffle(rng);
    Ok(rows)
}

/// A weighted subsample together with the names of its columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedSubsample {
    pub variables: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl WeightedSubsample {
    /// Draws `count` rows from `sample` with [`draw_weighted`].
    pub fn draw<R>(sample: &Sample, count: usize, rng: &mut R) -> Result<Self, SamplingError>
    where
        R: Rng + ?Sized,
    {
        Ok(Self {
            variables: sample.variables().to_vec(),
            rows: draw_weighted(sample, count, rng)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    use super::*;

    fn sample_with_weights(weights: &[f64]) -> Sample {
        let events = weights
            .iter()
            .enumerate()
            .map(|(i, &w)| {
                #[expect(clippy::cast_precision_loss)]
                let value = i as f64;
                Event::new(i as u64, w, vec![value, 10.0 * value])
            })
            .collect();
        Sample::new(vec!["a".to_owned(), "b".to_owned()], events).unwrap()
    }

    struct BrokenSource;

    impl EventSource for BrokenSource {
        fn num_events(&self) -> usize {
            3
        }

        fn read_event(&self, _index: usize) -> Result<Event, SourceError> {
            Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated file").into())
        }
    }

    struct FixedWeights(Vec<f64>);

    impl EventSource for FixedWeights {
        fn num_events(&self) -> usize {
            self.0.len()
        }

        fn read_event(&self, index: usize) -> Result<Event, SourceError> {
            Ok(Event::new(index as u64, self.0[index], vec![0.0]))
        }
    }

    #[test]
    fn test_materialize_reads_everything() {
        let sample = sample_with_weights(&[1.0, 2.0, 0.0, 4.0]);
        let events = materialize(&sample).unwrap();
        assert_eq!(events.len(), 4);
        assert_eq!(events, sample.events());
    }

    #[test]
    fn test_materialize_propagates_io_error() {
        let err = materialize(&BrokenSource).unwrap_err();
        assert!(matches!(err, SourceError::Io(_)));
    }

    #[test]
    fn test_search_ties_pick_smallest_index() {
        let table = CumulativeWeights::from_weights([1.0, 0.0, 1.0]);
        assert_eq!(table.search(1.0), Some(0));
        assert_eq!(table.search(1.5), Some(2));
        assert_eq!(table.search(0.2), Some(0));
        assert_eq!(table.search(2.5), None);
        assert_eq!(table.total(), 2.0);
    }

    #[test]
    fn test_draw_count() {
        let sample = sample_with_weights(&[1.0, 2.0, 3.0]);
        let mut rng = Pcg64::seed_from_u64(1);
        for count in [0, 1, 3, 50] {
            let rows = draw_weighted(&sample, count, &mut rng).unwrap();
            assert_eq!(rows.len(), count);
            assert!(rows.iter().all(|row| row.len() == 2));
        }
    }

    #[test]
    fn test_draw_strips_id_and_weight() {
        let sample = sample_with_weights(&[0.0, 5.0]);
        let mut rng = Pcg64::seed_from_u64(2);
        let rows = draw_weighted(&sample, 20, &mut rng).unwrap();
        assert!(rows.iter().all(|row| row == &[1.0, 10.0]));
    }

    #[test]
    fn test_zero_weight_events_never_drawn() {
        let sample = sample_with_weights(&[0.0, 1.0, 0.0, 0.0, 1.0, 0.0]);
        let mut rng = Pcg64::seed_from_u64(3);
        let rows = draw_weighted(&sample, 1000, &mut rng).unwrap();
        assert!(rows.iter().all(|row| row[0] == 1.0 || row[0] == 4.0));
    }

    #[test]
    fn test_empty_population() {
        let mut rng = Pcg64::seed_from_u64(4);
        let empty = sample_with_weights(&[]);
        assert!(matches!(
            draw_weighted(&empty, 5, &mut rng),
            Err(SamplingError::EmptyPopulation { requested: 5 })
        ));
        let weightless = sample_with_weights(&[0.0, 0.0]);
        assert!(matches!(
            draw_weighted(&weightless, 1, &mut rng),
            Err(SamplingError::EmptyPopulation { requested: 1 })
        ));
        assert!(draw_weighted(&empty, 0, &mut rng).unwrap().is_empty());
    }

    #[test]
    fn test_broken_source_fails_sampling() {
        let mut rng = Pcg64::seed_from_u64(5);
        let err = draw_weighted(&BrokenSource, 2, &mut rng).unwrap_err();
        assert!(matches!(err, SamplingError::Source(SourceError::Io(_))));
    }

    #[test]
    fn test_invalid_weights_are_malformed() {
        for (weights, bad_index) in [
            (vec![1.0, -1.0, 2.0], 1),
            (vec![1.0, 2.0, f64::NAN], 2),
            (vec![f64::INFINITY, 1.0], 0),
        ] {
            let source = FixedWeights(weights);
            let err = CumulativeWeights::from_source(&source).unwrap_err();
            assert!(
                matches!(err, SourceError::Malformed { index, .. } if index == bad_index),
                "{err}"
            );

            let mut rng = Pcg64::seed_from_u64(6);
            let err = draw_weighted(&source, 3, &mut rng).unwrap_err();
            assert!(matches!(
                err,
                SamplingError::Source(SourceError::Malformed { index, .. }) if index == bad_index
            ));
        }
    }

    #[test]
    #[expect(clippy::cast_precision_loss)]
    fn test_draw_frequencies_follow_weights() {
        const DRAWS: usize = 10_000;
        let weights = [1.0, 1.0, 1.0, 97.0];
        let sample = sample_with_weights(&weights);
        let mut rng = Pcg64::seed_from_u64(42);

        let rows = draw_weighted(&sample, DRAWS, &mut rng).unwrap();
        let mut observed = [0_usize; 4];
        for row in &rows {
            #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let index = row[0] as usize;
            observed[index] += 1;
        }

        // Chi-square goodness of fit, 3 degrees of freedom (critical value 16.27 at 0.1%)
        let total: f64 = weights.iter().sum();
        let chi_square: f64 = observed
            .iter()
            .zip(weights)
            .map(|(&obs, w)| {
                let expected = DRAWS as f64 * w / total;
                (obs as f64 - expected).powi(2) / expected
            })
            .sum();
        assert!(chi_square < 16.27, "chi-square {chi_square}, observed {observed:?}");
    }

    #[test]
    fn test_subsample_is_shuffled() {
        let sample = sample_with_weights(&[1.0; 200]);
        let mut rng = Pcg64::seed_from_u64(6);
        let subsample = WeightedSubsample::draw(&sample, 200, &mut rng).unwrap();
        assert_eq!(subsample.variables, ["a", "b"]);
        let firsts = subsample.rows.iter().map(|row| row[0]).collect::<Vec<_>>();
        assert!(!firsts.is_sorted_by(|a, b| a <= b));
    }
}
