//! Streaming per-variable normalization.
//!
//! [`StreamingNormalizer`] accumulates, for every variable of a schema, the weighted
//! mean and weighted second moment of the events it is fed, plus the total weight.
//! Batches are merged into the running state, never replacing it, so a population
//! that does not fit in memory can be added one shard at a time:
//!
//! ```text
//! add(A); add(B)  ==  add(B); add(A)  ==  add(A ++ B)      (up to rounding)
//! ```
//!
//! Once accumulated, the constants z-score feature values, `v -> (v - mean) / std`.
//! They can be frozen into [`NormalizationParams`], persisted with serde, and later
//! turned back into an equivalent normalizer.
//!
//! `add` takes `&mut self`: one writer per population. Callers sharing a normalizer
//! across threads must serialize access themselves.
//!
//! # Example
//!
//! ```
//! use hepneat_sample::{
//!     event::{Event, Sample},
//!     normalizer::StreamingNormalizer,
//! };
//!
//! let variables = vec!["pt".to_owned()];
//! let mut sample = Sample::new(
//!     variables.clone(),
//!     vec![Event::new(1, 1.0, vec![10.0]), Event::new(2, 1.0, vec![30.0])],
//! )
//! .unwrap();
//!
//! let mut normalizer = StreamingNormalizer::new(variables);
//! normalizer.add(&sample).unwrap();
//! assert_eq!(normalizer.total_weight(), 2.0);
//!
//! normalizer.normalize_sample(&mut sample).unwrap();
//! assert_eq!(sample.events()[0].values, [-1.0]);
//! assert_eq!(sample.events()[1].values, [1.0]);
//! ```

use std::iter;

use hepneat_stats::moments::WeightedMoments;
use log::info;
use serde::{Deserialize, Serialize};

use crate::event::{Event, Sample};

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum NormalizationError {
    #[display("variable '{name}' has zero standard deviation and cannot be normalized")]
    DegenerateVariable { name: String },
    #[display("feature vector has {found} values, expected {expected}")]
    ArityMismatch { expected: usize, found: usize },
    #[display("sample variables {found:?} do not match normalizer variables {expected:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },
    #[display("no events have been added to the normalizer")]
    NotInitialized,
}

/// Mean and standard deviation of one variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariableStats {
    pub mean: f64,
    pub std_dev: f64,
}

/// Persisted normalization constants of one variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableParams {
    pub name: String,
    pub mean: f64,
    pub std: f64,
}

/// Frozen state of a [`StreamingNormalizer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationParams {
    pub variables: Vec<VariableParams>,
    /// Total weight the constants were computed from; lets a reloaded normalizer
    /// keep merging new batches with the right proportions.
    #[serde(default)]
    pub total_weight: f64,
}

/// Incremental weighted mean/std accumulator over a fixed variable schema.
#[derive(Debug, Clone)]
pub struct StreamingNormalizer {
    variables: Vec<String>,
    moments: Vec<WeightedMoments>,
    total_weight: f64,
}

impl StreamingNormalizer {
    /// Creates an empty normalizer for the given variables.
    #[must_use]
    pub fn new(variables: Vec<String>) -> Self {
        let moments = vec![WeightedMoments::new(); variables.len()];
        Self {
            variables,
            moments,
            total_weight: 0.0,
        }
    }

    /// Rebuilds a normalizer from frozen constants.
    #[must_use]
    pub fn from_params(params: &NormalizationParams) -> Self {
        let (variables, moments) = params
            .variables
            .iter()
            .map(|param| {
                (
                    param.name.clone(),
                    WeightedMoments::from_mean_std(param.mean, param.std, params.total_weight),
                )
            })
            .unzip();
        Self {
            variables,
            moments,
            total_weight: params.total_weight,
        }
    }

    /// Names of the variables, in value order.
    #[must_use]
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Total weight accumulated so far (0 if nothing was added).
    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    /// Returns `true` if statistics are available.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.moments.first().is_some_and(|m| !m.is_empty())
    }

    /// Merges a sample into the running statistics.
    ///
    /// The sample must use the same variables, in the same order.
    pub fn add(&mut self, sample: &Sample) -> Result<(), NormalizationError> {
        if sample.variables() != self.variables {
            return Err(NormalizationError::SchemaMismatch {
                expected: self.variables.clone(),
                found: sample.variables().to_vec(),
            });
        }
        self.add_events(sample.events())
    }

    /// Merges a batch of events into the running statistics.
    ///
    /// Every event is checked before any is merged, so a failed call leaves the state
    /// unchanged.
    pub fn add_events(&mut self, events: &[Event]) -> Result<(), NormalizationError> {
        if let Some(event) = events
            .iter()
            .find(|event| event.values.len() != self.variables.len())
        {
            return Err(NormalizationError::ArityMismatch {
                expected: self.variables.len(),
                found: event.values.len(),
            });
        }

        info!(
            "Computing average and std for each variable in {} events",
            events.len()
        );
        for event in events {
            for (moments, &value) in iter::zip(&mut self.moments, &event.values) {
                moments.push(value, event.weight);
            }
            self.total_weight += event.weight;
        }
        Ok(())
    }

    /// Looks up the statistics of one variable.
    #[must_use]
    pub fn stats(&self, name: &str) -> Option<VariableStats> {
        let index = self.variables.iter().position(|v| v == name)?;
        Self::stats_of(&self.moments[index])
    }

    fn stats_of(moments: &WeightedMoments) -> Option<VariableStats> {
        Some(VariableStats {
            mean: moments.mean()?,
            std_dev: moments.std_dev()?,
        })
    }

    /// Logs the mean and standard deviation of every variable.
    pub fn report(&self) {
        if !self.is_initialized() {
            info!("No statistics accumulated yet");
            return;
        }
        for (name, moments) in iter::zip(&self.variables, &self.moments) {
            if let Some(stats) = Self::stats_of(moments) {
                info!(
                    "Variable {name}: {:.2} +- {:.2}",
                    stats.mean, stats.std_dev
                );
            }
        }
    }

    /// Returns the normalization constants of every variable, in value order.
    ///
    /// Fails if nothing was added or if some variable has zero spread.
    pub fn constants(&self) -> Result<Vec<VariableStats>, NormalizationError> {
        iter::zip(&self.variables, &self.moments)
            .map(|(name, moments)| {
                let stats = Self::stats_of(moments).ok_or(NormalizationError::NotInitialized)?;
                if stats.std_dev > 0.0 && stats.std_dev.is_finite() {
                    Ok(stats)
                } else {
                    Err(NormalizationError::DegenerateVariable { name: name.clone() })
                }
            })
            .collect()
    }

    /// Replaces each value `v` with `(v - mean) / std`, in place.
    ///
    /// The values are left untouched on error.
    pub fn normalize_values(&self, values: &mut [f64]) -> Result<(), NormalizationError> {
        let constants = self.constants()?;
        apply(&constants, values)
    }

    /// Normalizes the observables of one event in place.
    pub fn normalize(&self, event: &mut Event) -> Result<(), NormalizationError> {
        self.normalize_values(&mut event.values)
    }

    /// Normalizes every event of a sample in place.
    pub fn normalize_sample(&self, sample: &mut Sample) -> Result<(), NormalizationError> {
        if sample.variables() != self.variables {
            return Err(NormalizationError::SchemaMismatch {
                expected: self.variables.clone(),
                found: sample.variables().to_vec(),
            });
        }
        info!("Normalizing variables in sample of {} events", sample.len());
        let constants = self.constants()?;
        for event in &mut sample.events {
            apply(&constants, &mut event.values)?;
        }
        Ok(())
    }

    /// Freezes the current constants for persistence.
    pub fn params(&self) -> Result<NormalizationParams, NormalizationError> {
        let variables = iter::zip(&self.variables, &self.moments)
            .map(|(name, moments)| {
                let stats = Self::stats_of(moments).ok_or(NormalizationError::NotInitialized)?;
                Ok(VariableParams {
                    name: name.clone(),
                    mean: stats.mean,
                    std: stats.std_dev,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(NormalizationParams {
            variables,
            total_weight: self.total_weight,
        })
    }
}

fn apply(constants: &[VariableStats], values: &mut [f64]) -> Result<(), NormalizationError> {
    if values.len() != constants.len() {
        return Err(NormalizationError::ArityMismatch {
            expected: constants.len(),
            found: values.len(),
        });
    }
    for (value, stats) in iter::zip(values, constants) {
        *value = (*value - stats.mean) / stats.std_dev;
    }
    Ok(())
}
