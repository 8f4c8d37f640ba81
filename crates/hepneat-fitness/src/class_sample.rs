//! Compact per-class samples as consumed by the fitness metrics.

use hepneat_sample::event::Sample;

use crate::EvaluationError;

/// Which of the two samples an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum SampleClass {
    #[display("signal")]
    Signal,
    #[display("background")]
    Background,
}

/// Weight and (normalized) features of one event.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedFeatures {
    pub weight: f64,
    pub features: Vec<f64>,
}

/// All events of one class, together with the class's total weight (yield).
///
/// Shared read-only between all candidates of a generation.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassSample {
    total_weight: f64,
    events: Vec<WeightedFeatures>,
}

impl ClassSample {
    /// Creates a class sample whose total weight is the sum of its event weights.
    #[must_use]
    pub fn new(events: Vec<WeightedFeatures>) -> Self {
        let total_weight = events.iter().map(|event| event.weight).sum();
        Self {
            total_weight,
            events,
        }
    }

    /// Creates a class sample with an externally known total weight.
    #[must_use]
    pub fn with_total_weight(total_weight: f64, events: Vec<WeightedFeatures>) -> Self {
        Self {
            total_weight,
            events,
        }
    }

    /// Converts a (normalized) sample into compact form, dropping event identifiers.
    #[must_use]
    pub fn from_sample(sample: &Sample) -> Self {
        let events = sample
            .events()
            .iter()
            .map(|event| WeightedFeatures {
                weight: event.weight,
                features: event.values.clone(),
            })
            .collect();
        Self::new(events)
    }

    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    #[must_use]
    pub fn events(&self) -> &[WeightedFeatures] {
        &self.events
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Returns the total weight, failing unless it is positive and finite.
    pub(crate) fn checked_total_weight(&self, class: SampleClass) -> Result<f64, EvaluationError> {
        if self.total_weight > 0.0 && self.total_weight.is_finite() {
            Ok(self.total_weight)
        } else {
            Err(EvaluationError::NonPositiveTotalWeight {
                class,
                total_weight: self.total_weight,
            })
        }
    }

    /// Average weight per event, the scale of one unweighted count.
    #[expect(clippy::cast_precision_loss)]
    pub(crate) fn weight_scale(&self, class: SampleClass) -> Result<f64, EvaluationError> {
        if self.events.is_empty() {
            return Err(EvaluationError::EmptySample { class });
        }
        Ok(self.checked_total_weight(class)? / self.events.len() as f64)
    }
}
