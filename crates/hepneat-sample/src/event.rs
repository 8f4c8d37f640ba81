//! Weighted physics events and samples.
//!
//! An [`Event`] is one observation: a unique identifier, a non-negative weight and
//! the values of the physics observables. A [`Sample`] is an ordered collection of
//! events sharing one variable schema, the names of those observables.
//!
//! Both invariants (non-negative finite weights, constant arity) are checked once
//! in [`Sample::new`]. Deserializing a `Sample` goes through the same validation.

use serde::{Deserialize, Serialize};

/// One weighted observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Unique identifier of the event within its source.
    pub id: u64,
    /// Statistical weight of the event (e.g. cross-section normalization).
    pub weight: f64,
    /// Observable values, in schema order.
    pub values: Vec<f64>,
}

impl Event {
    #[must_use]
    pub fn new(id: u64, weight: f64, values: Vec<f64>) -> Self {
        Self { id, weight, values }
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum SampleError {
    #[display("event #{index} (id {id}) has {found} values, expected {expected}")]
    ArityMismatch {
        index: usize,
        id: u64,
        expected: usize,
        found: usize,
    },
    #[display("event #{index} (id {id}) has invalid weight {weight}")]
    InvalidWeight { index: usize, id: u64, weight: f64 },
}

/// Serialized form of a [`Sample`], validated on conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleData {
    pub variables: Vec<String>,
    pub events: Vec<Event>,
}

/// An ordered, validated collection of events sharing one variable schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SampleData")]
pub struct Sample {
    variables: Vec<String>,
    pub(crate) events: Vec<Event>,
}

impl TryFrom<SampleData> for Sample {
    type Error = SampleError;

    fn try_from(data: SampleData) -> Result<Self, Self::Error> {
        Self::new(data.variables, data.events)
    }
}

impl Sample {
    /// Creates a sample, checking every event against the schema.
    ///
    /// # Examples
    ///
    /// ```
    /// use hepneat_sample::event::{Event, Sample};
    ///
    /// let sample = Sample::new(
    ///     vec!["met".to_owned()],
    ///     vec![Event::new(1, 0.5, vec![42.0]), Event::new(2, 1.5, vec![17.0])],
    /// )
    /// .unwrap();
    /// assert_eq!(sample.len(), 2);
    /// assert_eq!(sample.total_weight(), 2.0);
    ///
    /// let bad = Sample::new(vec!["met".to_owned()], vec![Event::new(3, -1.0, vec![1.0])]);
    /// assert!(bad.is_err());
    /// ```
    pub fn new(variables: Vec<String>, events: Vec<Event>) -> Result<Self, SampleError> {
        for (index, event) in events.iter().enumerate() {
            if event.values.len() != variables.len() {
                return Err(SampleError::ArityMismatch {
                    index,
                    id: event.id,
                    expected: variables.len(),
                    found: event.values.len(),
                });
            }
            if !event.weight.is_finite() || event.weight < 0.0 {
                return Err(SampleError::InvalidWeight {
                    index,
                    id: event.id,
                    weight: event.weight,
                });
            }
        }
        Ok(Self { variables, events })
    }

    /// Names of the observables, in value order.
    #[must_use]
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    #[must_use]
    pub fn into_events(self) -> Vec<Event> {
        self.events
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Sum of all event weights (the sample yield).
    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.events.iter().map(|event| event.weight).sum()
    }
}
