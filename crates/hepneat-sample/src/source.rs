//! Random-access event sources.
//!
//! The sampler only needs two capabilities from the storage layer: read the weight of
//! an event, and read a whole event, both by index. [`EventSource`] captures exactly
//! that, so file-backed readers (owned by the driver) and in-memory samples are
//! interchangeable. Readers are expected to be fastest when indices are visited in
//! ascending order.

use std::io;

use crate::event::{Event, Sample};

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum SourceError {
    #[display("failed to read event source: {_0}")]
    Io(#[error(source)] io::Error),
    #[display("event index {index} out of range for {len} events")]
    OutOfRange { index: usize, len: usize },
    #[display("event #{index} is malformed: {reason}")]
    Malformed { index: usize, reason: String },
}

impl From<io::Error> for SourceError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

/// Indexed access to a weighted event collection.
pub trait EventSource {
    /// Number of events available.
    fn num_events(&self) -> usize;

    /// Reads the event at `index`.
    fn read_event(&self, index: usize) -> Result<Event, SourceError>;

    /// Reads only the weight of the event at `index`.
    ///
    /// Sources that can fetch the weight without the observables should override this.
    fn read_weight(&self, index: usize) -> Result<f64, SourceError> {
        self.read_event(index).map(|event| event.weight)
    }
}

impl EventSource for [Event] {
    fn num_events(&self) -> usize {
        self.len()
    }

    fn read_event(&self, index: usize) -> Result<Event, SourceError> {
        self.get(index).cloned().ok_or(SourceError::OutOfRange {
            index,
            len: self.len(),
        })
    }

    fn read_weight(&self, index: usize) -> Result<f64, SourceError> {
        self.get(index)
            .map(|event| event.weight)
            .ok_or(SourceError::OutOfRange {
                index,
                len: self.len(),
            })
    }
}

impl EventSource for Sample {
    fn num_events(&self) -> usize {
        self.events.num_events()
    }

    fn read_event(&self, index: usize) -> Result<Event, SourceError> {
        self.events.read_event(index)
    }

    fn read_weight(&self, index: usize) -> Result<f64, SourceError> {
        self.events.read_weight(index)
    }
}
