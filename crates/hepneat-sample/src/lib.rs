//! Weighted event samples: representation, subsampling and normalization.
//!
//! This crate sits between the storage layer (owned by the driver) and fitness
//! evaluation. It never opens files itself; storage is reached through
//! [`source::EventSource`].
//!
//! # Workflow
//!
//! ```text
//! EventSource (file reader, in-memory Sample)
//!     ↓ sampler::materialize / sampler::draw_weighted
//! Sample / weighted subsample
//!     ↓ StreamingNormalizer::add (one batch at a time)
//! Per-variable weighted mean and std
//!     ↓ StreamingNormalizer::normalize_sample
//! Normalized sample, ready for fitness evaluation
//! ```
//!
//! # Modules
//!
//! - [`event`]: [`Event`](event::Event) and validated [`Sample`](event::Sample)
//! - [`source`]: Random-access event sources
//! - [`sampler`]: Full materialization and weight-proportional subsampling
//! - [`normalizer`]: Streaming weighted mean/std and z-score normalization

pub mod event;
pub mod normalizer;
pub mod sampler;
pub mod source;
