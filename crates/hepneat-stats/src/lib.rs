//! Numerical building blocks for the hepneat analysis pipeline.
//!
//! This crate has no knowledge of events, networks or samples. It provides the
//! statistics those layers are built from:
//!
//! - **Weighted moments**: Exact running weighted mean and second moment, mergeable
//!   across batches
//! - **Histograms**: Fixed-binning weighted histograms, as filled with discriminator outputs
//! - **Descriptive statistics**: Summaries (min, max, mean, standard deviation) of a dataset
//! - **Special functions**: Log-gamma, regularized incomplete gamma, Poisson tail
//!   probabilities and the standard normal distribution functions
//!
//! # Modules
//!
//! - [`moments`]: Weighted running moments
//! - [`histogram`]: Fixed-binning weighted histogram
//! - [`descriptive`]: Descriptive statistics for summarizing datasets
//! - [`special`]: Special functions used by significance estimates
//!
//! # Examples
//!
//! ## Accumulating weighted moments
//!
//! ```
//! use hepneat_stats::moments::WeightedMoments;
//!
//! let mut moments = WeightedMoments::new();
//! moments.push(1.0, 1.0);
//! moments.push(3.0, 1.0);
//! assert_eq!(moments.mean(), Some(2.0));
//! assert_eq!(moments.std_dev(), Some(1.0));
//! ```
//!
//! ## Filling a histogram
//!
//! ```
//! use hepneat_stats::histogram::WeightedHistogram;
//!
//! let mut histogram = WeightedHistogram::unit(4);
//! histogram.fill(0.1, 2.0);
//! histogram.fill(0.9, 0.5);
//! assert_eq!(histogram.bins()[0].sum_weights, 2.0);
//! assert_eq!(histogram.bins()[3].sum_weights, 0.5);
//! ```
//!
//! ## Converting a p-value to a Z-value
//!
//! ```
//! use hepneat_stats::special;
//!
//! let z = special::normal_isf(0.025);
//! assert!((z - 1.959_963_984_540_054).abs() < 1e-9);
//! ```

pub mod descriptive;
pub mod histogram;
pub mod moments;
pub mod special;
