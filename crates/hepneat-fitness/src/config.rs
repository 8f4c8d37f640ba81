//! Shared configuration surface of the fitness metrics.
//!
//! One [`FitnessConfig`] carries the options of all three metrics; each metric reads
//! the ones it needs. Missing fields take their defaults when deserializing, so a
//! configuration file only lists what it changes.

use serde::{Deserialize, Serialize};

use crate::{
    EvaluationError,
    metric::{
        FitnessMetric,
        euclidean::EuclideanDistance,
        separation::SchwienhorstEllerSeparation,
        zscore::{BinWeighting, StoufferZScore},
    },
};

/// Selects the fitness metric.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::FromStr,
)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Weighted n-norm distance from the ideal outputs.
    #[display("euclidean")]
    Euclidean,
    /// Schwienhorst–Eller histogram separation.
    #[display("separation")]
    Separation,
    /// Monte-Carlo weighted Stouffer Z-score.
    #[default]
    #[display("zscore")]
    ZScore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitnessConfig {
    pub metric: MetricKind,
    /// Exponent of the Euclidean metric.
    pub norm: f64,
    /// Histogram bins of the separation and Z-score metrics.
    pub nbins: usize,
    /// Relative convergence tolerance of the Monte-Carlo loop.
    pub error: f64,
    /// Maximum Monte-Carlo draws per bin.
    pub mpoints: usize,
    /// Z-value floor.
    pub minz: f64,
    /// Per-bin weighting of the Z-score metric.
    pub weight: BinWeighting,
    /// Seed of the Monte-Carlo streams; entropy-seeded when absent.
    pub seed: Option<u64>,
}

impl Default for FitnessConfig {
    fn default() -> Self {
        Self {
            metric: MetricKind::default(),
            norm: EuclideanDistance::DEFAULT_NORM,
            nbins: StoufferZScore::DEFAULT_NUM_BINS,
            error: StoufferZScore::DEFAULT_TOLERANCE,
            mpoints: StoufferZScore::DEFAULT_MAX_DRAWS,
            minz: StoufferZScore::DEFAULT_MIN_Z,
            weight: BinWeighting::default(),
            seed: None,
        }
    }
}

impl FitnessConfig {
    /// Checks every option, including those the selected metric ignores.
    pub fn validate(&self) -> Result<(), EvaluationError> {
        EuclideanDistance::new(self.norm)?;
        StoufferZScore::new(self.nbins, self.error, self.mpoints, self.minz, self.weight)?;
        Ok(())
    }

    /// Validates the configuration and builds the selected metric.
    pub fn build_metric(&self) -> Result<Box<dyn FitnessMetric>, EvaluationError> {
        self.validate()?;
        let metric: Box<dyn FitnessMetric> = match self.metric {
            MetricKind::Euclidean => Box::new(EuclideanDistance::new(self.norm)?),
            MetricKind::Separation => Box::new(SchwienhorstEllerSeparation::new(self.nbins)?),
            MetricKind::ZScore => Box::new(
                StoufferZScore::new(self.nbins, self.error, self.mpoints, self.minz, self.weight)?
                    .with_seed(self.seed),
            ),
        };
        Ok(metric)
    }
}
