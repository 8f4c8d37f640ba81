//! Monte-Carlo combined significance (weighted Stouffer Z-score).
//!
//! The candidate's outputs are binned into signal and background histograms as for the
//! separation metric. Each bin is then turned into a Z-value by integrating over the
//! statistical uncertainty of the weighted bin contents:
//!
//! 1. A weighted count `c` in a class with per-event scale `k = W / N` is treated as a
//!    Poisson count of `c / k` events. Its expectation is drawn from the posterior
//!    `Gamma(shape = c / k + 1, scale = k)`, for background (`b`) and signal (`s`).
//! 2. An observed count is drawn from `Poisson(s + b)`.
//! 3. The one-sided p-value `P(X >= observed | b)` is converted to a Z-value with the
//!    inverse normal survival function and clamped to `[minz, -minz]`.
//! 4. Z-values are averaged over draws until the running average changes by less than
//!    `error` (relative), or until `mpoints` draws have been made.
//!
//! The per-bin Z-values are combined with weighted Stouffer's method and reported as
//! `1 - p` of the combined Z, so that a higher fitness still means more significance:
//!
//! ```text
//! Z       = Σ w_bin · Z_bin / sqrt(Σ w_bin²)
//! fitness = 1 - Φc(Z)
//! ```
//!
//! # Random streams
//!
//! Background expectations, signal expectations and observed counts are drawn from
//! three independent generators ([`DrawStreams`]) owned by the evaluation of a single
//! candidate. With a configured seed the streams are derived from the seed and the
//! candidate's position, so results do not depend on thread scheduling.

use std::{fmt, iter};

use hepneat_stats::special;
use log::{debug, warn};
use rand::SeedableRng;
use rand_distr::{Distribution, Gamma, Poisson};
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};

use crate::{
    EvaluationError,
    class_sample::{ClassSample, SampleClass},
    network::CandidateNetwork,
};

use super::{FitnessMetric, fill_histograms};

/// Weight given to each bin's Z-value when combining them.
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
pub enum BinWeighting {
    /// Every bin counts the same.
    #[default]
    #[display("constant")]
    Constant,
    /// Bins count proportionally to their center, favoring signal-like outputs.
    #[display("linear")]
    Linear,
}

impl BinWeighting {
    #[must_use]
    pub fn weight(self, bin_center: f64) -> f64 {
        match self {
            Self::Constant => 1.0,
            Self::Linear => bin_center,
        }
    }
}

/// Outcome of the Monte-Carlo integration of one bin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinSignificance {
    /// Running average of the Z-value when the loop stopped.
    pub z: f64,
    /// Number of draws made.
    pub draws: usize,
    /// Whether the relative-change criterion was met before the draw cap.
    pub converged: bool,
}

/// Independent random generators for one candidate's Monte-Carlo integration.
#[derive(Debug, Clone)]
pub struct DrawStreams {
    background: Pcg64,
    signal: Pcg64,
    count: Pcg64,
}

impl DrawStreams {
    const STREAMS_PER_CANDIDATE: u64 = 3;

    /// Derives reproducible streams from a base seed and a candidate position.
    #[must_use]
    pub fn seeded(seed: u64, candidate: usize) -> Self {
        let base = seed.wrapping_add((candidate as u64).wrapping_mul(Self::STREAMS_PER_CANDIDATE));
        Self {
            background: Pcg64::seed_from_u64(base),
            signal: Pcg64::seed_from_u64(base.wrapping_add(1)),
            count: Pcg64::seed_from_u64(base.wrapping_add(2)),
        }
    }

    /// Seeds each stream independently from the thread-local generator.
    #[must_use]
    pub fn from_entropy() -> Self {
        let mut rng = rand::rng();
        Self {
            background: Pcg64::from_rng(&mut rng),
            signal: Pcg64::from_rng(&mut rng),
            count: Pcg64::from_rng(&mut rng),
        }
    }
}

/// Weighted Stouffer Z-score metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoufferZScore {
    num_bins: usize,
    tolerance: f64,
    max_draws: usize,
    min_z: f64,
    weighting: BinWeighting,
    seed: Option<u64>,
}

impl Default for StoufferZScore {
    fn default() -> Self {
        Self {
            num_bins: Self::DEFAULT_NUM_BINS,
            tolerance: Self::DEFAULT_TOLERANCE,
            max_draws: Self::DEFAULT_MAX_DRAWS,
            min_z: Self::DEFAULT_MIN_Z,
            weighting: BinWeighting::default(),
            seed: None,
        }
    }
}

impl StoufferZScore {
    pub const DEFAULT_NUM_BINS: usize = 25;
    pub const DEFAULT_TOLERANCE: f64 = 0.01;
    pub const DEFAULT_MAX_DRAWS: usize = 1000;
    pub const DEFAULT_MIN_Z: f64 = -10.0;

    /// Creates the metric.
    ///
    /// # Arguments
    ///
    /// * `num_bins` - Histogram bins over `[0, 1]`
    /// * `tolerance` - Relative change of the running Z average that stops a bin's draws
    /// * `max_draws` - Draw cap per bin
    /// * `min_z` - Negative Z floor; Z-values are clamped to `[min_z, -min_z]`
    /// * `weighting` - Per-bin weighting function
    pub fn new(
        num_bins: usize,
        tolerance: f64,
        max_draws: usize,
        min_z: f64,
        weighting: BinWeighting,
    ) -> Result<Self, EvaluationError> {
        let invalid = |reason: String| Err(EvaluationError::InvalidConfig { reason });
        if num_bins == 0 {
            return invalid("nbins must be at least 1".to_owned());
        }
        if !(tolerance.is_finite() && tolerance > 0.0) {
            return invalid(format!("error must be positive, got {tolerance}"));
        }
        if max_draws == 0 {
            return invalid("mpoints must be at least 1".to_owned());
        }
        if !(min_z.is_finite() && min_z < 0.0) {
            return invalid(format!("minz must be negative, got {min_z}"));
        }
        Ok(Self {
            num_bins,
            tolerance,
            max_draws,
            min_z,
            weighting,
            seed: None,
        })
    }

    /// Makes the random streams reproducible (`Some`) or entropy-seeded (`None`).
    #[must_use]
    pub fn with_seed(self, seed: Option<u64>) -> Self {
        Self { seed, ..self }
    }

    /// Converts a one-sided p-value to a Z-value, clamped to `[min_z, -min_z]`.
    ///
    /// Zero and subnormal p-values give `-min_z`; a p-value of 1 (or NaN) gives `min_z`.
    #[must_use]
    pub fn z_value(&self, p_value: f64) -> f64 {
        if p_value.is_nan() || p_value >= 1.0 {
            self.min_z
        } else if p_value < f64::MIN_POSITIVE {
            -self.min_z
        } else {
            special::normal_isf(p_value).clamp(self.min_z, -self.min_z)
        }
    }

    /// Integrates the Z-value of one bin.
    ///
    /// `signal_weight` and `background_weight` are the weighted bin contents;
    /// `signal_scale` and `background_scale` the average event weight of each class.
    #[expect(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn bin_significance(
        &self,
        signal_weight: f64,
        background_weight: f64,
        signal_scale: f64,
        background_scale: f64,
        streams: &mut DrawStreams,
    ) -> Result<BinSignificance, EvaluationError> {
        let background_posterior = count_posterior(background_weight, background_scale)?;
        let signal_posterior = count_posterior(signal_weight, signal_scale)?;

        let mut average = 0.0;
        let mut accepted = 0_usize;
        for draw in 1..=self.max_draws {
            let background = background_posterior.sample(&mut streams.background);
            if background <= 0.0 {
                continue;
            }
            let signal = signal_posterior.sample(&mut streams.signal);
            let observed = Poisson::new(signal + background)
                .map_err(|err| distribution_error(&err))?
                .sample(&mut streams.count) as u64;
            let z = self.z_value(special::poisson_upper_tail(observed, background));

            accepted += 1;
            let previous = average;
            average += (z - average) / accepted as f64;
            if relative_change(previous, average) < self.tolerance {
                return Ok(BinSignificance {
                    z: average,
                    draws: draw,
                    converged: true,
                });
            }
        }

        Ok(BinSignificance {
            z: average,
            draws: self.max_draws,
            converged: false,
        })
    }
}

impl FitnessMetric for StoufferZScore {
    fn name(&self) -> &'static str {
        "zscore"
    }

    fn evaluate_candidate(
        &self,
        candidate: usize,
        network: &mut dyn CandidateNetwork,
        signal: &ClassSample,
        background: &ClassSample,
    ) -> Result<f64, EvaluationError> {
        let signal_scale = signal.weight_scale(SampleClass::Signal)?;
        let background_scale = background.weight_scale(SampleClass::Background)?;
        let histograms = fill_histograms(network, signal, background, self.num_bins)?;

        let mut streams = match self.seed {
            Some(seed) => DrawStreams::seeded(seed, candidate),
            None => DrawStreams::from_entropy(),
        };

        let mut weighted_z = 0.0;
        let mut squared_weights = 0.0;
        for (signal_bin, background_bin) in
            iter::zip(histograms.signal.bins(), histograms.background.bins())
        {
            let bin = self.bin_significance(
                signal_bin.sum_weights,
                background_bin.sum_weights,
                signal_scale,
                background_scale,
                &mut streams,
            )?;
            if !bin.converged {
                warn!(
                    "Candidate #{candidate}: bin [{:.3}, {:.3}) reached the maximum of {} draws without converging (z = {:.3})",
                    signal_bin.range.start, signal_bin.range.end, bin.draws, bin.z
                );
            }
            let weight = self.weighting.weight(signal_bin.center());
            weighted_z += weight * bin.z;
            squared_weights += weight * weight;
        }

        let combined_z = weighted_z / f64::sqrt(squared_weights);
        debug!("Candidate #{candidate}: combined z = {combined_z:.4}");
        Ok(special::normal_cdf(combined_z))
    }
}

/// Posterior of the expected weighted count given an observed weighted count.
fn count_posterior(weight: f64, scale: f64) -> Result<Gamma<f64>, EvaluationError> {
    Gamma::new(weight / scale + 1.0, scale).map_err(|err| distribution_error(&err))
}

fn distribution_error(err: &dyn fmt::Display) -> EvaluationError {
    EvaluationError::Distribution {
        reason: err.to_string(),
    }
}

fn relative_change(previous: f64, current: f64) -> f64 {
    let delta = current - previous;
    if delta == 0.0 {
        0.0
    } else if current == 0.0 {
        f64::INFINITY
    } else {
        (delta / current).abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::test_util::{IdentityNetwork, class_sample};

    fn seeded(num_bins: usize) -> StoufferZScore {
        StoufferZScore::new(
            num_bins,
            StoufferZScore::DEFAULT_TOLERANCE,
            StoufferZScore::DEFAULT_MAX_DRAWS,
            StoufferZScore::DEFAULT_MIN_Z,
            BinWeighting::Constant,
        )
        .unwrap()
        .with_seed(Some(7))
    }

    #[test]
    fn test_z_value_is_clamped() {
        let metric = StoufferZScore::default();
        assert_eq!(metric.z_value(1.0), -10.0);
        assert_eq!(metric.z_value(0.0), 10.0);
        assert_eq!(metric.z_value(1e-300), 10.0);
        assert!(metric.z_value(0.5).abs() < 1e-12);
        assert!((metric.z_value(0.025) - 1.959_963_984_540_054).abs() < 1e-9);
        assert!(metric.z_value(1.0 - 1e-15) >= -10.0);
    }

    #[test]
    fn test_signal_only_bin_clamps_to_max_z() {
        let metric = seeded(1);
        let mut streams = DrawStreams::seeded(11, 0);
        let bin = metric
            .bin_significance(1000.0, 0.0, 1.0, 1.0, &mut streams)
            .unwrap();
        assert!(bin.converged);
        assert_eq!(bin.z, 10.0);
        assert!(bin.draws <= 3);
    }

    #[test]
    fn test_subnormal_p_values_clamp_to_max_z() {
        let metric = StoufferZScore::default();
        for p in [f64::MIN_POSITIVE, 1e-315, 5e-324] {
            assert_eq!(metric.z_value(p), 10.0, "p = {p}");
        }
        assert_eq!(metric.z_value(f64::NAN), -10.0);
    }

    #[test]
    fn test_signal_dominated_bin_is_finite_for_every_seed() {
        // Observed counts around 172 over a background near 1 give p-values below 1e-308.
        let metric = seeded(1);
        for seed in 0..50 {
            let mut streams = DrawStreams::seeded(seed, 0);
            let bin = metric
                .bin_significance(172.0, 0.0, 1.0, 1.0, &mut streams)
                .unwrap();
            assert!(bin.z.is_finite(), "seed {seed}: {bin:?}");
            assert!(bin.converged, "seed {seed}: {bin:?}");
            assert!(bin.z > 9.0, "seed {seed}: {bin:?}");
        }
    }

    #[test]
    fn test_signal_dominated_candidate_has_finite_fitness() {
        let signal = class_sample(&[(1.0, 0.95); 172]);
        let background = class_sample(&[(1.0, 0.05)]);
        for seed in 0..20 {
            let metric = seeded(5).with_seed(Some(seed));
            let fitness = metric
                .evaluate_candidate(0, &mut IdentityNetwork::default(), &signal, &background)
                .unwrap();
            assert!(fitness.is_finite(), "seed {seed}");
            assert!((0.0..=1.0).contains(&fitness), "seed {seed}: {fitness}");
        }
    }

    #[test]
    fn test_draw_cap_without_convergence() {
        let metric = StoufferZScore::new(1, 1e-12, 50, -10.0, BinWeighting::Constant).unwrap();
        let mut streams = DrawStreams::seeded(3, 0);
        let bin = metric
            .bin_significance(5.0, 5.0, 1.0, 1.0, &mut streams)
            .unwrap();
        assert!(!bin.converged);
        assert_eq!(bin.draws, 50);
        assert!(bin.z.is_finite());
        assert!((-10.0..=10.0).contains(&bin.z));
    }

    #[test]
    fn test_relative_change() {
        assert_eq!(relative_change(0.0, 0.0), 0.0);
        assert_eq!(relative_change(1.0, 0.0), f64::INFINITY);
        assert_eq!(relative_change(0.0, 2.0), 1.0);
        assert!((relative_change(1.0, 1.01) - 0.01 / 1.01).abs() < 1e-15);
    }

    #[test]
    fn test_bin_weighting() {
        assert_eq!(BinWeighting::Constant.weight(0.3), 1.0);
        assert_eq!(BinWeighting::Linear.weight(0.3), 0.3);
        assert_eq!("linear".parse::<BinWeighting>().unwrap(), BinWeighting::Linear);
    }

    #[test]
    fn test_seeded_evaluation_is_reproducible() {
        let signal = class_sample(&[(1.0, 0.8), (2.0, 0.7), (1.0, 0.3)]);
        let background = class_sample(&[(1.0, 0.2), (3.0, 0.4), (1.0, 0.75)]);
        let metric = seeded(10);
        let first = metric
            .evaluate_candidate(4, &mut IdentityNetwork::default(), &signal, &background)
            .unwrap();
        let second = metric
            .evaluate_candidate(4, &mut IdentityNetwork::default(), &signal, &background)
            .unwrap();
        assert_eq!(first, second);
        assert!((0.0..=1.0).contains(&first));
    }

    #[test]
    fn test_separated_outputs_score_higher() {
        let signal_events = vec![(1.0, 0.9); 20];
        let separated_background = vec![(1.0, 0.1); 20];
        let overlapping_background = vec![(1.0, 0.9); 20];

        // Two bins: at most one empty, noise-only bin enters either combination.
        let metric = seeded(2);
        let signal = class_sample(&signal_events);
        let separated = metric
            .evaluate_candidate(
                0,
                &mut IdentityNetwork::default(),
                &signal,
                &class_sample(&separated_background),
            )
            .unwrap();
        let overlapping = metric
            .evaluate_candidate(
                0,
                &mut IdentityNetwork::default(),
                &signal,
                &class_sample(&overlapping_background),
            )
            .unwrap();
        assert!(
            separated > overlapping,
            "separated {separated} overlapping {overlapping}"
        );
    }

    #[test]
    fn test_empty_class_is_rejected() {
        let signal = class_sample(&[]);
        let background = class_sample(&[(1.0, 0.5)]);
        let err = StoufferZScore::default()
            .evaluate_candidate(0, &mut IdentityNetwork::default(), &signal, &background)
            .unwrap_err();
        assert!(matches!(
            err,
            EvaluationError::EmptySample {
                class: SampleClass::Signal
            }
        ));
    }

    #[test]
    fn test_invalid_parameters() {
        let c = BinWeighting::Constant;
        assert!(StoufferZScore::new(0, 0.01, 1000, -10.0, c).is_err());
        assert!(StoufferZScore::new(25, 0.0, 1000, -10.0, c).is_err());
        assert!(StoufferZScore::new(25, 0.01, 0, -10.0, c).is_err());
        assert!(StoufferZScore::new(25, 0.01, 1000, 3.0, c).is_err());
        assert!(StoufferZScore::new(25, 0.01, 1000, f64::NEG_INFINITY, c).is_err());
    }
}
