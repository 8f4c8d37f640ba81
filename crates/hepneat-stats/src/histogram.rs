use std::ops::Range;

/// A fixed-binning histogram of weighted values.
///
/// The range `[min, max]` is divided into equally wide bins. Filling a value adds its
/// weight to the bin containing it. The upper edge `max` itself falls into the last bin,
/// so a discriminator output of exactly `1.0` is not lost. Values outside the range
/// (and NaN) are dropped.
#[derive(Debug, Clone)]
pub struct WeightedHistogram {
    min: f64,
    max: f64,
    bins: Vec<HistogramBin>,
}

/// A single bin in a [`WeightedHistogram`].
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramBin {
    /// The range of values covered by this bin (inclusive start, exclusive end).
    pub range: Range<f64>,
    /// Sum of the weights filled into this bin.
    pub sum_weights: f64,
}

impl HistogramBin {
    /// Returns the midpoint of the bin range.
    #[must_use]
    pub fn center(&self) -> f64 {
        0.5 * (self.range.start + self.range.end)
    }
}

impl WeightedHistogram {
    /// Creates an empty histogram with `num_bins` equal bins over `[min, max]`.
    ///
    /// # Panics
    ///
    /// Panics if `num_bins` is zero or if `min < max` does not hold.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn new(num_bins: usize, min: f64, max: f64) -> Self {
        assert!(num_bins > 0, "histogram needs at least one bin");
        assert!(min < max, "histogram range must be non-empty");

        let width = (max - min) / num_bins as f64;
        let bins = (0..num_bins)
            .map(|idx| {
                // Recompute edges from the index to avoid accumulating rounding errors
                let start = min + idx as f64 * width;
                let end = if idx + 1 == num_bins {
                    max
                } else {
                    min + (idx + 1) as f64 * width
                };
                HistogramBin {
                    range: start..end,
                    sum_weights: 0.0,
                }
            })
            .collect();

        Self { min, max, bins }
    }

    /// Creates an empty histogram over `[0, 1]`, the range of a discriminator output.
    #[must_use]
    pub fn unit(num_bins: usize) -> Self {
        Self::new(num_bins, 0.0, 1.0)
    }

    /// Returns the index of the bin containing `value`, or `None` if it is out of range.
    #[expect(
        clippy::cast_precision_loss,
        clippy::cast_sign_loss,
        clippy::cast_possible_truncation
    )]
    #[must_use]
    pub fn bin_index(&self, value: f64) -> Option<usize> {
        if !(self.min..=self.max).contains(&value) {
            return None;
        }
        let num_bins = self.bins.len();
        let position = (value - self.min) / (self.max - self.min) * num_bins as f64;
        Some((position.floor() as usize).min(num_bins - 1))
    }

    /// Adds `weight` to the bin containing `value`. Returns `false` if the value was
    /// out of range and nothing was filled.
    pub fn fill(&mut self, value: f64, weight: f64) -> bool {
        let Some(idx) = self.bin_index(value) else {
            return false;
        };
        self.bins[idx].sum_weights += weight;
        true
    }

    /// Returns the in-range bins in ascending order.
    #[must_use]
    pub fn bins(&self) -> &[HistogramBin] {
        &self.bins
    }

    /// Sum of weights of all in-range bins.
    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.bins.iter().map(|bin| bin.sum_weights).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bin_edges() {
        let histogram = WeightedHistogram::unit(4);
        let bins = histogram.bins();
        assert_eq!(bins.len(), 4);
        assert_eq!(bins[0].range, 0.0..0.25);
        assert_eq!(bins[3].range, 0.75..1.0);
        assert!((bins[1].center() - 0.375).abs() < 1e-12);
    }

    #[test]
    fn test_fill_boundaries() {
        let mut histogram = WeightedHistogram::unit(25);
        assert!(histogram.fill(0.0, 1.0));
        assert!(histogram.fill(1.0, 2.0));
        assert!(histogram.fill(0.03, 3.0));
        assert!(histogram.fill(0.5, 0.5));

        let bins = histogram.bins();
        assert_eq!(bins[0].sum_weights, 4.0);
        assert_eq!(bins[24].sum_weights, 2.0);
        assert_eq!(bins[12].sum_weights, 0.5);
        assert_eq!(histogram.total_weight(), 6.5);
    }

    #[test]
    fn test_out_of_range_values_are_dropped() {
        let mut histogram = WeightedHistogram::new(3, -1.0, 2.0);
        assert!(!histogram.fill(-1.5, 1.0));
        assert!(!histogram.fill(2.5, 2.0));
        assert!(!histogram.fill(f64::NAN, 4.0));
        assert!(histogram.fill(0.5, 0.25));
        assert_eq!(histogram.bin_index(-1.5), None);
        assert_eq!(histogram.bin_index(f64::NAN), None);
        assert_eq!(histogram.total_weight(), 0.25);
        assert_eq!(histogram.bins()[1].sum_weights, 0.25);
    }

    #[test]
    #[should_panic(expected = "at least one bin")]
    fn test_zero_bins_panics() {
        let _ = WeightedHistogram::unit(0);
    }
}
