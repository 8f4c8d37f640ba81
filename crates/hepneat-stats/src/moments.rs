//! Exact weighted running moments.
//!
//! [`WeightedMoments`] keeps a weighted mean and a weighted second moment (mean of
//! squares) together with the total weight they were computed from. Each new value
//! updates both averages exactly:
//!
//! ```text
//! mean'   = (W·mean   + w·v ) / (W + w)
//! second' = (W·second + w·v²) / (W + w)
//! W'      = W + w
//! ```
//!
//! This is a plain weighted average, not an exponential decay: feeding the same
//! values in any order, in one call or split across several, yields the same
//! moments up to floating-point rounding.

use serde::{Deserialize, Serialize};

/// Weighted mean and second moment of a stream of values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightedMoments {
    mean: f64,
    second: f64,
    total_weight: f64,
    initialized: bool,
}

impl WeightedMoments {
    /// Creates an empty accumulator.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            mean: 0.0,
            second: 0.0,
            total_weight: 0.0,
            initialized: false,
        }
    }

    /// Rebuilds an accumulator from a frozen mean and standard deviation.
    ///
    /// The second moment is reconstructed as `mean² + std_dev²`.
    #[must_use]
    pub fn from_mean_std(mean: f64, std_dev: f64, total_weight: f64) -> Self {
        Self {
            mean,
            second: mean * mean + std_dev * std_dev,
            total_weight,
            initialized: true,
        }
    }

    /// Adds one value with the given weight.
    ///
    /// While no weight has been accumulated yet, the value replaces the current
    /// moments instead of being averaged into them.
    pub fn push(&mut self, value: f64, weight: f64) {
        if self.total_weight == 0.0 {
            self.mean = value;
            self.second = value * value;
            self.total_weight = weight;
        } else {
            let old = self.total_weight;
            let total = old + weight;
            self.mean = (old * self.mean + weight * value) / total;
            self.second = (old * self.second + weight * value * value) / total;
            self.total_weight = total;
        }
        self.initialized = true;
    }

    /// Returns `true` if no value has been pushed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        !self.initialized
    }

    /// Total weight accumulated so far (0 for an empty accumulator).
    #[must_use]
    pub const fn total_weight(&self) -> f64 {
        self.total_weight
    }

    /// Weighted mean, or `None` if empty.
    #[must_use]
    pub const fn mean(&self) -> Option<f64> {
        if self.initialized {
            Some(self.mean)
        } else {
            None
        }
    }

    /// Weighted mean of squared values, or `None` if empty.
    #[must_use]
    pub const fn second_moment(&self) -> Option<f64> {
        if self.initialized {
            Some(self.second)
        } else {
            None
        }
    }

    /// Weighted variance, clamped at zero against cancellation.
    #[must_use]
    pub fn variance(&self) -> Option<f64> {
        self.initialized
            .then(|| (self.second - self.mean * self.mean).max(0.0))
    }

    /// Weighted standard deviation, or `None` if empty.
    #[must_use]
    pub fn std_dev(&self) -> Option<f64> {
        self.variance().map(f64::sqrt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        let scale = a.abs().max(b.abs()).max(1.0);
        assert!((a - b).abs() <= 1e-9 * scale, "{a} != {b}");
    }

    #[test]
    fn test_empty() {
        let moments = WeightedMoments::new();
        assert!(moments.is_empty());
        assert_eq!(moments.total_weight(), 0.0);
        assert_eq!(moments.mean(), None);
        assert_eq!(moments.std_dev(), None);
    }

    #[test]
    fn test_first_value_initializes() {
        let mut moments = WeightedMoments::new();
        moments.push(4.0, 2.5);
        assert_eq!(moments.mean(), Some(4.0));
        assert_eq!(moments.second_moment(), Some(16.0));
        assert_eq!(moments.std_dev(), Some(0.0));
        assert_eq!(moments.total_weight(), 2.5);
    }

    #[test]
    fn test_weighted_mean_and_std() {
        let mut moments = WeightedMoments::new();
        moments.push(0.0, 3.0);
        moments.push(4.0, 1.0);
        // mean = 1, E[x²] = 4, var = 3
        assert_close(moments.mean().unwrap(), 1.0);
        assert_close(moments.variance().unwrap(), 3.0);
        assert_close(moments.total_weight(), 4.0);
    }

    #[test]
    fn test_order_invariance() {
        let values = [(1.5, 0.2), (-3.0, 1.7), (8.25, 0.01), (0.0, 4.0), (2.0, 2.0)];

        let mut forward = WeightedMoments::new();
        for &(v, w) in &values {
            forward.push(v, w);
        }
        let mut backward = WeightedMoments::new();
        for &(v, w) in values.iter().rev() {
            backward.push(v, w);
        }

        assert_close(forward.mean().unwrap(), backward.mean().unwrap());
        assert_close(forward.std_dev().unwrap(), backward.std_dev().unwrap());
        assert_close(forward.total_weight(), backward.total_weight());
    }

    #[test]
    fn test_zero_weight_prefix_is_replaced() {
        let mut moments = WeightedMoments::new();
        moments.push(100.0, 0.0);
        moments.push(2.0, 1.0);
        assert_eq!(moments.mean(), Some(2.0));
    }

    #[test]
    fn test_from_mean_std_round_trip() {
        let moments = WeightedMoments::from_mean_std(3.0, 2.0, 10.0);
        assert_close(moments.mean().unwrap(), 3.0);
        assert_close(moments.std_dev().unwrap(), 2.0);
        assert_close(moments.second_moment().unwrap(), 13.0);
    }

    #[test]
    fn test_variance_clamped_at_zero() {
        let mut moments = WeightedMoments::new();
        for _ in 0..10 {
            moments.push(0.1, 0.3);
        }
        assert!(moments.variance().unwrap() >= 0.0);
    }
}
