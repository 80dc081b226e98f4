//! Statistics Calculator Module
//! Handles derived sequences (percentages, growth) and descriptive statistics.

use statrs::distribution::{ContinuousCDF, StudentsT};
use thiserror::Error;

/// Confidence level used for bar chart error bars.
pub const DEFAULT_CONFIDENCE: f64 = 0.95;

#[derive(Error, Debug, PartialEq)]
pub enum StatsError {
    #[error("Length mismatch: {left} numerators vs {right} denominators")]
    LengthMismatch { left: usize, right: usize },
    #[error("Denominator at index {index} is zero")]
    ZeroDenominator { index: usize },
    #[error("Baseline value {0} cannot be used for growth")]
    InvalidBaseline(f64),
    #[error("No values to compute")]
    Empty,
}

/// Descriptive statistics for a single group.
#[derive(Debug, Clone)]
pub struct GroupStats {
    pub group_name: String,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub variance: f64,
    pub q1: f64,
    pub q3: f64,
    pub min: f64,
    pub max: f64,
}

impl Default for GroupStats {
    fn default() -> Self {
        Self {
            group_name: String::new(),
            count: 0,
            mean: f64::NAN,
            median: f64::NAN,
            std: f64::NAN,
            variance: f64::NAN,
            q1: f64::NAN,
            q3: f64::NAN,
            min: f64::NAN,
            max: f64::NAN,
        }
    }
}

impl GroupStats {
    /// Distance between the smallest and largest value.
    pub fn range(&self) -> f64 {
        self.max - self.min
    }
}

/// Handles statistical calculations.
pub struct StatsCalculator;

impl StatsCalculator {
    /// `numerators[i] / denominators[i] * 100` for every index.
    pub fn percentage_of(numerators: &[f64], denominators: &[f64]) -> Result<Vec<f64>, StatsError> {
        if numerators.len() != denominators.len() {
            return Err(StatsError::LengthMismatch {
                left: numerators.len(),
                right: denominators.len(),
            });
        }

        numerators
            .iter()
            .zip(denominators)
            .enumerate()
            .map(|(index, (n, d))| {
                if *d == 0.0 {
                    Err(StatsError::ZeroDenominator { index })
                } else {
                    Ok(n / d * 100.0)
                }
            })
            .collect()
    }

    /// Each value as a percentage of the first one.
    pub fn growth_percentage(values: &[f64]) -> Result<Vec<f64>, StatsError> {
        let baseline = *values.first().ok_or(StatsError::Empty)?;
        if baseline == 0.0 || !baseline.is_finite() {
            return Err(StatsError::InvalidBaseline(baseline));
        }
        Ok(values.iter().map(|v| v / baseline * 100.0).collect())
    }

    /// Relative change between consecutive values, in percent.
    pub fn period_changes(values: &[f64]) -> Result<Vec<f64>, StatsError> {
        values
            .windows(2)
            .enumerate()
            .map(|(index, pair)| {
                if pair[0] == 0.0 {
                    Err(StatsError::ZeroDenominator { index })
                } else {
                    Ok((pair[1] - pair[0]) / pair[0] * 100.0)
                }
            })
            .collect()
    }

    pub fn mean(values: &[f64]) -> f64 {
        if values.is_empty() {
            return f64::NAN;
        }
        values.iter().sum::<f64>() / values.len() as f64
    }

    /// Sample standard deviation (n - 1).
    pub fn std_dev(values: &[f64]) -> f64 {
        let n = values.len();
        if n < 2 {
            return 0.0;
        }
        let mean = Self::mean(values);
        let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        variance.sqrt()
    }

    /// Compute descriptive statistics for an array of values.
    pub fn compute_descriptive_stats(values: &[f64]) -> GroupStats {
        let n = values.len();
        if n == 0 {
            return GroupStats::default();
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let mean = Self::mean(values);
        let median = if n % 2 == 0 {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        } else {
            sorted[n / 2]
        };

        let std = Self::std_dev(values);

        GroupStats {
            group_name: String::new(),
            count: n,
            mean,
            median,
            std,
            variance: std * std,
            q1: Self::percentile(&sorted, 25.0),
            q3: Self::percentile(&sorted, 75.0),
            min: sorted[0],
            max: sorted[n - 1],
        }
    }

    /// Calculate percentile using linear interpolation (NumPy compatible).
    pub fn percentile(sorted_values: &[f64], p: f64) -> f64 {
        let n = sorted_values.len();
        if n == 0 {
            return f64::NAN;
        }
        if n == 1 {
            return sorted_values[0];
        }

        let rank = (p / 100.0) * (n - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = (rank.ceil() as usize).min(n - 1);
        let frac = rank - lower as f64;

        if lower == upper {
            sorted_values[lower]
        } else {
            sorted_values[lower] * (1.0 - frac) + sorted_values[upper] * frac
        }
    }

    /// Student-t confidence interval for the mean.
    ///
    /// Returns `None` with fewer than two values.
    pub fn mean_confidence_interval(values: &[f64], level: f64) -> Option<(f64, f64)> {
        let n = values.len();
        if n < 2 {
            return None;
        }

        let mean = Self::mean(values);
        let se = Self::std_dev(values) / (n as f64).sqrt();
        if se == 0.0 {
            return Some((mean, mean));
        }

        let dist = StudentsT::new(0.0, 1.0, (n - 1) as f64).ok()?;
        let t = dist.inverse_cdf(1.0 - (1.0 - level) / 2.0);
        Some((mean - t * se, mean + t * se))
    }

    /// Pearson correlation coefficient, `None` when undefined.
    pub fn pearson_correlation(x: &[f64], y: &[f64]) -> Option<f64> {
        if x.len() != y.len() || x.len() < 2 {
            return None;
        }

        let mean_x = Self::mean(x);
        let mean_y = Self::mean(y);
        let mut cov = 0.0;
        let mut var_x = 0.0;
        let mut var_y = 0.0;
        for (a, b) in x.iter().zip(y) {
            cov += (a - mean_x) * (b - mean_y);
            var_x += (a - mean_x).powi(2);
            var_y += (b - mean_y).powi(2);
        }

        let denom = (var_x * var_y).sqrt();
        if denom == 0.0 {
            None
        } else {
            Some(cov / denom)
        }
    }
}
