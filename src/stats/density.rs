//! Kernel density estimation for violin and density charts.

use super::StatsCalculator;
use statrs::distribution::{Continuous, Normal};

/// Evaluation points per density curve.
pub const DEFAULT_POINTS: usize = 200;

/// Bandwidths beyond the data range, matching the usual `cut = 3` of density
/// plots.
pub const DEFAULT_CUT: f64 = 3.0;

/// A density estimate evaluated on an evenly spaced grid.
#[derive(Debug, Clone, Default)]
pub struct DensityCurve {
    pub xs: Vec<f64>,
    pub densities: Vec<f64>,
    pub bandwidth: f64,
}

impl DensityCurve {
    pub fn peak(&self) -> f64 {
        self.densities.iter().copied().fold(0.0, f64::max)
    }

    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.xs.iter().copied().zip(self.densities.iter().copied())
    }
}

/// `n` evenly spaced values from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

/// Scott's rule: `std * n^(-1/5)`.
///
/// Constant samples fall back to a width proportional to their magnitude.
pub fn scott_bandwidth(values: &[f64]) -> f64 {
    let n = values.len();
    if n == 0 {
        return 1.0;
    }

    let bw = StatsCalculator::std_dev(values) * (n as f64).powf(-0.2);
    if bw > 0.0 && bw.is_finite() {
        bw
    } else {
        let magnitude = StatsCalculator::mean(values).abs();
        if magnitude > 0.0 {
            magnitude * 0.01
        } else {
            1.0
        }
    }
}

/// Gaussian kernel density estimate of `values` at every point of `grid`.
pub fn gaussian_kde(values: &[f64], grid: &[f64], bandwidth: f64) -> Vec<f64> {
    if values.is_empty() || bandwidth <= 0.0 {
        return vec![0.0; grid.len()];
    }

    let Ok(kernel) = Normal::new(0.0, 1.0) else {
        return vec![0.0; grid.len()];
    };
    let scale = values.len() as f64 * bandwidth;

    grid.iter()
        .map(|&x| {
            values
                .iter()
                .map(|&xi| kernel.pdf((x - xi) / bandwidth))
                .sum::<f64>()
                / scale
        })
        .collect()
}

/// Density curve spanning `cut` bandwidths past the data on both sides.
pub fn density_curve(values: &[f64], cut: f64, points: usize) -> DensityCurve {
    if values.is_empty() {
        return DensityCurve::default();
    }

    let bandwidth = scott_bandwidth(values);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let xs = linspace(min - cut * bandwidth, max + cut * bandwidth, points);
    let densities = gaussian_kde(values, &xs, bandwidth);

    DensityCurve {
        xs,
        densities,
        bandwidth,
    }
}
