//! Statistics module - derived sequences, descriptive stats and densities

mod calculator;
pub mod density;

pub use calculator::{GroupStats, StatsCalculator, StatsError, DEFAULT_CONFIDENCE};
pub use density::DensityCurve;
