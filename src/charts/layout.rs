//! Geometry helpers shared by the chart kinds.

use chrono::{Datelike, NaiveDate};

/// Share of a category slot occupied by its bars.
pub const CATEGORY_FILL: f64 = 0.8;

/// Centres of side-by-side bars for dataset `n` (1-based) of `t`
/// datasets, across `d` bar groups of width `w`: `t * i + w * n`.
pub fn grouped_bar_positions(n: usize, t: usize, d: usize, w: f64) -> Vec<f64> {
    (0..d).map(|i| (t * i) as f64 + w * n as f64).collect()
}

/// Pairwise midpoints, used to centre tick labels under grouped bars.
pub fn midpoints(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| (x + y) / 2.0).collect()
}

/// Offsets of `hue_count` bars inside a category slot centred on zero.
pub fn hue_offsets(hue_count: usize) -> Vec<f64> {
    if hue_count == 0 {
        return Vec::new();
    }
    let width = CATEGORY_FILL / hue_count as f64;
    (0..hue_count)
        .map(|j| -CATEGORY_FILL / 2.0 + width * (j as f64 + 0.5))
        .collect()
}

/// Width of one hue bar inside a category slot.
pub fn hue_bar_width(hue_count: usize) -> f64 {
    CATEGORY_FILL / hue_count.max(1) as f64
}

/// Rows and columns of a facet grid wrapping after `col_wrap` columns.
pub fn facet_grid(facets: usize, col_wrap: usize) -> (usize, usize) {
    if facets == 0 {
        return (0, 0);
    }
    let cols = col_wrap.clamp(1, facets);
    (facets.div_ceil(cols), cols)
}

/// Axis range covering `values` with `pad` of the span added on both sides.
///
/// Empty or degenerate input still yields a drawable range.
pub fn padded_range(values: impl IntoIterator<Item = f64>, pad: f64) -> (f64, f64) {
    let (min, max) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });

    if min.is_infinite() {
        return (0.0, 1.0);
    }
    let span = max - min;
    if span == 0.0 {
        let half = if min == 0.0 { 1.0 } else { min.abs() * 0.1 };
        return (min - half, max + half);
    }
    (min - span * pad, max + span * pad)
}

/// Same as [`padded_range`] but anchored at zero, for bar charts.
pub fn bar_range(values: impl IntoIterator<Item = f64>, pad: f64) -> (f64, f64) {
    let (lo, hi) = padded_range(values.into_iter().chain([0.0]), 0.0);
    let span = hi - lo;
    (
        if lo < 0.0 { lo - span * pad } else { 0.0 },
        if hi > 0.0 { hi + span * pad } else { 0.0 },
    )
}

/// Label for a tick at `value` when ticks sit on `positions`.
pub fn tick_label(value: f64, positions: &[f64], labels: &[String]) -> String {
    positions
        .iter()
        .zip(labels)
        .find(|(p, _)| (**p - value).abs() < 1e-6)
        .map(|(_, label)| label.clone())
        .unwrap_or_default()
}

/// Label for an integer category index, empty between categories.
pub fn category_label(value: f64, labels: &[String]) -> String {
    let rounded = value.round();
    if (value - rounded).abs() > 1e-6 || rounded < 0.0 {
        return String::new();
    }
    labels.get(rounded as usize).cloned().unwrap_or_default()
}

/// First day of every month within `[start, end]`.
pub fn month_starts(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut starts = Vec::new();
    let mut cursor = NaiveDate::from_ymd_opt(start.year(), start.month(), 1);
    while let Some(day) = cursor {
        if day > end {
            break;
        }
        if day >= start {
            starts.push(day);
        }
        cursor = if day.month() == 12 {
            NaiveDate::from_ymd_opt(day.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(day.year(), day.month() + 1, 1)
        };
    }
    starts
}

/// Short axis label for large magnitudes: `1.5T`, `250B`, `12M`.
pub fn compact_number(value: f64) -> String {
    const UNITS: [(f64, &str); 4] = [(1e12, "T"), (1e9, "B"), (1e6, "M"), (1e3, "k")];

    let magnitude = value.abs();
    for (scale, suffix) in UNITS {
        if magnitude >= scale {
            return format!("{}{}", trim_decimal(value / scale), suffix);
        }
    }
    trim_decimal(value)
}

fn trim_decimal(value: f64) -> String {
    let text = format!("{:.2}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_starts_within_range() {
        let start = NaiveDate::from_ymd_opt(2017, 1, 3).unwrap();
        let end = NaiveDate::from_ymd_opt(2017, 12, 29).unwrap();
        let months = month_starts(start, end);

        assert_eq!(months.len(), 11);
        assert_eq!(months[0], NaiveDate::from_ymd_opt(2017, 2, 1).unwrap());
        assert_eq!(months[10], NaiveDate::from_ymd_opt(2017, 12, 1).unwrap());

        let jan = NaiveDate::from_ymd_opt(2017, 1, 1).unwrap();
        let next_jan = NaiveDate::from_ymd_opt(2018, 1, 1).unwrap();
        assert_eq!(month_starts(jan, next_jan).len(), 13);
    }

    #[test]
    fn compact_numbers() {
        assert_eq!(compact_number(1.5e12), "1.5T");
        assert_eq!(compact_number(2.5e11), "250B");
        assert_eq!(compact_number(6.7e9), "6.7B");
        assert_eq!(compact_number(12_000_000.0), "12M");
        assert_eq!(compact_number(77.25), "77.25");
        assert_eq!(compact_number(40.0), "40");
        assert_eq!(compact_number(0.0), "0");
    }

    #[test]
    fn grouped_bars_follow_formula() {
        let revenue = grouped_bar_positions(1, 2, 4, 0.5);
        let earnings = grouped_bar_positions(2, 2, 4, 0.5);
        assert_eq!(revenue, vec![0.5, 2.5, 4.5, 6.5]);
        assert_eq!(earnings, vec![1.0, 3.0, 5.0, 7.0]);

        let middle = midpoints(&revenue, &earnings);
        assert_eq!(middle, vec![0.75, 2.75, 4.75, 6.75]);
        for ((a, b), m) in revenue.iter().zip(&earnings).zip(&middle) {
            assert!(a < m && m < b);
        }
    }

    #[test]
    fn hue_offsets_are_centred() {
        let offsets = hue_offsets(4);
        assert_eq!(offsets.len(), 4);
        assert!((offsets.iter().sum::<f64>()).abs() < 1e-12);
        assert!((offsets[1] - offsets[0] - hue_bar_width(4)).abs() < 1e-12);
        assert!(hue_offsets(0).is_empty());
    }

    #[test]
    fn facet_grid_covers_all() {
        assert_eq!(facet_grid(16, 4), (4, 4));
        assert_eq!(facet_grid(6, 3), (2, 3));
        assert_eq!(facet_grid(5, 3), (2, 3));
        assert_eq!(facet_grid(2, 4), (1, 2));
        assert_eq!(facet_grid(0, 4), (0, 0));
        let (rows, cols) = facet_grid(7, 0);
        assert!(rows * cols >= 7);
    }

    #[test]
    fn ranges_pad_and_anchor() {
        assert_eq!(padded_range([0.0, 10.0], 0.1), (-1.0, 11.0));
        assert_eq!(padded_range(Vec::<f64>::new(), 0.1), (0.0, 1.0));
        let (lo, hi) = padded_range([5.0, 5.0], 0.1);
        assert!(lo < 5.0 && hi > 5.0);

        let (lo, hi) = bar_range([2.0, 4.0], 0.05);
        assert_eq!(lo, 0.0);
        assert!((hi - 4.2).abs() < 1e-12);
    }

    #[test]
    fn labels_only_on_ticks() {
        let labels = vec!["Q1".to_string(), "Q2".to_string()];
        assert_eq!(category_label(1.0, &labels), "Q2");
        assert_eq!(category_label(0.5, &labels), "");
        assert_eq!(category_label(7.0, &labels), "");
        assert_eq!(tick_label(2.75, &[0.75, 2.75], &labels), "Q2");
        assert_eq!(tick_label(1.0, &[0.75, 2.75], &labels), "");
    }
}
