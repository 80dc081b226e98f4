//! Chart descriptions handed to the renderer.
//!
//! Studies build these from their tables; the renderer turns each into a PNG.

use super::Palette;
use chrono::NaiveDate;

/// A named list of values, e.g. the daily prices of one quarter.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedValues {
    pub name: String,
    pub values: Vec<f64>,
}

impl NamedValues {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Points at explicit x positions (scatter and bar series).
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedSeries {
    pub name: String,
    pub positions: Vec<f64>,
    pub values: Vec<f64>,
}

/// Values observed on calendar dates.
#[derive(Debug, Clone, PartialEq)]
pub struct DatedSeries {
    pub name: String,
    pub dates: Vec<NaiveDate>,
    pub values: Vec<f64>,
}

/// One titled panel of a time-series figure.
#[derive(Debug, Clone, PartialEq)]
pub struct LinePanel {
    pub title: String,
    pub series: Vec<DatedSeries>,
}

/// Mean of a bar with its confidence interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarStat {
    pub mean: f64,
    pub interval: Option<(f64, f64)>,
}

/// Bars per category, split by a hue column.
#[derive(Debug, Clone, PartialEq)]
pub struct HueBarPanel {
    pub title: Option<String>,
    pub y_label: String,
    pub categories: Vec<String>,
    pub hues: Vec<String>,
    /// `cells[category][hue]`, `None` where the combination has no rows.
    pub cells: Vec<Vec<Option<BarStat>>>,
    pub y_range: Option<(f64, f64)>,
    pub show_legend: bool,
}

/// (x, y) pairs for one hue level.
#[derive(Debug, Clone, PartialEq)]
pub struct XySeries {
    pub name: String,
    pub points: Vec<(f64, f64)>,
}

/// One small multiple of a facet grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Facet {
    pub title: String,
    pub series: Vec<XySeries>,
}

/// How a hue bar figure arranges its panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelLayout {
    /// One panel filling the image.
    Single,
    /// First panel across the top two thirds of a 3x3 grid, the rest in the
    /// middle row, one cell each.
    Overview,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FigureKind {
    /// Density outline per category with an inner quartile box.
    Violin {
        x_label: String,
        y_label: String,
        groups: Vec<NamedValues>,
    },
    /// Shaded density curves overlaid on one axis.
    Density {
        x_label: String,
        groups: Vec<NamedValues>,
    },
    /// Points at labelled x positions.
    CategoryScatter {
        tick_positions: Vec<f64>,
        tick_labels: Vec<String>,
        series: Vec<PositionedSeries>,
    },
    /// Bars centred on the positions given per series.
    GroupedBars {
        tick_positions: Vec<f64>,
        tick_labels: Vec<String>,
        bar_width: f64,
        series: Vec<PositionedSeries>,
    },
    /// One bar per label.
    Bars {
        x_label: String,
        y_label: String,
        labels: Vec<String>,
        stats: Vec<BarStat>,
        percent_axis: bool,
    },
    /// Line panels over dates, side by side.
    TimeLines {
        y_label: String,
        panels: Vec<LinePanel>,
        percent_axis: bool,
    },
    /// Category bars split by hue.
    HueBars {
        panels: Vec<HueBarPanel>,
        layout: PanelLayout,
    },
    /// Small multiples of scatter plots sharing axes and a hue legend.
    FacetScatter {
        x_label: String,
        y_label: String,
        col_wrap: usize,
        facets: Vec<Facet>,
    },
    /// Small multiples of line plots sharing axes.
    FacetLines {
        x_label: String,
        y_label: String,
        col_wrap: usize,
        facets: Vec<Facet>,
    },
}

/// A chart to render: where it goes, how big it is and what it shows.
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub file_name: String,
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub palette: Palette,
    pub kind: FigureKind,
}

impl Figure {
    pub fn new(file_name: impl Into<String>, title: impl Into<String>, kind: FigureKind) -> Self {
        Self {
            file_name: file_name.into(),
            title: title.into(),
            width: 1000,
            height: 800,
            palette: Palette::default(),
            kind,
        }
    }

    /// Size in inches at 100 pixels per inch, scaled.
    pub fn with_size(mut self, width_in: f64, height_in: f64, scale: f64) -> Self {
        self.width = (width_in * 100.0 * scale).round().max(1.0) as u32;
        self.height = (height_in * 100.0 * scale).round().max(1.0) as u32;
        self
    }

    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = palette;
        self
    }
}
