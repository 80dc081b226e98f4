//! Static Chart Renderer
//! Draws figures with plotters into an RGB buffer and saves them as PNG.
//!
//! Every chart kind follows the same steps:
//! 1. Title (caption, or a title band for multi-panel figures)
//! 2. Axes with categorical, month or numeric ticks
//! 3. Series in palette order
//! 4. Legend, drawn in a side strip when the plot area is crowded

use super::figure::{
    BarStat, Facet, Figure, FigureKind, HueBarPanel, LinePanel, NamedValues, PanelLayout,
    PositionedSeries,
};
use super::layout;
use super::palette::{Palette, ACTUAL_RED, ESTIMATE_BLUE, GRID_GREY};
use crate::stats::density::{self, DEFAULT_CUT, DEFAULT_POINTS};
use crate::stats::StatsCalculator;
use chrono::{Duration, NaiveDate};
use image::{ImageFormat, RgbImage};
use plotters::coord::ranged1d::{DefaultFormatting, KeyPointHint};
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use rayon::prelude::*;
use std::io::Cursor;
use std::ops::Range;
use std::path::{Path, PathBuf};
use thiserror::Error;

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

/// Violin outlines stop this many bandwidths past the data.
const VIOLIN_CUT: f64 = 2.0;
/// Half width of the widest violin, in category slots.
const VIOLIN_HALF_WIDTH: f64 = 0.4;
/// Side legend strips never take more than this share of the width.
const LEGEND_MAX_SHARE: f64 = 0.35;

const SCATTER_COLORS: [RGBColor; 2] = [ACTUAL_RED, ESTIMATE_BLUE];

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to draw chart: {0}")]
    Drawing(String),
    #[error("Invalid chart data for '{chart}': {reason}")]
    InvalidData { chart: String, reason: String },
    #[error("Failed to encode image: {0}")]
    Image(#[from] image::ImageError),
    #[error("Failed to write chart: {0}")]
    Io(#[from] std::io::Error),
    #[error("Pixel buffer does not match {0}x{1}")]
    Buffer(u32, u32),
}

fn draw_err<E: std::fmt::Display>(e: E) -> RenderError {
    RenderError::Drawing(e.to_string())
}

/// A chart written to disk.
#[derive(Debug, Clone)]
pub struct RenderedChart {
    pub file_name: String,
    pub title: String,
    pub path: PathBuf,
    pub png: Vec<u8>,
}

/// Font sizes scaled to the image.
#[derive(Debug, Clone, Copy)]
struct Fonts {
    title: i32,
    label: i32,
    tick: i32,
}

impl Fonts {
    fn for_size(width: u32, height: u32) -> Self {
        let scale = (width.min(height) as f64 / 800.0).max(0.5);
        Self {
            title: (30.0 * scale) as i32,
            label: (20.0 * scale) as i32,
            tick: (15.0 * scale) as i32,
        }
    }

    /// Smaller fonts for panels inside a grid.
    fn panel(self) -> Self {
        Self {
            title: (self.title * 2 / 3).max(10),
            label: (self.label * 3 / 4).max(9),
            tick: (self.tick * 3 / 4).max(8),
        }
    }
}

pub struct ChartRenderer;

impl ChartRenderer {
    /// Render a figure into an RGB image.
    pub fn render(figure: &Figure) -> Result<RgbImage, RenderError> {
        Self::validate(figure)?;

        let (width, height) = (figure.width, figure.height);
        let mut buffer = vec![255u8; width as usize * height as usize * 3];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
            root.fill(&WHITE).map_err(draw_err)?;
            Self::draw_figure(&root, figure)?;
            root.present().map_err(draw_err)?;
        }

        RgbImage::from_raw(width, height, buffer).ok_or(RenderError::Buffer(width, height))
    }

    /// Encode an image as PNG bytes.
    pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>, RenderError> {
        let mut bytes = Vec::new();
        image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }

    /// Render a figure and save it under `output_dir/<file_name>`.
    pub fn render_to_file(figure: &Figure, output_dir: &Path) -> Result<RenderedChart, RenderError> {
        let image = Self::render(figure)?;
        let png = Self::encode_png(&image)?;
        let path = output_dir.join(&figure.file_name);
        std::fs::write(&path, &png)?;
        log::info!("saved {} ({}x{})", path.display(), figure.width, figure.height);

        Ok(RenderedChart {
            file_name: figure.file_name.clone(),
            title: figure.title.clone(),
            path,
            png,
        })
    }

    /// Render figures in parallel, returning them in input order.
    pub fn render_all(figures: &[Figure], output_dir: &Path) -> Result<Vec<RenderedChart>, RenderError> {
        figures
            .par_iter()
            .map(|figure| Self::render_to_file(figure, output_dir))
            .collect()
    }

    /// Reject figures whose series cannot be drawn.
    pub fn validate(figure: &Figure) -> Result<(), RenderError> {
        let invalid = |reason: &str| RenderError::InvalidData {
            chart: figure.file_name.clone(),
            reason: reason.to_string(),
        };

        if figure.width == 0 || figure.height == 0 {
            return Err(invalid("image size is zero"));
        }

        match &figure.kind {
            FigureKind::Violin { groups, .. } | FigureKind::Density { groups, .. } => {
                if groups.is_empty() || groups.iter().any(|g| g.values.is_empty()) {
                    return Err(invalid("every group needs at least one value"));
                }
            }
            FigureKind::CategoryScatter {
                tick_positions,
                tick_labels,
                series,
            }
            | FigureKind::GroupedBars {
                tick_positions,
                tick_labels,
                series,
                ..
            } => {
                if tick_positions.len() != tick_labels.len() {
                    return Err(invalid("tick positions and labels differ in length"));
                }
                if series.is_empty() || series.iter().any(|s| s.positions.len() != s.values.len())
                {
                    return Err(invalid("series positions and values differ in length"));
                }
            }
            FigureKind::Bars { labels, stats, .. } => {
                if labels.is_empty() || labels.len() != stats.len() {
                    return Err(invalid("one bar per label is required"));
                }
            }
            FigureKind::TimeLines { panels, .. } => {
                let broken = panels.is_empty()
                    || panels.iter().any(|p| {
                        p.series.is_empty()
                            || p.series
                                .iter()
                                .any(|s| s.dates.is_empty() || s.dates.len() != s.values.len())
                    });
                if broken {
                    return Err(invalid("every line needs matching dates and values"));
                }
            }
            FigureKind::HueBars { panels, layout } => {
                if panels.is_empty() {
                    return Err(invalid("no panels"));
                }
                if *layout == PanelLayout::Overview && panels.len() > 3 {
                    return Err(invalid("overview layout holds at most three panels"));
                }
                let broken = panels.iter().any(|p| {
                    p.categories.is_empty()
                        || p.cells.len() != p.categories.len()
                        || p.cells.iter().any(|row| row.len() != p.hues.len())
                });
                if broken {
                    return Err(invalid("cells must be categories x hues"));
                }
            }
            FigureKind::FacetScatter { facets, .. } | FigureKind::FacetLines { facets, .. } => {
                if facets.is_empty() {
                    return Err(invalid("no facets"));
                }
            }
        }
        Ok(())
    }

    fn draw_figure(root: &Area, figure: &Figure) -> Result<(), RenderError> {
        let fonts = Fonts::for_size(figure.width, figure.height);
        match &figure.kind {
            FigureKind::Violin {
                x_label,
                y_label,
                groups,
            } => Self::draw_violin(root, figure, fonts, x_label, y_label, groups),
            FigureKind::Density { x_label, groups } => {
                Self::draw_density(root, figure, fonts, x_label, groups)
            }
            FigureKind::CategoryScatter {
                tick_positions,
                tick_labels,
                series,
            } => Self::draw_category_scatter(
                root,
                figure,
                fonts,
                tick_positions,
                tick_labels,
                series,
            ),
            FigureKind::GroupedBars {
                tick_positions,
                tick_labels,
                bar_width,
                series,
            } => Self::draw_grouped_bars(
                root,
                figure,
                fonts,
                tick_positions,
                tick_labels,
                *bar_width,
                series,
            ),
            FigureKind::Bars {
                x_label,
                y_label,
                labels,
                stats,
                percent_axis,
            } => Self::draw_bars(
                root,
                figure,
                fonts,
                x_label,
                y_label,
                labels,
                stats,
                *percent_axis,
            ),
            FigureKind::TimeLines {
                y_label,
                panels,
                percent_axis,
            } => Self::draw_time_lines(root, figure, fonts, y_label, panels, *percent_axis),
            FigureKind::HueBars { panels, layout } => {
                Self::draw_hue_bars(root, figure, fonts, panels, *layout)
            }
            FigureKind::FacetScatter {
                x_label,
                y_label,
                col_wrap,
                facets,
            } => Self::draw_facets(root, figure, fonts, x_label, y_label, *col_wrap, facets, false),
            FigureKind::FacetLines {
                x_label,
                y_label,
                col_wrap,
                facets,
            } => Self::draw_facets(root, figure, fonts, x_label, y_label, *col_wrap, facets, true),
        }
    }

    fn draw_violin(
        root: &Area,
        figure: &Figure,
        fonts: Fonts,
        x_label: &str,
        y_label: &str,
        groups: &[NamedValues],
    ) -> Result<(), RenderError> {
        let shapes: Vec<_> = groups
            .iter()
            .map(|g| {
                (
                    density::density_curve(&g.values, VIOLIN_CUT, DEFAULT_POINTS),
                    StatsCalculator::compute_descriptive_stats(&g.values),
                )
            })
            .collect();

        let (y_min, y_max) =
            layout::padded_range(shapes.iter().flat_map(|(c, _)| c.xs.iter().copied()), 0.02);
        let labels: Vec<String> = groups.iter().map(|g| g.name.clone()).collect();
        let ticks: Vec<f64> = (0..groups.len()).map(|i| i as f64).collect();

        let mut chart = ChartBuilder::on(root)
            .caption(&figure.title, ("sans-serif", fonts.title))
            .margin(20)
            .x_label_area_size(fonts.label * 3)
            .y_label_area_size(fonts.label * 4)
            .build_cartesian_2d(
                TickedAxis::new(-0.5..groups.len() as f64 - 0.5, ticks.clone()),
                y_min..y_max,
            )
            .map_err(draw_err)?;

        let x_fmt = |v: &f64| layout::category_label(*v, &labels);
        chart
            .configure_mesh()
            .disable_x_mesh()
            .light_line_style(&GRID_GREY)
            .x_labels(ticks.len())
            .x_label_formatter(&x_fmt)
            .x_desc(x_label)
            .y_desc(y_label)
            .label_style(("sans-serif", fonts.tick))
            .axis_desc_style(("sans-serif", fonts.label))
            .draw()
            .map_err(draw_err)?;

        for (i, (curve, stats)) in shapes.iter().enumerate() {
            let peak = curve.peak();
            if peak <= 0.0 {
                continue;
            }
            let center = i as f64;
            let half = |d: f64| d / peak * VIOLIN_HALF_WIDTH;
            let color = figure.palette.pick(i);

            let mut outline: Vec<(f64, f64)> = curve
                .xs
                .iter()
                .zip(&curve.densities)
                .map(|(&y, &d)| (center - half(d), y))
                .collect();
            outline.extend(
                curve
                    .xs
                    .iter()
                    .zip(&curve.densities)
                    .rev()
                    .map(|(&y, &d)| (center + half(d), y)),
            );

            chart
                .draw_series(std::iter::once(Polygon::new(outline.clone(), color.filled())))
                .map_err(draw_err)?;
            if let Some(&first) = outline.first() {
                outline.push(first);
            }
            chart
                .draw_series(std::iter::once(PathElement::new(outline, BLACK.stroke_width(1))))
                .map_err(draw_err)?;

            // Inner box: whiskers min..max, thick quartile bar, median dot
            chart
                .draw_series(std::iter::once(PathElement::new(
                    vec![(center, stats.min), (center, stats.max)],
                    BLACK.mix(0.8).stroke_width(1),
                )))
                .map_err(draw_err)?;
            chart
                .draw_series(std::iter::once(Rectangle::new(
                    [(center - 0.03, stats.q1), (center + 0.03, stats.q3)],
                    BLACK.mix(0.8).filled(),
                )))
                .map_err(draw_err)?;
            chart
                .draw_series(std::iter::once(Circle::new(
                    (center, stats.median),
                    4,
                    WHITE.filled(),
                )))
                .map_err(draw_err)?;
        }

        Ok(())
    }

    fn draw_density(
        root: &Area,
        figure: &Figure,
        fonts: Fonts,
        x_label: &str,
        groups: &[NamedValues],
    ) -> Result<(), RenderError> {
        let curves: Vec<_> = groups
            .iter()
            .map(|g| density::density_curve(&g.values, DEFAULT_CUT, DEFAULT_POINTS))
            .collect();

        let (x_min, x_max) =
            layout::padded_range(curves.iter().flat_map(|c| c.xs.iter().copied()), 0.0);
        let y_max = curves.iter().map(|c| c.peak()).fold(0.0, f64::max) * 1.1;
        let y_max = if y_max > 0.0 { y_max } else { 1.0 };

        let mut chart = ChartBuilder::on(root)
            .caption(&figure.title, ("sans-serif", fonts.title))
            .margin(20)
            .x_label_area_size(fonts.label * 3)
            .y_label_area_size(fonts.label * 4)
            .build_cartesian_2d(x_min..x_max, 0.0..y_max)
            .map_err(draw_err)?;

        let y_fmt = |v: &f64| format!("{:.3}", v);
        chart
            .configure_mesh()
            .light_line_style(&GRID_GREY)
            .y_label_formatter(&y_fmt)
            .x_desc(x_label)
            .y_desc("Density")
            .label_style(("sans-serif", fonts.tick))
            .axis_desc_style(("sans-serif", fonts.label))
            .draw()
            .map_err(draw_err)?;

        for (i, (curve, group)) in curves.iter().zip(groups).enumerate() {
            let color = figure.palette.pick(i);
            chart
                .draw_series(
                    AreaSeries::new(curve.points(), 0.0, color.mix(0.35).filled())
                        .border_style(color.stroke_width(2)),
                )
                .map_err(draw_err)?
                .label(group.name.clone())
                .legend(move |(x, y)| Rectangle::new([(x, y - 6), (x + 18, y + 6)], color.filled()));
        }

        Self::draw_series_legend(&mut chart, fonts)
    }

    fn draw_category_scatter(
        root: &Area,
        figure: &Figure,
        fonts: Fonts,
        tick_positions: &[f64],
        tick_labels: &[String],
        series: &[PositionedSeries],
    ) -> Result<(), RenderError> {
        let (x_min, x_max) = layout::padded_range(
            tick_positions
                .iter()
                .chain(series.iter().flat_map(|s| s.positions.iter()))
                .copied(),
            0.15,
        );
        let (y_min, y_max) =
            layout::padded_range(series.iter().flat_map(|s| s.values.iter().copied()), 0.15);

        let mut chart = ChartBuilder::on(root)
            .caption(&figure.title, ("sans-serif", fonts.title))
            .margin(20)
            .x_label_area_size(fonts.label * 3)
            .y_label_area_size(fonts.label * 4)
            .build_cartesian_2d(
                TickedAxis::new(x_min..x_max, tick_positions.to_vec()),
                y_min..y_max,
            )
            .map_err(draw_err)?;

        let x_fmt = |v: &f64| layout::tick_label(*v, tick_positions, tick_labels);
        chart
            .configure_mesh()
            .light_line_style(&GRID_GREY)
            .x_labels(tick_positions.len().max(1))
            .x_label_formatter(&x_fmt)
            .label_style(("sans-serif", fonts.tick))
            .draw()
            .map_err(draw_err)?;

        for (i, s) in series.iter().enumerate() {
            let color = SCATTER_COLORS
                .get(i)
                .copied()
                .unwrap_or_else(|| figure.palette.pick(i));
            chart
                .draw_series(
                    s.positions
                        .iter()
                        .zip(&s.values)
                        .map(|(&x, &y)| Circle::new((x, y), 9, color.mix(0.5).filled())),
                )
                .map_err(draw_err)?
                .label(s.name.clone())
                .legend(move |(x, y)| Circle::new((x + 8, y), 6, color.mix(0.5).filled()));
        }

        Self::draw_series_legend(&mut chart, fonts)
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_grouped_bars(
        root: &Area,
        figure: &Figure,
        fonts: Fonts,
        tick_positions: &[f64],
        tick_labels: &[String],
        bar_width: f64,
        series: &[PositionedSeries],
    ) -> Result<(), RenderError> {
        let half = bar_width / 2.0;
        let (x_min, x_max) = layout::padded_range(
            series
                .iter()
                .flat_map(|s| s.positions.iter().flat_map(|p| [p - half, p + half])),
            0.05,
        );
        let (y_min, y_max) =
            layout::bar_range(series.iter().flat_map(|s| s.values.iter().copied()), 0.05);

        let mut chart = ChartBuilder::on(root)
            .caption(&figure.title, ("sans-serif", fonts.title))
            .margin(20)
            .x_label_area_size(fonts.label * 3)
            .y_label_area_size(fonts.label * 4)
            .build_cartesian_2d(
                TickedAxis::new(x_min..x_max, tick_positions.to_vec()),
                y_min..y_max,
            )
            .map_err(draw_err)?;

        let x_fmt = |v: &f64| layout::tick_label(*v, tick_positions, tick_labels);
        chart
            .configure_mesh()
            .disable_x_mesh()
            .light_line_style(&GRID_GREY)
            .x_labels(tick_positions.len().max(1))
            .x_label_formatter(&x_fmt)
            .label_style(("sans-serif", fonts.tick))
            .draw()
            .map_err(draw_err)?;

        for (i, s) in series.iter().enumerate() {
            let color = figure.palette.pick(i);
            chart
                .draw_series(s.positions.iter().zip(&s.values).map(|(&x, &y)| {
                    Rectangle::new([(x - half, 0.0), (x + half, y)], color.filled())
                }))
                .map_err(draw_err)?
                .label(s.name.clone())
                .legend(move |(x, y)| Rectangle::new([(x, y - 6), (x + 18, y + 6)], color.filled()));
        }

        Self::draw_series_legend(&mut chart, fonts)
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_bars(
        root: &Area,
        figure: &Figure,
        fonts: Fonts,
        x_label: &str,
        y_label: &str,
        labels: &[String],
        stats: &[BarStat],
        percent_axis: bool,
    ) -> Result<(), RenderError> {
        let (y_min, y_max) = layout::bar_range(stats.iter().flat_map(bar_extent), 0.08);
        let ticks: Vec<f64> = (0..labels.len()).map(|i| i as f64).collect();

        let mut chart = ChartBuilder::on(root)
            .caption(&figure.title, ("sans-serif", fonts.title))
            .margin(20)
            .x_label_area_size(fonts.label * 3)
            .y_label_area_size(fonts.label * 4)
            .build_cartesian_2d(
                TickedAxis::new(-0.5..labels.len() as f64 - 0.5, ticks.clone()),
                y_min..y_max,
            )
            .map_err(draw_err)?;

        let x_fmt = |v: &f64| layout::category_label(*v, labels);
        let y_fmt = |v: &f64| {
            if percent_axis {
                format!("{:.0}%", v)
            } else {
                layout::compact_number(*v)
            }
        };
        chart
            .configure_mesh()
            .disable_x_mesh()
            .light_line_style(&GRID_GREY)
            .x_labels(ticks.len())
            .x_label_formatter(&x_fmt)
            .y_label_formatter(&y_fmt)
            .x_desc(x_label)
            .y_desc(y_label)
            .label_style(("sans-serif", fonts.tick))
            .axis_desc_style(("sans-serif", fonts.label))
            .draw()
            .map_err(draw_err)?;

        let half = layout::CATEGORY_FILL / 2.0;
        chart
            .draw_series(stats.iter().enumerate().map(|(i, stat)| {
                let x = i as f64;
                Rectangle::new(
                    [(x - half, 0.0), (x + half, stat.mean)],
                    figure.palette.pick(i).filled(),
                )
            }))
            .map_err(draw_err)?;

        let error_bars: Vec<(f64, (f64, f64))> = stats
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.interval.map(|iv| (i as f64, iv)))
            .collect();
        Self::draw_error_bars(&mut chart, &error_bars, 0.08)
    }

    fn draw_time_lines(
        root: &Area,
        figure: &Figure,
        fonts: Fonts,
        y_label: &str,
        panels: &[LinePanel],
        percent_axis: bool,
    ) -> Result<(), RenderError> {
        let titled;
        let (area, fonts) = if panels.len() > 1 && !figure.title.is_empty() {
            titled = root
                .titled(&figure.title, ("sans-serif", fonts.title))
                .map_err(draw_err)?;
            (&titled, fonts.panel())
        } else {
            (root, fonts)
        };

        let cells = area.split_evenly((1, panels.len()));
        for (panel, cell) in panels.iter().zip(cells.iter()) {
            let caption = if panel.title.is_empty() {
                figure.title.as_str()
            } else {
                panel.title.as_str()
            };
            Self::draw_line_panel(
                cell,
                caption,
                fonts,
                figure.palette,
                y_label,
                panel,
                percent_axis,
            )?;
        }
        Ok(())
    }

    fn draw_line_panel(
        area: &Area,
        caption: &str,
        fonts: Fonts,
        palette: Palette,
        y_label: &str,
        panel: &LinePanel,
        percent_axis: bool,
    ) -> Result<(), RenderError> {
        let dates = panel.series.iter().flat_map(|s| s.dates.iter().copied());
        let (Some(start), Some(end)) = (dates.clone().min(), dates.max()) else {
            return Ok(());
        };
        let day = |d: NaiveDate| (d - start).num_days() as f64;

        let months: Vec<f64> = layout::month_starts(start, end)
            .into_iter()
            .map(day)
            .collect();
        let span = day(end).max(1.0);
        let (y_min, y_max) = layout::padded_range(
            panel.series.iter().flat_map(|s| s.values.iter().copied()),
            0.05,
        );

        let mut chart = ChartBuilder::on(area)
            .caption(caption, ("sans-serif", fonts.title))
            .margin(15)
            .x_label_area_size(fonts.label * 3)
            .y_label_area_size(fonts.label * 4)
            .build_cartesian_2d(TickedAxis::new(0.0..span, months.clone()), y_min..y_max)
            .map_err(draw_err)?;

        let x_fmt = |v: &f64| {
            (start + Duration::days(v.round() as i64))
                .format("%b")
                .to_string()
        };
        let y_fmt = |v: &f64| {
            if percent_axis {
                format!("{:.0}%", v)
            } else {
                layout::compact_number(*v)
            }
        };
        chart
            .configure_mesh()
            .light_line_style(&GRID_GREY)
            .x_labels(months.len().max(1))
            .x_label_formatter(&x_fmt)
            .y_label_formatter(&y_fmt)
            .x_desc("Date")
            .y_desc(y_label)
            .label_style(("sans-serif", fonts.tick))
            .axis_desc_style(("sans-serif", fonts.label))
            .draw()
            .map_err(draw_err)?;

        for (i, s) in panel.series.iter().enumerate() {
            let color = palette.pick(i);
            let style = if palette == Palette::Pastel {
                color.stroke_width(4)
            } else {
                color.stroke_width(2)
            };
            chart
                .draw_series(LineSeries::new(
                    s.dates.iter().zip(&s.values).map(|(&d, &v)| (day(d), v)),
                    style,
                ))
                .map_err(draw_err)?
                .label(s.name.clone())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
        }

        if panel.series.len() > 1 {
            Self::draw_series_legend(&mut chart, fonts)?;
        }
        Ok(())
    }

    fn draw_hue_bars(
        root: &Area,
        figure: &Figure,
        fonts: Fonts,
        panels: &[HueBarPanel],
        panel_layout: PanelLayout,
    ) -> Result<(), RenderError> {
        let (width, height) = root.dim_in_pixel();
        let hues = panels.first().map(|p| p.hues.clone()).unwrap_or_default();
        let colors = figure.palette.hues(hues.len());
        let legend: Vec<(String, RGBColor)> = hues.into_iter().zip(colors).collect();

        match panel_layout {
            PanelLayout::Single => {
                let strip = if panels[0].show_legend {
                    Self::side_legend_width(root, &legend, fonts)?
                } else {
                    0
                };
                let (plot, side) = root.split_horizontally(width.saturating_sub(strip));
                let panel = &panels[0];
                let caption = panel.title.as_deref().unwrap_or(figure.title.as_str());
                Self::draw_hue_panel(&plot, Some(caption), fonts, figure.palette, panel)?;
                if panel.show_legend {
                    Self::draw_side_legend(&side, &legend, fonts)?;
                }
            }
            PanelLayout::Overview => {
                let titled = root
                    .titled(&figure.title, ("sans-serif", fonts.title))
                    .map_err(draw_err)?;
                let fonts = fonts.panel();
                let (top, middle) = titled.split_vertically(height / 2);
                let (overview, side) = top.split_horizontally(width * 2 / 3);
                Self::draw_hue_panel(
                    &overview,
                    panels[0].title.as_deref(),
                    fonts,
                    figure.palette,
                    &panels[0],
                )?;
                if panels[0].show_legend {
                    Self::draw_side_legend(&side, &legend, fonts)?;
                }

                let cells = middle.split_evenly((1, 3));
                for (panel, cell) in panels.iter().skip(1).zip(cells.iter()) {
                    Self::draw_hue_panel(cell, panel.title.as_deref(), fonts, figure.palette, panel)?;
                }
            }
        }
        Ok(())
    }

    fn draw_hue_panel(
        area: &Area,
        caption: Option<&str>,
        fonts: Fonts,
        palette: Palette,
        panel: &HueBarPanel,
    ) -> Result<(), RenderError> {
        let categories = panel.categories.len();
        let colors = palette.hues(panel.hues.len());
        let offsets = layout::hue_offsets(panel.hues.len());
        let half = layout::hue_bar_width(panel.hues.len()) / 2.0;
        let (y_min, y_max) = panel.y_range.unwrap_or_else(|| {
            layout::bar_range(
                panel
                    .cells
                    .iter()
                    .flatten()
                    .flatten()
                    .flat_map(bar_extent),
                0.05,
            )
        });
        let baseline = if y_min > 0.0 { y_min } else { 0.0 };
        let ticks: Vec<f64> = (0..categories).map(|i| i as f64).collect();

        let mut builder = ChartBuilder::on(area);
        builder
            .margin(10)
            .x_label_area_size(fonts.label * 3)
            .y_label_area_size(fonts.label * 4);
        if let Some(caption) = caption {
            builder.caption(caption, ("sans-serif", fonts.title));
        }
        let mut chart = builder
            .build_cartesian_2d(
                TickedAxis::new(-0.5..categories as f64 - 0.5, ticks.clone()),
                y_min..y_max,
            )
            .map_err(draw_err)?;

        let x_fmt = |v: &f64| layout::category_label(*v, &panel.categories);
        let y_fmt = |v: &f64| layout::compact_number(*v);
        chart
            .configure_mesh()
            .disable_x_mesh()
            .light_line_style(&GRID_GREY)
            .x_labels(ticks.len())
            .x_label_formatter(&x_fmt)
            .y_label_formatter(&y_fmt)
            .y_desc(panel.y_label.as_str())
            .label_style(("sans-serif", fonts.tick))
            .axis_desc_style(("sans-serif", fonts.label))
            .draw()
            .map_err(draw_err)?;

        for (j, (offset, color)) in offsets.iter().zip(&colors).enumerate() {
            let color = *color;
            let bars = panel.cells.iter().enumerate().filter_map(|(i, row)| {
                row[j].map(|stat| {
                    let x = i as f64 + offset;
                    Rectangle::new([(x - half, baseline), (x + half, stat.mean)], color.filled())
                })
            });
            chart.draw_series(bars).map_err(draw_err)?;
        }

        let error_bars: Vec<(f64, (f64, f64))> = panel
            .cells
            .iter()
            .enumerate()
            .flat_map(|(i, row)| {
                row.iter().zip(&offsets).filter_map(move |(cell, offset)| {
                    cell.and_then(|s| s.interval)
                        .map(|iv| (i as f64 + offset, iv))
                })
            })
            .collect();
        Self::draw_error_bars(&mut chart, &error_bars, half * 0.5)
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_facets(
        root: &Area,
        figure: &Figure,
        fonts: Fonts,
        x_label: &str,
        y_label: &str,
        col_wrap: usize,
        facets: &[Facet],
        lines: bool,
    ) -> Result<(), RenderError> {
        let mut hue_names: Vec<String> = Vec::new();
        for series in facets.iter().flat_map(|f| f.series.iter()) {
            if !hue_names.contains(&series.name) {
                hue_names.push(series.name.clone());
            }
        }
        let colors = figure.palette.hues(hue_names.len());
        let color_of = |name: &str| {
            hue_names
                .iter()
                .position(|n| n == name)
                .map(|i| colors[i])
                .unwrap_or(BLACK)
        };

        let points = || {
            facets
                .iter()
                .flat_map(|f| f.series.iter())
                .flat_map(|s| s.points.iter().copied())
        };
        let (x_min, x_max) = layout::padded_range(points().map(|(x, _)| x), 0.05);
        let (y_min, y_max) = layout::padded_range(points().map(|(_, y)| y), 0.08);

        let titled = root
            .titled(&figure.title, ("sans-serif", fonts.title))
            .map_err(draw_err)?;
        let (width, _) = titled.dim_in_pixel();
        let show_legend = hue_names.len() > 1;
        let entries: Vec<(String, RGBColor)> = hue_names
            .iter()
            .map(|n| (n.clone(), color_of(n)))
            .collect();
        let strip = if show_legend {
            Self::side_legend_width(&titled, &entries, fonts)?
        } else {
            0
        };
        let (grid, side) = titled.split_horizontally(width.saturating_sub(strip));

        let fonts_panel = fonts.panel();
        let (rows, cols) = layout::facet_grid(facets.len(), col_wrap);
        let cells = grid.split_evenly((rows, cols));
        let x_fmt = |v: &f64| layout::compact_number(*v);
        let y_fmt = |v: &f64| layout::compact_number(*v);

        for (facet, cell) in facets.iter().zip(cells.iter()) {
            let mut chart = ChartBuilder::on(cell)
                .caption(&facet.title, ("sans-serif", fonts_panel.title))
                .margin(8)
                .x_label_area_size(fonts_panel.label * 3)
                .y_label_area_size(fonts_panel.label * 4)
                .build_cartesian_2d(x_min..x_max, y_min..y_max)
                .map_err(draw_err)?;

            chart
                .configure_mesh()
                .light_line_style(&GRID_GREY)
                .x_labels(4)
                .y_labels(5)
                .x_label_formatter(&x_fmt)
                .y_label_formatter(&y_fmt)
                .x_desc(x_label)
                .y_desc(y_label)
                .label_style(("sans-serif", fonts_panel.tick))
                .axis_desc_style(("sans-serif", fonts_panel.label))
                .draw()
                .map_err(draw_err)?;

            for series in &facet.series {
                let color = color_of(&series.name);
                if lines {
                    chart
                        .draw_series(LineSeries::new(
                            series.points.iter().copied(),
                            color.stroke_width(3),
                        ))
                        .map_err(draw_err)?;
                } else {
                    chart
                        .draw_series(series.points.iter().map(|&p| {
                            EmptyElement::at(p)
                                + Circle::new((0, 0), 6, color.filled())
                                + Circle::new((0, 0), 6, WHITE.stroke_width(1))
                        }))
                        .map_err(draw_err)?;
                }
            }
        }

        if show_legend {
            Self::draw_side_legend(&side, &entries, fonts)?;
        }
        Ok(())
    }

    /// Legend inside the plot area for series registered with `.label()`.
    fn draw_series_legend<'a, 'b: 'a, X, Y>(
        chart: &mut ChartContext<'a, BitMapBackend<'b>, Cartesian2d<X, Y>>,
        fonts: Fonts,
    ) -> Result<(), RenderError>
    where
        X: Ranged<ValueType = f64>,
        Y: Ranged<ValueType = f64>,
    {
        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.85))
            .border_style(&BLACK.mix(0.4))
            .label_font(("sans-serif", fonts.label))
            .position(SeriesLabelPosition::UpperRight)
            .draw()
            .map_err(draw_err)
    }

    /// Vertical interval lines with caps of half width `cap`.
    fn draw_error_bars<'a, 'b: 'a, X, Y>(
        chart: &mut ChartContext<'a, BitMapBackend<'b>, Cartesian2d<X, Y>>,
        bars: &[(f64, (f64, f64))],
        cap: f64,
    ) -> Result<(), RenderError>
    where
        X: Ranged<ValueType = f64>,
        Y: Ranged<ValueType = f64>,
    {
        let style = RGBColor(60, 60, 60).stroke_width(2);
        chart
            .draw_series(bars.iter().flat_map(|&(x, (lo, hi))| {
                [
                    PathElement::new(vec![(x, lo), (x, hi)], style),
                    PathElement::new(vec![(x - cap, lo), (x + cap, lo)], style),
                    PathElement::new(vec![(x - cap, hi), (x + cap, hi)], style),
                ]
            }))
            .map_err(draw_err)?;
        Ok(())
    }

    /// Width of a side legend strip that fits its longest name.
    fn side_legend_width(
        area: &Area,
        entries: &[(String, RGBColor)],
        fonts: Fonts,
    ) -> Result<u32, RenderError> {
        let style = TextStyle::from(("sans-serif", fonts.label).into_font());
        let mut widest = 0;
        for (name, _) in entries {
            let (w, _) = area.estimate_text_size(name, &style).map_err(draw_err)?;
            widest = widest.max(w);
        }
        let swatch = fonts.label.max(10) as u32;
        let limit = (area.dim_in_pixel().0 as f64 * LEGEND_MAX_SHARE) as u32;
        Ok((widest + swatch + 26).min(limit))
    }

    /// Colored squares with names, stacked from the top of `area`.
    fn draw_side_legend(
        area: &Area,
        entries: &[(String, RGBColor)],
        fonts: Fonts,
    ) -> Result<(), RenderError> {
        let size = fonts.label.max(10);
        let row = size + size / 2;
        let font = ("sans-serif", fonts.label).into_font();

        for (i, (name, color)) in entries.iter().enumerate() {
            let y = 40 + i as i32 * row;
            area.draw(&Rectangle::new(
                [(10, y), (10 + size, y + size)],
                color.filled(),
            ))
            .map_err(draw_err)?;
            area.draw(&Text::new(name.clone(), (16 + size, y), font.clone()))
                .map_err(draw_err)?;
        }
        Ok(())
    }
}

/// An `f64` axis whose bold ticks sit exactly on the given positions.
#[derive(Clone)]
struct TickedAxis {
    coord: RangedCoordf64,
    ticks: Vec<f64>,
}

impl TickedAxis {
    fn new(range: Range<f64>, ticks: Vec<f64>) -> Self {
        Self {
            coord: range.into(),
            ticks,
        }
    }
}

impl Ranged for TickedAxis {
    type FormatOption = DefaultFormatting;
    type ValueType = f64;

    fn map(&self, value: &f64, limit: (i32, i32)) -> i32 {
        self.coord.map(value, limit)
    }

    fn key_points<Hint: KeyPointHint>(&self, hint: Hint) -> Vec<f64> {
        if hint.weight().allow_light_points() {
            Vec::new()
        } else {
            self.ticks.clone()
        }
    }

    fn range(&self) -> Range<f64> {
        self.coord.range()
    }
}

/// Values a bar spans, including its interval.
fn bar_extent(stat: &BarStat) -> Vec<f64> {
    let mut values = vec![stat.mean];
    if let Some((lo, hi)) = stat.interval {
        values.push(lo);
        values.push(hi);
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::figure::{DatedSeries, XySeries};
    use tempfile::tempdir;

    fn density_figure() -> Figure {
        Figure::new(
            "kdequarter.png",
            "Distribution of 2017 Netflix Stock Prices by Quarter",
            FigureKind::Density {
                x_label: "Price".into(),
                groups: vec![
                    NamedValues::new("Q1", vec![124.9, 127.5, 131.2, 139.9, 141.3]),
                    NamedValues::new("Q2", vec![143.8, 147.2, 153.1, 158.0, 151.9]),
                ],
            },
        )
        .with_size(6.0, 4.0, 1.0)
    }

    #[test]
    fn validate_rejects_empty_groups() {
        let mut figure = density_figure();
        if let FigureKind::Density { groups, .. } = &mut figure.kind {
            groups.push(NamedValues::new("Q3", Vec::new()));
        }
        assert!(matches!(
            ChartRenderer::validate(&figure),
            Err(RenderError::InvalidData { chart, .. }) if chart == "kdequarter.png"
        ));
    }

    #[test]
    fn validate_rejects_mismatched_lines() {
        let day = NaiveDate::from_ymd_opt(2017, 1, 3).unwrap();
        let figure = Figure::new(
            "stockgrowth.png",
            "",
            FigureKind::TimeLines {
                y_label: "Stock Price".into(),
                percent_axis: false,
                panels: vec![LinePanel {
                    title: "Netflix".into(),
                    series: vec![DatedSeries {
                        name: "Netflix".into(),
                        dates: vec![day],
                        values: vec![1.0, 2.0],
                    }],
                }],
            },
        );
        assert!(ChartRenderer::validate(&figure).is_err());
    }

    #[test]
    fn validate_checks_hue_cells() {
        let panel = HueBarPanel {
            title: None,
            y_label: "GDP".into(),
            categories: vec!["Chile".into(), "Zimbabwe".into()],
            hues: vec!["2000".into(), "2001".into()],
            cells: vec![vec![None, None]],
            y_range: None,
            show_legend: true,
        };
        let figure = Figure::new(
            "gdp.png",
            "GDP",
            FigureKind::HueBars {
                panels: vec![panel],
                layout: PanelLayout::Single,
            },
        );
        assert!(ChartRenderer::validate(&figure).is_err());
    }

    #[test]
    fn validate_accepts_facets() {
        let figure = Figure::new(
            "facets.png",
            "LEABY vs GDP",
            FigureKind::FacetScatter {
                x_label: "GDP".into(),
                y_label: "LEABY".into(),
                col_wrap: 4,
                facets: vec![Facet {
                    title: "Year = 2000".into(),
                    series: vec![XySeries {
                        name: "Chile".into(),
                        points: vec![(7.7e10, 77.3)],
                    }],
                }],
            },
        );
        assert!(ChartRenderer::validate(&figure).is_ok());
    }

    #[test]
    fn bar_extent_includes_interval() {
        let stat = BarStat {
            mean: 5.0,
            interval: Some((4.0, 6.0)),
        };
        assert_eq!(bar_extent(&stat), vec![5.0, 4.0, 6.0]);
    }

    fn day(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2017, month, day).unwrap()
    }

    fn hue_panel(title: Option<&str>) -> HueBarPanel {
        let stat = |mean: f64| {
            Some(BarStat {
                mean,
                interval: Some((mean * 0.9, mean * 1.1)),
            })
        };
        HueBarPanel {
            title: title.map(String::from),
            y_label: "GDP".into(),
            categories: vec!["Chile".into(), "United States of America".into()],
            hues: vec!["2000".into(), "2001".into()],
            cells: vec![vec![stat(7.7e10), stat(7.1e10)], vec![stat(1.0e13), None]],
            y_range: None,
            show_legend: true,
        }
    }

    fn facets() -> Vec<Facet> {
        vec![
            Facet {
                title: "Year = 2000".into(),
                series: vec![
                    XySeries {
                        name: "Chile".into(),
                        points: vec![(7.7e10, 77.3)],
                    },
                    XySeries {
                        name: "United States of America".into(),
                        points: vec![(1.0e13, 76.8)],
                    },
                ],
            },
            Facet {
                title: "Year = 2001".into(),
                series: vec![XySeries {
                    name: "Chile".into(),
                    points: vec![(7.1e10, 77.3), (6.9e10, 77.8)],
                }],
            },
        ]
    }

    /// One small figure of every kind.
    fn every_kind() -> Vec<Figure> {
        let quarters = vec!["1Q2017".to_string(), "2Q2017".to_string()];
        let kinds = vec![
            (
                "violin.png",
                FigureKind::Violin {
                    x_label: "Quarter".into(),
                    y_label: "Price".into(),
                    groups: vec![
                        NamedValues::new("Q1", vec![124.9, 127.5, 131.2]),
                        NamedValues::new("Q2", vec![143.8, 147.2, 153.1]),
                    ],
                },
            ),
            ("density.png", density_figure().kind),
            (
                "scatter.png",
                FigureKind::CategoryScatter {
                    tick_positions: vec![1.0, 2.0],
                    tick_labels: quarters.clone(),
                    series: vec![
                        PositionedSeries {
                            name: "Actual".into(),
                            positions: vec![1.0, 2.0],
                            values: vec![0.4, 0.15],
                        },
                        PositionedSeries {
                            name: "Expected".into(),
                            positions: vec![1.0, 2.0],
                            values: vec![0.37, 0.15],
                        },
                    ],
                },
            ),
            (
                "grouped.png",
                FigureKind::GroupedBars {
                    tick_positions: vec![0.4, 2.4],
                    tick_labels: quarters.clone(),
                    bar_width: 0.8,
                    series: vec![
                        PositionedSeries {
                            name: "Revenue".into(),
                            positions: vec![0.0, 2.0],
                            values: vec![2.79, 2.98],
                        },
                        PositionedSeries {
                            name: "Earnings".into(),
                            positions: vec![0.8, 2.8],
                            values: vec![0.0656, 0.12959],
                        },
                    ],
                },
            ),
            (
                "bars.png",
                FigureKind::Bars {
                    x_label: "Quarter".into(),
                    y_label: "Percent".into(),
                    labels: quarters,
                    stats: vec![
                        BarStat {
                            mean: 2.35,
                            interval: None,
                        },
                        BarStat {
                            mean: 4.35,
                            interval: Some((4.0, 4.7)),
                        },
                    ],
                    percent_axis: true,
                },
            ),
            (
                "lines.png",
                FigureKind::TimeLines {
                    y_label: "Stock Price".into(),
                    percent_axis: false,
                    panels: vec![
                        LinePanel {
                            title: "Netflix".into(),
                            series: vec![DatedSeries {
                                name: "Netflix".into(),
                                dates: vec![day(1, 1), day(2, 1), day(3, 1)],
                                values: vec![140.7, 142.1, 147.8],
                            }],
                        },
                        LinePanel {
                            title: "Dow Jones".into(),
                            series: vec![DatedSeries {
                                name: "Dow Jones".into(),
                                dates: vec![day(1, 1), day(2, 1), day(3, 1)],
                                values: vec![19864.1, 20812.2, 20663.2],
                            }],
                        },
                    ],
                },
            ),
            (
                "hue.png",
                FigureKind::HueBars {
                    panels: vec![hue_panel(None)],
                    layout: PanelLayout::Single,
                },
            ),
            (
                "overview.png",
                FigureKind::HueBars {
                    panels: vec![
                        hue_panel(Some("All")),
                        hue_panel(Some("Focus")),
                        hue_panel(Some("Smallest")),
                    ],
                    layout: PanelLayout::Overview,
                },
            ),
            (
                "facet_scatter.png",
                FigureKind::FacetScatter {
                    x_label: "GDP".into(),
                    y_label: "LEABY".into(),
                    col_wrap: 4,
                    facets: facets(),
                },
            ),
            (
                "facet_lines.png",
                FigureKind::FacetLines {
                    x_label: "Year".into(),
                    y_label: "LEABY".into(),
                    col_wrap: 3,
                    facets: facets(),
                },
            ),
        ];

        kinds
            .into_iter()
            .map(|(name, kind)| Figure::new(name, "Chart", kind).with_size(6.0, 4.0, 1.0))
            .collect()
    }

    #[test]
    fn render_to_file_writes_png() {
        let dir = tempdir().unwrap();
        let chart = ChartRenderer::render_to_file(&density_figure(), dir.path()).unwrap();

        assert!(chart.path.exists());
        assert_eq!(&chart.png[1..4], b"PNG");
        let decoded = image::load_from_memory(&chart.png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (600, 400));
    }

    #[test]
    fn renders_every_figure_kind() {
        for figure in every_kind() {
            let image = ChartRenderer::render(&figure)
                .unwrap_or_else(|e| panic!("{}: {}", figure.file_name, e));
            assert_eq!((image.width(), image.height()), (600, 400));
            assert!(
                image.pixels().any(|p| p.0 != [255, 255, 255]),
                "{} is blank",
                figure.file_name
            );
        }
    }

    #[test]
    fn render_all_keeps_input_order() {
        let dir = tempdir().unwrap();
        let figures = every_kind();
        let charts = ChartRenderer::render_all(&figures, dir.path()).unwrap();

        let expected: Vec<&str> = figures.iter().map(|f| f.file_name.as_str()).collect();
        let rendered: Vec<&str> = charts.iter().map(|c| c.file_name.as_str()).collect();
        assert_eq!(rendered, expected);
        for chart in &charts {
            assert_eq!(chart.path, dir.path().join(&chart.file_name));
            assert!(chart.path.is_file());
        }
    }

    #[test]
    fn render_all_stops_on_invalid_figure() {
        let dir = tempdir().unwrap();
        let mut figures = every_kind();
        figures[3].width = 0;
        let err = ChartRenderer::render_all(&figures, dir.path()).unwrap_err();
        assert!(matches!(err, RenderError::InvalidData { chart, .. } if chart == "grouped.png"));
    }

    #[test]
    fn side_legend_fits_longest_name() {
        let mut buffer = vec![255u8; 1000 * 800 * 3];
        let root = BitMapBackend::with_buffer(&mut buffer, (1000, 800)).into_drawing_area();
        let fonts = Fonts::for_size(1000, 800);
        let entry = |name: &str| (name.to_string(), BLACK);

        let style = TextStyle::from(("sans-serif", fonts.label).into_font());
        let (long_text, _) = root
            .estimate_text_size("United States of America", &style)
            .unwrap();
        let short = ChartRenderer::side_legend_width(&root, &[entry("Chile")], fonts).unwrap();
        let long = ChartRenderer::side_legend_width(
            &root,
            &[entry("Chile"), entry("United States of America")],
            fonts,
        )
        .unwrap();

        assert!(long > short);
        assert!(long >= long_text + fonts.label as u32);
        assert!(long <= 350);
    }

    #[test]
    fn ticked_axis_maps_like_plain_range() {
        let axis = TickedAxis::new(-0.5..2.5, vec![0.0, 1.0, 2.0]);
        assert_eq!(axis.range(), -0.5..2.5);
        assert_eq!(axis.map(&-0.5, (0, 300)), 0);
        assert_eq!(axis.map(&2.5, (0, 300)), 300);
    }
}
