//! Stock profile: a stock's year against a market index.
//!
//! Three price files are read (monthly stock, monthly index, daily stock with
//! a `Quarter` label). Their adjusted close column becomes `Price`.

use super::{signed_percent, Commentary, StudyError};
use crate::charts::layout::{grouped_bar_positions, midpoints};
use crate::charts::{
    BarStat, DatedSeries, Figure, FigureKind, LinePanel, NamedValues, PositionedSeries,
};
use crate::config::{EpsTable, FinancialsTable, RenderConfig, StudyConfig};
use crate::data::{DataLoader, DataProcessor};
use crate::stats::StatsCalculator;
use chrono::NaiveDate;
use polars::prelude::DataFrame;

pub const NAME: &str = "stock_profile";

pub const PRICE: &str = "Price";
pub const DATE: &str = "Date";
pub const QUARTER: &str = "Quarter";

const QUARTER_TITLE: &str = "Distribution of 2017 Netflix Stock Prices by Quarter";

/// Dated prices of one instrument.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    pub name: String,
    pub label: String,
    pub dates: Vec<NaiveDate>,
    pub prices: Vec<f64>,
}

impl PriceSeries {
    fn from_frame(df: &DataFrame, name: &str, label: &str) -> Result<Self, StudyError> {
        let dates = DataProcessor::date_values(df, DATE)?;
        let prices = DataProcessor::numeric_values(df, PRICE)?;
        if prices.is_empty() {
            return Err(StudyError::EmptySelection(name.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            label: label.to_string(),
            dates,
            prices,
        })
    }

    /// Prices as a percentage of the first one.
    pub fn growth(&self) -> Result<Vec<f64>, StudyError> {
        Ok(StatsCalculator::growth_percentage(&self.prices)?)
    }
}

pub struct StockProfileStudy {
    pub stock: PriceSeries,
    pub index: PriceSeries,
    /// Daily prices per quarter, quarters in file order.
    pub quarters: Vec<NamedValues>,
    pub eps: EpsTable,
    pub financials: FinancialsTable,
}

impl StockProfileStudy {
    pub fn load(config: &StudyConfig) -> Result<Self, StudyError> {
        let stock_cfg = &config.stock;
        let read = |file: &str| -> Result<DataFrame, StudyError> {
            let mut df = DataLoader::read_csv(&config.data_path(file))?;
            DataProcessor::rename_column(&mut df, &stock_cfg.price_column, PRICE)?;
            Ok(df)
        };

        let stock = read(&stock_cfg.stock_file)?;
        let index = read(&stock_cfg.index_file)?;
        let daily = read(&stock_cfg.daily_file)?;

        let study = Self {
            stock: PriceSeries::from_frame(&stock, &stock_cfg.stock_name, &stock_cfg.stock_label)?,
            index: PriceSeries::from_frame(&index, &stock_cfg.index_name, &stock_cfg.index_label)?,
            quarters: Self::quarterly_prices(&daily)?,
            eps: stock_cfg.eps.clone(),
            financials: stock_cfg.financials.clone(),
        };

        log::info!(
            "{}: {} {} rows, {} {} rows, {} quarters",
            NAME,
            study.stock.name,
            study.stock.prices.len(),
            study.index.name,
            study.index.prices.len(),
            study.quarters.len()
        );
        Ok(study)
    }

    /// Split the daily prices by quarter label.
    pub fn quarterly_prices(daily: &DataFrame) -> Result<Vec<NamedValues>, StudyError> {
        DataProcessor::require_columns(daily, &[QUARTER, PRICE])?;
        DataProcessor::unique_values(daily, QUARTER)?
            .into_iter()
            .map(|quarter| {
                let rows = DataProcessor::filter_by_value(daily, QUARTER, &quarter)?;
                let prices = DataProcessor::numeric_values(&rows, PRICE)?;
                Ok(NamedValues::new(quarter, prices))
            })
            .collect()
    }

    /// Earnings as a percentage of revenue per quarter.
    pub fn earnings_percentage(&self) -> Result<Vec<f64>, StudyError> {
        Ok(StatsCalculator::percentage_of(
            &self.financials.earnings,
            &self.financials.revenue,
        )?)
    }

    pub fn figures(&self, render: &RenderConfig) -> Result<Vec<Figure>, StudyError> {
        let scale = render.scale;

        let violin = Figure::new(
            "violinquarter.png",
            QUARTER_TITLE,
            FigureKind::Violin {
                x_label: "Business Quarters in 2017".into(),
                y_label: "Closing Stock Price".into(),
                groups: self.quarters.clone(),
            },
        )
        .with_size(15.0, 10.0, scale);

        let density = Figure::new(
            "kdequarter.png",
            QUARTER_TITLE,
            FigureKind::Density {
                x_label: PRICE.into(),
                groups: self.quarters.clone(),
            },
        )
        .with_size(15.0, 10.0, scale);

        let eps_positions: Vec<f64> = (1..=self.eps.labels.len()).map(|i| i as f64).collect();
        let scatter = Figure::new(
            "scatterearnings.png",
            "Earnings Per Share in Cents",
            FigureKind::CategoryScatter {
                tick_positions: eps_positions.clone(),
                tick_labels: self.eps.labels.clone(),
                series: vec![
                    PositionedSeries {
                        name: "Actual".into(),
                        positions: eps_positions.clone(),
                        values: self.eps.actual.clone(),
                    },
                    PositionedSeries {
                        name: "Estimate".into(),
                        positions: eps_positions,
                        values: self.eps.estimate.clone(),
                    },
                ],
            },
        )
        .with_size(8.0, 6.0, scale);

        // Two datasets side by side over every quarter
        let (datasets, width) = (2, 0.5);
        let groups = self.financials.labels.len();
        let revenue_x = grouped_bar_positions(1, datasets, groups, width);
        let earnings_x = grouped_bar_positions(2, datasets, groups, width);
        let revenue_bars = Figure::new(
            "earningsrevenue.png",
            "Revenue and Earnings",
            FigureKind::GroupedBars {
                tick_positions: midpoints(&revenue_x, &earnings_x),
                tick_labels: self.financials.labels.clone(),
                bar_width: width,
                series: vec![
                    PositionedSeries {
                        name: "Revenue".into(),
                        positions: revenue_x,
                        values: self.financials.revenue.clone(),
                    },
                    PositionedSeries {
                        name: "Earnings".into(),
                        positions: earnings_x,
                        values: self.financials.earnings.clone(),
                    },
                ],
            },
        )
        .with_size(10.0, 10.0, scale);

        let percent_bars = Figure::new(
            "percentearnings.png",
            "Earnings in Percentage of Revenue per Quarter",
            FigureKind::Bars {
                x_label: "Quarter".into(),
                y_label: "Percent".into(),
                labels: self.financials.labels.clone(),
                stats: self
                    .earnings_percentage()?
                    .into_iter()
                    .map(|mean| BarStat {
                        mean,
                        interval: None,
                    })
                    .collect(),
                percent_axis: true,
            },
        )
        .with_size(10.0, 10.0, scale);

        let price_panel = |series: &PriceSeries| LinePanel {
            title: series.name.clone(),
            series: vec![DatedSeries {
                name: series.name.clone(),
                dates: series.dates.clone(),
                values: series.prices.clone(),
            }],
        };
        let stock_growth = Figure::new(
            "stockgrowth.png",
            format!("{} and {} in 2017", self.stock.name, self.index.name),
            FigureKind::TimeLines {
                y_label: "Stock Price".into(),
                panels: vec![price_panel(&self.stock), price_panel(&self.index)],
                percent_axis: false,
            },
        )
        .with_size(12.0, 6.0, scale);

        let growth_title = "Percentage growth of stock prices";
        let percentage_growth = Figure::new(
            "percentage_growth.png",
            growth_title,
            FigureKind::TimeLines {
                y_label: "Percentage of Original".into(),
                panels: vec![LinePanel {
                    title: growth_title.into(),
                    series: vec![
                        DatedSeries {
                            name: self.index.label.clone(),
                            dates: self.index.dates.clone(),
                            values: self.index.growth()?,
                        },
                        DatedSeries {
                            name: self.stock.label.clone(),
                            dates: self.stock.dates.clone(),
                            values: self.stock.growth()?,
                        },
                    ],
                }],
                percent_axis: true,
            },
        )
        .with_size(10.0, 8.0, scale);

        Ok(vec![
            violin,
            density,
            scatter,
            revenue_bars,
            percent_bars,
            stock_growth,
            percentage_growth,
        ]
        .into_iter()
        .map(|figure| figure.with_palette(render.palette))
        .collect())
    }

    pub fn commentary(&self) -> Result<Commentary, StudyError> {
        let mut commentary = Commentary::new(format!(
            "{} vs {} stock profile",
            self.stock.name, self.index.name
        ));

        commentary.section("Quarterly prices", self.quarter_lines());
        commentary.section("Earnings per share", self.eps_lines());
        commentary.section("Revenue and earnings", self.earnings_lines()?);
        commentary.section("Growth", self.growth_lines()?);
        Ok(commentary)
    }

    fn quarter_lines(&self) -> Vec<String> {
        let stats: Vec<_> = self
            .quarters
            .iter()
            .filter(|q| !q.values.is_empty())
            .map(|q| {
                let mut s = StatsCalculator::compute_descriptive_stats(&q.values);
                s.group_name = q.name.clone();
                s
            })
            .collect();

        let mut lines: Vec<String> = stats
            .iter()
            .map(|s| {
                format!(
                    "{}: median {:.2}, range {:.2} to {:.2} over {} trading days",
                    s.group_name, s.median, s.min, s.max, s.count
                )
            })
            .collect();

        if let Some(widest) = stats.iter().max_by(|a, b| a.range().total_cmp(&b.range())) {
            lines.push(format!(
                "Widest spread in {} ({:.2} between low and high)",
                widest.group_name,
                widest.range()
            ));
        }
        if let Some(top) = stats.iter().max_by(|a, b| a.median.total_cmp(&b.median)) {
            lines.push(format!("Highest median price in {}", top.group_name));
        }
        lines
    }

    fn eps_lines(&self) -> Vec<String> {
        let eps = &self.eps;
        let mut beats = 0;
        let mut lines: Vec<String> = eps
            .labels
            .iter()
            .zip(eps.actual.iter().zip(&eps.estimate))
            .map(|(label, (actual, estimate))| {
                let diff = actual - estimate;
                let verdict = if diff.abs() < 1e-9 {
                    "met".to_string()
                } else if diff > 0.0 {
                    beats += 1;
                    format!("beat by {:.2}", diff)
                } else {
                    format!("missed by {:.2}", -diff)
                };
                format!(
                    "{}: actual {:.2} vs estimate {:.2}, {}",
                    label, actual, estimate, verdict
                )
            })
            .collect();

        if !eps.labels.is_empty() {
            lines.push(format!(
                "Estimate beaten in {} of {} quarters",
                beats,
                eps.labels.len()
            ));
        }
        lines
    }

    fn earnings_lines(&self) -> Result<Vec<String>, StudyError> {
        let percentages = self.earnings_percentage()?;
        let mut lines: Vec<String> = self
            .financials
            .labels
            .iter()
            .zip(&percentages)
            .map(|(label, pct)| format!("{}: earnings are {:.1}% of revenue", label, pct))
            .collect();

        if percentages.len() > 1 {
            let rising = percentages.windows(2).all(|w| w[1] > w[0]);
            lines.push(if rising {
                "Earnings share of revenue rose every quarter".to_string()
            } else {
                "Earnings share of revenue did not rise every quarter".to_string()
            });
        }
        Ok(lines)
    }

    fn growth_lines(&self) -> Result<Vec<String>, StudyError> {
        let mut lines = Vec::new();
        let mut finals = Vec::new();

        for series in [&self.stock, &self.index] {
            let growth = series.growth()?;
            let last = growth.last().copied().unwrap_or(100.0);
            let changes = StatsCalculator::period_changes(&series.prices)?;
            lines.push(format!(
                "{} ended the period at {} of its first price; period-to-period changes vary by {:.1} points",
                series.name,
                signed_percent(last - 100.0),
                StatsCalculator::std_dev(&changes)
            ));
            finals.push((series.name.as_str(), last));
        }

        if let [(stock, stock_last), (index, index_last)] = finals.as_slice() {
            let (leader, gap) = if stock_last >= index_last {
                (stock, stock_last - index_last)
            } else {
                (index, index_last - stock_last)
            };
            lines.push(format!("{} outgrew the other by {:.1} points", leader, gap));
        }
        Ok(lines)
    }
}
