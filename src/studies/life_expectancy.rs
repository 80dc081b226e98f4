//! Life expectancy vs GDP across countries and years.

use super::{Commentary, StudyError};
use crate::charts::layout::compact_number;
use crate::charts::{
    BarStat, Facet, Figure, FigureKind, HueBarPanel, NamedValues, PanelLayout, XySeries,
};
use crate::config::{RenderConfig, StudyConfig};
use crate::data::{DataLoader, DataProcessor};
use crate::stats::{StatsCalculator, DEFAULT_CONFIDENCE};
use polars::prelude::DataFrame;

pub const NAME: &str = "life_expectancy";

pub const COUNTRY: &str = "Country";
pub const YEAR: &str = "Year";
pub const GDP: &str = "GDP";
pub const LEABY: &str = "LEABY";

pub struct LifeExpectancyStudy {
    pub data: DataFrame,
    pub countries: Vec<String>,
    pub years: Vec<String>,
    /// Rows of the focus countries stacked in configured order.
    pub focus: Option<DataFrame>,
    /// Rows of the last focus country alone.
    pub smallest: Option<DataFrame>,
}

impl LifeExpectancyStudy {
    pub fn load(config: &StudyConfig) -> Result<Self, StudyError> {
        let cfg = &config.countries;
        let mut loader = DataLoader::new();
        loader.load_csv(&config.data_path(&cfg.data_file))?;
        log::debug!(
            "{}: {} rows, columns {:?}",
            NAME,
            loader.get_row_count(),
            loader.get_columns()
        );
        let mut data = loader.take_dataframe()?;
        DataProcessor::rename_column(&mut data, &cfg.life_expectancy_column, LEABY)?;
        Self::from_frame(data, &cfg.focus)
    }

    /// Build the study from an already renamed table.
    pub fn from_frame(data: DataFrame, focus: &[String]) -> Result<Self, StudyError> {
        DataProcessor::require_columns(&data, &[COUNTRY, YEAR, GDP, LEABY])?;
        if data.height() == 0 {
            return Err(StudyError::EmptySelection("country data".into()));
        }

        let countries = DataProcessor::unique_values(&data, COUNTRY)?;
        let years = DataProcessor::unique_values(&data, YEAR)?;

        let subsets = focus
            .iter()
            .map(|country| {
                let rows = DataProcessor::filter_by_value(&data, COUNTRY, country)?;
                if rows.height() == 0 {
                    return Err(StudyError::EmptySelection(country.clone()));
                }
                Ok(rows)
            })
            .collect::<Result<Vec<_>, StudyError>>()?;

        let smallest = subsets.last().cloned();
        let focus = if subsets.is_empty() {
            None
        } else {
            Some(DataProcessor::concat_rows(&subsets)?)
        };

        log::info!(
            "{}: {} rows, {} countries, {} years",
            NAME,
            data.height(),
            countries.len(),
            years.len()
        );
        Ok(Self {
            data,
            countries,
            years,
            focus,
            smallest,
        })
    }

    pub fn figures(&self, render: &RenderConfig) -> Result<Vec<Figure>, StudyError> {
        let scale = render.scale;

        let violin = Figure::new(
            "1-violin_lifeexp.png",
            "LEABY per Country",
            FigureKind::Violin {
                x_label: COUNTRY.into(),
                y_label: LEABY.into(),
                groups: self.groups(LEABY)?,
            },
        )
        .with_size(15.0, 10.0, scale);

        let gdp_label = "GDP in USD";
        let mut gdp_panels = vec![hue_panel(&self.data, GDP, gdp_label, true)?];
        for subset in [&self.focus, &self.smallest].into_iter().flatten() {
            gdp_panels.push(hue_panel(subset, GDP, gdp_label, false)?);
        }
        let gdp_composite = Figure::new(
            "11-gdp_per_country.png",
            "GDP per country",
            FigureKind::HueBars {
                panels: gdp_panels,
                layout: PanelLayout::Overview,
            },
        )
        .with_size(15.0, 10.0, scale);

        let mut leaby_panel = hue_panel(&self.data, LEABY, "Life Expectancy at birth", true)?;
        leaby_panel.y_range = Some((40.0, 85.0));
        let leaby_bars = Figure::new(
            "12-leaby_country.png",
            "Life Expectancy per Country per Year",
            FigureKind::HueBars {
                panels: vec![leaby_panel],
                layout: PanelLayout::Single,
            },
        )
        .with_size(10.0, 9.0, scale);

        let scatter = Figure::new(
            "2-scatter_gpd_lifexp.png",
            "LEABY vs GDP /year /country",
            FigureKind::FacetScatter {
                x_label: GDP.into(),
                y_label: LEABY.into(),
                col_wrap: 4,
                facets: self.year_facets()?,
            },
        )
        .with_size(10.0, 9.0, scale);

        let leaby_lines = Figure::new(
            "4-facet_lifexp_country.png",
            "LEABY /year /country",
            FigureKind::FacetLines {
                x_label: YEAR.into(),
                y_label: LEABY.into(),
                col_wrap: 3,
                facets: self.country_facets(LEABY)?,
            },
        )
        .with_size(12.0, 8.0, scale);

        let gdp_lines = Figure::new(
            "3-facet_gdp_country.png",
            "GDP /year /country",
            FigureKind::FacetLines {
                x_label: YEAR.into(),
                y_label: GDP.into(),
                col_wrap: 3,
                facets: self.country_facets(GDP)?,
            },
        )
        .with_size(12.0, 8.0, scale);

        let gdp_means = self.mean_bars(
            "gdp_by_country.png",
            "Mean GDP per Country",
            GDP,
            (15.0, 8.0),
            scale,
        )?;
        let leaby_means = self.mean_bars(
            "leaby_by_country.png",
            "Mean LEABY per Country",
            LEABY,
            (15.0, 5.0),
            scale,
        )?;

        Ok(vec![
            violin,
            gdp_composite,
            leaby_bars,
            scatter,
            leaby_lines,
            gdp_lines,
            gdp_means,
            leaby_means,
        ]
        .into_iter()
        .map(|figure| figure.with_palette(render.palette))
        .collect())
    }

    /// `value` grouped by country in first-appearance order.
    fn groups(&self, value: &str) -> Result<Vec<NamedValues>, StudyError> {
        Ok(DataProcessor::group_values(&self.data, COUNTRY, value)?
            .into_iter()
            .map(|(name, values)| NamedValues::new(name, values))
            .collect())
    }

    fn mean_bars(
        &self,
        file_name: &str,
        title: &str,
        value: &str,
        (width, height): (f64, f64),
        scale: f64,
    ) -> Result<Figure, StudyError> {
        let groups = self.groups(value)?;
        Ok(Figure::new(
            file_name,
            title,
            FigureKind::Bars {
                x_label: COUNTRY.into(),
                y_label: value.into(),
                labels: groups.iter().map(|g| g.name.clone()).collect(),
                stats: groups.iter().filter_map(|g| bar_stat(&g.values)).collect(),
                percent_axis: false,
            },
        )
        .with_size(width, height, scale))
    }

    /// One scatter facet per year, a series per country.
    fn year_facets(&self) -> Result<Vec<Facet>, StudyError> {
        self.years
            .iter()
            .map(|year| {
                let rows = DataProcessor::filter_by_value(&self.data, YEAR, year)?;
                let names = DataProcessor::string_values(&rows, COUNTRY)?;
                let gdp = DataProcessor::numeric_values(&rows, GDP)?;
                let leaby = DataProcessor::numeric_values(&rows, LEABY)?;

                let series = self
                    .countries
                    .iter()
                    .map(|country| XySeries {
                        name: country.clone(),
                        points: names
                            .iter()
                            .zip(gdp.iter().zip(&leaby))
                            .filter(|(name, _)| *name == country)
                            .map(|(_, (x, y))| (*x, *y))
                            .collect(),
                    })
                    .filter(|s| !s.points.is_empty())
                    .collect();

                Ok(Facet {
                    title: format!("{} = {}", YEAR, year),
                    series,
                })
            })
            .collect()
    }

    /// One line facet per country of `value` over the years.
    fn country_facets(&self, value: &str) -> Result<Vec<Facet>, StudyError> {
        self.countries
            .iter()
            .map(|country| {
                let rows = DataProcessor::filter_by_value(&self.data, COUNTRY, country)?;
                let years = DataProcessor::numeric_values(&rows, YEAR)?;
                let values = DataProcessor::numeric_values(&rows, value)?;
                let mut points: Vec<(f64, f64)> = years.into_iter().zip(values).collect();
                points.sort_by(|a, b| a.0.total_cmp(&b.0));

                Ok(Facet {
                    title: format!("{} = {}", COUNTRY, country),
                    series: vec![XySeries {
                        name: value.to_string(),
                        points,
                    }],
                })
            })
            .collect()
    }

    pub fn commentary(&self) -> Result<Commentary, StudyError> {
        let mut commentary = Commentary::new("Life expectancy and GDP");

        let mut overview = vec![format!("Countries: {}", self.countries.join(", "))];
        if let (Some(first), Some(last)) = (self.years.first(), self.years.last()) {
            overview.push(format!(
                "Years: {} to {} ({} years)",
                first,
                last,
                self.years.len()
            ));
        }
        commentary.section("Data", overview);

        let gdp = self.groups(GDP)?;
        let mut gdp_lines = extremes(&gdp, "mean GDP", |v| format!("{} USD", compact_number(v)));
        if let Some(focus) = &self.focus {
            for (country, values) in DataProcessor::group_values(focus, COUNTRY, GDP)? {
                let peak = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                gdp_lines.push(format!(
                    "{} peaked at {} USD",
                    country,
                    compact_number(peak)
                ));
            }
        }
        commentary.section("GDP", gdp_lines);

        let leaby = self.groups(LEABY)?;
        let mut leaby_lines = extremes(&leaby, "mean life expectancy", |v| {
            format!("{:.1} years", v)
        });
        leaby_lines.extend(self.leaby_changes()?);
        commentary.section("Life expectancy", leaby_lines);

        commentary.section("GDP and life expectancy", self.correlation_lines()?);
        Ok(commentary)
    }

    /// Life expectancy in the first and last year of every country.
    fn leaby_changes(&self) -> Result<Vec<String>, StudyError> {
        let facets = self.country_facets(LEABY)?;
        Ok(facets
            .iter()
            .zip(&self.countries)
            .filter_map(|(facet, country)| {
                let points = &facet.series.first()?.points;
                let (first_year, first) = *points.first()?;
                let (last_year, last) = *points.last()?;
                Some(format!(
                    "{}: {:.1} in {} to {:.1} in {} ({:+.1} years)",
                    country,
                    first,
                    first_year,
                    last,
                    last_year,
                    last - first
                ))
            })
            .collect())
    }

    fn correlation_lines(&self) -> Result<Vec<String>, StudyError> {
        let describe = |r: Option<f64>| match r {
            Some(r) => format!("r = {:.2}", r),
            None => "undefined".to_string(),
        };

        let gdp = DataProcessor::numeric_values(&self.data, GDP)?;
        let leaby = DataProcessor::numeric_values(&self.data, LEABY)?;
        let mut lines = vec![format!(
            "All countries: {}",
            describe(StatsCalculator::pearson_correlation(&gdp, &leaby))
        )];

        for country in &self.countries {
            let rows = DataProcessor::filter_by_value(&self.data, COUNTRY, country)?;
            let gdp = DataProcessor::numeric_values(&rows, GDP)?;
            let leaby = DataProcessor::numeric_values(&rows, LEABY)?;
            lines.push(format!(
                "{}: {}",
                country,
                describe(StatsCalculator::pearson_correlation(&gdp, &leaby))
            ));
        }
        Ok(lines)
    }
}

/// Mean bar with a confidence interval when there is more than one value.
fn bar_stat(values: &[f64]) -> Option<BarStat> {
    if values.is_empty() {
        return None;
    }
    Some(BarStat {
        mean: StatsCalculator::mean(values),
        interval: StatsCalculator::mean_confidence_interval(values, DEFAULT_CONFIDENCE),
    })
}

/// Bars of `value` by country with a bar per year.
fn hue_panel(
    df: &DataFrame,
    value: &str,
    y_label: &str,
    show_legend: bool,
) -> Result<HueBarPanel, StudyError> {
    let categories = DataProcessor::unique_values(df, COUNTRY)?;
    let hues = DataProcessor::unique_values(df, YEAR)?;
    let category_of = DataProcessor::string_values(df, COUNTRY)?;
    let hue_of = DataProcessor::string_values(df, YEAR)?;
    let values = DataProcessor::numeric_values(df, value)?;

    let mut buckets = vec![vec![Vec::new(); hues.len()]; categories.len()];
    for ((category, hue), v) in category_of.iter().zip(&hue_of).zip(values) {
        let i = categories.iter().position(|c| c == category);
        let j = hues.iter().position(|h| h == hue);
        if let (Some(i), Some(j)) = (i, j) {
            buckets[i][j].push(v);
        }
    }

    Ok(HueBarPanel {
        title: None,
        y_label: y_label.to_string(),
        categories,
        hues,
        cells: buckets
            .iter()
            .map(|row| row.iter().map(|values| bar_stat(values)).collect())
            .collect(),
        y_range: None,
        show_legend,
    })
}

/// Highest and lowest group mean.
fn extremes(groups: &[NamedValues], what: &str, fmt: impl Fn(f64) -> String) -> Vec<String> {
    let means: Vec<(&str, f64)> = groups
        .iter()
        .filter(|g| !g.values.is_empty())
        .map(|g| (g.name.as_str(), StatsCalculator::mean(&g.values)))
        .collect();

    let highest = means.iter().max_by(|a, b| a.1.total_cmp(&b.1));
    let lowest = means.iter().min_by(|a, b| a.1.total_cmp(&b.1));
    match (highest, lowest) {
        (Some((hi_name, hi)), Some((lo_name, lo))) => vec![
            format!("Highest {}: {} ({})", what, hi_name, fmt(*hi)),
            format!("Lowest {}: {} ({})", what, lo_name, fmt(*lo)),
        ],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn countries() -> DataFrame {
        df!(
            "Country" => ["Chile", "Chile", "Germany", "Germany", "Zimbabwe", "Zimbabwe"],
            "Year" => [2000i64, 2001, 2000, 2001, 2000, 2001],
            "LEABY" => [77.3, 77.3, 78.0, 78.3, 46.0, 45.3],
            "GDP" => [7.786e10, 7.097e10, 1.95e12, 1.95e12, 6.69e9, 6.78e9]
        )
        .unwrap()
    }

    fn focus() -> Vec<String> {
        vec!["Chile".into(), "Zimbabwe".into()]
    }

    #[test]
    fn focus_subsets_keep_order() {
        let study = LifeExpectancyStudy::from_frame(countries(), &focus()).unwrap();

        let focus = study.focus.as_ref().unwrap();
        assert_eq!(
            DataProcessor::string_values(focus, COUNTRY).unwrap(),
            vec!["Chile", "Chile", "Zimbabwe", "Zimbabwe"]
        );
        let smallest = study.smallest.as_ref().unwrap();
        assert_eq!(
            DataProcessor::unique_values(smallest, COUNTRY).unwrap(),
            vec!["Zimbabwe"]
        );
        assert_eq!(study.years, vec!["2000", "2001"]);
    }

    #[test]
    fn unknown_focus_country_is_an_error() {
        let err = LifeExpectancyStudy::from_frame(countries(), &["Atlantis".to_string()])
            .err()
            .unwrap();
        assert!(matches!(err, StudyError::EmptySelection(ref c) if c == "Atlantis"));
    }

    #[test]
    fn hue_panel_is_country_by_year() {
        let panel = hue_panel(&countries(), LEABY, "LEABY", true).unwrap();

        assert_eq!(panel.categories, vec!["Chile", "Germany", "Zimbabwe"]);
        assert_eq!(panel.hues, vec!["2000", "2001"]);
        let zim_2001 = panel.cells[2][1].unwrap();
        assert_eq!(zim_2001.mean, 45.3);
        assert!(zim_2001.interval.is_none());
    }

    #[test]
    fn figures_follow_notebook_order() {
        let study = LifeExpectancyStudy::from_frame(countries(), &focus()).unwrap();
        let figures = study.figures(&RenderConfig::default()).unwrap();

        let names: Vec<&str> = figures.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "1-violin_lifeexp.png",
                "11-gdp_per_country.png",
                "12-leaby_country.png",
                "2-scatter_gpd_lifexp.png",
                "4-facet_lifexp_country.png",
                "3-facet_gdp_country.png",
                "gdp_by_country.png",
                "leaby_by_country.png",
            ]
        );

        match &figures[1].kind {
            FigureKind::HueBars { panels, layout } => {
                assert_eq!(*layout, PanelLayout::Overview);
                assert_eq!(panels.len(), 3);
                assert!(panels[0].show_legend && !panels[1].show_legend);
                assert_eq!(panels[2].categories, vec!["Zimbabwe"]);
            }
            other => panic!("unexpected kind {:?}", other),
        }

        match &figures[3].kind {
            FigureKind::FacetScatter { facets, col_wrap, .. } => {
                assert_eq!(*col_wrap, 4);
                assert_eq!(facets.len(), 2);
                assert_eq!(facets[0].title, "Year = 2000");
                assert_eq!(facets[0].series.len(), 3);
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn mean_bars_carry_intervals() {
        let study = LifeExpectancyStudy::from_frame(countries(), &focus()).unwrap();
        let figure = study
            .mean_bars("leaby_by_country.png", "Mean LEABY", LEABY, (15.0, 5.0), 1.0)
            .unwrap();

        match figure.kind {
            FigureKind::Bars { labels, stats, .. } => {
                assert_eq!(labels.len(), 3);
                let germany = stats[1];
                assert!((germany.mean - 78.15).abs() < 1e-9);
                let (lo, hi) = germany.interval.unwrap();
                assert!(lo < germany.mean && germany.mean < hi);
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn commentary_names_extremes() {
        let study = LifeExpectancyStudy::from_frame(countries(), &focus()).unwrap();
        let markdown = study.commentary().unwrap().to_markdown();

        assert!(markdown.contains("Highest mean GDP: Germany"));
        assert!(markdown.contains("Lowest mean GDP: Zimbabwe"));
        assert!(markdown.contains("Highest mean life expectancy: Germany"));
        assert!(markdown.contains("Lowest mean life expectancy: Zimbabwe"));
        assert!(markdown.contains("Zimbabwe: 46.0 in 2000 to 45.3 in 2001 (-0.7 years)"));
        assert!(markdown.contains("Years: 2000 to 2001 (2 years)"));
    }
}
