use chartify_studies::data::{DataLoader, DataProcessor};
use chartify_studies::stats::StatsCalculator;
use chartify_studies::studies::{LifeExpectancyStudy, StockProfileStudy};
use chartify_studies::{run_all, write_deck, StudyConfig, StudyError};
use std::fs;
use std::io::Read;
use std::path::Path;
use tempfile::TempDir;

const NFLX: &str = "\
Date,Open,High,Low,Close,Adj Close,Volume
2017-01-01,124.959999,143.460007,124.309998,140.710007,140.710007,181772200
2017-02-01,141.199997,145.949997,139.050003,142.130005,142.130005,91432000
2017-03-01,142.839996,148.289993,138.259995,147.809998,147.809998,110692700
2017-04-01,146.699997,153.520004,138.660004,152.199997,152.199997,149769200
2017-05-01,151.910004,164.750000,151.610001,163.070007,163.070007,116795800
2017-06-01,163.520004,166.869995,147.300003,149.410004,149.410004,135675800
";

const DJI: &str = "\
Date,Open,High,Low,Close,Adj Close,Volume
2017-01-01,19872.859375,20125.580078,19677.939453,19864.089844,19864.089844,6482450000
2017-02-01,19923.810547,20851.330078,19831.089844,20812.240234,20812.240234,6185580000
2017-03-01,20957.289063,21169.109375,20412.800781,20663.220703,20663.220703,6941970000
2017-04-01,20665.169922,21070.900391,20379.550781,20940.509766,20940.509766,5392630000
2017-05-01,20962.730469,21112.320313,20553.449219,21008.650391,21008.650391,6613570000
2017-06-01,21030.550781,21535.029297,20994.220703,21349.630859,21349.630859,7214590000
";

const DAILY: &str = "\
Date,Open,High,Low,Close,Adj Close,Volume,Quarter
2017-01-03,124.959999,128.190002,124.309998,127.489998,127.489998,9437900,Q1
2017-01-04,127.489998,130.169998,126.550003,129.410004,129.410004,7843600,Q1
2017-01-05,129.220001,132.750000,128.899994,131.809998,131.809998,10185500,Q1
2017-04-03,146.699997,147.389999,145.289993,146.919998,146.919998,4371700,Q2
2017-04-04,146.690002,147.690002,145.800003,147.639999,147.639999,3545400,Q2
2017-07-03,149.800003,150.360001,145.899994,146.169998,146.169998,3780500,Q3
2017-07-05,146.919998,150.770004,146.800003,150.509995,150.509995,5316800,Q3
2017-10-02,199.500000,199.679993,192.720001,196.000000,196.000000,5597400,Q4
2017-10-03,196.000000,196.800003,193.199997,195.759995,195.759995,3818600,Q4
";

const ALL_DATA: &str = "\
Country,Year,Life expectancy at birth (years),GDP
Chile,2000,77.3,77860932152.0
Chile,2001,77.3,70979923960.0
Chile,2002,77.8,69736811435.0
Germany,2000,78,1949950000000.0
Germany,2001,78.3,1950650000000.0
Germany,2002,78.6,2079140000000.0
Zimbabwe,2000,46,6689957600.0
Zimbabwe,2001,45.3,6777384700.0
Zimbabwe,2002,44.8,6342116400.0
";

fn workspace() -> (TempDir, StudyConfig) {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("data");
    fs::create_dir_all(&data).unwrap();
    fs::write(data.join("NFLX.csv"), NFLX).unwrap();
    fs::write(data.join("DJI.csv"), DJI).unwrap();
    fs::write(data.join("NFLX_daily_by_quarter.csv"), DAILY).unwrap();
    fs::write(data.join("all_data.csv"), ALL_DATA).unwrap();

    let config = StudyConfig {
        data_dir: data,
        output_dir: dir.path().join("output"),
        ..StudyConfig::default()
    };
    (dir, config)
}

fn load(path: &Path) -> polars::prelude::DataFrame {
    DataLoader::read_csv(path).unwrap()
}

#[test]
fn rename_preserves_rows_and_other_columns() {
    let (_dir, config) = workspace();
    let original = load(&config.data_path("all_data.csv"));
    let mut renamed = original.clone();
    DataProcessor::rename_column(&mut renamed, "Life expectancy at birth (years)", "LEABY")
        .unwrap();

    assert_eq!(renamed.height(), original.height());
    assert_eq!(
        DataProcessor::numeric_values(&renamed, "LEABY").unwrap(),
        DataProcessor::numeric_values(&original, "Life expectancy at birth (years)").unwrap()
    );
    for column in ["Country", "Year", "GDP"] {
        assert_eq!(
            DataProcessor::string_values(&renamed, column).unwrap(),
            DataProcessor::string_values(&original, column).unwrap()
        );
    }
}

#[test]
fn filter_keeps_only_matching_rows_in_order() {
    let (_dir, config) = workspace();
    let df = load(&config.data_path("all_data.csv"));

    let zim = DataProcessor::filter_by_value(&df, "Country", "Zimbabwe").unwrap();
    assert_eq!(
        DataProcessor::unique_values(&zim, "Country").unwrap(),
        vec!["Zimbabwe"]
    );
    assert_eq!(
        DataProcessor::numeric_values(&zim, "Year").unwrap(),
        vec![2000.0, 2001.0, 2002.0]
    );

    let year = DataProcessor::filter_by_value(&df, "Year", "2001").unwrap();
    assert_eq!(
        DataProcessor::string_values(&year, "Country").unwrap(),
        vec!["Chile", "Germany", "Zimbabwe"]
    );
}

#[test]
fn growth_and_percentages_from_files() {
    let (_dir, config) = workspace();
    let study = StockProfileStudy::load(&config).unwrap();

    let growth = study.index.growth().unwrap();
    let prices = &study.index.prices;
    for (g, p) in growth.iter().zip(prices) {
        assert!((g - p / prices[0] * 100.0).abs() < 1e-9);
    }

    let pct = study.earnings_percentage().unwrap();
    let expected = StatsCalculator::percentage_of(
        &config.stock.financials.earnings,
        &config.stock.financials.revenue,
    )
    .unwrap();
    assert_eq!(pct, expected);
    assert_eq!(study.quarters.len(), 4);
}

#[test]
fn missing_data_file_is_reported() {
    let (_dir, mut config) = workspace();
    config.countries.data_file = "missing.csv".into();

    let err = LifeExpectancyStudy::load(&config).err().unwrap();
    assert!(matches!(err, StudyError::Loader(_)));
    assert!(err.to_string().contains("missing.csv"));
}

#[test]
fn life_expectancy_commentary_from_file() {
    let (_dir, config) = workspace();
    let study = LifeExpectancyStudy::load(&config).unwrap();
    let commentary = study.commentary().unwrap();

    let markdown = commentary.to_markdown();
    assert!(markdown.starts_with("# Life expectancy and GDP"));
    assert!(markdown.contains("Countries: Chile, Germany, Zimbabwe"));
    assert!(markdown.contains("Highest mean GDP: Germany"));
    assert!(markdown.contains("Lowest mean life expectancy: Zimbabwe"));
    assert!(markdown.contains("Zimbabwe: 46.0 in 2000 to 44.8 in 2002 (-1.2 years)"));
}

#[test]
fn full_run_writes_charts_commentary_and_deck() {
    let (_dir, mut config) = workspace();
    config.render.scale = 0.4;

    let outputs = run_all(&config).unwrap();
    assert_eq!(outputs.len(), 2);
    assert_eq!(outputs[0].charts.len(), 7);
    assert_eq!(outputs[1].charts.len(), 8);
    for chart in outputs.iter().flat_map(|o| o.charts.iter()) {
        assert!(chart.path.is_file(), "{} missing", chart.path.display());
    }
    assert!(outputs[0].commentary_path.is_file());

    let deck = write_deck(&outputs, &config).unwrap();
    let mut archive = zip::ZipArchive::new(fs::File::open(&deck).unwrap()).unwrap();
    let count = |archive: &zip::ZipArchive<fs::File>, prefix: &str| {
        archive
            .file_names()
            .filter(|n| n.starts_with(prefix) && !n.contains("_rels"))
            .count()
    };
    assert_eq!(count(&archive, "ppt/media/"), 15);
    // title, chart list, then text + two chart slides per study
    assert_eq!(count(&archive, "ppt/slides/slide"), 8);

    let mut listing = String::new();
    archive
        .by_name("ppt/slides/slide2.xml")
        .unwrap()
        .read_to_string(&mut listing)
        .unwrap();
    assert!(listing.contains("violinquarter.png"));
    assert!(listing.contains("3-facet_gdp_country.png"));
}

#[test]
fn disabled_studies_produce_nothing() {
    let (_dir, mut config) = workspace();
    config.stock.enabled = false;
    config.countries.enabled = false;

    let outputs = run_all(&config).unwrap();
    assert!(outputs.is_empty());
}
