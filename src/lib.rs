//! Chartify Studies - CSV data studies rendered as static charts
//!
//! Two studies share one pipeline: load CSV tables with polars, rename and
//! filter columns, derive percentages and statistics, render PNG charts with
//! plotters, then write commentary and an optional slide deck.

pub mod charts;
pub mod config;
pub mod data;
pub mod ppt;
pub mod stats;
pub mod studies;

pub use config::{ConfigError, StudyConfig};
pub use studies::{run_all, StudyError, StudyOutput};

use anyhow::anyhow;
use ppt::{DeckChart, DeckSection, PptGenerator};
use std::path::PathBuf;

/// Bundle every study's commentary and charts into `<deck_name>.pptx` in the
/// output directory.
pub fn write_deck(outputs: &[StudyOutput], config: &StudyConfig) -> anyhow::Result<PathBuf> {
    let path = config
        .output_dir
        .join(format!("{}.pptx", config.render.deck_name));

    let sections: Vec<DeckSection> = outputs
        .iter()
        .map(|output| DeckSection {
            title: output.commentary.title.clone(),
            lines: output.commentary.to_lines(),
            charts: output
                .charts
                .iter()
                .map(|c| DeckChart {
                    title: &c.title,
                    file_name: &c.file_name,
                    png: &c.png,
                })
                .collect(),
        })
        .collect();

    PptGenerator::generate(&sections, &path, "Chartify Studies")
        .map_err(|e| anyhow!("Failed to write deck {}: {}", path.display(), e))?;
    Ok(path)
}
