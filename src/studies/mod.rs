//! Studies module - The two exploratory studies
//!
//! A study loads its tables, derives the values it needs, describes its
//! charts as [`Figure`]s and writes commentary. Rendering is shared.

mod commentary;
pub mod life_expectancy;
pub mod stock_profile;

pub use commentary::{signed_percent, Commentary, CommentarySection};
pub use life_expectancy::LifeExpectancyStudy;
pub use stock_profile::StockProfileStudy;

use crate::charts::{ChartRenderer, Figure, RenderError, RenderedChart};
use crate::config::StudyConfig;
use crate::data::{LoaderError, ProcessorError};
use crate::stats::StatsError;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StudyError {
    #[error(transparent)]
    Loader(#[from] LoaderError),
    #[error(transparent)]
    Processor(#[from] ProcessorError),
    #[error(transparent)]
    Stats(#[from] StatsError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("No rows for {0}")]
    EmptySelection(String),
}

/// Everything a study produced.
#[derive(Debug, Clone)]
pub struct StudyOutput {
    pub name: String,
    pub charts: Vec<RenderedChart>,
    pub commentary: Commentary,
    pub commentary_path: PathBuf,
}

/// Render a study's figures and write its commentary next to them.
pub fn publish(
    name: &str,
    figures: &[Figure],
    commentary: Commentary,
    output_dir: &Path,
) -> Result<StudyOutput, StudyError> {
    std::fs::create_dir_all(output_dir).map_err(|source| StudyError::Write {
        path: output_dir.to_path_buf(),
        source,
    })?;

    log::info!("{}: rendering {} charts", name, figures.len());
    let charts = ChartRenderer::render_all(figures, output_dir)?;

    let commentary_path = output_dir.join("commentary.md");
    std::fs::write(&commentary_path, commentary.to_markdown()).map_err(|source| {
        StudyError::Write {
            path: commentary_path.clone(),
            source,
        }
    })?;

    Ok(StudyOutput {
        name: name.to_string(),
        charts,
        commentary,
        commentary_path,
    })
}

/// Run every enabled study, each into its own subdirectory of the output
/// directory.
pub fn run_all(config: &StudyConfig) -> Result<Vec<StudyOutput>, StudyError> {
    let mut outputs = Vec::new();

    if config.stock.enabled {
        let study = StockProfileStudy::load(config)?;
        let figures = study.figures(&config.render)?;
        let commentary = study.commentary()?;
        outputs.push(publish(
            stock_profile::NAME,
            &figures,
            commentary,
            &config.output_dir.join(stock_profile::NAME),
        )?);
    } else {
        log::info!("{} disabled", stock_profile::NAME);
    }

    if config.countries.enabled {
        let study = LifeExpectancyStudy::load(config)?;
        let figures = study.figures(&config.render)?;
        let commentary = study.commentary()?;
        outputs.push(publish(
            life_expectancy::NAME,
            &figures,
            commentary,
            &config.output_dir.join(life_expectancy::NAME),
        )?);
    } else {
        log::info!("{} disabled", life_expectancy::NAME);
    }

    Ok(outputs)
}
