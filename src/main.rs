//! Chartify Studies - Renders the stock profile and life expectancy studies.
//!
//! Usage: `chartify-studies [CONFIG.json]`. Without a config file the
//! defaults read `data/` and write to `output/`.

use anyhow::{Context, Result};
use chartify_studies::{run_all, write_deck, StudyConfig};
use std::env;
use std::path::Path;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match env::args().nth(1) {
        Some(path) => StudyConfig::from_file(Path::new(&path))
            .with_context(|| format!("Failed to load config {}", path))?,
        None => StudyConfig::default(),
    };
    log::debug!("config: {:?}", config);

    let outputs = run_all(&config).context("Study run failed")?;
    for output in &outputs {
        log::info!(
            "{}: {} charts, commentary in {}",
            output.name,
            output.charts.len(),
            output.commentary_path.display()
        );
    }

    if config.render.deck && !outputs.is_empty() {
        let deck = write_deck(&outputs, &config)?;
        if config.render.open_report {
            open::that(&deck).with_context(|| format!("Failed to open {}", deck.display()))?;
        }
    }

    Ok(())
}
