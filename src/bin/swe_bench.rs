//! Benchmark binary: loads a [`ScenarioConfig`], runs a [`Domain`] to
//! completion, and writes the final cell state as JSON.

use std::path::PathBuf;

use anyhow::{Context, Result};
use swe_core::boundary::{BoundarySet, UniformBoundary};
use swe_core::cellstate::{Bed, CellState, Manning};
use swe_core::config::{ScenarioConfig, UniformRainfallConfig};
use swe_core::grid::Grid;
use swe_core::host::Domain;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn configure_logging() {
    let _ = tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).try_init();
}

fn build_domain(config: &ScenarioConfig) -> Result<Domain> {
    let grid = Grid::new(config.grid.columns, config.grid.rows, config.grid.dx, config.grid.dy)?;
    let n = grid.len();
    let bed = Bed::flat(n, config.bed_elevation);
    let manning = Manning::uniform(n, config.manning_n)?;

    let mut state = CellState::new(n);
    for eta in state.eta.iter_mut() {
        *eta = config.initial_eta;
    }
    for eta_max in state.eta_max.iter_mut() {
        *eta_max = config.initial_eta;
    }

    let uniform = config
        .uniform_rainfall
        .as_ref()
        .map(|UniformRainfallConfig { intensity_mm_per_hr }| UniformBoundary::new(*intensity_mm_per_hr));
    let boundaries = BoundarySet::new(Vec::new(), uniform, Vec::new(), Vec::new(), Vec::new())?;

    Domain::new(grid, bed, manning, state, boundaries, config.run, config.duration).context("constructing domain")
}

fn main() -> Result<()> {
    configure_logging();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = match config_path {
        Some(path) => ScenarioConfig::load(&path)?,
        None => {
            info!("no scenario file given, running the built-in flat-bed smoke scenario");
            default_scenario()
        }
    };

    let mut domain = build_domain(&config)?;
    domain.run_to_end().context("running domain to completion")?;

    let snapshot = serde_json::json!({
        "t": domain.scalars.t,
        "n_success": domain.scalars.n_success,
        "n_skipped": domain.scalars.n_skipped,
        "eta": domain.state.eta,
        "eta_max": domain.state.eta_max,
        "qx": domain.state.qx,
        "qy": domain.state.qy,
    });
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

fn default_scenario() -> ScenarioConfig {
    let text = r#"
        initial_eta = 1.0
        duration = 5.0

        [grid]
        columns = 16
        rows = 16
        dx = 1.0
        dy = 1.0
    "#;
    toml::from_str(text).expect("built-in smoke scenario is valid TOML")
}
