//! TOML-loadable scenario configuration (§10.3).
//!
//! Deliberately thin and in-memory-first: no raster references, no XML,
//! just enough to describe a flat-bed or uniform-roughness scenario for
//! the bundled benchmark binary and integration tests.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use crate::constants::COURANT_DEFAULT;
use crate::scheme::SchemeKind;

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct GridConfig {
    pub columns: usize,
    pub rows: usize,
    pub dx: f64,
    pub dy: f64,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SchemeConfig {
    GodunovFirstOrder,
    GodunovCached,
    SimplifiedInertial,
}

impl From<SchemeConfig> for SchemeKind {
    fn from(value: SchemeConfig) -> Self {
        match value {
            SchemeConfig::GodunovFirstOrder => SchemeKind::GodunovFirstOrder,
            SchemeConfig::GodunovCached => SchemeKind::GodunovCached,
            SchemeConfig::SimplifiedInertial => SchemeKind::SimplifiedInertial,
        }
    }
}

/// Run-time equivalents of the original's device-program compile-time
/// switches (§6): `TIMESTEP_DYNAMIC|FIXED`, `TIMESTEP_SIMPLIFIED`,
/// `FRICTION_ENABLED`, `FRICTION_IN_FLUX_KERNEL`. `USE_ALTERNATE_CONSTRUCTS`
/// has no Rust equivalent and is intentionally absent.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    pub scheme: SchemeConfig,
    pub friction_enabled: bool,
    pub friction_in_flux_kernel: bool,
    pub timestep_dynamic: bool,
    pub timestep_simplified: bool,
    pub fixed_dt: f64,
    pub courant: f64,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            scheme: SchemeConfig::GodunovFirstOrder,
            friction_enabled: true,
            friction_in_flux_kernel: true,
            timestep_dynamic: true,
            timestep_simplified: false,
            fixed_dt: 0.1,
            courant: COURANT_DEFAULT,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct UniformRainfallConfig {
    pub intensity_mm_per_hr: f64,
}

fn default_manning() -> f64 {
    0.03
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioConfig {
    pub grid: GridConfig,
    #[serde(default)]
    pub run: RunOptions,
    pub initial_eta: f64,
    #[serde(default)]
    pub bed_elevation: f64,
    #[serde(default = "default_manning")]
    pub manning_n: f64,
    pub duration: f64,
    #[serde(default)]
    pub uniform_rainfall: Option<UniformRainfallConfig>,
}

impl ScenarioConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).with_context(|| format!("reading scenario config {}", path.display()))?;
        let config: ScenarioConfig =
            toml::from_str(&text).with_context(|| format!("parsing scenario config {}", path.display()))?;
        info!(path = %path.display(), columns = config.grid.columns, rows = config.grid.rows, "loaded scenario config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_scenario() {
        let text = r#"
            initial_eta = 1.0
            duration = 10.0

            [grid]
            columns = 4
            rows = 4
            dx = 1.0
            dy = 1.0
        "#;
        let config: ScenarioConfig = toml::from_str(text).unwrap();
        assert_eq!(config.grid.columns, 4);
        assert_eq!(config.manning_n, 0.03);
        assert_eq!(config.run.scheme, SchemeConfig::GodunovFirstOrder);
        assert!(config.uniform_rainfall.is_none());
    }

    #[test]
    fn parses_run_options_and_rainfall_override() {
        let text = r#"
            initial_eta = 0.0
            duration = 3600.0

            [grid]
            columns = 32
            rows = 32
            dx = 1.0
            dy = 1.0

            [run]
            scheme = "simplified_inertial"
            friction_enabled = false

            [uniform_rainfall]
            intensity_mm_per_hr = 10.0
        "#;
        let config: ScenarioConfig = toml::from_str(text).unwrap();
        assert_eq!(config.run.scheme, SchemeConfig::SimplifiedInertial);
        assert!(!config.run.friction_enabled);
        assert_eq!(config.uniform_rainfall.unwrap().intensity_mm_per_hr, 10.0);
    }
}
