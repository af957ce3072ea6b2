//! A CPU-parallel 2-D shallow-water hydrodynamic solver: finite-volume
//! Godunov/HLLC scheme with depth-positivity reconstruction, point-implicit
//! Manning friction, CFL-adaptive timestepping, and a small set of
//! boundary-forcing kernels (rainfall, stage/discharge timeseries, gridded
//! rasters, pressurised pipes).

pub mod boundary;
pub mod cellstate;
pub mod config;
pub mod constants;
pub mod error;
pub mod friction;
pub mod grid;
pub mod host;
pub mod limiter;
pub mod reconstruct;
pub mod riemann;
pub mod scheme;
pub mod timestep;

pub use cellstate::{Bed, Cell, CellState, Manning};
pub use config::{RunOptions, ScenarioConfig};
pub use error::{DomainError, DomainResult};
pub use grid::Grid;
pub use host::Domain;
pub use scheme::SchemeKind;
