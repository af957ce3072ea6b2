//! Boundary condition kernels (§4.7): cell-list timeseries, uniform
//! rainfall/loss, gridded rainfall/mass-flux (resident and streaming), and
//! the simple pressurised-pipe connector.

pub mod cell;
pub mod gridded;
pub mod pipe;
pub mod uniform;

use std::collections::HashSet;

pub use cell::{CellBoundary, DepthMode, DischargeMode, TimeseriesEntry};
pub use gridded::{GriddedBoundary, GriddedKind, RasterGeometry, StreamingGriddedBoundary};
pub use pipe::SimplePipe;
pub use uniform::UniformBoundary;

use crate::cellstate::Bed;
use crate::cellstate::CellState;
use crate::error::{DomainError, DomainResult};
use crate::grid::Grid;

/// The full set of boundary conditions attached to a domain. Construction
/// enforces that no two cell-boundary relations target the same cell
/// (§9 "Boundary-map aliasing") — the Rust host layer can check this
/// cheaply where the original's external mapping tool could not.
#[derive(Debug, Clone, Default)]
pub struct BoundarySet {
    pub cell_boundaries: Vec<CellBoundary>,
    pub uniform: Option<UniformBoundary>,
    pub gridded: Vec<GriddedBoundary>,
    pub streaming_gridded: Vec<StreamingGriddedBoundary>,
    pub pipes: Vec<SimplePipe>,
}

impl BoundarySet {
    pub fn new(
        cell_boundaries: Vec<CellBoundary>,
        uniform: Option<UniformBoundary>,
        gridded: Vec<GriddedBoundary>,
        streaming_gridded: Vec<StreamingGriddedBoundary>,
        pipes: Vec<SimplePipe>,
    ) -> DomainResult<Self> {
        let mut seen = HashSet::new();
        for boundary in &cell_boundaries {
            for &id in &boundary.cell_ids {
                if !seen.insert(id) {
                    return Err(DomainError::DuplicateBoundaryCell { id });
                }
            }
        }
        Ok(BoundarySet {
            cell_boundaries,
            uniform,
            gridded,
            streaming_gridded,
            pipes,
        })
    }

    /// Applies every boundary kernel in turn: cell, uniform, resident
    /// gridded, streaming gridded, then pipe. Order only matters where two
    /// kernels could target the same cell, which the disjointness check
    /// above rules out among cell boundaries; the whole-domain kernels each
    /// only add depth and commute with one another.
    pub fn apply(&mut self, grid: &Grid, state: &mut CellState, bed: &Bed, t: f64, t_hydro: f64, dt: f64) {
        if dt <= 0.0 {
            return;
        }
        for boundary in &self.cell_boundaries {
            boundary.apply(grid, state, bed, t, dt);
        }
        if let Some(uniform) = &self.uniform {
            uniform.apply(state, bed, t_hydro);
        }
        for g in &self.gridded {
            g.apply(grid, state, bed, t, t_hydro);
        }
        for g in &mut self.streaming_gridded {
            g.apply(grid, state, bed, t_hydro);
        }
        for pipe in &self.pipes {
            pipe.apply(grid, state, bed, dt);
        }
    }
}
