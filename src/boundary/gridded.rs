//! Gridded rainfall/mass-flux boundary, resident and streaming variants
//! (`bdy_Gridded` / `bdy_StreamingGridded`, §4.7).

use crate::cellstate::{clamp_eta, Bed, CellState};
use crate::constants::T_HYDRO;
use crate::error::{DomainError, DomainResult};
use crate::grid::Grid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GriddedKind {
    RainIntensity,
    MassFlux,
}

/// Georeferencing for a coarser raster of spacing `resolution`, anchored
/// at `(origin_x, origin_y)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterGeometry {
    pub origin_x: f64,
    pub origin_y: f64,
    pub resolution: f64,
    pub columns: usize,
    pub rows: usize,
}

impl RasterGeometry {
    fn sample_index(&self, grid: &Grid, i: usize, j: usize) -> Option<usize> {
        let x = (i as f64) * grid.dx() - self.origin_x;
        let y = (j as f64) * grid.dy() - self.origin_y;
        if x < 0.0 || y < 0.0 {
            return None;
        }
        let col = (x / self.resolution) as usize;
        let row = (y / self.resolution) as usize;
        if col >= self.columns || row >= self.rows {
            return None;
        }
        Some(row * self.columns + col)
    }
}

fn apply_rate(grid: &Grid, state: &mut CellState, bed: &Bed, geometry: &RasterGeometry, raster: &[f64], kind: GriddedKind, t_hydro: f64) {
    if t_hydro < T_HYDRO {
        return;
    }
    for j in 0..grid.rows() {
        for i in 0..grid.columns() {
            let id = grid.id(i, j);
            if state.cell(id).is_disabled() {
                continue;
            }
            let idx = match geometry.sample_index(grid, i, j) {
                Some(idx) => idx,
                None => continue,
            };
            let value = raster[idx];
            let delta = match kind {
                GriddedKind::RainIntensity => (value / 3.6e6) * t_hydro,
                GriddedKind::MassFlux => (value / (grid.dx() * grid.dy())) * t_hydro,
            };
            state.eta[id] = clamp_eta(state.eta[id] + delta, bed.z[id]);
        }
    }
}

/// Entire timeseries of rasters resident in memory, indexed by
/// `⌊t/T_int⌋` (clamped to the last layer).
#[derive(Debug, Clone)]
pub struct GriddedBoundary {
    pub geometry: RasterGeometry,
    pub kind: GriddedKind,
    pub interval: f64,
    layers: Vec<Vec<f64>>,
}

impl GriddedBoundary {
    pub fn new(geometry: RasterGeometry, kind: GriddedKind, interval: f64, layers: Vec<Vec<f64>>) -> DomainResult<Self> {
        if interval <= 0.0 {
            return Err(DomainError::InvalidTimeseriesInterval { interval });
        }
        if layers.is_empty() {
            return Err(DomainError::EmptyTimeseries);
        }
        if geometry.resolution <= 0.0 {
            return Err(DomainError::InvalidGridResolution { value: geometry.resolution });
        }
        Ok(GriddedBoundary {
            geometry,
            kind,
            interval,
            layers,
        })
    }

    pub fn apply(&self, grid: &Grid, state: &mut CellState, bed: &Bed, t: f64, t_hydro: f64) {
        let idx = ((t / self.interval) as usize).min(self.layers.len() - 1);
        apply_rate(grid, state, bed, &self.geometry, &self.layers[idx], self.kind, t_hydro);
    }
}

/// A single raster buffer the host overwrites as simulation time crosses
/// into a new `⌊t/T_int⌋` bucket (§5's streaming contract): the host must
/// finish the upload before the step that applies this boundary runs.
#[derive(Debug, Clone)]
pub struct StreamingGriddedBoundary {
    pub geometry: RasterGeometry,
    pub kind: GriddedKind,
    pub interval: f64,
    current: Vec<f64>,
    current_index: i64,
}

impl StreamingGriddedBoundary {
    pub fn new(geometry: RasterGeometry, kind: GriddedKind, interval: f64, initial: Vec<f64>) -> DomainResult<Self> {
        if interval <= 0.0 {
            return Err(DomainError::InvalidTimeseriesInterval { interval });
        }
        if geometry.resolution <= 0.0 {
            return Err(DomainError::InvalidGridResolution { value: geometry.resolution });
        }
        Ok(StreamingGriddedBoundary {
            geometry,
            kind,
            interval,
            current: initial,
            current_index: -1,
        })
    }

    pub fn current_index_for(&self, t: f64) -> i64 {
        (t / self.interval).floor() as i64
    }

    pub fn is_stale(&self, t: f64) -> bool {
        self.current_index_for(t) != self.current_index
    }

    /// Installs the raster for bucket `index`; called by the host once per
    /// bucket transition, before the next `apply`.
    pub fn set_current_raster(&mut self, index: i64, raster: Vec<f64>) {
        self.current = raster;
        self.current_index = index;
    }

    pub fn apply(&mut self, grid: &Grid, state: &mut CellState, bed: &Bed, t_hydro: f64) {
        apply_rate(grid, state, bed, &self.geometry, &self.current, self.kind, t_hydro);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry(columns: usize, rows: usize) -> RasterGeometry {
        RasterGeometry {
            origin_x: 0.0,
            origin_y: 0.0,
            resolution: 1.0,
            columns,
            rows,
        }
    }

    #[test]
    fn resident_gridded_picks_the_right_time_layer() {
        let grid = Grid::new(2, 1, 1.0, 1.0).unwrap();
        let bed = Bed::flat(grid.len(), 0.0);
        let mut state = CellState::new(grid.len());
        let boundary = GriddedBoundary::new(
            geometry(2, 1),
            GriddedKind::RainIntensity,
            1.0,
            vec![vec![0.0, 0.0], vec![36000.0, 36000.0]],
        )
        .unwrap();
        boundary.apply(&grid, &mut state, &bed, 1.5, T_HYDRO);
        assert!(state.eta[0] > 0.0);
    }

    #[test]
    fn streaming_gridded_uses_whatever_is_currently_installed() {
        let grid = Grid::new(1, 1, 1.0, 1.0).unwrap();
        let bed = Bed::flat(1, 0.0);
        let mut state = CellState::new(1);
        let mut boundary = StreamingGriddedBoundary::new(geometry(1, 1), GriddedKind::MassFlux, 1.0, vec![0.0]).unwrap();
        boundary.set_current_raster(3, vec![1.0]);
        boundary.apply(&grid, &mut state, &bed, T_HYDRO);
        assert!(state.eta[0] > 0.0);
    }

    #[test]
    fn out_of_raster_cells_are_left_untouched() {
        let grid = Grid::new(3, 1, 1.0, 1.0).unwrap();
        let bed = Bed::flat(grid.len(), 0.0);
        let mut state = CellState::new(grid.len());
        let boundary = GriddedBoundary::new(geometry(2, 1), GriddedKind::RainIntensity, 1.0, vec![vec![36000.0, 36000.0]]).unwrap();
        boundary.apply(&grid, &mut state, &bed, 0.0, T_HYDRO);
        assert_eq!(state.eta[2], 0.0);
    }
}
