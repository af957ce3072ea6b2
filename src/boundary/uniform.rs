//! Uniform rainfall/loss boundary (`bdy_Uniform`, §4.7).

use crate::cellstate::{clamp_eta, Bed, CellState};
use crate::constants::T_HYDRO;

/// A domain-wide rainfall (positive) or loss (negative) intensity,
/// applied only on hydrological sub-steps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformBoundary {
    pub intensity_mm_per_hr: f64,
}

impl UniformBoundary {
    pub fn new(intensity_mm_per_hr: f64) -> Self {
        UniformBoundary { intensity_mm_per_hr }
    }

    pub fn apply(&self, state: &mut CellState, bed: &Bed, t_hydro: f64) {
        if t_hydro < T_HYDRO {
            return;
        }
        let delta = (self.intensity_mm_per_hr / 3.6e6) * t_hydro;
        for id in 0..state.len() {
            if state.cell(id).is_disabled() {
                continue;
            }
            state.eta[id] = clamp_eta(state.eta[id] + delta, bed.z[id]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;

    #[test]
    fn rainfall_raises_every_enabled_cell() {
        let grid = Grid::new(3, 1, 1.0, 1.0).unwrap();
        let bed = Bed::flat(grid.len(), 0.0);
        let mut state = CellState::new(grid.len());
        let boundary = UniformBoundary::new(10.0);
        boundary.apply(&mut state, &bed, T_HYDRO);
        let expected = (10.0 / 3.6e6) * T_HYDRO;
        for &eta in &state.eta {
            assert!((eta - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn sub_hydro_step_is_a_no_op() {
        let grid = Grid::new(2, 1, 1.0, 1.0).unwrap();
        let bed = Bed::flat(grid.len(), 0.0);
        let mut state = CellState::new(grid.len());
        let boundary = UniformBoundary::new(10.0);
        boundary.apply(&mut state, &bed, T_HYDRO * 0.5);
        assert_eq!(state.eta, vec![0.0; grid.len()]);
    }

    #[test]
    fn loss_never_drops_below_bed() {
        let grid = Grid::new(1, 1, 1.0, 1.0).unwrap();
        let bed = Bed::flat(1, 0.0);
        let mut state = CellState::new(1);
        state.eta[0] = 0.01;
        let boundary = UniformBoundary::new(-1_000_000.0);
        boundary.apply(&mut state, &bed, T_HYDRO);
        assert!(state.eta[0] >= 0.0);
    }
}
