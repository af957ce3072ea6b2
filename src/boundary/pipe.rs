//! Simple pressurised-pipe connector (`bdy_SimplePipe`, §4.7).

use crate::cellstate::{depth, Bed, CellState};
use crate::constants::{G, PIPE_MAX_ITERATIONS, PIPE_TOLERANCE, VERY_SMALL, WATER_KINEMATIC_VISCOSITY};
use crate::error::{DomainError, DomainResult};
use crate::grid::Grid;

/// Two cell endpoints joined by a pipe of fixed geometry. `apply` solves
/// the Darcy-Weisbach head balance each step and moves the corresponding
/// volume between endpoints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimplePipe {
    pub upstream_cell: usize,
    pub downstream_cell: usize,
    pub diameter: f64,
    pub length: f64,
    pub roughness: f64,
    pub loss_coefficient: f64,
    pub upstream_invert: f64,
    pub downstream_invert: f64,
}

impl SimplePipe {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        upstream_cell: usize,
        downstream_cell: usize,
        diameter: f64,
        length: f64,
        roughness: f64,
        loss_coefficient: f64,
        upstream_invert: f64,
        downstream_invert: f64,
    ) -> DomainResult<Self> {
        if !(diameter.is_finite() && diameter > 0.0) {
            return Err(DomainError::InvalidPipeDiameter { value: diameter });
        }
        if !(length.is_finite() && length > 0.0) {
            return Err(DomainError::InvalidPipeLength { value: length });
        }
        Ok(SimplePipe {
            upstream_cell,
            downstream_cell,
            diameter,
            length,
            roughness,
            loss_coefficient,
            upstream_invert,
            downstream_invert,
        })
    }

    /// Partial-pipe shape factor `φ = (θ − sin θ)/θ`, `θ = 2·arccos(1 −
    /// 2h/D)`. `φ → 1` as the pipe runs full.
    fn shape_factor(&self, h: f64) -> f64 {
        let ratio = (h / self.diameter).clamp(0.0, 1.0);
        let theta = 2.0 * (1.0 - 2.0 * ratio).clamp(-1.0, 1.0).acos();
        if theta < VERY_SMALL {
            0.0
        } else {
            (theta - theta.sin()) / theta
        }
    }

    fn active(&self, state: &CellState, bed: &Bed) -> bool {
        if bed.is_nodata(self.upstream_cell) || bed.is_nodata(self.downstream_cell) {
            return false;
        }
        if self.upstream_invert < bed.z[self.upstream_cell] {
            return false;
        }
        let h_up = depth(state.eta[self.upstream_cell], bed.z[self.upstream_cell]);
        bed.z[self.upstream_cell] + h_up >= self.upstream_invert
    }

    /// Fixed-point solve of the Darcy-Weisbach head balance
    /// `h_0 − h_f − h_loc = 0` for the pipe velocity, adaptively stepping
    /// the friction-head guess `h_f` (§4.7). Returns `None` on
    /// non-convergence within [`PIPE_MAX_ITERATIONS`].
    fn solve_velocity(&self, h_0: f64, h_rep: f64) -> Option<f64> {
        let phi = self.shape_factor(h_rep).max(VERY_SMALL);
        let d_w = self.diameter * phi;

        let mut h_f = (0.5 * h_0).max(1e-6);
        for _ in 0..PIPE_MAX_ITERATIONS {
            let reynolds_term = (2.0 * G * d_w * h_f.max(1e-8) / self.length).sqrt();
            if reynolds_term < VERY_SMALL {
                return Some(0.0);
            }
            let v = -2.0
                * (self.roughness / (3.71 * d_w) + 2.51 * WATER_KINEMATIC_VISCOSITY / (d_w * reynolds_term)).log10()
                * reynolds_term;
            let h_loc = self.loss_coefficient * v * v / (2.0 * G);
            let err = h_0 - h_f - h_loc;
            if err.abs() < PIPE_TOLERANCE {
                return Some(v);
            }

            let step = if err.abs() >= 0.2 { 0.2 } else { 0.002 };
            let mut delta = step * err;
            if delta.abs() < 1e-5 {
                delta = 1e-5 * err.signum();
            }
            if h_f + delta < 0.0 {
                delta *= 0.5;
            }
            h_f += delta;
        }
        None
    }

    /// Applies one step of the pipe connector, mutating both endpoint
    /// cells' water level. A non-convergent solve deliberately poisons
    /// both endpoints with NaN (§7) to halt the simulation.
    pub fn apply(&self, grid: &Grid, state: &mut CellState, bed: &Bed, dt: f64) {
        if dt <= 0.0 || !self.active(state, bed) {
            return;
        }

        let z_up = bed.z[self.upstream_cell];
        let z_down = bed.z[self.downstream_cell];
        let h_up = depth(state.eta[self.upstream_cell], z_up);
        let h_down = depth(state.eta[self.downstream_cell], z_down);

        let level_up = z_up + h_up;
        let level_down = z_down + h_down;
        let h_0 = level_up - level_down;
        if h_0 <= 0.0 {
            return;
        }

        let h_rep = h_up.min(self.diameter);
        let velocity = match self.solve_velocity(h_0, h_rep) {
            Some(v) => v,
            None => f64::NAN,
        };

        if velocity.is_nan() {
            state.eta[self.upstream_cell] = f64::NAN;
            state.eta[self.downstream_cell] = f64::NAN;
            return;
        }

        let area = std::f64::consts::FRAC_PI_4 * self.diameter * self.diameter;
        let volume = velocity * area * dt;
        let depth_change = volume / (grid.dx() * grid.dy());

        state.eta[self.upstream_cell] = (state.eta[self.upstream_cell] - depth_change).max(z_up);
        state.eta[self.downstream_cell] = (state.eta[self.downstream_cell] + depth_change).max(z_down);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inactive_when_invert_is_below_bed() {
        let pipe = SimplePipe::new(0, 1, 0.5, 10.0, 0.0005, 1.5, -1.0, 0.0).unwrap();
        let grid = Grid::new(2, 1, 1.0, 1.0).unwrap();
        let bed = Bed::flat(2, 0.0);
        let mut state = CellState::new(2);
        state.eta[0] = 2.0;
        let before = state.clone();
        pipe.apply(&grid, &mut state, &bed, 1.0);
        assert_eq!(state.eta, before.eta);
    }

    #[test]
    fn flows_downhill_from_higher_head_to_lower() {
        let pipe = SimplePipe::new(0, 1, 0.5, 10.0, 0.0005, 1.5, 0.0, 0.0).unwrap();
        let grid = Grid::new(2, 1, 1.0, 1.0).unwrap();
        let bed = Bed::flat(2, 0.0);
        let mut state = CellState::new(2);
        state.eta[0] = 2.0;
        state.eta[1] = 0.0;
        pipe.apply(&grid, &mut state, &bed, 1.0);
        assert!(state.eta[0] < 2.0);
        assert!(state.eta[1] > 0.0);
    }

    #[test]
    fn shape_factor_is_full_bore_at_diameter() {
        let pipe = SimplePipe::new(0, 1, 1.0, 10.0, 0.0005, 1.5, 0.0, 0.0).unwrap();
        let phi = pipe.shape_factor(1.0);
        assert!((phi - 1.0).abs() < 1e-6);
    }

    #[test]
    fn rejects_non_positive_diameter() {
        assert!(matches!(
            SimplePipe::new(0, 1, 0.0, 10.0, 0.0005, 1.5, 0.0, 0.0),
            Err(DomainError::InvalidPipeDiameter { .. })
        ));
    }
}
