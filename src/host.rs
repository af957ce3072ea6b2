//! Host orchestrator (§10.4): owns the grid, state, boundary set, and
//! timestep scalar block, and drives the step loop boundaries → reduction
//! → timestep → scheme → standalone friction.

use tracing::{debug, info};

use crate::boundary::BoundarySet;
use crate::cellstate::{depth, Bed, CellState, Manning};
use crate::config::RunOptions;
use crate::error::{DomainError, DomainResult};
use crate::friction::apply_friction;
use crate::grid::Grid;
use crate::scheme::{self, SchemeKind};
use crate::timestep::{self, BatchState, TimestepOptions, TimestepScalars};

/// A running simulation: grid geometry, per-cell fields, boundary
/// conditions, and the timestep controller's scalar state.
///
/// There is no device ping-pong buffer pair to manage here — each
/// [`step`] call already allocates the next [`CellState`] and this struct
/// just installs it, so "swapping buffers" is a plain field assignment.
pub struct Domain {
    pub grid: Grid,
    pub bed: Bed,
    pub manning: Manning,
    pub state: CellState,
    pub boundaries: BoundarySet,
    pub scalars: TimestepScalars,
    pub run: RunOptions,
    t_end: f64,
}

impl Domain {
    pub fn new(
        grid: Grid,
        bed: Bed,
        manning: Manning,
        state: CellState,
        boundaries: BoundarySet,
        run: RunOptions,
        t_end: f64,
    ) -> DomainResult<Self> {
        let n = grid.len();
        state.check_len(n)?;
        if bed.z.len() != n {
            return Err(DomainError::LengthMismatch { expected: n, actual: bed.z.len() });
        }
        if manning.n.len() != n {
            return Err(DomainError::LengthMismatch { expected: n, actual: manning.n.len() });
        }
        if SchemeKind::from(run.scheme).requires_square_cells() && !grid.is_square() {
            return Err(DomainError::NonSquareCells { dx: grid.dx(), dy: grid.dy() });
        }
        // No intermediate checkpoints in this thin host: the sync point is
        // the run's own end.
        Ok(Domain {
            grid,
            bed,
            manning,
            state,
            boundaries,
            scalars: TimestepScalars::new(t_end),
            run,
            t_end,
        })
    }

    fn timestep_options(&self) -> TimestepOptions {
        TimestepOptions {
            courant: self.run.courant,
            simplified_wave_speed: self.run.timestep_simplified,
        }
    }

    fn next_dt(&mut self) -> BatchState {
        if self.run.timestep_dynamic {
            let opts = self.timestep_options();
            let s_max = timestep::max_wave_speed(&self.state, &self.bed, &opts);
            timestep::advance(&mut self.scalars, &self.grid, s_max, &opts, self.t_end)
        } else {
            self.scalars.t += self.scalars.dt;
            let remaining = (self.t_end - self.scalars.t).max(0.0);
            self.scalars.dt = self.run.fixed_dt.min(remaining);
            if self.scalars.dt <= 0.0 {
                BatchState::Idle
            } else {
                BatchState::Run
            }
        }
    }

    /// Advances the domain by one batch: applies boundary forcing for the
    /// `Δt` carried from the previous batch, reduces and folds the result
    /// into the timestep scalars, then runs the scheme kernel (and, if
    /// friction isn't already folded into the scheme kernel, the standalone
    /// friction pass) with the freshly chosen `Δt`.
    ///
    /// `next_dt` is what actually performs the reduction and the timestep
    /// fold (`timestep::advance`), so it must run *after* boundaries so the
    /// reduction sees the post-boundary state, matching boundaries →
    /// reduction → timestep → scheme.
    pub fn step(&mut self) -> DomainResult<BatchState> {
        let carried_dt = self.scalars.dt.abs();
        if carried_dt > 0.0 {
            // `t_hydro` as stored is always the post-fold, already-wrapped
            // value (`advance` keeps it in `[0, T_HYDRO)`), so it would never
            // read as due here. What the boundary kernels need is the
            // accumulated hydrological time this carried `Δt` is about to
            // fold into it — the same quantity `advance` is about to add,
            // before its own wrap.
            let t_hydro = self.scalars.t_hydro + carried_dt;
            self.boundaries.apply(&self.grid, &mut self.state, &self.bed, self.scalars.t, t_hydro, carried_dt);
        }

        let batch_state = self.next_dt();
        let dt = self.scalars.dt.abs();
        if dt <= 0.0 {
            return Ok(batch_state);
        }

        let friction_in_kernel = self.run.friction_enabled && self.run.friction_in_flux_kernel;
        self.state = scheme::step(
            &self.grid,
            &self.state,
            &self.bed,
            &self.manning,
            dt,
            self.run.scheme.into(),
            friction_in_kernel,
        )?;

        if self.run.friction_enabled && !self.run.friction_in_flux_kernel {
            self.apply_standalone_friction(dt);
        }

        debug!(t = self.scalars.t, dt, n_success = self.scalars.n_success, "step complete");
        Ok(batch_state)
    }

    fn apply_standalone_friction(&mut self, dt: f64) {
        for id in 0..self.state.len() {
            let cell = self.state.cell(id);
            if cell.is_disabled() {
                continue;
            }
            let h = depth(cell.eta, self.bed.z[id]);
            let (qx, qy) = apply_friction(cell.qx, cell.qy, h, self.manning.n[id], dt);
            self.state.qx[id] = qx;
            self.state.qy[id] = qy;
        }
    }

    /// Runs [`step`] until the domain's configured end time is reached or
    /// a step reports [`BatchState::Idle`].
    pub fn run_to_end(&mut self) -> DomainResult<()> {
        info!(t_end = self.t_end, scheme = ?self.run.scheme, "running domain");
        while self.scalars.t < self.t_end {
            if self.step()? == BatchState::Idle {
                break;
            }
        }
        info!(t = self.scalars.t, n_success = self.scalars.n_success, n_skipped = self.scalars.n_skipped, "run complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::{BoundarySet, UniformBoundary};
    use crate::config::{RunOptions, SchemeConfig};

    fn flat_domain(n: usize, t_end: f64) -> Domain {
        let grid = Grid::new(n, n, 1.0, 1.0).unwrap();
        let bed = Bed::flat(grid.len(), 0.0);
        let manning = Manning::uniform(grid.len(), 0.03).unwrap();
        let mut state = CellState::new(grid.len());
        state.eta.iter_mut().for_each(|e| *e = 1.0);
        state.eta_max.iter_mut().for_each(|e| *e = 1.0);
        let boundaries = BoundarySet::default();
        let run = RunOptions {
            scheme: SchemeConfig::GodunovFirstOrder,
            ..RunOptions::default()
        };
        Domain::new(grid, bed, manning, state, boundaries, run, t_end).unwrap()
    }

    #[test]
    fn still_water_run_stays_at_rest() {
        let mut domain = flat_domain(4, 1.0);
        domain.run_to_end().unwrap();
        for &eta in &domain.state.eta {
            assert!((eta - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn run_terminates_at_the_configured_end_time() {
        let mut domain = flat_domain(4, 0.05);
        domain.run_to_end().unwrap();
        assert!(domain.scalars.t >= 0.05 - 1e-9);
        assert!(domain.scalars.t <= 0.05 + 1e-9);
    }

    #[test]
    fn fixed_timestep_mode_advances_by_exact_increments() {
        let grid = Grid::new(3, 3, 1.0, 1.0).unwrap();
        let bed = Bed::flat(grid.len(), 0.0);
        let manning = Manning::uniform(grid.len(), 0.03).unwrap();
        let state = CellState::new(grid.len());
        let run = RunOptions {
            timestep_dynamic: false,
            fixed_dt: 0.1,
            ..RunOptions::default()
        };
        let mut domain = Domain::new(grid, bed, manning, state, BoundarySet::default(), run, 0.25).unwrap();
        domain.step().unwrap();
        assert!((domain.scalars.dt - 0.1).abs() < 1e-12);
        domain.step().unwrap();
        domain.step().unwrap();
        assert!(domain.scalars.t <= 0.25 + 1e-9);
    }

    #[test]
    fn rejects_mismatched_bed_length() {
        let grid = Grid::new(2, 2, 1.0, 1.0).unwrap();
        let bed = Bed::flat(3, 0.0);
        let manning = Manning::uniform(grid.len(), 0.03).unwrap();
        let state = CellState::new(grid.len());
        let result = Domain::new(grid, bed, manning, state, BoundarySet::default(), RunOptions::default(), 1.0);
        assert!(matches!(result, Err(DomainError::LengthMismatch { .. })));
    }

    #[test]
    fn rainfall_integrates_to_the_expected_mean_depth_over_real_time() {
        // Concrete scenario 5: 32x32, perimeter disabled, 10 mm/hr for 3600s
        // should leave every enabled cell at ~0.010 m. This drives the host
        // through thousands of real dynamic steps (unlike the boundary
        // kernel's own unit tests, which hand `t_hydro` the threshold
        // directly) so it actually exercises the hydrological accumulation
        // as `run_to_end` performs it.
        let n = 32;
        let grid = Grid::new(n, n, 1.0, 1.0).unwrap();
        let len = grid.len();
        let manning = Manning::uniform(len, 0.03).unwrap();

        let mut bed_z = vec![0.0; len];
        let mut state = CellState::new(len);
        for j in 0..n {
            for i in 0..n {
                if grid.is_perimeter(i, j) {
                    let id = grid.id(i, j);
                    bed_z[id] = -10000.0;
                    state.eta_max[id] = -10000.0;
                }
            }
        }
        let bed = Bed::new(bed_z);

        let boundaries = BoundarySet::new(vec![], Some(UniformBoundary::new(10.0)), vec![], vec![], vec![]).unwrap();
        let run = RunOptions {
            scheme: SchemeConfig::GodunovFirstOrder,
            ..RunOptions::default()
        };
        let mut domain = Domain::new(grid, bed, manning, state, boundaries, run, 3600.0).unwrap();
        domain.run_to_end().unwrap();

        let mut total = 0.0;
        let mut enabled = 0usize;
        for id in 0..domain.state.len() {
            if domain.state.cell(id).is_disabled() {
                continue;
            }
            total += domain.state.eta[id];
            enabled += 1;
        }
        let mean_depth = total / enabled as f64;
        assert!((mean_depth - 0.010).abs() < 1e-6, "mean depth {mean_depth}");
    }
}
