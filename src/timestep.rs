//! CFL reduction and the adaptive timestep controller (§4.6).

use rayon::prelude::*;

use crate::cellstate::{depth, velocity, Bed, CellState};
use crate::constants::{
    COURANT_DEFAULT, DT_MAX, DT_MIN, DT_START_MIN, G, T_EARLY_DUR, T_EARLY_LIMIT, T_HYDRO, T_START_DUR,
};
use crate::grid::Grid;

/// State of the current batch, as observed by the host after an
/// `advance` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    /// `Δt > 0`: the scheme/friction/boundary kernels should run this step.
    Run,
    /// `Δt` went negative: a sync point (`t_sync`) was reached this step.
    /// The magnitude of the returned `dt` is the clamped step actually
    /// taken; the host should treat the sign as a one-shot signal, not
    /// carry it into the next step.
    SyncReached,
    /// `Δt == 0`: the step is skipped but still counted.
    Idle,
}

/// The mutable scalar block advanced once per step by [`advance`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimestepScalars {
    pub t: f64,
    pub dt: f64,
    pub t_hydro: f64,
    pub t_sync: f64,
    pub dt_batch: f64,
    pub n_success: u64,
    pub n_skipped: u64,
}

impl TimestepScalars {
    pub fn new(t_sync: f64) -> Self {
        TimestepScalars {
            t: 0.0,
            dt: 0.0,
            t_hydro: 0.0,
            t_sync,
            dt_batch: 0.0,
            n_success: 0,
            n_skipped: 0,
        }
    }

    /// Whether this step is due for the hydrological (rainfall/loss)
    /// sub-update: `t_hydro` has reached the hydrological period `T_H`.
    pub fn hydro_due(&self) -> bool {
        self.t_hydro >= T_HYDRO
    }
}

/// Tunables for [`advance`], mirroring the original's device-program
/// compile-time switches (§6) as run-time fields instead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimestepOptions {
    pub courant: f64,
    /// Wave speed uses only `√(gh)`, dropping the advective `|u|, |v|` term
    /// (`TIMESTEP_SIMPLIFIED`).
    pub simplified_wave_speed: bool,
}

impl Default for TimestepOptions {
    fn default() -> Self {
        TimestepOptions {
            courant: COURANT_DEFAULT,
            simplified_wave_speed: false,
        }
    }
}

/// Per-cell wave speed `max(|u|+√(gh), |v|+√(gh))`, zero for disabled or dry
/// cells. This is "phase 1, per-work-item" of the reduction (§4.6); the
/// work-stealing chunking rayon does internally is the "workgroup" stage,
/// and `.reduce()` is the in-group tree-max.
fn cell_wave_speed(state: &CellState, bed: &Bed, id: usize, simplified: bool) -> f64 {
    let cell = state.cell(id);
    if cell.is_disabled() {
        return 0.0;
    }
    let h = depth(cell.eta, bed.z[id]);
    if h < 1e-14 {
        return 0.0;
    }
    let c = (G * h).sqrt();
    if simplified {
        return c;
    }
    let u = velocity(cell.qx, h);
    let v = velocity(cell.qy, h);
    (u.abs() + c).max(v.abs() + c)
}

/// Two-phase parallel reduction: the whole grid's max wave speed. On the
/// original device this is phase 1 (per-workgroup maxima into `W[..]`) plus
/// the first half of phase 2 (`s_max` read-back); on the CPU rewrite both
/// collapse into a single `par_iter().reduce()`.
pub fn max_wave_speed(state: &CellState, bed: &Bed, opts: &TimestepOptions) -> f64 {
    (0..state.len())
        .into_par_iter()
        .map(|id| cell_wave_speed(state, bed, id, opts.simplified_wave_speed))
        .reduce(|| 0.0, f64::max)
}

/// `tst_Advance_Normal`: folds a freshly reduced `s_max` into the scalar
/// block, choosing the next `Δt` and reporting the batch state.
pub fn advance(scalars: &mut TimestepScalars, grid: &Grid, s_max: f64, opts: &TimestepOptions, t_end: f64) -> BatchState {
    let dt_in = scalars.dt;
    scalars.t += dt_in;
    scalars.t_hydro += dt_in;
    if scalars.t_hydro > T_HYDRO {
        scalars.t_hydro -= T_HYDRO;
    }
    if dt_in > 0.0 {
        scalars.n_success += 1;
    } else if dt_in < 0.0 {
        scalars.n_skipped += 1;
    }
    scalars.dt_batch += dt_in.abs();

    let spacing = grid.dx().min(grid.dy());
    let mut dt = if s_max > 0.0 {
        opts.courant * spacing / s_max
    } else {
        DT_MAX
    };

    if scalars.t < T_START_DUR && dt < DT_START_MIN {
        dt = DT_START_MIN;
    }
    if dt > 0.0 {
        dt = dt.max(DT_MIN);
    }

    let mut state = BatchState::Run;
    if scalars.t + dt >= scalars.t_sync && scalars.t_sync - scalars.t > 1e-14 {
        dt = scalars.t_sync - scalars.t;
    } else if scalars.t + dt >= scalars.t_sync {
        dt = -dt;
        state = BatchState::SyncReached;
    }

    if scalars.t < T_EARLY_DUR {
        dt = dt.min(T_EARLY_LIMIT);
    }

    dt = dt.min(t_end - scalars.t).min(DT_MAX);

    if dt == 0.0 {
        state = BatchState::Idle;
    }

    scalars.dt = dt;
    state
}

/// `tst_UpdateTimestep`: re-reduces after a rollback or re-sync, then keeps
/// the smaller of the recomputed `Δt` and the pre-rollback magnitude before
/// reapplying the sync/early-limit clamps.
pub fn update_after_rollback(
    scalars: &mut TimestepScalars,
    grid: &Grid,
    state: &CellState,
    bed: &Bed,
    opts: &TimestepOptions,
    t_end: f64,
    previous_dt: f64,
) -> BatchState {
    let s_max = max_wave_speed(state, bed, opts);
    let result = advance(scalars, grid, s_max, opts, t_end);
    if scalars.dt.abs() > previous_dt.abs() {
        scalars.dt = previous_dt.abs().copysign(scalars.dt);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_cell_state(eta: f64, qx: f64, qy: f64) -> CellState {
        CellState {
            eta: vec![eta],
            eta_max: vec![eta],
            qx: vec![qx],
            qy: vec![qy],
        }
    }

    #[test]
    fn dry_cell_has_zero_wave_speed() {
        let bed = Bed::flat(1, 0.0);
        let state = single_cell_state(0.0, 0.0, 0.0);
        let opts = TimestepOptions::default();
        assert_eq!(max_wave_speed(&state, &bed, &opts), 0.0);
    }

    #[test]
    fn disabled_cell_is_excluded_from_reduction() {
        let bed = Bed::flat(1, 0.0);
        let mut state = single_cell_state(5.0, 0.0, 0.0);
        state.eta_max[0] = -10000.0;
        let opts = TimestepOptions::default();
        assert_eq!(max_wave_speed(&state, &bed, &opts), 0.0);
    }

    #[test]
    fn scenario_six_cfl_reduction_returns_tenth_second() {
        // s_max = 5, Δx = 1, C = 0.5 => Δt = 0.1 (§8 concrete scenario 6).
        let grid = Grid::new(1, 1, 1.0, 1.0).unwrap();
        let mut scalars = TimestepScalars::new(2000.0);
        scalars.t = 1000.0; // past both the startup kickstart and early-limit windows
        let opts = TimestepOptions::default();
        let state = advance(&mut scalars, &grid, 5.0, &opts, 2000.0);
        assert_eq!(state, BatchState::Run);
        assert!((scalars.dt - 0.1).abs() < 1e-12);
    }

    #[test]
    fn sync_point_clamps_dt_to_remaining_interval() {
        let grid = Grid::new(1, 1, 1.0, 1.0).unwrap();
        let mut scalars = TimestepScalars::new(1000.05);
        scalars.t = 1000.0;
        let opts = TimestepOptions::default();
        let state = advance(&mut scalars, &grid, 5.0, &opts, 2000.0);
        assert_eq!(state, BatchState::Run);
        assert!((scalars.dt - 0.05).abs() < 1e-12);
    }

    #[test]
    fn reaching_simulation_end_is_reported_idle() {
        // t_sync left far away so the sync clamp doesn't fire; the
        // t_end - t clamp reaching zero is what should flip to Idle.
        let grid = Grid::new(1, 1, 1.0, 1.0).unwrap();
        let mut scalars = TimestepScalars::new(2000.0);
        scalars.t = 1000.0;
        let opts = TimestepOptions::default();
        let state = advance(&mut scalars, &grid, 5.0, &opts, 1000.0);
        assert_eq!(state, BatchState::Idle);
        assert_eq!(scalars.dt, 0.0);
    }
}
