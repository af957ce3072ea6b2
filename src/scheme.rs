//! Scheme kernels (§4.3, §4.4): per-cell finite-volume state update.
//!
//! Each call to [`step`] is one whole-grid kernel dispatch: it reads `src`
//! and returns a freshly allocated `CellState` the caller installs as the
//! new source after swapping ping-pong buffers (`host::Domain` owns the
//! swap). Writing a fresh `Vec` per step gives the same non-aliasing
//! guarantee the original gets from separate device src/dst buffers,
//! without any unsafe aliasing tricks.

use rayon::prelude::*;

use crate::cellstate::{clamp_eta, depth, Bed, Cell, CellState, Manning};
use crate::constants::{FR_MAX, G, VERY_SMALL};
use crate::error::{DomainError, DomainResult};
use crate::friction::apply_friction;
use crate::grid::{Direction, Grid};
use crate::reconstruct::{reconstruct, RawSide};
use crate::riemann::{hllc_flux, Flux};

/// Selects which finite-volume scheme [`step`] runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemeKind {
    /// Godunov first-order upwind scheme with HLLC fluxes (§4.3).
    GodunovFirstOrder,
    /// Same numerics as `GodunovFirstOrder`. On the original GPU target this
    /// variant stages a workgroup's neighbourhood into shared memory before
    /// computing; the CPU rewrite has no shared-memory tier to exploit, so
    /// it is kept only as a distinct, selectable tag (§9) and produces
    /// identical output to `GodunovFirstOrder`.
    GodunovCached,
    /// Simplified-inertial scheme (§4.4). Requires square cells.
    SimplifiedInertial,
}

impl SchemeKind {
    pub fn requires_square_cells(self) -> bool {
        matches!(self, SchemeKind::SimplifiedInertial)
    }
}

/// Runs one scheme step over the whole grid, returning the next `CellState`.
pub fn step(
    grid: &Grid,
    src: &CellState,
    bed: &Bed,
    manning: &Manning,
    dt: f64,
    kind: SchemeKind,
    friction_in_kernel: bool,
) -> DomainResult<CellState> {
    let n = grid.len();
    src.check_len(n)?;
    if bed.z.len() != n {
        return Err(DomainError::LengthMismatch {
            expected: n,
            actual: bed.z.len(),
        });
    }
    if manning.n.len() != n {
        return Err(DomainError::LengthMismatch {
            expected: n,
            actual: manning.n.len(),
        });
    }
    if kind.requires_square_cells() && !grid.is_square() {
        return Err(DomainError::NonSquareCells {
            dx: grid.dx(),
            dy: grid.dy(),
        });
    }

    let updated: Vec<Cell> = (0..n)
        .into_par_iter()
        .map(|id| step_cell(grid, src, bed, manning, dt, kind, friction_in_kernel, id))
        .collect();

    let mut dst = CellState::new(n);
    for (id, cell) in updated.into_iter().enumerate() {
        dst.set_cell(id, cell);
    }
    Ok(dst)
}

fn step_cell(
    grid: &Grid,
    src: &CellState,
    bed: &Bed,
    manning: &Manning,
    dt: f64,
    kind: SchemeKind,
    friction_in_kernel: bool,
    id: usize,
) -> Cell {
    let (i, j) = grid.coords(id);
    let cell = src.cell(id);

    if cell.is_disabled() || grid.is_perimeter(i, j) {
        return cell;
    }

    let z_self = bed.z[id];
    let h_self = depth(cell.eta, z_self);

    let neighbour_ids = Direction::ALL.map(|d| grid.neighbour(i, j, d));
    let all_dry = h_self < VERY_SMALL
        && neighbour_ids
            .iter()
            .all(|&nb| depth(src.cell(nb).eta, bed.z[nb]) < VERY_SMALL);
    if all_dry {
        return cell;
    }

    match kind {
        SchemeKind::GodunovFirstOrder | SchemeKind::GodunovCached => {
            godunov_cell(grid, src, bed, manning, dt, friction_in_kernel, i, j, id, cell, z_self)
        }
        SchemeKind::SimplifiedInertial => {
            simplified_inertial_cell(grid, src, bed, manning, i, j, id, z_self, cell, dt)
        }
    }
}

/// One interface's contribution: the numerical flux, the stopping count,
/// and the reconstructed `(η, z_b)` on this cell's own side — the latter
/// pair is what the well-balanced source term (§4.3 step 3) needs.
struct Face {
    flux: Flux,
    stop: u32,
    self_eta: f64,
    z_star: f64,
}

fn face(direction: Direction, self_cell: Cell, z_self: f64, nb_cell: Cell, z_nb: f64) -> Face {
    let self_raw = RawSide {
        eta: self_cell.eta,
        z_b: z_self,
        qx: self_cell.qx,
        qy: self_cell.qy,
    };
    let nb_raw = RawSide {
        eta: nb_cell.eta,
        z_b: z_nb,
        qx: nb_cell.qx,
        qy: nb_cell.qy,
    };

    let self_is_left = direction.reference_is_left();
    let (left, right) = if self_is_left {
        (self_raw, nb_raw)
    } else {
        (nb_raw, self_raw)
    };

    let result = reconstruct(direction, left, right);
    let flux = hllc_flux(direction, &result.left, &result.right);
    let self_side = if self_is_left { result.left } else { result.right };

    Face {
        flux,
        stop: result.stop,
        self_eta: self_side.eta,
        z_star: self_side.z_b,
    }
}

#[allow(clippy::too_many_arguments)]
fn godunov_cell(
    grid: &Grid,
    src: &CellState,
    bed: &Bed,
    manning: &Manning,
    dt: f64,
    friction_in_kernel: bool,
    i: usize,
    j: usize,
    id: usize,
    cell: Cell,
    z_self: f64,
) -> Cell {
    let north_id = grid.neighbour(i, j, Direction::North);
    let east_id = grid.neighbour(i, j, Direction::East);
    let south_id = grid.neighbour(i, j, Direction::South);
    let west_id = grid.neighbour(i, j, Direction::West);

    let north = face(Direction::North, cell, z_self, src.cell(north_id), bed.z[north_id]);
    let east = face(Direction::East, cell, z_self, src.cell(east_id), bed.z[east_id]);
    let south = face(Direction::South, cell, z_self, src.cell(south_id), bed.z[south_id]);
    let west = face(Direction::West, cell, z_self, src.cell(west_id), bed.z[west_id]);

    let stop = north.stop + east.stop + south.stop + west.stop;

    // Well-balanced bed-slope source, built from each axis's two
    // post-reconstruction (η, z_b) pairs — see riemann::physical_flux for
    // why the flux itself carries no bed term.
    let eta_bar_ew = 0.5 * (east.self_eta + west.self_eta);
    let z_bar_ew = 0.5 * (east.z_star + west.z_star);
    let source_x = -G * (eta_bar_ew - z_bar_ew) * (east.z_star - west.z_star) * grid.inv_dx();

    let eta_bar_ns = 0.5 * (north.self_eta + south.self_eta);
    let z_bar_ns = 0.5 * (north.z_star + south.z_star);
    let source_y = -G * (eta_bar_ns - z_bar_ns) * (north.z_star - south.z_star) * grid.inv_dy();

    let mut d_eta = (east.flux.eta - west.flux.eta) * grid.inv_dx() + (north.flux.eta - south.flux.eta) * grid.inv_dy();
    let mut d_qx = (east.flux.qx - west.flux.qx) * grid.inv_dx() + (north.flux.qx - south.flux.qx) * grid.inv_dy() - source_x;
    let mut d_qy = (east.flux.qy - west.flux.qy) * grid.inv_dx() + (north.flux.qy - south.flux.qy) * grid.inv_dy() - source_y;

    if d_eta.abs() < VERY_SMALL {
        d_eta = 0.0;
    }
    if d_qx.abs() < VERY_SMALL {
        d_qx = 0.0;
    }
    if d_qy.abs() < VERY_SMALL {
        d_qy = 0.0;
    }

    let mut qx = cell.qx;
    let mut qy = cell.qy;
    if stop > 0 {
        qx = 0.0;
        qy = 0.0;
    }

    let mut eta = cell.eta - dt * d_eta;
    qx -= dt * d_qx;
    qy -= dt * d_qy;

    let h = depth(eta, z_self);
    if friction_in_kernel && h >= VERY_SMALL {
        let (fx, fy) = apply_friction(qx, qy, h, manning.n[id], dt);
        qx = fx;
        qy = fy;
    }

    eta = clamp_eta(eta, z_self);
    let eta_max = cell.eta_max.max(eta);

    Cell { eta, eta_max, qx, qy }
}

/// One face's discharge under the simplified-inertial formula (§4.4).
fn inertial_face(self_cell: Cell, z_self: f64, nb_cell: Cell, z_nb: f64, q_prev: f64, spacing: f64, n: f64, dt: f64) -> f64 {
    let h = (self_cell.eta.max(nb_cell.eta) - z_self.max(z_nb)).max(0.0);
    if h < VERY_SMALL {
        return 0.0;
    }

    let slope = (nb_cell.eta - self_cell.eta) / spacing;
    let denom = 1.0 + G * h * dt * n * n * q_prev.abs() / h.powf(10.0 / 3.0);
    let mut q_new = (q_prev - G * h * dt * slope) / denom;

    let cap = FR_MAX * h * (G * h).sqrt();
    q_new = q_new.clamp(-cap, cap);

    // Reverse-flow crossing zero is arrested rather than allowed to flip.
    if q_prev != 0.0 && q_new.signum() != q_prev.signum() {
        q_new = 0.0;
    }
    q_new
}

#[allow(clippy::too_many_arguments)]
fn simplified_inertial_cell(
    grid: &Grid,
    src: &CellState,
    bed: &Bed,
    manning: &Manning,
    i: usize,
    j: usize,
    id: usize,
    z_self: f64,
    cell: Cell,
    dt: f64,
) -> Cell {
    let east_id = grid.neighbour(i, j, Direction::East);
    let west_id = grid.neighbour(i, j, Direction::West);
    let north_id = grid.neighbour(i, j, Direction::North);
    let south_id = grid.neighbour(i, j, Direction::South);

    let east = src.cell(east_id);
    let west = src.cell(west_id);
    let north = src.cell(north_id);
    let south = src.cell(south_id);
    let n = manning.n[id];

    // Square cells enforced at scheme-selection time (see `step`), so Δx
    // doubles as the spacing for both axes, matching §4.4's Δy-only
    // continuity update.
    let spacing = grid.dx();

    let q_e = inertial_face(cell, z_self, east, bed.z[east_id], cell.qx, spacing, n, dt);
    let q_n = inertial_face(cell, z_self, north, bed.z[north_id], cell.qy, spacing, n, dt);
    let q_w = west.qx;
    let q_s = south.qy;

    let d_eta = dt * (q_e - q_w + q_n - q_s) * grid.inv_dy();
    let eta = clamp_eta(cell.eta + d_eta, z_self);
    let eta_max = cell.eta_max.max(eta);

    Cell {
        eta,
        eta_max,
        qx: q_e,
        qy: q_n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn flat_grid(n: usize) -> (Grid, Bed, Manning) {
        let grid = Grid::new(n, n, 1.0, 1.0).unwrap();
        let bed = Bed::flat(grid.len(), 0.0);
        let manning = Manning::uniform(grid.len(), 0.03).unwrap();
        (grid, bed, manning)
    }

    #[test]
    fn flat_still_water_stays_at_rest() {
        let (grid, bed, manning) = flat_grid(4);
        let state = CellState {
            eta: vec![1.0; grid.len()],
            eta_max: vec![1.0; grid.len()],
            qx: vec![0.0; grid.len()],
            qy: vec![0.0; grid.len()],
        };
        let next = step(&grid, &state, &bed, &manning, 0.01, SchemeKind::GodunovFirstOrder, false).unwrap();
        for id in 0..grid.len() {
            assert!((next.eta[id] - 1.0).abs() < 1e-9, "id {id}");
            assert!(next.qx[id].abs() < 1e-9);
            assert!(next.qy[id].abs() < 1e-9);
        }
    }

    #[test]
    fn lake_at_rest_over_uneven_bed_stays_at_rest() {
        let grid = Grid::new(4, 4, 1.0, 1.0).unwrap();
        let n = grid.len();
        let manning = Manning::uniform(n, 0.0).unwrap();
        let mut z = vec![0.0; n];
        for (id, zb) in z.iter_mut().enumerate() {
            let (i, j) = grid.coords(id);
            *zb = 0.1 * ((i + j) as f64);
        }
        let bed = Bed::new(z);
        let state = CellState {
            eta: vec![5.0; n],
            eta_max: vec![5.0; n],
            qx: vec![0.0; n],
            qy: vec![0.0; n],
        };
        let next = step(&grid, &state, &bed, &manning, 0.01, SchemeKind::GodunovFirstOrder, false).unwrap();
        for id in 0..n {
            assert!((next.eta[id] - 5.0).abs() < 1e-9, "id {id} eta {}", next.eta[id]);
            assert!(next.qx[id].abs() < 1e-9, "id {id} qx {}", next.qx[id]);
            assert!(next.qy[id].abs() < 1e-9, "id {id} qy {}", next.qy[id]);
        }
    }

    #[test]
    fn perimeter_cells_are_copied_through_unchanged() {
        let (grid, bed, manning) = flat_grid(4);
        let mut eta = vec![1.0; grid.len()];
        eta[grid.id(1, 1)] = 2.0; // perturb one interior cell
        let state = CellState {
            eta,
            eta_max: vec![2.0; grid.len()],
            qx: vec![0.0; grid.len()],
            qy: vec![0.0; grid.len()],
        };
        let next = step(&grid, &state, &bed, &manning, 0.01, SchemeKind::GodunovFirstOrder, false).unwrap();
        for j in 0..4 {
            for i in 0..4 {
                if grid.is_perimeter(i, j) {
                    let id = grid.id(i, j);
                    assert_eq!(next.eta[id], state.eta[id]);
                }
            }
        }
    }

    #[test]
    fn disabled_cell_survives_unchanged() {
        let (grid, bed, manning) = flat_grid(4);
        let mut eta_max = vec![1.0; grid.len()];
        let id = grid.id(1, 1);
        eta_max[id] = -10000.0;
        let state = CellState {
            eta: vec![1.0; grid.len()],
            eta_max,
            qx: vec![0.7; grid.len()],
            qy: vec![0.3; grid.len()],
        };
        let next = step(&grid, &state, &bed, &manning, 0.01, SchemeKind::GodunovFirstOrder, false).unwrap();
        assert_eq!(next.cell(id), state.cell(id));
    }

    #[test]
    fn simplified_inertial_rejects_non_square_cells() {
        let grid = Grid::new(4, 4, 1.0, 2.0).unwrap();
        let bed = Bed::flat(grid.len(), 0.0);
        let manning = Manning::uniform(grid.len(), 0.03).unwrap();
        let state = CellState::new(grid.len());
        let result = step(&grid, &state, &bed, &manning, 0.01, SchemeKind::SimplifiedInertial, false);
        assert!(matches!(result, Err(DomainError::NonSquareCells { .. })));
    }
}
