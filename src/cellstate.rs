//! The primary mutable cell-state field and its static companions.

use serde::{Deserialize, Serialize};

use crate::constants::{NODATA, VERY_SMALL};
use crate::error::{DomainError, DomainResult};

/// Per-cell mutable state: free-surface level, running max level, and
/// unit-width discharges.
///
/// Stored structure-of-arrays (one `Vec<f64>` per field) rather than the
/// original's 32-byte-aligned array-of-structs tuple: this keeps each
/// rayon-parallelised kernel's working set to the fields it actually reads,
/// and lets slices be split per chunk without re-packing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellState {
    pub eta: Vec<f64>,
    pub eta_max: Vec<f64>,
    pub qx: Vec<f64>,
    pub qy: Vec<f64>,
}

impl CellState {
    /// A freshly allocated, fully enabled state: every cell at `η = η_max =
    /// 0, q = 0`. Masking cells out (NODATA) is the caller's job, done by
    /// writing `-9999` to the relevant entries after construction.
    pub fn new(n: usize) -> Self {
        CellState {
            eta: vec![0.0; n],
            eta_max: vec![0.0; n],
            qx: vec![0.0; n],
            qy: vec![0.0; n],
        }
    }

    pub fn len(&self) -> usize {
        self.eta.len()
    }

    pub fn is_empty(&self) -> bool {
        self.eta.is_empty()
    }

    pub fn check_len(&self, expected: usize) -> DomainResult<()> {
        let actual = self.eta.len();
        if actual != expected
            || self.eta_max.len() != expected
            || self.qx.len() != expected
            || self.qy.len() != expected
        {
            return Err(DomainError::LengthMismatch { expected, actual });
        }
        Ok(())
    }

    /// A single cell's state, used as the unit of exchange between kernels
    /// and the per-cell physics modules (reconstruction, friction, ...).
    #[inline]
    pub fn cell(&self, id: usize) -> Cell {
        Cell {
            eta: self.eta[id],
            eta_max: self.eta_max[id],
            qx: self.qx[id],
            qy: self.qy[id],
        }
    }

    #[inline]
    pub fn set_cell(&mut self, id: usize, cell: Cell) {
        self.eta[id] = cell.eta;
        self.eta_max[id] = cell.eta_max;
        self.qx[id] = cell.qx;
        self.qy[id] = cell.qy;
    }
}

/// Single-cell snapshot of [`CellState`], the unit kernels operate on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub eta: f64,
    pub eta_max: f64,
    pub qx: f64,
    pub qy: f64,
}

impl Cell {
    /// A cell is disabled (masked out) iff `η_max ≤ −9999` or `η = −9999`.
    #[inline]
    pub fn is_disabled(&self) -> bool {
        self.eta_max <= NODATA || self.eta == NODATA
    }
}

/// Static bed elevation field, immutable after initialisation.
/// `z_b ≤ −9999` marks NODATA.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bed {
    pub z: Vec<f64>,
}

impl Bed {
    pub fn new(z: Vec<f64>) -> Self {
        Bed { z }
    }

    pub fn flat(n: usize, elevation: f64) -> Self {
        Bed {
            z: vec![elevation; n],
        }
    }

    #[inline]
    pub fn is_nodata(&self, id: usize) -> bool {
        self.z[id] <= NODATA
    }
}

/// Static Manning roughness field, immutable after initialisation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manning {
    pub n: Vec<f64>,
}

impl Manning {
    pub fn new(n: Vec<f64>) -> DomainResult<Self> {
        if let Some(&bad) = n.iter().find(|v| !v.is_finite() || **v < 0.0) {
            return Err(DomainError::InvalidRoughness { value: bad });
        }
        Ok(Manning { n })
    }

    pub fn uniform(count: usize, value: f64) -> DomainResult<Self> {
        Self::new(vec![value; count])
    }
}

/// Depth at a cell, `h = η − z_b`; zero (not negative) below the bed.
#[inline]
pub fn depth(eta: f64, z_b: f64) -> f64 {
    (eta - z_b).max(0.0)
}

/// Velocity component `u = q/h`, zero when the cell is effectively dry.
#[inline]
pub fn velocity(q: f64, h: f64) -> f64 {
    if h < VERY_SMALL {
        0.0
    } else {
        q / h
    }
}

/// Clamp `η` to never fall below the bed (within `VERY_SMALL`).
#[inline]
pub fn clamp_eta(eta: f64, z_b: f64) -> f64 {
    if eta - z_b < VERY_SMALL {
        z_b
    } else {
        eta
    }
}
