//! Immutable structured-Cartesian grid geometry.

use crate::error::{DomainError, DomainResult};

/// Compass direction of an interface relative to a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Whether this direction's free-surface reference for reconstruction
    /// (§4.1 step 2) is the left (`true`) or right (`false`) cell.
    pub(crate) fn reference_is_left(self) -> bool {
        matches!(self, Direction::North | Direction::East)
    }
}

/// Row-major 2-D Cartesian grid: immutable after construction.
#[derive(Debug, Clone)]
pub struct Grid {
    columns: usize,
    rows: usize,
    dx: f64,
    dy: f64,
    inv_dx: f64,
    inv_dy: f64,
}

impl Grid {
    pub fn new(columns: usize, rows: usize, dx: f64, dy: f64) -> DomainResult<Self> {
        if columns == 0 || rows == 0 {
            return Err(DomainError::EmptyGrid { columns, rows });
        }
        if !(dx.is_finite() && dy.is_finite()) || dx <= 0.0 || dy <= 0.0 {
            return Err(DomainError::InvalidSpacing { dx, dy });
        }
        Ok(Grid {
            columns,
            rows,
            dx,
            dy,
            inv_dx: 1.0 / dx,
            inv_dy: 1.0 / dy,
        })
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn dx(&self) -> f64 {
        self.dx
    }

    pub fn dy(&self) -> f64 {
        self.dy
    }

    pub fn inv_dx(&self) -> f64 {
        self.inv_dx
    }

    pub fn inv_dy(&self) -> f64 {
        self.inv_dy
    }

    /// Total cell count `N = C·R`.
    pub fn len(&self) -> usize {
        self.columns * self.rows
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns `true` iff `dx == dy`, required by the simplified-inertial
    /// scheme (open question, §9 of SPEC_FULL.md).
    pub fn is_square(&self) -> bool {
        (self.dx - self.dy).abs() <= f64::EPSILON * self.dx.max(self.dy)
    }

    /// Linear index `id(i,j) = j·C + i`.
    #[inline]
    pub fn id(&self, i: usize, j: usize) -> usize {
        j * self.columns + i
    }

    /// Column/row of a linear index; inverse of [`Grid::id`].
    #[inline]
    pub fn coords(&self, id: usize) -> (usize, usize) {
        (id % self.columns, id / self.columns)
    }

    pub fn contains(&self, i: usize, j: usize) -> bool {
        i < self.columns && j < self.rows
    }

    pub fn check_bounds(&self, i: usize, j: usize) -> DomainResult<()> {
        if self.contains(i, j) {
            Ok(())
        } else {
            Err(DomainError::CellOutOfBounds {
                i,
                j,
                columns: self.columns,
                rows: self.rows,
            })
        }
    }

    /// Neighbour index in direction `d`, clamped to the perimeter ring when
    /// out of bounds (out-of-bounds neighbours are treated as the boundary
    /// cell itself and are not updated by scheme kernels).
    #[inline]
    pub fn neighbour(&self, i: usize, j: usize, d: Direction) -> usize {
        let (ni, nj) = match d {
            Direction::North => (i, j.wrapping_sub(1)),
            Direction::South => (i, j + 1),
            Direction::East => (i + 1, j),
            Direction::West => (i.wrapping_sub(1), j),
        };
        let ni = if ni >= self.columns || (d == Direction::West && i == 0) {
            i
        } else {
            ni
        };
        let nj = if nj >= self.rows || (d == Direction::North && j == 0) {
            j
        } else {
            nj
        };
        self.id(ni, nj)
    }

    /// `true` for cells on the outermost ring of the grid — these are the
    /// boundary cells the scheme kernel does not update in place.
    pub fn is_perimeter(&self, i: usize, j: usize) -> bool {
        i == 0 || j == 0 || i + 1 == self.columns || j + 1 == self.rows
    }
}
