//! Construction-time and API-misuse error surface.
//!
//! Per-step numerical degeneracies (dry cells, sync overshoot, pipe
//! non-convergence) are handled in-kernel per §7 of the design and never
//! produce a [`DomainError`]; this type covers the host-facing API layer
//! that the original left to external tooling (XML config loader, CLI
//! model builder).

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum DomainError {
    #[error("grid spacing must be positive and finite, got dx={dx}, dy={dy}")]
    InvalidSpacing { dx: f64, dy: f64 },

    #[error("grid must have at least one row and column, got columns={columns}, rows={rows}")]
    EmptyGrid { columns: usize, rows: usize },

    #[error(
        "non-square cells (dx={dx}, dy={dy}) are not supported by the simplified-inertial scheme"
    )]
    NonSquareCells { dx: f64, dy: f64 },

    #[error("array length mismatch: expected {expected} cells, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("cell index ({i}, {j}) is out of bounds for a {columns}x{rows} grid")]
    CellOutOfBounds {
        i: usize,
        j: usize,
        columns: usize,
        rows: usize,
    },

    #[error("boundary cell {id} is targeted by more than one cell-boundary relation")]
    DuplicateBoundaryCell { id: usize },

    #[error("timeseries must have at least one entry")]
    EmptyTimeseries,

    #[error("timeseries interval must be positive, got {interval}")]
    InvalidTimeseriesInterval { interval: f64 },

    #[error("manning roughness must be non-negative and finite, got {value}")]
    InvalidRoughness { value: f64 },

    #[error("pipe diameter must be positive and finite, got {value}")]
    InvalidPipeDiameter { value: f64 },

    #[error("pipe length must be positive and finite, got {value}")]
    InvalidPipeLength { value: f64 },

    #[error("gridded boundary resolution must be positive, got {value}")]
    InvalidGridResolution { value: f64 },
}

pub type DomainResult<T> = Result<T, DomainError>;
