//! Physical and numerical constants shared across kernels.

/// Gravitational acceleration \[m/s²\].
pub const G: f64 = 9.80665;

/// Smallest depth/discharge magnitude treated as non-zero.
///
/// Below this, velocities are zeroed instead of divided, and cells are
/// treated as dry.
pub const VERY_SMALL: f64 = 1e-14;

/// Sentinel bed elevation / free-surface level marking a disabled (masked
/// out, NODATA) cell.
pub const NODATA: f64 = -9999.0;

/// Default Froude-number cap for the simplified-inertial scheme.
pub const FR_MAX: f64 = 0.8;

/// Default Courant number used by the CFL timestep controller.
pub const COURANT_DEFAULT: f64 = 0.5;

/// Hydrological sub-timestep period \[s\].
pub const T_HYDRO: f64 = 0.25;

/// Duration \[s\] over which `Δt` is capped by [`T_EARLY_LIMIT`].
pub const T_EARLY_DUR: f64 = 60.0;

/// Timestep cap \[s\] enforced during the first [`T_EARLY_DUR`] seconds.
pub const T_EARLY_LIMIT: f64 = 0.1;

/// Minimum timestep \[s\] once `Δt` is positive.
pub const DT_MIN: f64 = 1e-10;

/// Maximum timestep \[s\] ever returned by the controller.
pub const DT_MAX: f64 = 15.0;

/// Minimum `Δt` enforced during the startup kickstart window.
pub const DT_START_MIN: f64 = 1e-10;

/// Duration \[s\] of the startup kickstart window.
pub const T_START_DUR: f64 = 1.0;

/// MINBEE/MINMOD limiter slope parameter (`β`).
pub const MINBEE_BETA: f64 = 1.0;

/// Kinematic viscosity of water \[m²/s\], used by the pipe Darcy-Weisbach solve.
pub const WATER_KINEMATIC_VISCOSITY: f64 = 1.0e-6;

/// Iteration cap for the simple-pipe Darcy-Weisbach fixed-point solve.
pub const PIPE_MAX_ITERATIONS: u32 = 5000;

/// Head-balance convergence tolerance \[m\] for the pipe solve.
pub const PIPE_TOLERANCE: f64 = 1e-4;
