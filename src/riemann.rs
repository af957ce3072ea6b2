//! HLLC approximate Riemann solver (§4.2), operating on reconstructed
//! interface states from [`crate::reconstruct`].

use crate::constants::{G, VERY_SMALL};
use crate::grid::Direction;
use crate::reconstruct::ReconstructedSide;

/// Numerical flux across one interface: `(F_η, F_qx, F_qy)`.
///
/// The fourth component mentioned in the spec (`F_η_max`, always zero) is
/// omitted here since `η_max` is never updated from flux.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Flux {
    pub eta: f64,
    pub qx: f64,
    pub qy: f64,
}

/// Physical flux of the normal component, expressed in (normal, tangential)
/// momentum rather than (x, y) — converted back to (qx, qy) by the caller
/// via `direction`.
struct NormalFlux {
    mass: f64,
    normal_mom: f64,
    tangential_mom: f64,
}

#[inline]
fn to_xy(direction: Direction, normal: f64, tangential: f64) -> (f64, f64) {
    match direction {
        Direction::North | Direction::South => (tangential, normal),
        Direction::East | Direction::West => (normal, tangential),
    }
}

#[inline]
fn normal_tangential(direction: Direction, u: f64, v: f64) -> (f64, f64) {
    match direction {
        Direction::North | Direction::South => (v, u),
        Direction::East | Direction::West => (u, v),
    }
}

/// Physical flux at one reconstructed side. The hydrostatic pressure term
/// is the plain `0.5·g·h²` (no bed correction here); well-balancing against
/// a varying bed is the scheme kernel's job (§4.3 step 3), using the
/// reconstructed `z_b`/`η` this function's caller reads off each side.
fn physical_flux(direction: Direction, side: &ReconstructedSide) -> NormalFlux {
    let (u_n, u_t) = normal_tangential(direction, side.u, side.v);
    let q_n = side.h * u_n;
    let q_t = side.h * u_t;
    let pressure = 0.5 * G * side.h * side.h;
    NormalFlux {
        mass: q_n,
        normal_mom: q_n * u_n + pressure,
        tangential_mom: q_t * u_n,
    }
}

fn flux_from_normal(direction: Direction, f: NormalFlux) -> Flux {
    let (qx, qy) = to_xy(direction, f.normal_mom, f.tangential_mom);
    Flux {
        eta: f.mass,
        qx,
        qy,
    }
}

/// HLLC numerical flux across one interface.
pub fn hllc_flux(direction: Direction, left: &ReconstructedSide, right: &ReconstructedSide) -> Flux {
    let h_l = left.h;
    let h_r = right.h;
    let (u_l, _t_l) = normal_tangential(direction, left.u, left.v);
    let (u_r, _t_r) = normal_tangential(direction, right.u, right.v);

    if h_l < VERY_SMALL && h_r < VERY_SMALL {
        // Both dry: zero depth means zero hydrostatic pressure and no
        // advective component.
        return Flux::default();
    }

    let a_l = (G * h_l.max(0.0)).sqrt();
    let a_r = (G * h_r.max(0.0)).sqrt();
    let a_bar = 0.5 * (a_l + a_r);

    let left_dry = h_l < VERY_SMALL;
    let right_dry = h_r < VERY_SMALL;

    let h_star = ((a_bar + 0.25 * (u_l - u_r)).powi(2)) / G;
    let u_star = 0.5 * (u_l + u_r) + a_l - a_r;
    let a_star = (G * h_star.max(0.0)).sqrt();

    let s_l = if left_dry {
        u_r - 2.0 * a_r
    } else {
        (u_l - a_l).min(u_star - a_star)
    };
    let s_r = if right_dry {
        u_l + 2.0 * a_l
    } else {
        (u_r + a_r).max(u_star + a_star)
    };

    let f_l = physical_flux(direction, left);
    let f_r = physical_flux(direction, right);

    if s_l >= 0.0 {
        return flux_from_normal(direction, f_l);
    }
    if s_r <= 0.0 {
        return flux_from_normal(direction, f_r);
    }

    let denom_sm = h_r * (u_r - s_r) - h_l * (u_l - s_l);
    let s_m = if denom_sm.abs() < VERY_SMALL {
        0.5 * (u_l + u_r)
    } else {
        (s_l * h_r * (u_r - s_r) - s_r * h_l * (u_l - s_l)) / denom_sm
    };

    let s_diff = s_r - s_l;
    let mass = if s_diff.abs() < VERY_SMALL {
        0.5 * (f_l.mass + f_r.mass)
    } else {
        (s_r * f_l.mass - s_l * f_r.mass + s_l * s_r * (h_r - h_l)) / s_diff
    };
    let normal_mom = if s_diff.abs() < VERY_SMALL {
        0.5 * (f_l.normal_mom + f_r.normal_mom)
    } else {
        (s_r * f_l.normal_mom - s_l * f_r.normal_mom + s_l * s_r * (h_r * u_r - h_l * u_l)) / s_diff
    };

    // Transverse momentum uses the tangential velocity of whichever side the
    // contact wave (s_m) puts us on.
    let tangential_mom = if s_m >= 0.0 {
        mass * normal_tangential(direction, left.u, left.v).1
    } else {
        mass * normal_tangential(direction, right.u, right.v).1
    };

    flux_from_normal(
        direction,
        NormalFlux {
            mass,
            normal_mom,
            tangential_mom,
        },
    )
}

impl std::ops::Sub for Flux {
    type Output = Flux;
    fn sub(self, rhs: Flux) -> Flux {
        Flux {
            eta: self.eta - rhs.eta,
            qx: self.qx - rhs.qx,
            qy: self.qy - rhs.qy,
        }
    }
}

impl std::ops::Add for Flux {
    type Output = Flux;
    fn add(self, rhs: Flux) -> Flux {
        Flux {
            eta: self.eta + rhs.eta,
            qx: self.qx + rhs.qx,
            qy: self.qy + rhs.qy,
        }
    }
}

impl std::ops::Mul<f64> for Flux {
    type Output = Flux;
    fn mul(self, rhs: f64) -> Flux {
        Flux {
            eta: self.eta * rhs,
            qx: self.qx * rhs,
            qy: self.qy * rhs,
        }
    }
}
