//! Cell-list timeseries boundary (`bdy_Cell`, §4.7).

use crate::cellstate::{clamp_eta, depth, Bed, CellState};
use crate::constants::G;
use crate::error::{DomainError, DomainResult};
use crate::grid::Grid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthMode {
    Ignore,
    FreeSurfaceLevel,
    Depth,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DischargeMode {
    Ignore,
    Discharge,
    Velocity,
    Volume,
}

/// One entry of a cell boundary's time series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeseriesEntry {
    pub t: f64,
    pub depth_value: f64,
    pub qx: f64,
    pub qy: f64,
}

#[derive(Debug, Clone)]
pub struct CellBoundary {
    pub cell_ids: Vec<usize>,
    pub depth_mode: DepthMode,
    pub discharge_mode: DischargeMode,
    series: Vec<TimeseriesEntry>,
}

impl CellBoundary {
    pub fn new(
        cell_ids: Vec<usize>,
        depth_mode: DepthMode,
        discharge_mode: DischargeMode,
        series: Vec<TimeseriesEntry>,
    ) -> DomainResult<Self> {
        if series.is_empty() {
            return Err(DomainError::EmptyTimeseries);
        }
        Ok(CellBoundary {
            cell_ids,
            depth_mode,
            discharge_mode,
            series,
        })
    }

    /// Linearly interpolates the time series at `t`, clamping to the first
    /// or last entry outside its range.
    fn sample(&self, t: f64) -> TimeseriesEntry {
        let last = self.series.len() - 1;
        if t <= self.series[0].t {
            return self.series[0];
        }
        if t >= self.series[last].t {
            return self.series[last];
        }
        let idx = self.series.partition_point(|e| e.t <= t).saturating_sub(1).min(last.saturating_sub(1));
        let a = self.series[idx];
        let b = self.series[idx + 1];
        let span = b.t - a.t;
        let frac = if span > 0.0 { (t - a.t) / span } else { 0.0 };
        TimeseriesEntry {
            t,
            depth_value: a.depth_value + frac * (b.depth_value - a.depth_value),
            qx: a.qx + frac * (b.qx - a.qx),
            qy: a.qy + frac * (b.qy - a.qy),
        }
    }

    pub fn apply(&self, grid: &Grid, state: &mut CellState, bed: &Bed, t: f64, dt: f64) {
        let entry = self.sample(t);
        for &id in &self.cell_ids {
            if state.cell(id).is_disabled() {
                continue;
            }
            let z_b = bed.z[id];

            match self.depth_mode {
                DepthMode::Ignore => {}
                DepthMode::FreeSurfaceLevel => state.eta[id] = entry.depth_value,
                DepthMode::Depth => state.eta[id] = z_b + entry.depth_value,
                DepthMode::Critical => {
                    let q = (entry.qx * entry.qx + entry.qy * entry.qy).sqrt();
                    let h_c = (q * q / G).cbrt();
                    let h = depth(state.eta[id], z_b);
                    if h < h_c {
                        state.eta[id] = z_b + h_c;
                    }
                }
            }

            match self.discharge_mode {
                DischargeMode::Ignore => {}
                DischargeMode::Volume => {
                    // Distributed without imposing direction: always adds.
                    let q_mag = (entry.qx * entry.qx + entry.qy * entry.qy).sqrt();
                    let depth_change = q_mag * dt / (grid.dx() * grid.dy());
                    state.eta[id] += depth_change;
                }
                DischargeMode::Discharge | DischargeMode::Velocity => {
                    let h = depth(state.eta[id], z_b);
                    let (qx, qy) = if self.discharge_mode == DischargeMode::Velocity {
                        (entry.qx * h, entry.qy * h)
                    } else {
                        (entry.qx, entry.qy)
                    };
                    let depth_change = qx.abs() * dt / grid.dy() + qy.abs() * dt / grid.dx();
                    state.eta[id] += depth_change;
                    state.qx[id] = qx;
                    state.qy[id] = qy;

                    let q_total = (qx * qx + qy * qy).sqrt();
                    let h_c = (q_total * q_total / G).cbrt();
                    let h_after = depth(state.eta[id], z_b);
                    if h_after < h_c {
                        state.eta[id] = z_b + h_c;
                    }
                }
            }

            state.eta[id] = clamp_eta(state.eta[id], z_b);
        }
    }
}
