//! Engine construction settings
//!
//! Everything the engine needs at construction time lives in [`EngineConfig`].
//! The defaults match the control panel a host typically starts with.

use crate::simulation::{mesh::Mesh, params::SimParams};

/// Construction parameters for a [`crate::simulation::SteppingEngine`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct EngineConfig {
    pub grid_resolution_x: u32,
    pub grid_resolution_y: u32,
    pub substeps: u32,
    pub tau: f32,
    pub ma: f32,
    pub aoa_deg: f32,
    pub chord_ratio: f32,
    pub speed_max: f32,
}

impl EngineConfig {
    pub fn new(grid_resolution_x: u32, grid_resolution_y: u32, substeps: u32, params: SimParams) -> Self {
        Self {
            grid_resolution_x,
            grid_resolution_y,
            substeps,
            tau: params.tau,
            ma: params.ma,
            aoa_deg: params.aoa_deg,
            chord_ratio: params.chord_ratio,
            speed_max: params.speed_max,
        }
    }

    /// Mesh with both axes clamped to at least one cell.
    pub fn mesh(&self) -> Mesh {
        Mesh::new(self.grid_resolution_x, self.grid_resolution_y)
    }

    pub fn params(&self) -> SimParams {
        SimParams::new(self.tau, self.ma, self.aoa_deg, self.chord_ratio, self.speed_max)
    }

    pub fn with_grid(mut self, nx: u32, ny: u32) -> Self {
        self.grid_resolution_x = nx;
        self.grid_resolution_y = ny;
        self
    }

    pub fn with_substeps(mut self, substeps: u32) -> Self {
        self.substeps = substeps;
        self
    }

    pub fn with_params(self, params: SimParams) -> Self {
        Self::new(self.grid_resolution_x, self.grid_resolution_y, self.substeps, params)
    }

    /// Snap every value onto the ranges a control panel offers.
    ///
    /// The engine itself only clamps dimensions and substeps to one; this is
    /// for hosts that want the UI conventions applied before construction.
    pub fn snapped_to_ui(self) -> Self {
        use ui_ranges::*;
        Self {
            grid_resolution_x: snap_grid(self.grid_resolution_x),
            grid_resolution_y: snap_grid(self.grid_resolution_y),
            substeps: self.substeps.clamp(*SUBSTEPS.start(), *SUBSTEPS.end()),
            tau: self.tau.clamp(*TAU.start(), *TAU.end()),
            ma: self.ma.clamp(*MA.start(), *MA.end()),
            aoa_deg: self.aoa_deg.clamp(*AOA_DEG.start(), *AOA_DEG.end()),
            chord_ratio: self.chord_ratio.clamp(*CHORD_RATIO.start(), *CHORD_RATIO.end()),
            speed_max: self.speed_max.clamp(*SPEED_MAX.start(), *SPEED_MAX.end()),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(256, 256, 1, SimParams::default())
    }
}

/// Slider ranges used by the reference control panel. Not enforced by the engine.
pub mod ui_ranges {
    use std::ops::RangeInclusive;

    pub const GRID: RangeInclusive<u32> = 32..=2024;
    pub const GRID_STEP: u32 = 32;
    pub const SUBSTEPS: RangeInclusive<u32> = 1..=100;
    pub const TAU: RangeInclusive<f32> = 0.50..=0.60;
    pub const MA: RangeInclusive<f32> = 0.001..=0.12;
    pub const AOA_DEG: RangeInclusive<f32> = -30.0..=30.0;
    pub const CHORD_RATIO: RangeInclusive<f32> = 0.1..=0.5;
    pub const SPEED_MAX: RangeInclusive<f32> = 0.02..=0.4;

    /// Round to the nearest slider stop, measured from the range start.
    pub fn snap_grid(value: u32) -> u32 {
        let (lo, hi) = (*GRID.start(), *GRID.end());
        let clamped = value.clamp(lo, hi);
        let steps = (clamped - lo + GRID_STEP / 2) / GRID_STEP;
        (lo + steps * GRID_STEP).min(hi)
    }
}
