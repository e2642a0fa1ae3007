//! Physical parameters consumed by the kernels

/// Physical and geometric parameters for one simulation configuration.
///
/// The engine treats this as an opaque value: it is replaced as a whole and
/// copied into every kernel invocation, never patched in place. Ranges are
/// not validated here; see [`crate::config::ui_ranges`] for the values a host
/// usually offers.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SimParams {
    /// BGK relaxation time
    pub tau: f32,
    /// Free-stream Mach number
    pub ma: f32,
    /// Obstacle angle of attack, in degrees
    pub aoa_deg: f32,
    /// Obstacle chord as a fraction of the domain width
    pub chord_ratio: f32,
    /// Upper bound on the free-stream lattice speed
    pub speed_max: f32,
}

impl SimParams {
    pub fn new(tau: f32, ma: f32, aoa_deg: f32, chord_ratio: f32, speed_max: f32) -> Self {
        Self {
            tau,
            ma,
            aoa_deg,
            chord_ratio,
            speed_max,
        }
    }

    /// Free-stream speed in lattice units: `ma * cs`, capped at `speed_max`.
    pub fn inlet_speed(&self) -> f32 {
        (self.ma * super::d2q9::CS).min(self.speed_max)
    }
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            tau: 0.6,
            ma: 0.09,
            aoa_deg: 5.0,
            chord_ratio: 0.3,
            speed_max: 0.15,
        }
    }
}
