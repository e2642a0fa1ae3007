//! D2Q9 lattice constants and the per-cell arithmetic shared by the kernels.
//!
//! Directions are numbered as
//! ```text
//!   6   2   5
//!    \  |  /
//!   3 - 0 - 1
//!    /  |  \
//!   7   4   8
//! ```
//! Distribution buffers are laid out direction-major: value `k` of cell `i`
//! lives at `k * cell_count + i`. The WGSL kernels in [`super::shaders`] use
//! the same numbering and layout.

use super::{mesh::Mesh, params::SimParams};

pub const RHO0: f32 = 1.0;
pub const CS2: f32 = 1.0 / 3.0;
pub const CS: f32 = 0.577_350_26;
pub const CS4: f32 = CS2 * CS2;

/// NACA 00xx thickness used for the obstacle.
pub const THICKNESS_RATIO: f32 = 0.12;

pub const C: [[i32; 2]; 9] = [
    [0, 0],
    [1, 0],
    [0, 1],
    [-1, 0],
    [0, -1],
    [1, 1],
    [-1, 1],
    [-1, -1],
    [1, -1],
];

pub const OPP: [usize; 9] = [0, 3, 4, 1, 2, 7, 8, 5, 6];

pub const W: [f32; 9] = [
    4.0 / 9.0,
    1.0 / 9.0,
    1.0 / 9.0,
    1.0 / 9.0,
    1.0 / 9.0,
    1.0 / 36.0,
    1.0 / 36.0,
    1.0 / 36.0,
    1.0 / 36.0,
];

/// `w_k * rho * (1 + cu/cs2 + cu^2/(2 cs4) - u^2/(2 cs2))`
#[inline]
pub fn equilibrium(k: usize, rho: f32, ux: f32, uy: f32) -> f32 {
    let cu = C[k][0] as f32 * ux + C[k][1] as f32 * uy;
    let u2 = ux * ux + uy * uy;
    W[k] * rho * (1.0 + cu / CS2 + 0.5 * (cu * cu) / CS4 - 0.5 * u2 / CS2)
}

/// Whether the centre of cell `(x, y)` falls inside the rotated airfoil.
///
/// Chord is `chord_ratio * nx` with the leading edge at `nx / 4`, centred
/// vertically, pitched nose-up by `aoa_deg` about the quarter chord.
pub fn is_solid(mesh: Mesh, params: &SimParams, x: u32, y: u32) -> bool {
    let chord = params.chord_ratio * mesh.nx as f32;
    if chord <= 1e-6 {
        return false;
    }

    let leading_edge = 0.25 * mesh.nx as f32;
    let pivot_x = leading_edge + 0.25 * chord;
    let pivot_y = 0.5 * mesh.ny as f32;

    let dx = x as f32 + 0.5 - pivot_x;
    let dy = y as f32 + 0.5 - pivot_y;

    let angle = params.aoa_deg.to_radians();
    let (sin_a, cos_a) = angle.sin_cos();
    let local_x = dx * cos_a - dy * sin_a;
    let local_y = dx * sin_a + dy * cos_a;

    let xn = (local_x + 0.25 * chord) / chord;
    if !(0.0..=1.0).contains(&xn) {
        return false;
    }

    let half_thickness = 5.0
        * THICKNESS_RATIO
        * chord
        * (0.2969 * xn.sqrt() - 0.1260 * xn - 0.3516 * xn * xn + 0.2843 * xn * xn * xn
            - 0.1015 * xn * xn * xn * xn);

    local_y.abs() <= half_thickness
}
