//! WGSL sources for the four lattice kernels
//!
//! Each kernel is compiled as its own module (prelude + body) so that the
//! bindings of one entry point never collide with another's. Binding 0 is
//! always the uniform snapshot; the remaining bindings follow the order of the
//! buffer arguments in [`super::traits::LatticeBackend`].

pub const PRELUDE: &str = r#"
struct Uniforms {
    nx: u32,
    ny: u32,
    tau: f32,
    ma: f32,
    aoa_deg: f32,
    chord_ratio: f32,
    speed_max: f32,
    inlet_speed: f32,
}

const NL: u32 = 9u;
const RHO0: f32 = 1.0;
const CS2: f32 = 0.33333334;
const CS4: f32 = 0.11111112;
const THICKNESS_RATIO: f32 = 0.12;

var<private> CX: array<i32, 9> = array<i32, 9>(0, 1, 0, -1, 0, 1, -1, -1, 1);
var<private> CY: array<i32, 9> = array<i32, 9>(0, 0, 1, 0, -1, 1, 1, -1, -1);
var<private> OPP: array<u32, 9> = array<u32, 9>(0u, 3u, 4u, 1u, 2u, 7u, 8u, 5u, 6u);
var<private> W: array<f32, 9> = array<f32, 9>(
    0.44444445,
    0.11111111, 0.11111111, 0.11111111, 0.11111111,
    0.027777778, 0.027777778, 0.027777778, 0.027777778,
);

fn equilibrium(k: u32, rho: f32, vel: vec2<f32>) -> f32 {
    let cu = f32(CX[k]) * vel.x + f32(CY[k]) * vel.y;
    let u2 = vel.x * vel.x + vel.y * vel.y;
    return W[k] * rho * (1.0 + cu / CS2 + 0.5 * (cu * cu) / CS4 - 0.5 * u2 / CS2);
}

fn cell_count() -> u32 {
    return params.nx * params.ny;
}
"#;

pub const INITIALIZE: &str = r#"
@group(0) @binding(0) var<uniform> params: Uniforms;
@group(0) @binding(1) var<storage, read_write> dist_out: array<f32>;

@compute @workgroup_size(256)
fn initialize(@builtin(global_invocation_id) gid: vec3<u32>) {
    let cells = cell_count();
    let i = gid.x;
    if (i >= cells) {
        return;
    }

    let vel = vec2<f32>(params.inlet_speed, 0.0);
    for (var k = 0u; k < NL; k++) {
        dist_out[k * cells + i] = equilibrium(k, RHO0, vel);
    }
}
"#;

pub const SOLID_MASK: &str = r#"
@group(0) @binding(0) var<uniform> params: Uniforms;
@group(0) @binding(1) var<storage, read_write> mask_out: array<u32>;

fn is_solid(x: u32, y: u32) -> bool {
    let chord = params.chord_ratio * f32(params.nx);
    if (chord <= 1e-6) {
        return false;
    }

    let leading_edge = 0.25 * f32(params.nx);
    let pivot = vec2<f32>(leading_edge + 0.25 * chord, 0.5 * f32(params.ny));
    let d = vec2<f32>(f32(x) + 0.5, f32(y) + 0.5) - pivot;

    let angle = radians(params.aoa_deg);
    let sin_a = sin(angle);
    let cos_a = cos(angle);
    let local_x = d.x * cos_a - d.y * sin_a;
    let local_y = d.x * sin_a + d.y * cos_a;

    let xn = (local_x + 0.25 * chord) / chord;
    if (xn < 0.0 || xn > 1.0) {
        return false;
    }

    let half_thickness = 5.0 * THICKNESS_RATIO * chord * (
        0.2969 * sqrt(xn)
        - 0.1260 * xn
        - 0.3516 * xn * xn
        + 0.2843 * xn * xn * xn
        - 0.1015 * xn * xn * xn * xn
    );
    return abs(local_y) <= half_thickness;
}

@compute @workgroup_size(256)
fn solid_mask(@builtin(global_invocation_id) gid: vec3<u32>) {
    let i = gid.x;
    if (i >= cell_count()) {
        return;
    }
    let x = i % params.nx;
    let y = i / params.nx;
    mask_out[i] = select(0u, 1u, is_solid(x, y));
}
"#;

pub const COLLIDE_STREAM: &str = r#"
@group(0) @binding(0) var<uniform> params: Uniforms;
@group(0) @binding(1) var<storage, read> dist_in: array<f32>;
@group(0) @binding(2) var<storage, read> solid: array<u32>;
@group(0) @binding(3) var<storage, read_write> dist_out: array<f32>;
@group(0) @binding(4) var<storage, read_write> speed_out: array<f32>;

@compute @workgroup_size(256)
fn collide_stream(@builtin(global_invocation_id) gid: vec3<u32>) {
    let cells = cell_count();
    let i = gid.x;
    if (i >= cells) {
        return;
    }

    if (solid[i] != 0u) {
        for (var k = 0u; k < NL; k++) {
            dist_out[k * cells + i] = dist_in[k * cells + i];
        }
        speed_out[i] = 0.0;
        return;
    }

    let x = i32(i % params.nx);
    let y = i32(i / params.nx);

    var f: array<f32, 9>;
    var rho = 0.0;
    var m = vec2<f32>(0.0, 0.0);
    for (var k = 0u; k < NL; k++) {
        let sx = x - CX[k];
        let sy = y - CY[k];
        var value: f32;
        if (sx < 0 || sy < 0 || sx >= i32(params.nx) || sy >= i32(params.ny)) {
            value = dist_in[k * cells + i];
        } else {
            let j = u32(sy) * params.nx + u32(sx);
            if (solid[j] != 0u) {
                value = dist_in[OPP[k] * cells + i];
            } else {
                value = dist_in[k * cells + j];
            }
        }
        f[k] = value;
        rho += value;
        m += value * vec2<f32>(f32(CX[k]), f32(CY[k]));
    }

    var vel = vec2<f32>(0.0, 0.0);
    if (rho > 1e-12) {
        vel = m / rho;
    }

    let omega = 1.0 / params.tau;
    for (var k = 0u; k < NL; k++) {
        dist_out[k * cells + i] = f[k] - omega * (f[k] - equilibrium(k, rho, vel));
    }
    speed_out[i] = sqrt(vel.x * vel.x + vel.y * vel.y);
}
"#;

pub const BOUNDARY: &str = r#"
@group(0) @binding(0) var<uniform> params: Uniforms;
@group(0) @binding(1) var<storage, read_write> dist: array<f32>;

@compute @workgroup_size(256)
fn boundary(@builtin(global_invocation_id) gid: vec3<u32>) {
    let cells = cell_count();
    let i = gid.x;
    if (i >= cells) {
        return;
    }

    let x = i % params.nx;
    let y = i / params.nx;
    let edge = x == 0u || y == 0u || x + 1u == params.nx || y + 1u == params.ny;
    if (!edge) {
        return;
    }

    let vel = vec2<f32>(params.inlet_speed, 0.0);
    for (var k = 0u; k < NL; k++) {
        dist[k * cells + i] = equilibrium(k, RHO0, vel);
    }
}
"#;

/// Full source of one kernel module.
pub fn module_source(body: &str) -> String {
    [PRELUDE, body].concat()
}
