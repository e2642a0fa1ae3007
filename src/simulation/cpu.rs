//! Host reference backend
//!
//! Runs the four lattice kernels on the CPU with rayon. Results are fully
//! deterministic (no reductions cross threads), which makes this backend the
//! one the test-suite drives the engine with. Work recorded into a
//! [`CpuStream`] is executed in order when the stream is submitted.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rayon::prelude::*;

use super::{
    d2q9::{self, C, OPP, RHO0},
    mesh::Mesh,
    traits::{KernelArgs, LatticeBackend},
};
use crate::error::{EngineError, Result};

/// Default per-buffer limit, matching the common 1 GiB device maximum.
pub const DEFAULT_MAX_BUFFER_BYTES: u64 = 1 << 30;

/// Host-memory buffer of 32-bit words, shared by reference.
#[derive(Debug, Clone)]
pub struct CpuBuffer {
    label: &'static str,
    words: Arc<RwLock<Vec<u32>>>,
}

impl CpuBuffer {
    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> Vec<u32> {
        self.read().clone()
    }

    /// Whether both handles refer to the same allocation.
    pub fn same_allocation(&self, other: &CpuBuffer) -> bool {
        Arc::ptr_eq(&self.words, &other.words)
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<u32>> {
        // A poisoned lock only means a kernel panicked mid-write; the words
        // are still plain data.
        self.words.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<u32>> {
        self.words.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Debug, Clone)]
enum CpuPass {
    Initialize {
        args: KernelArgs,
        dist_out: CpuBuffer,
    },
    SolidMask {
        args: KernelArgs,
        mask_out: CpuBuffer,
    },
    CollideStream {
        args: KernelArgs,
        dist_in: CpuBuffer,
        mask_in: CpuBuffer,
        dist_out: CpuBuffer,
        speed_out: CpuBuffer,
    },
    Boundary {
        args: KernelArgs,
        dist: CpuBuffer,
    },
}

/// Recorded kernel passes, executed on submit.
#[derive(Debug)]
pub struct CpuStream {
    label: String,
    passes: Vec<CpuPass>,
}

impl CpuStream {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Number of kernel passes recorded so far.
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }
}

/// CPU implementation of [`LatticeBackend`].
#[derive(Debug, Clone)]
pub struct CpuBackend {
    max_buffer_bytes: u64,
}

impl CpuBackend {
    pub fn new() -> Self {
        Self {
            max_buffer_bytes: DEFAULT_MAX_BUFFER_BYTES,
        }
    }

    /// Refuse any single allocation larger than `bytes`.
    pub fn with_buffer_limit(bytes: u64) -> Self {
        Self {
            max_buffer_bytes: bytes,
        }
    }

    fn execute(&self, pass: &CpuPass) {
        match pass {
            CpuPass::Initialize { args, dist_out } => {
                initialize(args, &mut dist_out.write());
            }
            CpuPass::SolidMask { args, mask_out } => {
                solid_mask(args, &mut mask_out.write());
            }
            CpuPass::CollideStream {
                args,
                dist_in,
                mask_in,
                dist_out,
                speed_out,
            } => {
                debug_assert!(!dist_in.same_allocation(dist_out));
                let input = dist_in.read();
                let mask = mask_in.read();
                let mut output = dist_out.write();
                let mut speed = speed_out.write();
                collide_stream(args, &input, &mask, &mut output, &mut speed);
            }
            CpuPass::Boundary { args, dist } => {
                boundary(args, &mut dist.write());
            }
        }
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl LatticeBackend for CpuBackend {
    type Buffer = CpuBuffer;
    type Stream = CpuStream;

    fn name(&self) -> &str {
        "cpu"
    }

    fn allocate(&self, label: &'static str, bytes: u64) -> Result<CpuBuffer> {
        let fail = || EngineError::Allocation { label, bytes };
        if bytes > self.max_buffer_bytes {
            return Err(fail());
        }
        let len = usize::try_from(bytes / 4).map_err(|_| fail())?;

        let mut words = Vec::new();
        words.try_reserve_exact(len).map_err(|_| fail())?;
        words.resize(len, 0u32);

        Ok(CpuBuffer {
            label,
            words: Arc::new(RwLock::new(words)),
        })
    }

    fn buffer_size(&self, buffer: &CpuBuffer) -> u64 {
        buffer.len() as u64 * 4
    }

    fn begin(&self, label: &str) -> CpuStream {
        CpuStream {
            label: label.to_string(),
            passes: Vec::new(),
        }
    }

    fn submit(&self, stream: CpuStream) {
        for pass in &stream.passes {
            self.execute(pass);
        }
    }

    fn submit_and_wait(&self, stream: CpuStream) {
        // Execution is synchronous already.
        self.submit(stream);
    }

    fn initialize(&self, stream: &mut CpuStream, args: &KernelArgs, dist_out: &CpuBuffer) {
        stream.passes.push(CpuPass::Initialize {
            args: *args,
            dist_out: dist_out.clone(),
        });
    }

    fn solid_mask(&self, stream: &mut CpuStream, args: &KernelArgs, mask_out: &CpuBuffer) {
        stream.passes.push(CpuPass::SolidMask {
            args: *args,
            mask_out: mask_out.clone(),
        });
    }

    fn collide_stream(
        &self,
        stream: &mut CpuStream,
        args: &KernelArgs,
        dist_in: &CpuBuffer,
        mask_in: &CpuBuffer,
        dist_out: &CpuBuffer,
        speed_out: &CpuBuffer,
    ) {
        stream.passes.push(CpuPass::CollideStream {
            args: *args,
            dist_in: dist_in.clone(),
            mask_in: mask_in.clone(),
            dist_out: dist_out.clone(),
            speed_out: speed_out.clone(),
        });
    }

    fn boundary(&self, stream: &mut CpuStream, args: &KernelArgs, dist: &CpuBuffer) {
        stream.passes.push(CpuPass::Boundary {
            args: *args,
            dist: dist.clone(),
        });
    }

    fn read_words(&self, buffer: &CpuBuffer) -> Result<Vec<u32>> {
        Ok(buffer.snapshot())
    }
}

fn cells(mesh: Mesh) -> usize {
    mesh.cell_count() as usize
}

fn initialize(args: &KernelArgs, out: &mut [u32]) {
    let n = cells(args.mesh);
    let u0 = args.params.inlet_speed();
    out.par_chunks_mut(n)
        .take(9)
        .enumerate()
        .for_each(|(k, plane)| {
            let feq = d2q9::equilibrium(k, RHO0, u0, 0.0).to_bits();
            plane.fill(feq);
        });
}

fn solid_mask(args: &KernelArgs, out: &mut [u32]) {
    let mesh = args.mesh;
    out.par_iter_mut()
        .take(cells(mesh))
        .enumerate()
        .for_each(|(i, word)| {
            let x = (i % mesh.nx as usize) as u32;
            let y = (i / mesh.nx as usize) as u32;
            *word = d2q9::is_solid(mesh, &args.params, x, y) as u32;
        });
}

/// Post-collision values of one cell plus its speed magnitude.
fn collide_cell(args: &KernelArgs, input: &[u32], mask: &[u32], i: usize) -> ([f32; 9], f32) {
    let mesh = args.mesh;
    let n = cells(mesh);
    let f_in = |k: usize, cell: usize| f32::from_bits(input[k * n + cell]);

    let mut f = [0.0f32; 9];
    if mask[i] != 0 {
        for (k, value) in f.iter_mut().enumerate() {
            *value = f_in(k, i);
        }
        return (f, 0.0);
    }

    let x = (i % mesh.nx as usize) as i64;
    let y = (i / mesh.nx as usize) as i64;

    let mut rho = 0.0f32;
    let mut mx = 0.0f32;
    let mut my = 0.0f32;
    for k in 0..9 {
        let sx = x - C[k][0] as i64;
        let sy = y - C[k][1] as i64;
        let value = if sx < 0 || sy < 0 || sx >= mesh.nx as i64 || sy >= mesh.ny as i64 {
            f_in(k, i)
        } else {
            let j = sy as usize * mesh.nx as usize + sx as usize;
            if mask[j] != 0 {
                f_in(OPP[k], i)
            } else {
                f_in(k, j)
            }
        };
        f[k] = value;
        rho += value;
        mx += value * C[k][0] as f32;
        my += value * C[k][1] as f32;
    }

    let (ux, uy) = if rho > 1e-12 {
        (mx / rho, my / rho)
    } else {
        (0.0, 0.0)
    };

    let omega = 1.0 / args.params.tau;
    for (k, value) in f.iter_mut().enumerate() {
        *value -= omega * (*value - d2q9::equilibrium(k, rho, ux, uy));
    }
    (f, (ux * ux + uy * uy).sqrt())
}

fn collide_stream(args: &KernelArgs, input: &[u32], mask: &[u32], out: &mut [u32], speed: &mut [u32]) {
    let n = cells(args.mesh);
    let updated: Vec<([f32; 9], f32)> = (0..n)
        .into_par_iter()
        .map(|i| collide_cell(args, input, mask, i))
        .collect();

    for (i, (f, s)) in updated.into_iter().enumerate() {
        for (k, value) in f.into_iter().enumerate() {
            out[k * n + i] = value.to_bits();
        }
        speed[i] = s.to_bits();
    }
}

fn boundary(args: &KernelArgs, dist: &mut [u32]) {
    let mesh = args.mesh;
    let n = cells(mesh);
    let u0 = args.params.inlet_speed();
    let feq: [u32; 9] = std::array::from_fn(|k| d2q9::equilibrium(k, RHO0, u0, 0.0).to_bits());

    let mut apply = |x: u32, y: u32| {
        let i = mesh.index(x, y);
        for (k, value) in feq.iter().enumerate() {
            dist[k * n + i] = *value;
        }
    };

    for x in 0..mesh.nx {
        apply(x, 0);
        apply(x, mesh.ny - 1);
    }
    for y in 0..mesh.ny {
        apply(0, y);
        apply(mesh.nx - 1, y);
    }
}
