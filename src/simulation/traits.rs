//! Kernel capability interface
//!
//! The stepping engine never talks to a device directly. Everything it needs
//! from one (buffer allocation, an in-order command stream and the four
//! lattice kernels) goes through [`LatticeBackend`], so the engine can run on
//! wgpu, on the host reference implementation, or on a test double.

use super::{dispatch::DispatchPlan, mesh::Mesh, params::SimParams};
use crate::error::Result;

/// Immutable per-invocation snapshot handed to every kernel.
///
/// Built fresh by the engine for each batch of work; a backend may copy it
/// to the device but never sees it change afterwards.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct KernelArgs {
    pub mesh: Mesh,
    pub params: SimParams,
    pub plan: DispatchPlan,
}

/// Device capabilities the stepping engine depends on.
///
/// Work recorded into a [`Self::Stream`] must execute in recording order, and
/// streams must execute in submission order. Within a single kernel no
/// ordering between cells is assumed.
pub trait LatticeBackend {
    /// Handle to device memory. Cloning shares the allocation.
    type Buffer: Clone;

    /// In-order command stream that kernels are recorded into.
    type Stream;

    /// Short human readable name for logs
    fn name(&self) -> &str;

    /// Reject meshes the device cannot dispatch or address.
    fn check_capacity(&self, _mesh: Mesh, _plan: DispatchPlan) -> Result<()> {
        Ok(())
    }

    /// Allocate `bytes` of zeroed storage, or fail with
    /// [`crate::EngineError::Allocation`].
    fn allocate(&self, label: &'static str, bytes: u64) -> Result<Self::Buffer>;

    /// Size of a buffer in bytes.
    fn buffer_size(&self, buffer: &Self::Buffer) -> u64;

    /// Open a new command stream.
    fn begin(&self, label: &str) -> Self::Stream;

    /// Submit a stream without waiting for it to finish.
    fn submit(&self, stream: Self::Stream);

    /// Submit a stream and block until the device has executed it.
    fn submit_and_wait(&self, stream: Self::Stream);

    /// Fill `dist_out` with the equilibrium state for `args.params`.
    fn initialize(&self, stream: &mut Self::Stream, args: &KernelArgs, dist_out: &Self::Buffer);

    /// Rasterize the obstacle into `mask_out` (one word per cell, non-zero is solid).
    fn solid_mask(&self, stream: &mut Self::Stream, args: &KernelArgs, mask_out: &Self::Buffer);

    /// One collision + streaming update from `dist_in` into `dist_out`.
    ///
    /// Must write every direction of every cell of `dist_out` and the speed
    /// magnitude of every cell into `speed_out`. `dist_in` and `dist_out`
    /// are always distinct buffers.
    fn collide_stream(
        &self,
        stream: &mut Self::Stream,
        args: &KernelArgs,
        dist_in: &Self::Buffer,
        mask_in: &Self::Buffer,
        dist_out: &Self::Buffer,
        speed_out: &Self::Buffer,
    );

    /// Enforce the domain edge conditions on `dist` in place. Interior cells
    /// must be left untouched.
    fn boundary(&self, stream: &mut Self::Stream, args: &KernelArgs, dist: &Self::Buffer);

    /// Copy a buffer back to the host as 32-bit words. Blocks until all
    /// previously submitted work has finished.
    fn read_words(&self, buffer: &Self::Buffer) -> Result<Vec<u32>>;
}
