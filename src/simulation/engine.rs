//! Stepping engine
//!
//! Owns the lattice state and sequences the kernels against it:
//!
//! 1. `reset`: initialize(even), initialize(odd), solid_mask, then block
//! 2. each step: collide_stream(input -> output), boundary(output)
//! 3. `advance`: `max(1, substeps)` steps recorded into one stream
//!
//! Input and output buffers alternate with the parity of the step index.
//! Reconfiguration (`resize`, `set_parameters`, `set_substeps`) is only
//! legal between ticks; the `&mut self` receivers make that the caller's
//! obligation at compile time.

use super::{
    buffers::{LatticeBuffers, Parity},
    dispatch::DispatchPlan,
    mesh::Mesh,
    params::SimParams,
    traits::{KernelArgs, LatticeBackend},
};
use crate::{config::EngineConfig, error::Result};

/// Lifecycle of an engine instance.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EngineState {
    /// Buffers exist but have never been initialized.
    Uninitialized,
    /// State is consistent and steps may be issued.
    Ready,
    /// A reset or resize is in progress.
    Reinitializing,
}

/// D2Q9 stepping engine over a [`LatticeBackend`].
pub struct SteppingEngine<B: LatticeBackend> {
    backend: B,
    buffers: LatticeBuffers<B::Buffer>,
    params: SimParams,
    plan: DispatchPlan,
    substeps: u32,
    step_index: u64,
    generation: u64,
    state: EngineState,
}

impl<B: LatticeBackend> SteppingEngine<B> {
    /// Allocate the lattice for `config` and bring it to its initial state.
    ///
    /// Fails if any of the four buffers cannot be allocated; no engine is
    /// returned in that case.
    pub fn new(backend: B, config: &EngineConfig) -> Result<Self> {
        let mesh = config.mesh();
        let plan = DispatchPlan::for_mesh(mesh);
        backend.check_capacity(mesh, plan)?;
        let buffers = LatticeBuffers::allocate(&backend, mesh)?;

        let mut engine = Self {
            backend,
            buffers,
            params: config.params(),
            plan,
            substeps: clamp_substeps(config.substeps),
            step_index: 0,
            generation: 0,
            state: EngineState::Uninitialized,
        };
        engine.reset();

        log::info!(
            "stepping engine ready on {}: {} lattice, {} groups of {}, {} substep(s)",
            engine.backend.name(),
            mesh,
            plan.group_count,
            plan.group_size,
            engine.substeps
        );
        Ok(engine)
    }

    /// Reinitialize both distribution buffers and the solid mask from the
    /// current parameters and rewind the step index.
    ///
    /// Blocks until the device has finished, so nothing can observe a
    /// half-initialized buffer.
    pub fn reset(&mut self) {
        self.state = EngineState::Reinitializing;
        let args = self.kernel_args();

        let mut stream = self.backend.begin("lattice reset");
        self.backend.initialize(
            &mut stream,
            &args,
            self.buffers.distribution(Parity::Even),
        );
        self.backend.initialize(
            &mut stream,
            &args,
            self.buffers.distribution(Parity::Odd),
        );
        self.backend
            .solid_mask(&mut stream, &args, self.buffers.solid_mask());
        self.backend.submit_and_wait(stream);

        self.step_index = 0;
        self.state = EngineState::Ready;
        log::debug!("lattice reset: {} with {:?}", args.mesh, args.params);
    }

    /// Run the configured number of substeps (or `substeps` if given),
    /// never fewer than one. Returns the number of steps issued.
    ///
    /// The work is submitted without waiting for it.
    pub fn advance(&mut self, substeps: Option<u32>) -> u32 {
        let mut stream = self.backend.begin("lattice advance");
        let steps = self.encode_advance(&mut stream, substeps);
        self.backend.submit(stream);
        steps
    }

    /// Record an `advance` into a caller-owned stream.
    ///
    /// Anything the caller records into `stream` afterwards runs after the
    /// last step, which is how a renderer reads the speed field safely.
    pub fn encode_advance(&mut self, stream: &mut B::Stream, substeps: Option<u32>) -> u32 {
        let steps = clamp_substeps(substeps.unwrap_or(self.substeps));
        let args = self.kernel_args();
        for _ in 0..steps {
            self.step(stream, &args);
        }
        log::trace!("advanced {} step(s), step index {}", steps, self.step_index);
        steps
    }

    fn step(&mut self, stream: &mut B::Stream, args: &KernelArgs) {
        let (input, output) = self.buffers.io_for_step(self.step_index);
        self.backend.collide_stream(
            stream,
            args,
            input,
            self.buffers.solid_mask(),
            output,
            self.buffers.speed(),
        );
        self.backend.boundary(stream, args, output);
        self.step_index += 1;
    }

    /// Set the substep count used by later `advance` calls. Values below one
    /// become one.
    pub fn set_substeps(&mut self, substeps: u32) {
        self.substeps = clamp_substeps(substeps);
    }

    /// Replace the parameters. Takes effect on the next step or reset; the
    /// solid mask is only rebuilt by a reset.
    pub fn set_parameters(&mut self, params: SimParams) {
        if params != self.params {
            log::debug!("parameters {:?} -> {:?}", self.params, params);
        }
        self.params = params;
    }

    /// Reallocate the lattice at `nx x ny` (each clamped to at least one) and
    /// reset it.
    ///
    /// Buffer handles obtained before the call refer to the old lattice. If
    /// allocation fails the engine keeps its previous lattice untouched.
    pub fn resize(&mut self, nx: u32, ny: u32) -> Result<()> {
        let mesh = Mesh::new(nx, ny);
        let plan = DispatchPlan::for_mesh(mesh);
        self.backend.check_capacity(mesh, plan)?;

        let previous = self.state;
        self.state = EngineState::Reinitializing;
        let buffers = match LatticeBuffers::allocate(&self.backend, mesh) {
            Ok(buffers) => buffers,
            Err(err) => {
                log::error!("resize to {} failed: {}", mesh, err);
                self.state = previous;
                return Err(err);
            }
        };

        let old = self.buffers.mesh();
        self.buffers = buffers;
        self.plan = plan;
        self.generation += 1;
        self.reset();

        log::info!(
            "resized lattice {} -> {} ({} groups), generation {}",
            old,
            mesh,
            plan.group_count,
            self.generation
        );
        Ok(())
    }

    fn kernel_args(&self) -> KernelArgs {
        KernelArgs {
            mesh: self.buffers.mesh(),
            params: self.params,
            plan: self.plan,
        }
    }

    pub fn mesh(&self) -> Mesh {
        self.buffers.mesh()
    }

    pub fn params(&self) -> SimParams {
        self.params
    }

    pub fn substeps(&self) -> u32 {
        self.substeps
    }

    pub fn step_index(&self) -> u64 {
        self.step_index
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Incremented every time the lattice is reallocated.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn plan(&self) -> DispatchPlan {
        self.plan
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn speed_buffer(&self) -> &B::Buffer {
        self.buffers.speed()
    }

    pub fn solid_mask_buffer(&self) -> &B::Buffer {
        self.buffers.solid_mask()
    }

    /// Both distribution buffers, indexed by [`Parity::index`].
    pub fn distribution_buffers(&self) -> &[B::Buffer; 2] {
        self.buffers.distributions()
    }

    /// Parity of the buffer holding the latest distributions, which is also
    /// the input of the next step.
    pub fn current_parity(&self) -> Parity {
        Parity::of_step(self.step_index)
    }

    pub fn current_distribution(&self) -> &B::Buffer {
        self.buffers.distribution(self.current_parity())
    }

    /// Buffer the next step reads from.
    pub fn input_buffer(&self) -> &B::Buffer {
        self.buffers.io_for_step(self.step_index).0
    }

    /// Blocking copy of the speed field, one value per cell.
    pub fn read_speed(&self) -> Result<Vec<f32>> {
        let words = self.backend.read_words(self.buffers.speed())?;
        Ok(words.into_iter().map(f32::from_bits).collect())
    }

    /// Blocking copy of the solid mask, one flag per cell.
    pub fn read_solid_mask(&self) -> Result<Vec<bool>> {
        let words = self.backend.read_words(self.buffers.solid_mask())?;
        Ok(words.into_iter().map(|w| w != 0).collect())
    }

    /// Blocking copy of one distribution buffer, direction-major.
    pub fn read_distribution(&self, parity: Parity) -> Result<Vec<f32>> {
        let words = self
            .backend
            .read_words(self.buffers.distribution(parity))?;
        Ok(words.into_iter().map(f32::from_bits).collect())
    }
}

fn clamp_substeps(substeps: u32) -> u32 {
    if substeps == 0 {
        log::debug!("substep count 0 clamped to 1");
    }
    substeps.max(1)
}
