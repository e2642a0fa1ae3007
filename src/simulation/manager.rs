//! Host controller for the stepping engine
//!
//! Drives an engine from a frame loop: advances once per tick unless paused,
//! forwards control commands, and republishes the buffer handles a renderer
//! needs whenever the lattice is reallocated.

use super::{
    engine::SteppingEngine,
    mesh::Mesh,
    params::SimParams,
    traits::LatticeBackend,
};
use crate::error::Result;

/// Everything a renderer needs to draw the current lattice.
///
/// The handles refer to one particular allocation. After a resize they are
/// stale; check [`SimulationHost::is_current`] before using a cached copy.
#[derive(Debug, Clone)]
pub struct VisualizationSource<Buf> {
    pub mesh: Mesh,
    pub params: SimParams,
    pub speed: Buf,
    pub solid_mask: Buf,
    pub generation: u64,
}

/// Frame-loop wrapper around a [`SteppingEngine`].
pub struct SimulationHost<B: LatticeBackend> {
    engine: SteppingEngine<B>,
    is_paused: bool,
    visualization: VisualizationSource<B::Buffer>,
}

impl<B: LatticeBackend> SimulationHost<B> {
    pub fn new(engine: SteppingEngine<B>) -> Self {
        let visualization = publish(&engine);
        Self {
            engine,
            is_paused: false,
            visualization,
        }
    }

    /// Advance one frame's worth of substeps unless paused.
    ///
    /// # Returns
    /// Number of lattice steps issued (zero while paused)
    pub fn tick(&mut self) -> u32 {
        if self.is_paused {
            return 0;
        }
        self.engine.advance(None)
    }

    /// Record one frame into a single stream: the simulation steps (unless
    /// paused) followed by whatever `draw` records against the current
    /// visualization handles. The stream is submitted afterwards.
    pub fn frame<F>(&mut self, draw: F) -> u32
    where
        F: FnOnce(&mut B::Stream, &VisualizationSource<B::Buffer>),
    {
        let mut stream = self.engine.backend().begin("frame");
        let steps = if self.is_paused {
            0
        } else {
            self.engine.encode_advance(&mut stream, None)
        };
        draw(&mut stream, &self.visualization);
        self.engine.backend().submit(stream);
        steps
    }

    pub fn toggle_pause(&mut self) -> bool {
        self.set_paused(!self.is_paused);
        self.is_paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        if paused != self.is_paused {
            log::debug!("simulation {}", if paused { "paused" } else { "resumed" });
        }
        self.is_paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.is_paused
    }

    /// Reinitialize the lattice with the current parameters.
    pub fn restart(&mut self) {
        self.engine.reset();
        self.visualization.params = self.engine.params();
    }

    /// Reallocate the lattice and republish the visualization handles.
    ///
    /// On failure the previous lattice and handles stay in place.
    pub fn update_grid_size(&mut self, nx: u32, ny: u32) -> Result<()> {
        self.engine.resize(nx, ny)?;
        self.visualization = publish(&self.engine);
        Ok(())
    }

    pub fn update_substeps(&mut self, substeps: u32) {
        self.engine.set_substeps(substeps);
    }

    /// Replace the simulation parameters. The obstacle is only re-rasterized
    /// on the next [`restart`](Self::restart) or grid change.
    pub fn update_parameters(
        &mut self,
        tau: f32,
        ma: f32,
        aoa_deg: f32,
        chord_ratio: f32,
        speed_max: f32,
    ) {
        let params = SimParams::new(tau, ma, aoa_deg, chord_ratio, speed_max);
        self.engine.set_parameters(params);
        self.visualization.params = params;
    }

    pub fn visualization(&self) -> &VisualizationSource<B::Buffer> {
        &self.visualization
    }

    /// Whether a previously obtained source still refers to the live lattice.
    pub fn is_current(&self, source: &VisualizationSource<B::Buffer>) -> bool {
        source.generation == self.engine.generation()
    }

    pub fn engine(&self) -> &SteppingEngine<B> {
        &self.engine
    }

    /// Direct engine access. A resize made through it is not republished;
    /// [`is_current`](Self::is_current) will report the cached source stale.
    pub fn engine_mut(&mut self) -> &mut SteppingEngine<B> {
        &mut self.engine
    }

    pub fn into_engine(self) -> SteppingEngine<B> {
        self.engine
    }
}

fn publish<B: LatticeBackend>(engine: &SteppingEngine<B>) -> VisualizationSource<B::Buffer> {
    VisualizationSource {
        mesh: engine.mesh(),
        params: engine.params(),
        speed: engine.speed_buffer().clone(),
        solid_mask: engine.solid_mask_buffer().clone(),
        generation: engine.generation(),
    }
}
