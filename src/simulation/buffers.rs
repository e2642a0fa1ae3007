//! Device-resident lattice state

use super::{mesh::Mesh, traits::LatticeBackend};
use crate::error::Result;

/// Which of the two distribution buffers a step reads from.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Parity {
    Even = 0,
    Odd = 1,
}

impl Parity {
    /// Input parity for the step with the given index.
    pub fn of_step(step_index: u64) -> Self {
        if step_index & 1 == 0 {
            Parity::Even
        } else {
            Parity::Odd
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn other(self) -> Self {
        match self {
            Parity::Even => Parity::Odd,
            Parity::Odd => Parity::Even,
        }
    }
}

/// The four buffers that make up one simulation state, all sized from the
/// same mesh.
///
/// Only [`LatticeBuffers::allocate`] creates a set, and it either returns all
/// four buffers or none, so a set is never partially sized for a different
/// mesh.
#[derive(Debug, Clone)]
pub struct LatticeBuffers<Buf> {
    mesh: Mesh,
    distributions: [Buf; 2],
    solid_mask: Buf,
    speed: Buf,
}

impl<Buf: Clone> LatticeBuffers<Buf> {
    pub fn allocate<B>(backend: &B, mesh: Mesh) -> Result<Self>
    where
        B: LatticeBackend<Buffer = Buf> + ?Sized,
    {
        let distribution_bytes = mesh.distribution_bytes()?;
        let field_bytes = mesh.field_bytes()?;

        let solid_mask = backend.allocate("lattice solid mask", field_bytes)?;
        let even = backend.allocate("lattice distributions (even)", distribution_bytes)?;
        let odd = backend.allocate("lattice distributions (odd)", distribution_bytes)?;
        let speed = backend.allocate("lattice speed", field_bytes)?;

        log::debug!(
            "allocated {} lattice on {}: 2 x {} B distributions, 2 x {} B fields",
            mesh,
            backend.name(),
            distribution_bytes,
            field_bytes
        );

        Ok(Self {
            mesh,
            distributions: [even, odd],
            solid_mask,
            speed,
        })
    }

    /// `(input, output)` distribution buffers for the given step.
    ///
    /// This is the only place the ping-pong alternation is decided.
    pub fn io_for_step(&self, step_index: u64) -> (&Buf, &Buf) {
        let input = Parity::of_step(step_index);
        (
            &self.distributions[input.index()],
            &self.distributions[input.other().index()],
        )
    }

    pub fn mesh(&self) -> Mesh {
        self.mesh
    }

    pub fn distribution(&self, parity: Parity) -> &Buf {
        &self.distributions[parity.index()]
    }

    pub fn distributions(&self) -> &[Buf; 2] {
        &self.distributions
    }

    pub fn solid_mask(&self) -> &Buf {
        &self.solid_mask
    }

    pub fn speed(&self) -> &Buf {
        &self.speed
    }
}
