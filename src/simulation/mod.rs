// src/simulation/mod.rs
//! Lattice Boltzmann simulation
//!
//! D2Q9 stepping engine, the device state it owns, and the backends that run
//! its kernels.

pub mod buffers;
pub mod cpu;
pub mod d2q9;
pub mod dispatch;
pub mod engine;
pub mod gpu;
pub mod manager;
pub mod mesh;
pub mod params;
pub mod shaders;
pub mod traits;

pub use buffers::{LatticeBuffers, Parity};
pub use cpu::{CpuBackend, CpuBuffer, CpuStream};
pub use dispatch::DispatchPlan;
pub use engine::{EngineState, SteppingEngine};
pub use gpu::{WgpuBackend, WgpuStream};
pub use manager::{SimulationHost, VisualizationSource};
pub use mesh::Mesh;
pub use params::SimParams;
pub use traits::{KernelArgs, LatticeBackend};
