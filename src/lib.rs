// src/lib.rs
//! Flowlab
//!
//! A 2D lattice Boltzmann (D2Q9) wind tunnel built on wgpu compute, with a
//! deterministic CPU backend for headless runs and tests.

pub mod config;
pub mod error;
pub mod prelude;
pub mod simulation;
pub mod wgpu_utils;

// Re-export main types for convenience
pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use simulation::{SimulationHost, SteppingEngine};

/// Creates a stepping engine with the default configuration on the first
/// available GPU adapter
pub fn default() -> Result<SteppingEngine<simulation::WgpuBackend>> {
    let backend = pollster::block_on(simulation::WgpuBackend::request())?;
    SteppingEngine::new(backend, &EngineConfig::default())
}
