//! # Flowlab Prelude
//!
//! Commonly used types in one import:
//!
//! ```no_run
//! use flowlab::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let engine = SteppingEngine::new(CpuBackend::new(), &EngineConfig::default())?;
//!     let mut host = SimulationHost::new(engine);
//!     host.tick();
//!     let speed = host.engine().read_speed()?;
//!     println!("{} cells", speed.len());
//!     Ok(())
//! }
//! ```

pub use crate::config::{ui_ranges, EngineConfig};
pub use crate::default;
pub use crate::error::{EngineError, Result};

pub use crate::simulation::{
    CpuBackend, DispatchPlan, EngineState, KernelArgs, LatticeBackend, Mesh, Parity,
    SimParams, SimulationHost, SteppingEngine, VisualizationSource, WgpuBackend,
};

// Re-export wgpu types needed to inject a device
pub use wgpu::{Device, Queue};
