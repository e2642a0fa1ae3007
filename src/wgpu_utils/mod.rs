// src/wgpu_utils/mod.rs
//! WGPU utility functions and helpers
//!
//! Small wrappers around the wgpu calls the compute backend repeats for
//! every kernel: binding layouts, uniform snapshots and staging copies.

pub mod binding_types;
pub mod uniform_buffer;

// Re-export main types
pub use binding_types::*;
pub use uniform_buffer::{StagingBuffer, UniformBuffer};
