//! Error types for the stepping engine and its backends

use thiserror::Error;

/// Errors surfaced by engine construction, resize and device setup.
///
/// Dimension and substep values below one are clamped rather than reported,
/// and a dispatch never fails once its buffers exist, so stepping itself has
/// no error path.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The device could not provide a buffer of the requested size.
    #[error("failed to allocate {label} ({bytes} bytes)")]
    Allocation { label: &'static str, bytes: u64 },

    /// `9 * nx * ny` does not fit the addressable buffer size.
    #[error("lattice {nx}x{ny} overflows buffer capacity")]
    CapacityOverflow { nx: u32, ny: u32 },

    /// No adapter matched the request.
    #[error("no compatible adapter found: {0}")]
    AdapterUnavailable(String),

    /// The adapter refused to hand out a device.
    #[error("device request failed: {0}")]
    DeviceRequest(String),

    /// The adapter lacks a capability the kernels need.
    #[error("unsupported adapter: {0}")]
    Unsupported(String),

    /// Copying a buffer back to the host failed.
    #[error("buffer readback failed: {0}")]
    Readback(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
