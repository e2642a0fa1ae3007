//! Lattice dimensions

use crate::error::{EngineError, Result};

/// Number of discrete velocity directions in the D2Q9 lattice.
pub const NL: u32 = 9;

/// Lattice dimensions in cells.
///
/// Both axes are at least one. A mesh is fixed for the lifetime of a buffer
/// set; resizing produces a new `Mesh` alongside new buffers.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Mesh {
    pub nx: u32,
    pub ny: u32,
}

impl Mesh {
    /// Create a mesh, clamping each axis to at least one cell.
    pub fn new(nx: u32, ny: u32) -> Self {
        if nx == 0 || ny == 0 {
            log::warn!("clamping lattice {}x{} to at least one cell per axis", nx, ny);
        }
        Self {
            nx: nx.max(1),
            ny: ny.max(1),
        }
    }

    /// Build a mesh from signed host values (UI sliders hand out `i32`).
    pub fn from_signed(nx: i64, ny: i64) -> Self {
        let clamp = |v: i64| v.clamp(1, u32::MAX as i64) as u32;
        Self::new(clamp(nx), clamp(ny))
    }

    /// Total number of cells, `nx * ny`.
    pub fn cell_count(&self) -> u64 {
        self.nx as u64 * self.ny as u64
    }

    /// Number of `f32` values in one distribution buffer, `9 * nx * ny`.
    pub fn distribution_len(&self) -> Result<u64> {
        self.cell_count()
            .checked_mul(NL as u64)
            .ok_or(EngineError::CapacityOverflow {
                nx: self.nx,
                ny: self.ny,
            })
    }

    /// Byte size of one distribution buffer.
    pub fn distribution_bytes(&self) -> Result<u64> {
        self.distribution_len()?
            .checked_mul(std::mem::size_of::<f32>() as u64)
            .ok_or(EngineError::CapacityOverflow {
                nx: self.nx,
                ny: self.ny,
            })
    }

    /// Byte size of a per-cell field (solid mask words or speed values).
    pub fn field_bytes(&self) -> Result<u64> {
        self.cell_count()
            .checked_mul(std::mem::size_of::<u32>() as u64)
            .ok_or(EngineError::CapacityOverflow {
                nx: self.nx,
                ny: self.ny,
            })
    }

    /// Linear cell index for `(x, y)`, row-major with `x` fastest.
    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.nx as usize) + x as usize
    }

    /// Whether `(x, y)` lies on the outer ring of the domain.
    #[inline]
    pub fn is_edge(&self, x: u32, y: u32) -> bool {
        x == 0 || y == 0 || x + 1 == self.nx || y + 1 == self.ny
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new(256, 256)
    }
}

impl std::fmt::Display for Mesh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.nx, self.ny)
    }
}
