//! Work partitioning for the lattice kernels

use super::mesh::Mesh;

/// Invocations per workgroup. Must match `@workgroup_size` in the shaders.
pub const GROUP_WIDTH: u32 = 256;

/// One-dimensional dispatch over every cell of a mesh.
///
/// Kernels recover `(x, y)` from the linear invocation index and discard
/// invocations past the last cell, so the plan carries no 2D layout.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DispatchPlan {
    pub group_size: u32,
    pub group_count: u32,
}

impl DispatchPlan {
    pub fn for_mesh(mesh: Mesh) -> Self {
        Self::for_cells(mesh.cell_count(), GROUP_WIDTH)
    }

    /// `ceil(cells / group_size)` groups of `group_size` invocations.
    pub fn for_cells(cells: u64, group_size: u32) -> Self {
        let group_size = group_size.max(1);
        let groups = cells.div_ceil(group_size as u64).max(1);
        Self {
            group_size,
            group_count: u32::try_from(groups).unwrap_or(u32::MAX),
        }
    }

    /// Total invocations launched, including the idle tail.
    pub fn invocations(&self) -> u64 {
        self.group_count as u64 * self.group_size as u64
    }
}
