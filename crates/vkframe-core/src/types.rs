//! GPU-visible data layouts.

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

/// A colored 2D vertex, matching `mesh.vert` input locations 0 and 1.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Vertex {
    /// Position in normalized model space
    pub position: [f32; 2],
    /// Linear RGB color
    pub color: [f32; 3],
}

impl Vertex {
    /// Create a new vertex
    #[inline]
    pub const fn new(position: [f32; 2], color: [f32; 3]) -> Self {
        Self { position, color }
    }

    /// Byte stride of one vertex in a vertex buffer.
    pub const STRIDE: u32 = std::mem::size_of::<Self>() as u32;

    /// Byte offset of the color attribute.
    pub const COLOR_OFFSET: u32 = std::mem::size_of::<[f32; 2]>() as u32;
}

/// Per-frame uniform data written into the slot's uniform buffer.
///
/// Layout follows std140: a `mat4` followed by a `vec4`.
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct FrameUniformBlock {
    /// Clip-space transform for the current swapchain extent
    pub projection: [[f32; 4]; 4],
    /// x = elapsed seconds, y = width, z = height, w = unused
    pub params: [f32; 4],
}

impl FrameUniformBlock {
    /// Build the block for a given extent and elapsed time.
    pub fn new(projection: Mat4, width: u32, height: u32, elapsed_secs: f32) -> Self {
        Self {
            projection: projection.to_cols_array_2d(),
            params: [elapsed_secs, width as f32, height as f32, 0.0],
        }
    }

    /// Size of the block in bytes.
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;
}

impl Default for FrameUniformBlock {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY, 1, 1, 0.0)
    }
}
