//! Shaders for the vkframe renderer.
//!
//! GLSL sources live in `shaders/` and are compiled to SPIR-V at build time
//! with shaderc. Accessors return the bytecode as `u32` words, ready for
//! `vkCreateShaderModule`.
//!
//! - [`triangle_vertex_shader`]: vertex inputs only, positions pass through
//! - [`mesh_vertex_shader`]: vertex inputs plus the per-frame uniform block
//!   at set 0, binding 0
//! - [`color_fragment_shader`]: writes the interpolated vertex color

use std::sync::OnceLock;

/// SPIR-V magic number, the first word of every module.
pub const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Embedded SPIR-V (raw bytes, not necessarily 4-byte aligned).
mod spirv_bytes {
    pub static TRIANGLE_VERT: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/triangle_vert.spv"));
    pub static MESH_VERT: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/mesh_vert.spv"));
    pub static COLOR_FRAG: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/color_frag.spv"));
}

/// Repack little-endian bytes into words.
fn bytes_to_spirv(bytes: &[u8]) -> Vec<u32> {
    debug_assert!(bytes.len() % 4 == 0, "SPIR-V length must be a multiple of 4");
    bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

static TRIANGLE_VERT_SPIRV: OnceLock<Vec<u32>> = OnceLock::new();
static MESH_VERT_SPIRV: OnceLock<Vec<u32>> = OnceLock::new();
static COLOR_FRAG_SPIRV: OnceLock<Vec<u32>> = OnceLock::new();

/// Vertex shader for uniform-free drawing.
pub fn triangle_vertex_shader() -> &'static [u32] {
    TRIANGLE_VERT_SPIRV.get_or_init(|| bytes_to_spirv(spirv_bytes::TRIANGLE_VERT))
}

/// Vertex shader reading the per-frame uniform block.
pub fn mesh_vertex_shader() -> &'static [u32] {
    MESH_VERT_SPIRV.get_or_init(|| bytes_to_spirv(spirv_bytes::MESH_VERT))
}

/// Fragment shader shared by both vertex shaders.
pub fn color_fragment_shader() -> &'static [u32] {
    COLOR_FRAG_SPIRV.get_or_init(|| bytes_to_spirv(spirv_bytes::COLOR_FRAG))
}
