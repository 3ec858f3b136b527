//! Core types, math, and constants for the vkframe renderer.
//!
//! This crate provides the foundational types shared by the GPU layer,
//! the frame loop, and applications:
//! - Frame pacing constants
//! - Vertex and uniform block layouts
//! - Projection helpers for per-frame uniforms

pub mod math;
pub mod types;

pub use math::{aspect_projection, slot_for_frame};
pub use types::{FrameUniformBlock, Vertex};

/// Renderer-wide constants
pub mod constants {
    /// Number of frames the CPU may record ahead of the GPU.
    pub const FRAMES_IN_FLIGHT: usize = 2;
    /// Clear color of the single color attachment (opaque black, RGBA).
    pub const CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];
    /// Timeout used for fence and acquire waits.
    ///
    /// `u64::MAX` means "never fire"; a wait that still times out is fatal.
    pub const WAIT_FOREVER_NS: u64 = u64::MAX;
}
