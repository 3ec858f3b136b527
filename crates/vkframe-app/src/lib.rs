//! Application runner for the vkframe renderer.
//!
//! This crate wires the collaborators around the frame loop:
//! - Window creation and resize notifications
//! - GPU context, render pass, pipeline and geometry upload
//! - Per-slot uniform buffers refreshed every frame
//! - Event loop handling and fatal-error termination
//!
//! # Example
//!
//! ```no_run
//! use vkframe_app::{run_app, AppConfig, SceneData};
//! use vkframe_core::Vertex;
//!
//! fn main() -> anyhow::Result<()> {
//!     let scene = SceneData::vertices(vec![
//!         Vertex::new([0.0, -0.5], [1.0, 0.0, 0.0]),
//!         Vertex::new([0.5, 0.5], [0.0, 1.0, 0.0]),
//!         Vertex::new([-0.5, 0.5], [0.0, 0.0, 1.0]),
//!     ]);
//!     run_app(AppConfig::new("Triangle").with_scene(scene))
//! }
//! ```

mod config;
mod runner;
mod scene;
mod uniforms;

pub use config::{AppConfig, SceneData, SceneMode};
pub use runner::run_app;
pub use scene::SceneResources;
pub use uniforms::{uniform_block, SlotUniforms};

// Re-export commonly used types for convenience
pub use vkframe_gpu::{GpuContext, GpuContextBuilder};
pub use vkframe_render::{FrameStats, FrameStatus};
