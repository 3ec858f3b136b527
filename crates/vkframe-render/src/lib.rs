//! Frame loop for vkframe.
//!
//! This crate provides:
//! - Frames-in-flight slots with their command buffers and sync primitives
//! - Swapchain construction, teardown and recreation
//! - Command recording for a single clear-and-draw render pass
//! - The frame scheduler tying acquire, record, submit and present together

pub mod error;
pub mod frame;
pub mod recorder;
pub mod scheduler;
pub mod swapchain;

#[cfg(test)]
mod mock;

pub use error::{RenderError, Result};
pub use frame::{FrameResourceSet, FrameSlot};
pub use recorder::{record, DrawMode, Geometry, PipelineBinding, RenderTarget};
pub use scheduler::{FrameScene, FrameScheduler, FrameStats, FrameStatus, FrameUniforms};
pub use swapchain::{SwapchainManager, SwapchainPreferences, SwapchainState};
