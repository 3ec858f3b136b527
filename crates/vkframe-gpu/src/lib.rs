//! Vulkan abstraction layer for vkframe.
//!
//! This crate provides:
//! - Vulkan instance, surface and device management
//! - The [`GpuDevice`] seam the frame loop is written against
//! - Swapchain parameter selection
//! - Memory allocation via gpu-allocator
//! - Command pools, descriptors, render pass and pipeline helpers

pub mod capabilities;
pub mod command;
pub mod context;
pub mod descriptors;
pub mod device;
pub mod error;
pub mod instance;
pub mod memory;
pub mod pipeline;
pub mod render_pass;
pub mod surface;

pub use capabilities::{GpuCapabilities, GpuVendor};
pub use command::CommandPool;
pub use context::{GpuContext, GpuContextBuilder};
pub use descriptors::{
    create_uniform_set_layout, uniform_binding, write_uniform_buffer, DescriptorPool,
};
pub use device::{GpuDevice, QueueFamilies};
pub use error::{GpuError, Result};
pub use memory::{GpuAllocator, GpuBuffer};
pub use pipeline::{GraphicsPipeline, GraphicsPipelineConfig};
pub use render_pass::create_color_render_pass;
pub use surface::{
    calculate_extent, select_image_count, select_present_mode, select_surface_format,
    SurfaceSupport, PREFERRED_SURFACE_FORMAT,
};
