//! Per-slot uniform buffers refreshed by the frame scheduler.

use std::sync::Arc;
use std::time::Instant;

use ash::vk;
use tracing::warn;
use vkframe_core::{aspect_projection, FrameUniformBlock};
use vkframe_gpu::{GpuBuffer, GpuContext};
use vkframe_render::{FrameUniforms, RenderError};

/// Uniform block for a frame drawn at `extent`, `elapsed_secs` after start.
pub fn uniform_block(extent: vk::Extent2D, elapsed_secs: f32) -> FrameUniformBlock {
    FrameUniformBlock::new(
        aspect_projection(extent.width, extent.height),
        extent.width,
        extent.height,
        elapsed_secs,
    )
}

/// One host-visible uniform buffer per frame slot.
///
/// A slot's buffer is only written after the scheduler has waited on that
/// slot's fence, so the GPU never reads a block while it is being replaced.
pub struct SlotUniforms {
    gpu: Arc<GpuContext>,
    buffers: Vec<GpuBuffer>,
    start: Instant,
}

impl SlotUniforms {
    pub fn new(gpu: Arc<GpuContext>) -> Self {
        Self {
            gpu,
            buffers: Vec::new(),
            start: Instant::now(),
        }
    }

    /// Take ownership of the buffer for the next slot.
    pub(crate) fn push(&mut self, buffer: GpuBuffer) {
        self.buffers.push(buffer);
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

impl FrameUniforms for SlotUniforms {
    fn update(&mut self, slot: usize, extent: vk::Extent2D) -> vkframe_render::Result<()> {
        let buffer = self.buffers.get(slot).ok_or_else(|| {
            RenderError::InvalidScene(format!("no uniform buffer for slot {slot}"))
        })?;
        let block = uniform_block(extent, self.start.elapsed().as_secs_f32());
        buffer.write(std::slice::from_ref(&block))?;
        Ok(())
    }
}

impl Drop for SlotUniforms {
    fn drop(&mut self) {
        let mut allocator = self.gpu.allocator().lock();
        for mut buffer in self.buffers.drain(..) {
            if let Err(e) = allocator.free_buffer(&mut buffer) {
                warn!("Failed to free uniform buffer: {e}");
            }
        }
    }
}
