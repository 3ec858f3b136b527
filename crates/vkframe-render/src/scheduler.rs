//! The per-frame loop.
//!
//! Each [`FrameScheduler::draw_frame`] call runs one iteration:
//!
//! 1. wait for the current slot's in-flight fence
//! 2. acquire a swapchain image, signaling the slot's image-available semaphore
//! 3. on a stale surface or pending resize, rebuild the swapchain and abandon
//!    the iteration without submitting (the slot is reused next call)
//! 4. reset the fence and command buffer, refresh uniforms, record
//! 5. submit, waiting on image-available and signaling render-finished and
//!    the fence
//! 6. present, waiting on render-finished
//!
//! The slot for a frame is `submitted_frames % FRAMES_IN_FLIGHT`, so an
//! abandoned iteration does not advance it.

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info, trace, warn};
use vkframe_core::constants::{FRAMES_IN_FLIGHT, WAIT_FOREVER_NS};
use vkframe_core::slot_for_frame;
use vkframe_gpu::{GpuDevice, GpuError};
use vkframe_platform::PresentationWindow;

use crate::error::{RenderError, Result};
use crate::frame::{FrameResourceSet, FrameSlot};
use crate::recorder::{record, Geometry, PipelineBinding, RenderTarget};
use crate::swapchain::{SwapchainManager, SwapchainPreferences, SwapchainState};

/// Outcome of one [`FrameScheduler::draw_frame`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameStatus {
    /// A frame was submitted and queued for presentation.
    Presented { slot: usize, image_index: u32 },
    /// The swapchain was rebuilt and nothing was submitted.
    SwapchainRecreated,
    /// The window or surface has no drawable area; nothing was submitted.
    Skipped,
}

/// Counters kept by the scheduler.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub submitted_frames: u64,
    pub recreations: u64,
}

/// Per-frame uniform refresh, run after a slot's fence has signaled and
/// before its command buffer is recorded.
pub trait FrameUniforms {
    /// Update the data read by `slot` for a frame drawn at `extent`.
    fn update(&mut self, slot: usize, extent: vk::Extent2D) -> Result<()>;
}

/// What every frame draws.
#[derive(Clone, Debug)]
pub struct FrameScene {
    pub pipeline: PipelineBinding,
    /// Empty, or one set per frame slot.
    pub descriptor_sets: Vec<vk::DescriptorSet>,
    pub geometry: Geometry,
}

/// Drives frame slots, the swapchain and the recorder.
pub struct FrameScheduler<D: GpuDevice, W: PresentationWindow> {
    device: Arc<D>,
    window: Arc<W>,
    frames: FrameResourceSet,
    swapchain: SwapchainManager,
    scene: FrameScene,
    uniforms: Option<Box<dyn FrameUniforms>>,
    stats: FrameStats,
    resize_pending: bool,
    shut_down: bool,
}

impl<D: GpuDevice, W: PresentationWindow> FrameScheduler<D, W> {
    /// Allocate frame slots from `command_pool` and build the first
    /// swapchain.
    ///
    /// # Safety
    /// The pool, render pass and every handle in `scene` must be valid for
    /// `device` and outlive the scheduler. The pool must allow individual
    /// command buffer resets.
    pub unsafe fn new(
        device: Arc<D>,
        window: Arc<W>,
        command_pool: vk::CommandPool,
        render_pass: vk::RenderPass,
        preferences: SwapchainPreferences,
        scene: FrameScene,
    ) -> Result<Self> {
        let sets = scene.descriptor_sets.len();
        if sets != 0 && sets != FRAMES_IN_FLIGHT {
            return Err(RenderError::InvalidScene(format!(
                "expected 0 or {FRAMES_IN_FLIGHT} descriptor sets, got {sets}"
            )));
        }

        let mut frames = FrameResourceSet::new(device.as_ref(), command_pool)?;
        let swapchain =
            match SwapchainManager::new(device.as_ref(), window.as_ref(), render_pass, preferences)
            {
                Ok(swapchain) => swapchain,
                Err(e) => {
                    frames.destroy(device.as_ref());
                    return Err(e);
                }
            };

        Ok(Self {
            device,
            window,
            frames,
            swapchain,
            scene,
            uniforms: None,
            stats: FrameStats::default(),
            resize_pending: false,
            shut_down: false,
        })
    }

    /// Refresh uniforms through `uniforms` every frame.
    pub fn with_uniforms(mut self, uniforms: Box<dyn FrameUniforms>) -> Self {
        self.uniforms = Some(uniforms);
        self
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Slot the next submitted frame will use.
    pub fn next_slot(&self) -> usize {
        slot_for_frame(self.stats.submitted_frames)
    }

    pub fn frame_slot(&self, slot_index: usize) -> FrameSlot {
        self.frames.acquire(slot_index)
    }

    pub fn swapchain(&self) -> Result<&SwapchainState> {
        self.swapchain.current()
    }

    pub fn device(&self) -> &Arc<D> {
        &self.device
    }

    pub fn window(&self) -> &Arc<W> {
        &self.window
    }

    /// Run one iteration of the frame loop.
    ///
    /// Stale surfaces and resizes are handled here and reported as
    /// [`FrameStatus::SwapchainRecreated`]; every error is fatal.
    pub fn draw_frame(&mut self) -> Result<FrameStatus> {
        if self.shut_down {
            return Err(RenderError::InvalidSurface(
                "frame scheduler has been shut down".into(),
            ));
        }

        let (width, height) = self.window.drawable_size();
        if width == 0 || height == 0 {
            trace!("Window has no drawable area, skipping frame");
            return Ok(FrameStatus::Skipped);
        }

        let slot_index = slot_for_frame(self.stats.submitted_frames);
        let slot = self.frames.acquire(slot_index);
        let device = Arc::clone(&self.device);

        // Wait slot
        unsafe { device.wait_for_fence(slot.in_flight, WAIT_FOREVER_NS) }.map_err(|e| match e {
            GpuError::Timeout => RenderError::FenceTimeout { slot: slot_index },
            other => RenderError::Gpu(other),
        })?;

        if self.window.take_resized() || self.resize_pending || !self.swapchain.is_live() {
            debug!("Window resized, recreating swapchain");
            return self.recreate_for_frame();
        }

        // Acquire image
        let (swapchain, extent) = {
            let state = self.swapchain.current()?;
            (state.swapchain, state.extent)
        };
        let acquired =
            unsafe { device.acquire_next_image(swapchain, WAIT_FOREVER_NS, slot.image_available) };
        let image_index = match acquired {
            Ok((index, false)) => index,
            Ok((index, true)) => {
                debug!(index, "Acquired image is suboptimal, recreating swapchain");
                let status = self.recreate_for_frame()?;
                // The acquire signaled a semaphore no submission will wait on.
                // Recreation left the device idle.
                unsafe {
                    self.frames
                        .renew_image_available(device.as_ref(), slot_index)?;
                }
                return Ok(status);
            }
            Err(e) if e.is_out_of_date() => {
                debug!("Swapchain out of date on acquire, recreating");
                return self.recreate_for_frame();
            }
            Err(GpuError::Timeout) => return Err(RenderError::AcquireTimeout),
            Err(e) => return Err(RenderError::Gpu(e)),
        };

        trace!(slot = slot_index, image = image_index, "Recording frame");

        let framebuffer = self
            .swapchain
            .current()?
            .framebuffer(image_index)
            .ok_or_else(|| {
                RenderError::InvalidSurface(format!("no framebuffer for image {image_index}"))
            })?;

        // Reset and record
        unsafe {
            device.reset_fence(slot.in_flight)?;
            device
                .reset_command_buffer(slot.command_buffer)
                .map_err(RenderError::recording("reset"))?;
        }

        if let Some(uniforms) = self.uniforms.as_mut() {
            uniforms.update(slot_index, extent)?;
        }

        let target = RenderTarget {
            render_pass: self.swapchain.render_pass(),
            framebuffer,
            extent,
        };
        let descriptor_set = self.scene.descriptor_sets.get(slot_index).copied();
        unsafe {
            record(
                device.as_ref(),
                slot.command_buffer,
                &target,
                &self.scene.pipeline,
                descriptor_set,
                &self.scene.geometry,
            )?;
        }

        // Submit
        let wait_semaphores = [slot.image_available];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [slot.command_buffer];
        let signal_semaphores = [slot.render_finished];
        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe { device.queue_submit(device.graphics_queue(), &submit_info, slot.in_flight) }
            .map_err(RenderError::Submission)?;
        self.stats.submitted_frames += 1;

        // Present
        let swapchains = [swapchain];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&signal_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        match unsafe { device.queue_present(device.present_queue(), &present_info) } {
            Ok(false) => {}
            Ok(true) => debug!("Swapchain suboptimal on present"),
            Err(e) if e.is_out_of_date() => debug!("Swapchain out of date on present"),
            Err(e) => return Err(RenderError::Presentation(e)),
        }

        Ok(FrameStatus::Presented {
            slot: slot_index,
            image_index,
        })
    }

    /// Tear down and rebuild the swapchain for the window's current size.
    ///
    /// While the window or the surface bounds leave no drawable area the
    /// rebuild is deferred to the next frame, and the current swapchain is
    /// kept until then.
    pub fn recreate_swapchain_resources(&mut self) -> Result<()> {
        let (width, height) = self.window.drawable_size();
        if width == 0 || height == 0 {
            debug!("Deferring swapchain recreation until the window has a drawable area");
            self.resize_pending = true;
            return Ok(());
        }

        let rebuilt = unsafe {
            self.swapchain
                .recreate(self.device.as_ref(), self.window.as_ref())?
                .is_some()
        };
        if !rebuilt {
            debug!("Deferring swapchain recreation until the surface has a drawable area");
            self.resize_pending = true;
            return Ok(());
        }

        self.resize_pending = false;
        self.stats.recreations += 1;
        Ok(())
    }

    fn recreate_for_frame(&mut self) -> Result<FrameStatus> {
        self.recreate_swapchain_resources()?;
        Ok(if self.resize_pending {
            FrameStatus::Skipped
        } else {
            FrameStatus::SwapchainRecreated
        })
    }

    /// Wait for the device and destroy the swapchain and every frame slot.
    ///
    /// Further [`Self::draw_frame`] calls fail. Calling this twice is a no-op.
    pub fn shutdown(&mut self) -> Result<()> {
        if self.shut_down {
            return Ok(());
        }

        unsafe {
            self.device.device_wait_idle()?;
            self.swapchain.destroy(self.device.as_ref());
            self.frames.destroy(self.device.as_ref());
        }
        self.shut_down = true;

        info!(
            "Frame scheduler shut down after {} frames ({} swapchain recreations)",
            self.stats.submitted_frames, self.stats.recreations
        );
        Ok(())
    }
}

impl<D: GpuDevice, W: PresentationWindow> Drop for FrameScheduler<D, W> {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!("Frame scheduler shutdown failed: {e}");
        }
    }
}
