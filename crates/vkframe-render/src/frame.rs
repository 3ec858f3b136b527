//! Per-frame-in-flight resources.

use ash::vk;
use vkframe_core::constants::FRAMES_IN_FLIGHT;
use vkframe_gpu::GpuDevice;

use crate::error::{RenderError, Result};

/// Resources owned by one frame in flight.
///
/// Handles are plain copies; the owning [`FrameResourceSet`] destroys them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameSlot {
    /// Command buffer re-recorded every time the slot is used.
    pub command_buffer: vk::CommandBuffer,
    /// Signaled when the GPU has finished the slot's last submission.
    pub in_flight: vk::Fence,
    /// Signaled by image acquisition, waited on by the submission.
    pub image_available: vk::Semaphore,
    /// Signaled by the submission, waited on by presentation.
    pub render_finished: vk::Semaphore,
}

/// Fixed pool of [`FRAMES_IN_FLIGHT`] frame slots.
///
/// Created once at startup and reused in round-robin order. Fences start
/// signaled so the first wait on each slot returns immediately.
pub struct FrameResourceSet {
    pool: vk::CommandPool,
    slots: Vec<FrameSlot>,
}

impl FrameResourceSet {
    /// Allocate every slot from `pool`.
    ///
    /// `pool` must allow individual command buffer resets.
    ///
    /// # Safety
    /// The device and pool must be valid.
    pub unsafe fn new<D: GpuDevice + ?Sized>(device: &D, pool: vk::CommandPool) -> Result<Self> {
        let command_buffers = device
            .allocate_command_buffers(pool, FRAMES_IN_FLIGHT as u32)
            .map_err(RenderError::ResourceCreation)?;

        let mut set = Self {
            pool,
            slots: Vec::with_capacity(FRAMES_IN_FLIGHT),
        };

        for command_buffer in command_buffers.iter().copied() {
            match create_slot_sync(device, command_buffer) {
                Ok(slot) => set.slots.push(slot),
                Err(e) => {
                    // Slots created so far plus the unused command buffers
                    set.destroy_sync(device);
                    device.free_command_buffers(pool, &command_buffers);
                    return Err(e);
                }
            }
        }

        Ok(set)
    }

    /// The slot for round-robin index `slot_index`.
    ///
    /// # Panics
    /// If `slot_index >= FRAMES_IN_FLIGHT`.
    pub fn acquire(&self, slot_index: usize) -> FrameSlot {
        self.slots[slot_index]
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the slots have been destroyed.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Replace the image-available semaphore of a slot.
    ///
    /// Used when an acquired image is abandoned: the old semaphore still
    /// carries a signal nobody will wait on.
    ///
    /// # Safety
    /// No pending GPU work may reference the old semaphore.
    pub unsafe fn renew_image_available<D: GpuDevice + ?Sized>(
        &mut self,
        device: &D,
        slot_index: usize,
    ) -> Result<()> {
        let fresh = device
            .create_semaphore()
            .map_err(RenderError::ResourceCreation)?;
        let slot = &mut self.slots[slot_index];
        device.destroy_semaphore(slot.image_available);
        slot.image_available = fresh;
        Ok(())
    }

    /// Destroy every slot.
    ///
    /// # Safety
    /// The device must be idle with respect to all slots.
    pub unsafe fn destroy<D: GpuDevice + ?Sized>(&mut self, device: &D) {
        let command_buffers: Vec<_> = self.slots.iter().map(|s| s.command_buffer).collect();
        self.destroy_sync(device);
        if !command_buffers.is_empty() {
            device.free_command_buffers(self.pool, &command_buffers);
        }
    }

    unsafe fn destroy_sync<D: GpuDevice + ?Sized>(&mut self, device: &D) {
        for slot in self.slots.drain(..) {
            device.destroy_semaphore(slot.image_available);
            device.destroy_semaphore(slot.render_finished);
            device.destroy_fence(slot.in_flight);
        }
    }
}

unsafe fn create_slot_sync<D: GpuDevice + ?Sized>(
    device: &D,
    command_buffer: vk::CommandBuffer,
) -> Result<FrameSlot> {
    let image_available = device
        .create_semaphore()
        .map_err(RenderError::ResourceCreation)?;
    let render_finished = match device.create_semaphore() {
        Ok(s) => s,
        Err(e) => {
            device.destroy_semaphore(image_available);
            return Err(RenderError::ResourceCreation(e));
        }
    };
    let in_flight = match device.create_fence(true) {
        Ok(f) => f,
        Err(e) => {
            device.destroy_semaphore(image_available);
            device.destroy_semaphore(render_finished);
            return Err(RenderError::ResourceCreation(e));
        }
    };

    Ok(FrameSlot {
        command_buffer,
        in_flight,
        image_available,
        render_finished,
    })
}
