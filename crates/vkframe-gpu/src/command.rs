//! Command pools and one-shot submissions.

use crate::error::Result;
use ash::vk;
use vkframe_core::constants::WAIT_FOREVER_NS;

/// A command pool bound to one queue family.
///
/// Frame slots allocate their long-lived buffers from it; uploads borrow a
/// transient buffer through [`CommandPool::submit_and_wait`].
pub struct CommandPool {
    pool: vk::CommandPool,
    queue_family: u32,
}

impl CommandPool {
    /// Create a pool for `queue_family`.
    ///
    /// Pass `RESET_COMMAND_BUFFER` when buffers are re-recorded individually,
    /// as frame slots are.
    ///
    /// # Safety
    /// The device must be valid and the queue family must exist.
    pub unsafe fn new(
        device: &ash::Device,
        queue_family: u32,
        flags: vk::CommandPoolCreateFlags,
    ) -> Result<Self> {
        let info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(queue_family)
            .flags(flags);
        let pool = device.create_command_pool(&info, None)?;
        Ok(Self { pool, queue_family })
    }

    pub fn handle(&self) -> vk::CommandPool {
        self.pool
    }

    pub fn queue_family(&self) -> u32 {
        self.queue_family
    }

    /// Record commands with `record`, submit them to `queue` and block until
    /// they have executed.
    ///
    /// The transient buffer and fence are released on every path.
    ///
    /// # Safety
    /// `queue` must belong to this pool's family and must not be used by
    /// another thread during the call.
    pub unsafe fn submit_and_wait<F>(
        &self,
        device: &ash::Device,
        queue: vk::Queue,
        record: F,
    ) -> Result<()>
    where
        F: FnOnce(vk::CommandBuffer),
    {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let buffers = device.allocate_command_buffers(&alloc_info)?;
        let cmd = buffers[0];

        let result = record_and_submit(device, queue, cmd, record);
        device.free_command_buffers(self.pool, &buffers);
        result
    }

    /// Destroy the pool. Buffers allocated from it are freed with it.
    ///
    /// # Safety
    /// No buffer from this pool may be pending execution.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        device.destroy_command_pool(self.pool, None);
    }
}

unsafe fn record_and_submit<F>(
    device: &ash::Device,
    queue: vk::Queue,
    cmd: vk::CommandBuffer,
    record: F,
) -> Result<()>
where
    F: FnOnce(vk::CommandBuffer),
{
    let begin_info =
        vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
    device.begin_command_buffer(cmd, &begin_info)?;
    record(cmd);
    device.end_command_buffer(cmd)?;

    let fence = device.create_fence(&vk::FenceCreateInfo::default(), None)?;
    let command_buffers = [cmd];
    let submit = vk::SubmitInfo::default().command_buffers(&command_buffers);

    let result = device
        .queue_submit(queue, &[submit], fence)
        .and_then(|()| device.wait_for_fences(&[fence], true, WAIT_FOREVER_NS));
    device.destroy_fence(fence, None);

    Ok(result?)
}
