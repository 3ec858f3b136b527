//! The device seam used by the frame loop.
//!
//! [`GpuDevice`] is the one explicit context object handed to every frame-loop
//! component: it bundles the logical device, the graphics and present queues,
//! and the presentation surface. [`crate::GpuContext`] implements it on top of
//! a real Vulkan driver; tests implement it with a recording mock.
//!
//! Every method mirrors exactly one Vulkan entry point so that call order and
//! structural field values (render area, clear values, wait stages) stay
//! observable.

use crate::error::Result;
use crate::surface::SurfaceSupport;
use ash::vk;

/// Queue family indices used for graphics and presentation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueFamilies {
    /// Family the graphics queue was created from.
    pub graphics: u32,
    /// Family the present queue was created from.
    pub present: u32,
}

impl QueueFamilies {
    /// Whether graphics and presentation share one family.
    pub const fn is_unified(&self) -> bool {
        self.graphics == self.present
    }
}

/// Logical device, queues and presentation surface.
///
/// All `unsafe` methods require that every handle passed in was created from
/// this device and is not destroyed while in use, as in the matching Vulkan
/// call.
pub trait GpuDevice {
    /// Queue that receives frame submissions.
    fn graphics_queue(&self) -> vk::Queue;

    /// Queue that receives presentation requests.
    fn present_queue(&self) -> vk::Queue;

    /// Queue families of the two queues.
    fn queue_families(&self) -> QueueFamilies;

    /// The presentation surface.
    fn surface(&self) -> vk::SurfaceKHR;

    /// Query current surface capabilities, formats and present modes.
    unsafe fn surface_support(&self) -> Result<SurfaceSupport>;

    /// Block until the device has finished all outstanding work.
    unsafe fn device_wait_idle(&self) -> Result<()>;

    // Synchronization

    unsafe fn create_semaphore(&self) -> Result<vk::Semaphore>;
    unsafe fn destroy_semaphore(&self, semaphore: vk::Semaphore);
    unsafe fn create_fence(&self, signaled: bool) -> Result<vk::Fence>;
    unsafe fn destroy_fence(&self, fence: vk::Fence);

    /// Wait for `fence`; returns [`crate::GpuError::Timeout`] if the timeout fires.
    unsafe fn wait_for_fence(&self, fence: vk::Fence, timeout_ns: u64) -> Result<()>;
    unsafe fn reset_fence(&self, fence: vk::Fence) -> Result<()>;

    // Command buffers

    unsafe fn allocate_command_buffers(
        &self,
        pool: vk::CommandPool,
        count: u32,
    ) -> Result<Vec<vk::CommandBuffer>>;
    unsafe fn free_command_buffers(&self, pool: vk::CommandPool, buffers: &[vk::CommandBuffer]);
    unsafe fn reset_command_buffer(&self, cmd: vk::CommandBuffer) -> Result<()>;
    unsafe fn begin_command_buffer(&self, cmd: vk::CommandBuffer) -> Result<()>;
    unsafe fn end_command_buffer(&self, cmd: vk::CommandBuffer) -> Result<()>;

    // Recording

    unsafe fn cmd_begin_render_pass(
        &self,
        cmd: vk::CommandBuffer,
        begin_info: &vk::RenderPassBeginInfo<'_>,
    );
    unsafe fn cmd_end_render_pass(&self, cmd: vk::CommandBuffer);
    unsafe fn cmd_bind_pipeline(&self, cmd: vk::CommandBuffer, pipeline: vk::Pipeline);
    unsafe fn cmd_bind_vertex_buffer(
        &self,
        cmd: vk::CommandBuffer,
        binding: u32,
        buffer: vk::Buffer,
        offset: vk::DeviceSize,
    );
    unsafe fn cmd_bind_index_buffer(
        &self,
        cmd: vk::CommandBuffer,
        buffer: vk::Buffer,
        offset: vk::DeviceSize,
        index_type: vk::IndexType,
    );
    unsafe fn cmd_set_viewport(&self, cmd: vk::CommandBuffer, viewport: vk::Viewport);
    unsafe fn cmd_set_scissor(&self, cmd: vk::CommandBuffer, scissor: vk::Rect2D);
    unsafe fn cmd_bind_descriptor_set(
        &self,
        cmd: vk::CommandBuffer,
        layout: vk::PipelineLayout,
        set: vk::DescriptorSet,
    );
    unsafe fn cmd_draw(
        &self,
        cmd: vk::CommandBuffer,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    );
    unsafe fn cmd_draw_indexed(
        &self,
        cmd: vk::CommandBuffer,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    );

    // Queues

    unsafe fn queue_submit(
        &self,
        queue: vk::Queue,
        submit: &vk::SubmitInfo<'_>,
        fence: vk::Fence,
    ) -> Result<()>;

    // Swapchain

    unsafe fn create_swapchain(
        &self,
        create_info: &vk::SwapchainCreateInfoKHR<'_>,
    ) -> Result<vk::SwapchainKHR>;
    unsafe fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> Result<Vec<vk::Image>>;
    unsafe fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR);

    /// Acquire the next presentable image, signaling `semaphore`.
    ///
    /// Returns the image index and whether the swapchain is suboptimal.
    /// Out-of-date surfaces report [`crate::GpuError::SurfaceOutOfDate`];
    /// an expired timeout reports [`crate::GpuError::Timeout`].
    unsafe fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        timeout_ns: u64,
        semaphore: vk::Semaphore,
    ) -> Result<(u32, bool)>;

    /// Queue an image for presentation. Returns whether the swapchain is
    /// suboptimal; out-of-date surfaces report
    /// [`crate::GpuError::SurfaceOutOfDate`].
    unsafe fn queue_present(
        &self,
        queue: vk::Queue,
        present_info: &vk::PresentInfoKHR<'_>,
    ) -> Result<bool>;

    // Views and framebuffers

    unsafe fn create_image_view(
        &self,
        create_info: &vk::ImageViewCreateInfo<'_>,
    ) -> Result<vk::ImageView>;
    unsafe fn destroy_image_view(&self, view: vk::ImageView);
    unsafe fn create_framebuffer(
        &self,
        create_info: &vk::FramebufferCreateInfo<'_>,
    ) -> Result<vk::Framebuffer>;
    unsafe fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer);
}
