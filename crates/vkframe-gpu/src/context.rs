//! GPU context management.

use crate::capabilities::GpuCapabilities;
use crate::device::{GpuDevice, QueueFamilies};
use crate::error::{GpuError, Result};
use crate::instance::{create_instance, required_device_extensions, select_physical_device};
use crate::memory::GpuAllocator;
use crate::surface::{create_surface, SurfaceSupport};
use ash::vk;
use parking_lot::Mutex;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::ffi::c_char;
use std::sync::Arc;

/// Main GPU context holding Vulkan resources.
///
/// Owns the instance, the presentation surface, the logical device with its
/// graphics and present queues, and the memory allocator. This is the
/// driver-backed [`GpuDevice`].
pub struct GpuContext {
    // Entry must be kept alive for the lifetime of the context
    #[allow(dead_code)]
    pub(crate) entry: ash::Entry,
    pub(crate) instance: ash::Instance,
    pub(crate) surface_loader: ash::khr::surface::Instance,
    pub(crate) surface: vk::SurfaceKHR,
    pub(crate) physical_device: vk::PhysicalDevice,
    pub(crate) device: Arc<ash::Device>,
    pub(crate) swapchain_loader: ash::khr::swapchain::Device,
    pub(crate) capabilities: GpuCapabilities,
    pub(crate) allocator: Mutex<GpuAllocator>,

    pub(crate) queue_families: QueueFamilies,
    pub(crate) graphics_queue: vk::Queue,
    pub(crate) present_queue: vk::Queue,
}

impl GpuContext {
    /// Get the Vulkan device handle.
    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    /// Get the physical device handle.
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    /// Get GPU capabilities.
    pub fn capabilities(&self) -> &GpuCapabilities {
        &self.capabilities
    }

    /// Get the Vulkan instance handle.
    pub fn instance(&self) -> &ash::Instance {
        &self.instance
    }

    /// Get access to the GPU allocator.
    pub fn allocator(&self) -> &Mutex<GpuAllocator> {
        &self.allocator
    }

    /// Wait for device to be idle.
    pub fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.device.device_wait_idle()?;
        }
        Ok(())
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();

            // Shutdown allocator BEFORE destroying device
            // This frees all VkDeviceMemory allocations
            self.allocator.lock().release();

            self.device.destroy_device(None);
            self.surface_loader.destroy_surface(self.surface, None);
            self.instance.destroy_instance(None);
        }
    }
}

impl GpuDevice for GpuContext {
    fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    fn present_queue(&self) -> vk::Queue {
        self.present_queue
    }

    fn queue_families(&self) -> QueueFamilies {
        self.queue_families
    }

    fn surface(&self) -> vk::SurfaceKHR {
        self.surface
    }

    unsafe fn surface_support(&self) -> Result<SurfaceSupport> {
        SurfaceSupport::query(&self.surface_loader, self.physical_device, self.surface)
    }

    unsafe fn device_wait_idle(&self) -> Result<()> {
        self.device.device_wait_idle()?;
        Ok(())
    }

    unsafe fn create_semaphore(&self) -> Result<vk::Semaphore> {
        Ok(self
            .device
            .create_semaphore(&vk::SemaphoreCreateInfo::default(), None)?)
    }

    unsafe fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        self.device.destroy_semaphore(semaphore, None);
    }

    unsafe fn create_fence(&self, signaled: bool) -> Result<vk::Fence> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        Ok(self
            .device
            .create_fence(&vk::FenceCreateInfo::default().flags(flags), None)?)
    }

    unsafe fn destroy_fence(&self, fence: vk::Fence) {
        self.device.destroy_fence(fence, None);
    }

    unsafe fn wait_for_fence(&self, fence: vk::Fence, timeout_ns: u64) -> Result<()> {
        match self.device.wait_for_fences(&[fence], true, timeout_ns) {
            Ok(()) => Ok(()),
            Err(vk::Result::TIMEOUT) => Err(GpuError::Timeout),
            Err(e) => Err(e.into()),
        }
    }

    unsafe fn reset_fence(&self, fence: vk::Fence) -> Result<()> {
        Ok(self.device.reset_fences(&[fence])?)
    }

    unsafe fn allocate_command_buffers(
        &self,
        pool: vk::CommandPool,
        count: u32,
    ) -> Result<Vec<vk::CommandBuffer>> {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);

        Ok(self.device.allocate_command_buffers(&alloc_info)?)
    }

    unsafe fn free_command_buffers(&self, pool: vk::CommandPool, buffers: &[vk::CommandBuffer]) {
        self.device.free_command_buffers(pool, buffers);
    }

    unsafe fn reset_command_buffer(&self, cmd: vk::CommandBuffer) -> Result<()> {
        self.device
            .reset_command_buffer(cmd, vk::CommandBufferResetFlags::empty())?;
        Ok(())
    }

    unsafe fn begin_command_buffer(&self, cmd: vk::CommandBuffer) -> Result<()> {
        // Re-recorded every frame, so no ONE_TIME_SUBMIT
        let begin_info = vk::CommandBufferBeginInfo::default();
        Ok(self.device.begin_command_buffer(cmd, &begin_info)?)
    }

    unsafe fn end_command_buffer(&self, cmd: vk::CommandBuffer) -> Result<()> {
        Ok(self.device.end_command_buffer(cmd)?)
    }

    unsafe fn cmd_begin_render_pass(
        &self,
        cmd: vk::CommandBuffer,
        begin_info: &vk::RenderPassBeginInfo<'_>,
    ) {
        self.device
            .cmd_begin_render_pass(cmd, begin_info, vk::SubpassContents::INLINE);
    }

    unsafe fn cmd_end_render_pass(&self, cmd: vk::CommandBuffer) {
        self.device.cmd_end_render_pass(cmd);
    }

    unsafe fn cmd_bind_pipeline(&self, cmd: vk::CommandBuffer, pipeline: vk::Pipeline) {
        self.device
            .cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, pipeline);
    }

    unsafe fn cmd_bind_vertex_buffer(
        &self,
        cmd: vk::CommandBuffer,
        binding: u32,
        buffer: vk::Buffer,
        offset: vk::DeviceSize,
    ) {
        self.device
            .cmd_bind_vertex_buffers(cmd, binding, &[buffer], &[offset]);
    }

    unsafe fn cmd_bind_index_buffer(
        &self,
        cmd: vk::CommandBuffer,
        buffer: vk::Buffer,
        offset: vk::DeviceSize,
        index_type: vk::IndexType,
    ) {
        self.device
            .cmd_bind_index_buffer(cmd, buffer, offset, index_type);
    }

    unsafe fn cmd_set_viewport(&self, cmd: vk::CommandBuffer, viewport: vk::Viewport) {
        self.device.cmd_set_viewport(cmd, 0, &[viewport]);
    }

    unsafe fn cmd_set_scissor(&self, cmd: vk::CommandBuffer, scissor: vk::Rect2D) {
        self.device.cmd_set_scissor(cmd, 0, &[scissor]);
    }

    unsafe fn cmd_bind_descriptor_set(
        &self,
        cmd: vk::CommandBuffer,
        layout: vk::PipelineLayout,
        set: vk::DescriptorSet,
    ) {
        self.device.cmd_bind_descriptor_sets(
            cmd,
            vk::PipelineBindPoint::GRAPHICS,
            layout,
            0,
            &[set],
            &[],
        );
    }

    unsafe fn cmd_draw(
        &self,
        cmd: vk::CommandBuffer,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) {
        self.device
            .cmd_draw(cmd, vertex_count, instance_count, first_vertex, first_instance);
    }

    unsafe fn cmd_draw_indexed(
        &self,
        cmd: vk::CommandBuffer,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        self.device.cmd_draw_indexed(
            cmd,
            index_count,
            instance_count,
            first_index,
            vertex_offset,
            first_instance,
        );
    }

    unsafe fn queue_submit(
        &self,
        queue: vk::Queue,
        submit: &vk::SubmitInfo<'_>,
        fence: vk::Fence,
    ) -> Result<()> {
        self.device
            .queue_submit(queue, std::slice::from_ref(submit), fence)?;
        Ok(())
    }

    unsafe fn create_swapchain(
        &self,
        create_info: &vk::SwapchainCreateInfoKHR<'_>,
    ) -> Result<vk::SwapchainKHR> {
        self.swapchain_loader
            .create_swapchain(create_info, None)
            .map_err(|e| GpuError::SwapchainCreation(e.to_string()))
    }

    unsafe fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> Result<Vec<vk::Image>> {
        Ok(self.swapchain_loader.get_swapchain_images(swapchain)?)
    }

    unsafe fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
        self.swapchain_loader.destroy_swapchain(swapchain, None);
    }

    unsafe fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        timeout_ns: u64,
        semaphore: vk::Semaphore,
    ) -> Result<(u32, bool)> {
        match self.swapchain_loader.acquire_next_image(
            swapchain,
            timeout_ns,
            semaphore,
            vk::Fence::null(),
        ) {
            Ok((index, suboptimal)) => Ok((index, suboptimal)),
            // OUT_OF_DATE means no image was acquired; caller must recreate the swapchain.
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Err(GpuError::SurfaceOutOfDate),
            Err(vk::Result::TIMEOUT | vk::Result::NOT_READY) => Err(GpuError::Timeout),
            Err(e) => Err(GpuError::from(e)),
        }
    }

    unsafe fn queue_present(
        &self,
        queue: vk::Queue,
        present_info: &vk::PresentInfoKHR<'_>,
    ) -> Result<bool> {
        match self.swapchain_loader.queue_present(queue, present_info) {
            Ok(suboptimal) => Ok(suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Err(GpuError::SurfaceOutOfDate),
            Err(e) => Err(GpuError::from(e)),
        }
    }

    unsafe fn create_image_view(
        &self,
        create_info: &vk::ImageViewCreateInfo<'_>,
    ) -> Result<vk::ImageView> {
        Ok(self.device.create_image_view(create_info, None)?)
    }

    unsafe fn destroy_image_view(&self, view: vk::ImageView) {
        self.device.destroy_image_view(view, None);
    }

    unsafe fn create_framebuffer(
        &self,
        create_info: &vk::FramebufferCreateInfo<'_>,
    ) -> Result<vk::Framebuffer> {
        Ok(self.device.create_framebuffer(create_info, None)?)
    }

    unsafe fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer) {
        self.device.destroy_framebuffer(framebuffer, None);
    }
}

/// Builder for creating a GPU context.
pub struct GpuContextBuilder {
    app_name: String,
    enable_validation: bool,
}

impl Default for GpuContextBuilder {
    fn default() -> Self {
        Self {
            app_name: "vkframe".to_string(),
            enable_validation: cfg!(debug_assertions),
        }
    }
}

impl GpuContextBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the application name.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    /// Enable or disable validation layers.
    pub fn validation(mut self, enable: bool) -> Self {
        self.enable_validation = enable;
        self
    }

    /// Build the GPU context for presenting to `window`.
    pub fn build<W>(self, window: &W) -> Result<GpuContext>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        // Load Vulkan entry point
        let entry = unsafe { ash::Entry::load() }
            .map_err(|e| GpuError::Other(format!("Failed to load Vulkan: {e}")))?;

        let display = window
            .display_handle()
            .map_err(|e| GpuError::SurfaceCreation(format!("Failed to get display handle: {e}")))?
            .as_raw();

        // Create Vulkan instance
        let instance =
            unsafe { create_instance(&entry, &self.app_name, display, self.enable_validation) }?;

        // Surface must exist before device selection so present support can be checked
        let surface = unsafe { create_surface(&entry, &instance, window) }?;
        let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

        let (physical_device, queue_families, capabilities) =
            unsafe { select_physical_device(&instance, &surface_loader, surface) }?;
        tracing::info!("Selected GPU: {}", capabilities.summary());

        // Create logical device
        let (device, graphics_queue, present_queue) =
            unsafe { create_device(&instance, physical_device, queue_families)? };

        let device = Arc::new(device);
        let swapchain_loader = ash::khr::swapchain::Device::new(&instance, &device);

        // Create GPU allocator
        let allocator = unsafe { GpuAllocator::new(&instance, device.clone(), physical_device) }?;

        Ok(GpuContext {
            entry,
            instance,
            surface_loader,
            surface,
            physical_device,
            device,
            swapchain_loader,
            capabilities,
            allocator: Mutex::new(allocator),
            queue_families,
            graphics_queue,
            present_queue,
        })
    }
}

/// Create the logical device and retrieve queues.
///
/// # Safety
/// The instance and physical device must be valid.
unsafe fn create_device(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    queue_families: QueueFamilies,
) -> Result<(ash::Device, vk::Queue, vk::Queue)> {
    // Collect unique queue families
    let mut unique_families = vec![queue_families.graphics];
    if !queue_families.is_unified() {
        unique_families.push(queue_families.present);
    }

    let queue_priority = 1.0_f32;
    let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = unique_families
        .iter()
        .map(|&family| {
            vk::DeviceQueueCreateInfo::default()
                .queue_family_index(family)
                .queue_priorities(std::slice::from_ref(&queue_priority))
        })
        .collect();

    let extension_names: Vec<*const c_char> = required_device_extensions()
        .iter()
        .map(|ext| ext.as_ptr())
        .collect();

    let features = vk::PhysicalDeviceFeatures::default();

    let device_create_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queue_create_infos)
        .enabled_extension_names(&extension_names)
        .enabled_features(&features);

    let device = instance
        .create_device(physical_device, &device_create_info, None)
        .map_err(GpuError::from)?;

    let graphics_queue = device.get_device_queue(queue_families.graphics, 0);
    let present_queue = device.get_device_queue(queue_families.present, 0);

    Ok((device, graphics_queue, present_queue))
}
