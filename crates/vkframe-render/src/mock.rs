//! Recording `GpuDevice` used by the frame loop tests.
//!
//! Fences model delayed GPU completion: a submitted fence stays pending until
//! the CPU waits on it (or waits for device idle). Misuse that a validation
//! layer would flag is collected in a violation log instead of panicking so
//! tests can assert on it.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use ash::vk::{self, Handle};
use parking_lot::Mutex;
use vkframe_gpu::{GpuDevice, GpuError, QueueFamilies, Result, SurfaceSupport};
use vkframe_platform::PresentationWindow;

pub const GRAPHICS_QUEUE: u64 = 0x10;
pub const PRESENT_QUEUE: u64 = 0x11;
pub const COMMAND_POOL: u64 = 0x20;
pub const SURFACE: u64 = 0x30;

/// One observed device call. Handles are raw values.
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    DeviceWaitIdle,
    CreateSemaphore(u64),
    DestroySemaphore(u64),
    CreateFence {
        fence: u64,
        signaled: bool,
    },
    DestroyFence(u64),
    WaitForFence(u64),
    ResetFence(u64),
    AllocateCommandBuffers(usize),
    FreeCommandBuffers(usize),
    ResetCommandBuffer(u64),
    BeginCommandBuffer(u64),
    EndCommandBuffer(u64),
    BeginRenderPass {
        cmd: u64,
        render_pass: u64,
        framebuffer: u64,
        render_area: (i32, i32, u32, u32),
        clear_colors: Vec<[f32; 4]>,
    },
    EndRenderPass(u64),
    BindPipeline {
        cmd: u64,
        pipeline: u64,
    },
    BindVertexBuffer {
        cmd: u64,
        binding: u32,
        buffer: u64,
        offset: u64,
    },
    BindIndexBuffer {
        cmd: u64,
        buffer: u64,
        offset: u64,
        index_type: vk::IndexType,
    },
    SetViewport {
        cmd: u64,
        rect: [f32; 4],
        depth: (f32, f32),
    },
    SetScissor {
        cmd: u64,
        offset: (i32, i32),
        extent: (u32, u32),
    },
    BindDescriptorSet {
        cmd: u64,
        layout: u64,
        set: u64,
    },
    Draw {
        cmd: u64,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    },
    DrawIndexed {
        cmd: u64,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    },
    QueueSubmit {
        queue: u64,
        wait_semaphores: Vec<u64>,
        wait_stages: Vec<vk::PipelineStageFlags>,
        command_buffers: Vec<u64>,
        signal_semaphores: Vec<u64>,
        fence: u64,
    },
    CreateSwapchain {
        swapchain: u64,
        min_image_count: u32,
        extent: (u32, u32),
        format: vk::Format,
        present_mode: vk::PresentModeKHR,
        sharing_mode: vk::SharingMode,
    },
    DestroySwapchain(u64),
    AcquireNextImage {
        swapchain: u64,
        semaphore: u64,
    },
    QueuePresent {
        queue: u64,
        wait_semaphores: Vec<u64>,
        swapchains: Vec<u64>,
        image_indices: Vec<u32>,
    },
    CreateImageView {
        view: u64,
        image: u64,
    },
    DestroyImageView(u64),
    CreateFramebuffer {
        framebuffer: u64,
        attachments: Vec<u64>,
        extent: (u32, u32),
    },
    DestroyFramebuffer(u64),
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BeginCommandBuffer(cmd) => write!(f, "begin cmd={cmd:#x}"),
            Self::EndCommandBuffer(cmd) => write!(f, "end cmd={cmd:#x}"),
            Self::BeginRenderPass {
                render_pass,
                framebuffer,
                render_area: (x, y, w, h),
                clear_colors,
                ..
            } => write!(
                f,
                "begin_render_pass pass={render_pass:#x} fb={framebuffer:#x} area=({x},{y},{w}x{h}) clear={clear_colors:?}"
            ),
            Self::EndRenderPass(_) => write!(f, "end_render_pass"),
            Self::BindPipeline { pipeline, .. } => write!(f, "bind_pipeline {pipeline:#x}"),
            Self::BindVertexBuffer {
                binding,
                buffer,
                offset,
                ..
            } => write!(f, "bind_vertex_buffer binding={binding} buffer={buffer:#x} offset={offset}"),
            Self::BindIndexBuffer {
                buffer,
                offset,
                index_type,
                ..
            } => {
                let bits = if *index_type == vk::IndexType::UINT32 { 32 } else { 16 };
                write!(f, "bind_index_buffer buffer={buffer:#x} offset={offset} u{bits}")
            }
            Self::SetViewport {
                rect: [x, y, w, h],
                depth: (min, max),
                ..
            } => write!(f, "set_viewport ({x},{y},{w}x{h}) depth={min}..{max}"),
            Self::SetScissor {
                offset: (x, y),
                extent: (w, h),
                ..
            } => write!(f, "set_scissor ({x},{y},{w}x{h})"),
            Self::BindDescriptorSet { layout, set, .. } => {
                write!(f, "bind_descriptor_set layout={layout:#x} set={set:#x}")
            }
            Self::Draw {
                vertex_count,
                instance_count,
                first_vertex,
                first_instance,
                ..
            } => write!(
                f,
                "draw vertices={vertex_count} instances={instance_count} first_vertex={first_vertex} first_instance={first_instance}"
            ),
            Self::DrawIndexed {
                index_count,
                instance_count,
                first_index,
                vertex_offset,
                first_instance,
                ..
            } => write!(
                f,
                "draw_indexed indices={index_count} instances={instance_count} first_index={first_index} vertex_offset={vertex_offset} first_instance={first_instance}"
            ),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Scripted result of the next image acquisition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AcquireOutcome {
    Success,
    Suboptimal,
    OutOfDate,
    Timeout,
}

/// Scripted result of the next presentation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PresentOutcome {
    Success,
    Suboptimal,
    OutOfDate,
    DeviceLost,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FenceState {
    Unsignaled,
    Pending,
    Signaled,
}

struct State {
    next_handle: u64,
    calls: Vec<Call>,
    violations: Vec<String>,
    fences: HashMap<u64, FenceState>,
    semaphores: HashSet<u64>,
    last_submit_fence: HashMap<u64, u64>,
    recording: HashSet<u64>,
    swapchains: HashMap<u64, Vec<u64>>,
    views: HashSet<u64>,
    framebuffers: HashSet<u64>,
    next_image: u32,
    acquire_script: VecDeque<AcquireOutcome>,
    present_script: VecDeque<PresentOutcome>,
    support: SurfaceSupport,
    fail_fence_waits: bool,
    fail_begin: bool,
}

impl State {
    fn handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn violation(&mut self, message: String) {
        self.violations.push(message);
    }
}

/// In-memory GPU that records every call.
pub struct MockGpu {
    families: QueueFamilies,
    state: Mutex<State>,
}

impl MockGpu {
    pub fn new() -> Self {
        Self::with_queue_families(QueueFamilies {
            graphics: 0,
            present: 0,
        })
    }

    pub fn with_queue_families(families: QueueFamilies) -> Self {
        Self {
            families,
            state: Mutex::new(State {
                next_handle: 0x1000,
                calls: Vec::new(),
                violations: Vec::new(),
                fences: HashMap::new(),
                semaphores: HashSet::new(),
                last_submit_fence: HashMap::new(),
                recording: HashSet::new(),
                swapchains: HashMap::new(),
                views: HashSet::new(),
                framebuffers: HashSet::new(),
                next_image: 0,
                acquire_script: VecDeque::new(),
                present_script: VecDeque::new(),
                support: default_support(),
                fail_fence_waits: false,
                fail_begin: false,
            }),
        }
    }

    pub fn command_pool(&self) -> vk::CommandPool {
        vk::CommandPool::from_raw(COMMAND_POOL)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn violations(&self) -> Vec<String> {
        self.state.lock().violations.clone()
    }

    pub fn fence_signaled(&self, fence: vk::Fence) -> bool {
        self.state.lock().fences.get(&fence.as_raw()) == Some(&FenceState::Signaled)
    }

    pub fn live_semaphores(&self) -> usize {
        self.state.lock().semaphores.len()
    }

    pub fn live_fences(&self) -> usize {
        self.state.lock().fences.len()
    }

    pub fn live_swapchain_objects(&self) -> (usize, usize, usize) {
        let state = self.state.lock();
        (
            state.swapchains.len(),
            state.views.len(),
            state.framebuffers.len(),
        )
    }

    pub fn script_acquire(&self, outcome: AcquireOutcome) {
        self.state.lock().acquire_script.push_back(outcome);
    }

    pub fn script_present(&self, outcome: PresentOutcome) {
        self.state.lock().present_script.push_back(outcome);
    }

    pub fn set_capabilities(&self, capabilities: vk::SurfaceCapabilitiesKHR) {
        self.state.lock().support.capabilities = capabilities;
    }

    pub fn set_formats(&self, formats: Vec<vk::SurfaceFormatKHR>) {
        self.state.lock().support.formats = formats;
    }

    pub fn fail_fence_waits(&self) {
        self.state.lock().fail_fence_waits = true;
    }

    pub fn fail_command_buffer_begin(&self) {
        self.state.lock().fail_begin = true;
    }

    fn record(&self, call: Call) {
        self.state.lock().calls.push(call);
    }
}

impl Default for MockGpu {
    fn default() -> Self {
        Self::new()
    }
}

/// Surface with two minimum images, no maximum and generous extent bounds.
pub fn default_support() -> SurfaceSupport {
    SurfaceSupport {
        capabilities: capabilities((1, 1), (8192, 8192), 2, 0),
        formats: vec![vkframe_gpu::PREFERRED_SURFACE_FORMAT],
        present_modes: vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX],
    }
}

pub fn capabilities(
    min_extent: (u32, u32),
    max_extent: (u32, u32),
    min_images: u32,
    max_images: u32,
) -> vk::SurfaceCapabilitiesKHR {
    vk::SurfaceCapabilitiesKHR {
        min_image_count: min_images,
        max_image_count: max_images,
        min_image_extent: vk::Extent2D {
            width: min_extent.0,
            height: min_extent.1,
        },
        max_image_extent: vk::Extent2D {
            width: max_extent.0,
            height: max_extent.1,
        },
        current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
        supported_composite_alpha: vk::CompositeAlphaFlagsKHR::OPAQUE,
        ..Default::default()
    }
}

unsafe fn raw_slice<'a, T>(ptr: *const T, len: u32) -> &'a [T] {
    if ptr.is_null() || len == 0 {
        &[]
    } else {
        std::slice::from_raw_parts(ptr, len as usize)
    }
}

fn raws<H: Handle + Copy>(handles: &[H]) -> Vec<u64> {
    handles.iter().map(|h| h.as_raw()).collect()
}

impl GpuDevice for MockGpu {
    fn graphics_queue(&self) -> vk::Queue {
        vk::Queue::from_raw(GRAPHICS_QUEUE)
    }

    fn present_queue(&self) -> vk::Queue {
        vk::Queue::from_raw(PRESENT_QUEUE)
    }

    fn queue_families(&self) -> QueueFamilies {
        self.families
    }

    fn surface(&self) -> vk::SurfaceKHR {
        vk::SurfaceKHR::from_raw(SURFACE)
    }

    unsafe fn surface_support(&self) -> Result<SurfaceSupport> {
        Ok(self.state.lock().support.clone())
    }

    unsafe fn device_wait_idle(&self) -> Result<()> {
        let mut state = self.state.lock();
        for fence in state.fences.values_mut() {
            if *fence == FenceState::Pending {
                *fence = FenceState::Signaled;
            }
        }
        state.calls.push(Call::DeviceWaitIdle);
        Ok(())
    }

    unsafe fn create_semaphore(&self) -> Result<vk::Semaphore> {
        let mut state = self.state.lock();
        let raw = state.handle();
        state.semaphores.insert(raw);
        state.calls.push(Call::CreateSemaphore(raw));
        Ok(vk::Semaphore::from_raw(raw))
    }

    unsafe fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        let mut state = self.state.lock();
        let raw = semaphore.as_raw();
        if !state.semaphores.remove(&raw) {
            state.violation(format!("destroyed unknown semaphore {raw:#x}"));
        }
        state.calls.push(Call::DestroySemaphore(raw));
    }

    unsafe fn create_fence(&self, signaled: bool) -> Result<vk::Fence> {
        let mut state = self.state.lock();
        let raw = state.handle();
        let initial = if signaled {
            FenceState::Signaled
        } else {
            FenceState::Unsignaled
        };
        state.fences.insert(raw, initial);
        state.calls.push(Call::CreateFence {
            fence: raw,
            signaled,
        });
        Ok(vk::Fence::from_raw(raw))
    }

    unsafe fn destroy_fence(&self, fence: vk::Fence) {
        let mut state = self.state.lock();
        let raw = fence.as_raw();
        if state.fences.remove(&raw) == Some(FenceState::Pending) {
            state.violation(format!("destroyed fence {raw:#x} while its work was pending"));
        }
        state.calls.push(Call::DestroyFence(raw));
    }

    unsafe fn wait_for_fence(&self, fence: vk::Fence, _timeout_ns: u64) -> Result<()> {
        let mut state = self.state.lock();
        let raw = fence.as_raw();
        state.calls.push(Call::WaitForFence(raw));
        if state.fail_fence_waits {
            return Err(GpuError::Timeout);
        }
        match state.fences.get(&raw).copied() {
            Some(FenceState::Signaled) => Ok(()),
            Some(FenceState::Pending) => {
                state.fences.insert(raw, FenceState::Signaled);
                Ok(())
            }
            // Nothing will ever signal it
            Some(FenceState::Unsignaled) => Err(GpuError::Timeout),
            None => Err(GpuError::InvalidState(format!("unknown fence {raw:#x}"))),
        }
    }

    unsafe fn reset_fence(&self, fence: vk::Fence) -> Result<()> {
        let mut state = self.state.lock();
        let raw = fence.as_raw();
        if state.fences.get(&raw) == Some(&FenceState::Pending) {
            state.violation(format!("reset fence {raw:#x} while its work was pending"));
        }
        state.fences.insert(raw, FenceState::Unsignaled);
        state.calls.push(Call::ResetFence(raw));
        Ok(())
    }

    unsafe fn allocate_command_buffers(
        &self,
        _pool: vk::CommandPool,
        count: u32,
    ) -> Result<Vec<vk::CommandBuffer>> {
        let mut state = self.state.lock();
        let buffers = (0..count)
            .map(|_| vk::CommandBuffer::from_raw(state.handle()))
            .collect();
        state.calls.push(Call::AllocateCommandBuffers(count as usize));
        Ok(buffers)
    }

    unsafe fn free_command_buffers(&self, _pool: vk::CommandPool, buffers: &[vk::CommandBuffer]) {
        self.record(Call::FreeCommandBuffers(buffers.len()));
    }

    unsafe fn reset_command_buffer(&self, cmd: vk::CommandBuffer) -> Result<()> {
        let mut state = self.state.lock();
        let raw = cmd.as_raw();
        if let Some(&fence) = state.last_submit_fence.get(&raw) {
            if state.fences.get(&fence) == Some(&FenceState::Pending) {
                state.violation(format!(
                    "reset command buffer {raw:#x} before fence {fence:#x} signaled"
                ));
            }
        }
        state.calls.push(Call::ResetCommandBuffer(raw));
        Ok(())
    }

    unsafe fn begin_command_buffer(&self, cmd: vk::CommandBuffer) -> Result<()> {
        let mut state = self.state.lock();
        let raw = cmd.as_raw();
        if state.fail_begin {
            return Err(GpuError::Vulkan(vk::Result::ERROR_OUT_OF_HOST_MEMORY));
        }
        if !state.recording.insert(raw) {
            state.violation(format!("began command buffer {raw:#x} twice"));
        }
        state.calls.push(Call::BeginCommandBuffer(raw));
        Ok(())
    }

    unsafe fn end_command_buffer(&self, cmd: vk::CommandBuffer) -> Result<()> {
        let mut state = self.state.lock();
        let raw = cmd.as_raw();
        if !state.recording.remove(&raw) {
            state.violation(format!("ended command buffer {raw:#x} that was not recording"));
        }
        state.calls.push(Call::EndCommandBuffer(raw));
        Ok(())
    }

    unsafe fn cmd_begin_render_pass(
        &self,
        cmd: vk::CommandBuffer,
        begin_info: &vk::RenderPassBeginInfo<'_>,
    ) {
        let clear_colors = raw_slice(begin_info.p_clear_values, begin_info.clear_value_count)
            .iter()
            .map(|v| v.color.float32)
            .collect();
        let area = begin_info.render_area;
        self.record(Call::BeginRenderPass {
            cmd: cmd.as_raw(),
            render_pass: begin_info.render_pass.as_raw(),
            framebuffer: begin_info.framebuffer.as_raw(),
            render_area: (
                area.offset.x,
                area.offset.y,
                area.extent.width,
                area.extent.height,
            ),
            clear_colors,
        });
    }

    unsafe fn cmd_end_render_pass(&self, cmd: vk::CommandBuffer) {
        self.record(Call::EndRenderPass(cmd.as_raw()));
    }

    unsafe fn cmd_bind_pipeline(&self, cmd: vk::CommandBuffer, pipeline: vk::Pipeline) {
        self.record(Call::BindPipeline {
            cmd: cmd.as_raw(),
            pipeline: pipeline.as_raw(),
        });
    }

    unsafe fn cmd_bind_vertex_buffer(
        &self,
        cmd: vk::CommandBuffer,
        binding: u32,
        buffer: vk::Buffer,
        offset: vk::DeviceSize,
    ) {
        self.record(Call::BindVertexBuffer {
            cmd: cmd.as_raw(),
            binding,
            buffer: buffer.as_raw(),
            offset,
        });
    }

    unsafe fn cmd_bind_index_buffer(
        &self,
        cmd: vk::CommandBuffer,
        buffer: vk::Buffer,
        offset: vk::DeviceSize,
        index_type: vk::IndexType,
    ) {
        self.record(Call::BindIndexBuffer {
            cmd: cmd.as_raw(),
            buffer: buffer.as_raw(),
            offset,
            index_type,
        });
    }

    unsafe fn cmd_set_viewport(&self, cmd: vk::CommandBuffer, viewport: vk::Viewport) {
        self.record(Call::SetViewport {
            cmd: cmd.as_raw(),
            rect: [viewport.x, viewport.y, viewport.width, viewport.height],
            depth: (viewport.min_depth, viewport.max_depth),
        });
    }

    unsafe fn cmd_set_scissor(&self, cmd: vk::CommandBuffer, scissor: vk::Rect2D) {
        self.record(Call::SetScissor {
            cmd: cmd.as_raw(),
            offset: (scissor.offset.x, scissor.offset.y),
            extent: (scissor.extent.width, scissor.extent.height),
        });
    }

    unsafe fn cmd_bind_descriptor_set(
        &self,
        cmd: vk::CommandBuffer,
        layout: vk::PipelineLayout,
        set: vk::DescriptorSet,
    ) {
        self.record(Call::BindDescriptorSet {
            cmd: cmd.as_raw(),
            layout: layout.as_raw(),
            set: set.as_raw(),
        });
    }

    unsafe fn cmd_draw(
        &self,
        cmd: vk::CommandBuffer,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) {
        self.record(Call::Draw {
            cmd: cmd.as_raw(),
            vertex_count,
            instance_count,
            first_vertex,
            first_instance,
        });
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
        self.record(Call::DrawIndexed {
            cmd: cmd.as_raw(),
            index_count,
            instance_count,
            first_index,
            vertex_offset,
            first_instance,
        });
    }

    unsafe fn queue_submit(
        &self,
        queue: vk::Queue,
        submit: &vk::SubmitInfo<'_>,
        fence: vk::Fence,
    ) -> Result<()> {
        let wait_semaphores = raws(raw_slice(
            submit.p_wait_semaphores,
            submit.wait_semaphore_count,
        ));
        let wait_stages =
            raw_slice(submit.p_wait_dst_stage_mask, submit.wait_semaphore_count).to_vec();
        let command_buffers = raws(raw_slice(
            submit.p_command_buffers,
            submit.command_buffer_count,
        ));
        let signal_semaphores = raws(raw_slice(
            submit.p_signal_semaphores,
            submit.signal_semaphore_count,
        ));

        let mut state = self.state.lock();
        let fence_raw = fence.as_raw();
        if fence != vk::Fence::null() {
            if state.fences.get(&fence_raw) != Some(&FenceState::Unsignaled) {
                state.violation(format!("submitted with fence {fence_raw:#x} not unsignaled"));
            }
            state.fences.insert(fence_raw, FenceState::Pending);
            for &cmd in &command_buffers {
                state.last_submit_fence.insert(cmd, fence_raw);
            }
        }
        for cmd in &command_buffers {
            if state.recording.contains(cmd) {
                state.violation(format!("submitted command buffer {cmd:#x} while recording"));
            }
        }
        state.calls.push(Call::QueueSubmit {
            queue: queue.as_raw(),
            wait_semaphores,
            wait_stages,
            command_buffers,
            signal_semaphores,
            fence: fence_raw,
        });
        Ok(())
    }

    unsafe fn create_swapchain(
        &self,
        create_info: &vk::SwapchainCreateInfoKHR<'_>,
    ) -> Result<vk::SwapchainKHR> {
        let mut state = self.state.lock();
        let extent = create_info.image_extent;
        if extent.width == 0 || extent.height == 0 {
            state.violation("created swapchain with zero extent".to_string());
        }
        let raw = state.handle();
        let images = (0..create_info.min_image_count)
            .map(|_| state.handle())
            .collect();
        state.swapchains.insert(raw, images);
        state.next_image = 0;
        state.calls.push(Call::CreateSwapchain {
            swapchain: raw,
            min_image_count: create_info.min_image_count,
            extent: (extent.width, extent.height),
            format: create_info.image_format,
            present_mode: create_info.present_mode,
            sharing_mode: create_info.image_sharing_mode,
        });
        Ok(vk::SwapchainKHR::from_raw(raw))
    }

    unsafe fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> Result<Vec<vk::Image>> {
        let state = self.state.lock();
        state
            .swapchains
            .get(&swapchain.as_raw())
            .map(|images| images.iter().map(|&i| vk::Image::from_raw(i)).collect())
            .ok_or_else(|| GpuError::InvalidState("unknown swapchain".to_string()))
    }

    unsafe fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
        let mut state = self.state.lock();
        let raw = swapchain.as_raw();
        if !state.views.is_empty() || !state.framebuffers.is_empty() {
            state.violation(format!("destroyed swapchain {raw:#x} with live views"));
        }
        state.swapchains.remove(&raw);
        state.calls.push(Call::DestroySwapchain(raw));
    }

    unsafe fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        _timeout_ns: u64,
        semaphore: vk::Semaphore,
    ) -> Result<(u32, bool)> {
        let mut state = self.state.lock();
        state.calls.push(Call::AcquireNextImage {
            swapchain: swapchain.as_raw(),
            semaphore: semaphore.as_raw(),
        });
        let outcome = state
            .acquire_script
            .pop_front()
            .unwrap_or(AcquireOutcome::Success);
        let suboptimal = match outcome {
            AcquireOutcome::Success => false,
            AcquireOutcome::Suboptimal => true,
            AcquireOutcome::OutOfDate => return Err(GpuError::SurfaceOutOfDate),
            AcquireOutcome::Timeout => return Err(GpuError::Timeout),
        };
        let count = state
            .swapchains
            .get(&swapchain.as_raw())
            .map_or(0, |images| images.len() as u32);
        if count == 0 {
            return Err(GpuError::InvalidState("unknown swapchain".to_string()));
        }
        let index = state.next_image % count;
        state.next_image += 1;
        Ok((index, suboptimal))
    }

    unsafe fn queue_present(
        &self,
        queue: vk::Queue,
        present_info: &vk::PresentInfoKHR<'_>,
    ) -> Result<bool> {
        let wait_semaphores = raws(raw_slice(
            present_info.p_wait_semaphores,
            present_info.wait_semaphore_count,
        ));
        let swapchains = raws(raw_slice(
            present_info.p_swapchains,
            present_info.swapchain_count,
        ));
        let image_indices =
            raw_slice(present_info.p_image_indices, present_info.swapchain_count).to_vec();

        let mut state = self.state.lock();
        state.calls.push(Call::QueuePresent {
            queue: queue.as_raw(),
            wait_semaphores,
            swapchains,
            image_indices,
        });
        match state
            .present_script
            .pop_front()
            .unwrap_or(PresentOutcome::Success)
        {
            PresentOutcome::Success => Ok(false),
            PresentOutcome::Suboptimal => Ok(true),
            PresentOutcome::OutOfDate => Err(GpuError::SurfaceOutOfDate),
            PresentOutcome::DeviceLost => Err(GpuError::Vulkan(vk::Result::ERROR_DEVICE_LOST)),
        }
    }

    unsafe fn create_image_view(
        &self,
        create_info: &vk::ImageViewCreateInfo<'_>,
    ) -> Result<vk::ImageView> {
        let mut state = self.state.lock();
        let raw = state.handle();
        state.views.insert(raw);
        state.calls.push(Call::CreateImageView {
            view: raw,
            image: create_info.image.as_raw(),
        });
        Ok(vk::ImageView::from_raw(raw))
    }

    unsafe fn destroy_image_view(&self, view: vk::ImageView) {
        let mut state = self.state.lock();
        let raw = view.as_raw();
        if !state.framebuffers.is_empty() {
            state.violation(format!("destroyed view {raw:#x} with live framebuffers"));
        }
        state.views.remove(&raw);
        state.calls.push(Call::DestroyImageView(raw));
    }

    unsafe fn create_framebuffer(
        &self,
        create_info: &vk::FramebufferCreateInfo<'_>,
    ) -> Result<vk::Framebuffer> {
        let attachments = raws(raw_slice(
            create_info.p_attachments,
            create_info.attachment_count,
        ));
        let mut state = self.state.lock();
        let raw = state.handle();
        state.framebuffers.insert(raw);
        state.calls.push(Call::CreateFramebuffer {
            framebuffer: raw,
            attachments,
            extent: (create_info.width, create_info.height),
        });
        Ok(vk::Framebuffer::from_raw(raw))
    }

    unsafe fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer) {
        let mut state = self.state.lock();
        let raw = framebuffer.as_raw();
        state.framebuffers.remove(&raw);
        state.calls.push(Call::DestroyFramebuffer(raw));
    }
}

/// Window with a settable size and resize flag.
pub struct MockWindow {
    size: Mutex<(u32, u32)>,
    resized: AtomicBool,
}

impl MockWindow {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: Mutex::new((width, height)),
            resized: AtomicBool::new(false),
        }
    }

    /// Change the size and raise the resize flag, as the event loop would.
    pub fn resize(&self, width: u32, height: u32) {
        *self.size.lock() = (width, height);
        self.resized.store(true, Ordering::SeqCst);
    }

    pub fn resize_pending(&self) -> bool {
        self.resized.load(Ordering::SeqCst)
    }
}

impl PresentationWindow for MockWindow {
    fn drawable_size(&self) -> (u32, u32) {
        *self.size.lock()
    }

    fn take_resized(&self) -> bool {
        self.resized.swap(false, Ordering::SeqCst)
    }
}
