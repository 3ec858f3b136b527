//! Swapchain and size-dependent resources.
//!
//! Everything that depends on the surface extent (the swapchain object, one
//! image view and one framebuffer per image) lives in a [`SwapchainState`].
//! A state is never patched: when the surface goes stale or the window is
//! resized it is destroyed in full and a new one is built.

use ash::vk;
use tracing::{debug, info};
use vkframe_gpu::{
    calculate_extent, select_image_count, select_present_mode, select_surface_format, GpuDevice,
    PREFERRED_SURFACE_FORMAT,
};
use vkframe_platform::PresentationWindow;

use crate::error::{RenderError, Result};

/// Format and present mode preferences.
#[derive(Clone, Copy, Debug)]
pub struct SwapchainPreferences {
    /// Used when the surface supports it, otherwise the first reported format.
    pub surface_format: vk::SurfaceFormatKHR,
    /// FIFO when set; otherwise MAILBOX if available.
    pub vsync: bool,
}

impl Default for SwapchainPreferences {
    fn default() -> Self {
        Self {
            surface_format: PREFERRED_SURFACE_FORMAT,
            vsync: true,
        }
    }
}

impl SwapchainPreferences {
    /// Preferences with the given vsync setting.
    pub fn with_vsync(vsync: bool) -> Self {
        Self {
            vsync,
            ..Self::default()
        }
    }
}

/// One generation of the swapchain and its per-image resources.
#[derive(Debug)]
pub struct SwapchainState {
    pub swapchain: vk::SwapchainKHR,
    pub surface_format: vk::SurfaceFormatKHR,
    pub present_mode: vk::PresentModeKHR,
    pub extent: vk::Extent2D,
    pub images: Vec<vk::Image>,
    pub views: Vec<vk::ImageView>,
    pub framebuffers: Vec<vk::Framebuffer>,
    pub render_pass: vk::RenderPass,
}

impl SwapchainState {
    /// Number of presentable images.
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Framebuffer for an acquired image index.
    pub fn framebuffer(&self, image_index: u32) -> Option<vk::Framebuffer> {
        self.framebuffers.get(image_index as usize).copied()
    }
}

/// Owns the current [`SwapchainState`] and rebuilds it on demand.
pub struct SwapchainManager {
    render_pass: vk::RenderPass,
    preferences: SwapchainPreferences,
    state: Option<SwapchainState>,
}

impl SwapchainManager {
    /// Build the first swapchain for `window`.
    ///
    /// `render_pass` must be compatible with the format the preferences
    /// select; it is shared by every generation.
    ///
    /// # Safety
    /// The device and render pass must be valid.
    pub unsafe fn new<D, W>(
        device: &D,
        window: &W,
        render_pass: vk::RenderPass,
        preferences: SwapchainPreferences,
    ) -> Result<Self>
    where
        D: GpuDevice + ?Sized,
        W: PresentationWindow + ?Sized,
    {
        let state = build(device, window, render_pass, &preferences)?;
        info!(
            "Swapchain created: {}x{} ({} images, {:?})",
            state.extent.width,
            state.extent.height,
            state.image_count(),
            state.present_mode
        );

        Ok(Self {
            render_pass,
            preferences,
            state: Some(state),
        })
    }

    /// The current state.
    pub fn current(&self) -> Result<&SwapchainState> {
        self.state
            .as_ref()
            .ok_or_else(|| RenderError::InvalidSurface("swapchain has been destroyed".into()))
    }

    /// The shared render pass.
    pub fn render_pass(&self) -> vk::RenderPass {
        self.render_pass
    }

    /// Whether a state is currently built.
    pub fn is_live(&self) -> bool {
        self.state.is_some()
    }

    /// Wait for the device to go idle, then destroy the current state and
    /// build a new one for the window's current size.
    ///
    /// Returns `None` without touching the current state when the surface
    /// bounds leave no drawable area; the caller retries later.
    ///
    /// # Safety
    /// The device must be the one the swapchain was built with.
    pub unsafe fn recreate<D, W>(
        &mut self,
        device: &D,
        window: &W,
    ) -> Result<Option<&SwapchainState>>
    where
        D: GpuDevice + ?Sized,
        W: PresentationWindow + ?Sized,
    {
        device.device_wait_idle()?;

        let extent = target_extent(device, window)?;
        if extent.width == 0 || extent.height == 0 {
            debug!(
                "Surface allows a {}x{} swapchain, keeping the current one",
                extent.width, extent.height
            );
            return Ok(None);
        }

        if let Some(old) = self.state.take() {
            destroy(device, old);
        }

        let state = build(device, window, self.render_pass, &self.preferences)?;
        info!(
            "Swapchain recreated: {}x{} ({} images)",
            state.extent.width,
            state.extent.height,
            state.image_count()
        );

        Ok(Some(&*self.state.insert(state)))
    }

    /// Destroy the current state, if any.
    ///
    /// # Safety
    /// The device must be idle with respect to the swapchain's resources.
    pub unsafe fn destroy<D: GpuDevice + ?Sized>(&mut self, device: &D) {
        if let Some(state) = self.state.take() {
            destroy(device, state);
        }
    }
}

/// Extent a swapchain built now would get: the drawable size clamped to the
/// surface's current bounds.
///
/// # Safety
/// The device must be valid.
pub unsafe fn target_extent<D, W>(device: &D, window: &W) -> Result<vk::Extent2D>
where
    D: GpuDevice + ?Sized,
    W: PresentationWindow + ?Sized,
{
    let support = device.surface_support()?;
    let (width, height) = window.drawable_size();
    Ok(calculate_extent(&support.capabilities, width, height))
}

/// Build a swapchain, its views and framebuffers for the window's current
/// drawable size.
///
/// # Safety
/// The device and render pass must be valid and no other swapchain may be
/// live on the surface.
pub unsafe fn build<D, W>(
    device: &D,
    window: &W,
    render_pass: vk::RenderPass,
    preferences: &SwapchainPreferences,
) -> Result<SwapchainState>
where
    D: GpuDevice + ?Sized,
    W: PresentationWindow + ?Sized,
{
    let support = device.surface_support()?;
    let caps = &support.capabilities;

    let surface_format = select_surface_format(&support.formats, preferences.surface_format)
        .map_err(RenderError::ResourceCreation)?;
    let present_mode = select_present_mode(&support.present_modes, preferences.vsync);

    let (width, height) = window.drawable_size();
    let extent = calculate_extent(caps, width, height);
    if extent.width == 0 || extent.height == 0 {
        return Err(RenderError::InvalidSurface(format!(
            "cannot build a {}x{} swapchain",
            extent.width, extent.height
        )));
    }
    let image_count = select_image_count(caps);

    let families = device.queue_families();
    let family_indices = [families.graphics, families.present];
    let mut create_info = vk::SwapchainCreateInfoKHR::default()
        .surface(device.surface())
        .min_image_count(image_count)
        .image_format(surface_format.format)
        .image_color_space(surface_format.color_space)
        .image_extent(extent)
        .image_array_layers(1)
        .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
        .pre_transform(caps.current_transform)
        .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
        .present_mode(present_mode)
        .clipped(true);

    create_info = if families.is_unified() {
        create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
    } else {
        create_info
            .image_sharing_mode(vk::SharingMode::CONCURRENT)
            .queue_family_indices(&family_indices)
    };

    let swapchain = device
        .create_swapchain(&create_info)
        .map_err(RenderError::ResourceCreation)?;

    // From here on, partial state is torn down through `destroy` on failure
    let mut state = SwapchainState {
        swapchain,
        surface_format,
        present_mode,
        extent,
        images: Vec::new(),
        views: Vec::new(),
        framebuffers: Vec::new(),
        render_pass,
    };

    if let Err(e) = populate(device, &mut state) {
        destroy(device, state);
        return Err(e);
    }

    debug!(
        "Swapchain format {:?}, {} images requested, {} received",
        surface_format.format,
        image_count,
        state.image_count()
    );

    Ok(state)
}

unsafe fn populate<D: GpuDevice + ?Sized>(device: &D, state: &mut SwapchainState) -> Result<()> {
    state.images = device
        .swapchain_images(state.swapchain)
        .map_err(RenderError::ResourceCreation)?;

    for &image in &state.images {
        let view_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(state.surface_format.format)
            .components(vk::ComponentMapping::default())
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(vk::ImageAspectFlags::COLOR)
                    .base_mip_level(0)
                    .level_count(1)
                    .base_array_layer(0)
                    .layer_count(1),
            );
        let view = device
            .create_image_view(&view_info)
            .map_err(RenderError::ResourceCreation)?;
        state.views.push(view);
    }

    for &view in &state.views {
        let attachments = [view];
        let framebuffer_info = vk::FramebufferCreateInfo::default()
            .render_pass(state.render_pass)
            .attachments(&attachments)
            .width(state.extent.width)
            .height(state.extent.height)
            .layers(1);
        let framebuffer = device
            .create_framebuffer(&framebuffer_info)
            .map_err(RenderError::ResourceCreation)?;
        state.framebuffers.push(framebuffer);
    }

    Ok(())
}

/// Destroy framebuffers, then views, then the swapchain object.
///
/// # Safety
/// The device must be idle with respect to the state's resources.
pub unsafe fn destroy<D: GpuDevice + ?Sized>(device: &D, state: SwapchainState) {
    for framebuffer in state.framebuffers {
        device.destroy_framebuffer(framebuffer);
    }
    for view in state.views {
        device.destroy_image_view(view);
    }
    device.destroy_swapchain(state.swapchain);
}
