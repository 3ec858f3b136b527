//! Vulkan instance creation and physical device selection.

use crate::capabilities::GpuCapabilities;
use crate::device::QueueFamilies;
use crate::error::{GpuError, Result};
use crate::surface::SurfaceSupport;
use ash::vk;
use raw_window_handle::RawDisplayHandle;
use std::ffi::{c_char, CStr, CString};

/// Validation layers to enable in debug builds.
pub fn validation_layers() -> Vec<&'static CStr> {
    vec![
        // Standard validation layer
        c"VK_LAYER_KHRONOS_validation",
    ]
}

/// Required device extensions.
pub fn required_device_extensions() -> Vec<&'static CStr> {
    vec![ash::khr::swapchain::NAME]
}

/// Create a Vulkan instance able to present to windows on `display`.
///
/// # Safety
/// The entry must be a valid Vulkan entry point.
pub unsafe fn create_instance(
    entry: &ash::Entry,
    app_name: &str,
    display: RawDisplayHandle,
    enable_validation: bool,
) -> Result<ash::Instance> {
    let app_name = CString::new(app_name)
        .map_err(|e| GpuError::Other(format!("Invalid application name: {e}")))?;

    let app_info = vk::ApplicationInfo::default()
        .application_name(&app_name)
        .application_version(vk::make_api_version(0, 0, 1, 0))
        .engine_name(c"vkframe")
        .engine_version(vk::make_api_version(0, 0, 1, 0))
        .api_version(vk::API_VERSION_1_2);

    // Surface extensions for the current windowing system
    #[cfg_attr(not(target_os = "macos"), allow(unused_mut))]
    let mut extension_names: Vec<*const c_char> =
        ash_window::enumerate_required_extensions(display)
            .map_err(|e| GpuError::ExtensionNotSupported(e.to_string()))?
            .to_vec();

    #[cfg(target_os = "macos")]
    extension_names.push(ash::khr::portability_enumeration::NAME.as_ptr());

    let layers = if enable_validation {
        validation_layers()
    } else {
        vec![]
    };

    // Drop requested layers the loader does not know about
    let available_layers = entry.enumerate_instance_layer_properties()?;
    let layers: Vec<&CStr> = layers
        .into_iter()
        .filter(|layer| {
            let found = available_layers
                .iter()
                .any(|props| CStr::from_ptr(props.layer_name.as_ptr()) == *layer);
            if !found {
                tracing::warn!("Validation layer {:?} not available", layer);
            }
            found
        })
        .collect();

    let layer_names: Vec<*const c_char> = layers.iter().map(|l| l.as_ptr()).collect();

    // Required for MoltenVK on macOS
    #[cfg(target_os = "macos")]
    let create_flags = vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR;
    #[cfg(not(target_os = "macos"))]
    let create_flags = vk::InstanceCreateFlags::empty();

    let create_info = vk::InstanceCreateInfo::default()
        .application_info(&app_info)
        .enabled_extension_names(&extension_names)
        .enabled_layer_names(&layer_names)
        .flags(create_flags);

    let instance = entry.create_instance(&create_info, None)?;

    Ok(instance)
}

/// Pick the highest-scoring physical device that can render to and present
/// on `surface`. Ties keep the first device enumerated.
///
/// # Safety
/// The instance and surface must be valid.
pub unsafe fn select_physical_device(
    instance: &ash::Instance,
    surface_loader: &ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
) -> Result<(vk::PhysicalDevice, QueueFamilies, GpuCapabilities)> {
    let devices = instance.enumerate_physical_devices()?;

    let mut best: Option<(vk::PhysicalDevice, QueueFamilies, GpuCapabilities)> = None;

    for device in devices {
        let Some(families) = find_queue_families(instance, surface_loader, surface, device)?
        else {
            continue;
        };

        if !supports_device_extensions(instance, device) {
            continue;
        }

        let support = SurfaceSupport::query(surface_loader, device, surface)?;
        if !support.is_adequate() {
            continue;
        }

        let capabilities = GpuCapabilities::query(instance, device);
        tracing::debug!(
            "Candidate GPU {} scored {}",
            capabilities.device_name,
            capabilities.score()
        );
        if best
            .as_ref()
            .map_or(true, |(.., current)| capabilities.score() > current.score())
        {
            best = Some((device, families, capabilities));
        }
    }

    best.ok_or(GpuError::NoSuitableDevice)
}

/// Find graphics and present queue families, preferring one family that
/// supports both.
///
/// # Safety
/// All handles must be valid.
unsafe fn find_queue_families(
    instance: &ash::Instance,
    surface_loader: &ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
    physical_device: vk::PhysicalDevice,
) -> Result<Option<QueueFamilies>> {
    let queue_families = instance.get_physical_device_queue_family_properties(physical_device);

    let mut graphics = None;
    let mut present = None;

    for (i, family) in queue_families.iter().enumerate() {
        let i = i as u32;
        let has_graphics = family.queue_flags.contains(vk::QueueFlags::GRAPHICS);
        let has_present =
            surface_loader.get_physical_device_surface_support(physical_device, i, surface)?;

        if has_graphics && has_present {
            return Ok(Some(QueueFamilies {
                graphics: i,
                present: i,
            }));
        }
        if has_graphics && graphics.is_none() {
            graphics = Some(i);
        }
        if has_present && present.is_none() {
            present = Some(i);
        }
    }

    Ok(graphics
        .zip(present)
        .map(|(graphics, present)| QueueFamilies { graphics, present }))
}

/// Check that every required device extension is available.
unsafe fn supports_device_extensions(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
) -> bool {
    let Ok(available) = instance.enumerate_device_extension_properties(physical_device) else {
        return false;
    };

    required_device_extensions().iter().all(|required| {
        available
            .iter()
            .any(|ext| CStr::from_ptr(ext.extension_name.as_ptr()) == *required)
    })
}
