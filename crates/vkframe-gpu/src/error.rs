//! GPU error types.

use ash::vk;
use thiserror::Error;

/// GPU-related errors.
#[derive(Error, Debug)]
pub enum GpuError {
    /// Vulkan error.
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] vk::Result),

    /// A fence or acquire wait ran past its timeout.
    #[error("GPU wait timed out")]
    Timeout,

    /// The swapchain no longer matches its surface.
    #[error("Surface is out of date")]
    SurfaceOutOfDate,

    /// No suitable GPU found.
    #[error("No suitable GPU found")]
    NoSuitableDevice,

    /// Required extension not supported.
    #[error("Required extension not supported: {0}")]
    ExtensionNotSupported(String),

    /// Memory allocation failed.
    #[error("Memory allocation failed: {0}")]
    AllocationFailed(String),

    /// Surface creation failed.
    #[error("Surface creation failed: {0}")]
    SurfaceCreation(String),

    /// Swapchain creation failed.
    #[error("Swapchain creation failed: {0}")]
    SwapchainCreation(String),

    /// Shader module creation failed.
    #[error("Shader compilation failed: {0}")]
    ShaderCompilation(String),

    /// Pipeline creation failed.
    #[error("Pipeline creation failed: {0}")]
    PipelineCreation(String),

    /// Invalid state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl GpuError {
    /// Returns true for the stale-surface condition that swapchain
    /// recreation recovers from.
    pub const fn is_out_of_date(&self) -> bool {
        matches!(
            self,
            Self::SurfaceOutOfDate | Self::Vulkan(vk::Result::ERROR_OUT_OF_DATE_KHR)
        )
    }
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, GpuError>;
