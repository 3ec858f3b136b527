//! Frame loop error types.

use thiserror::Error;
use vkframe_gpu::GpuError;

/// Errors that escape the frame loop.
///
/// None of these are recoverable within a frame. Stale surfaces are absorbed
/// by the scheduler and never show up here.
#[derive(Error, Debug)]
pub enum RenderError {
    /// The in-flight fence of a frame slot did not signal in time.
    #[error("Timed out waiting for frame slot {slot} to finish")]
    FenceTimeout { slot: usize },

    /// Image acquisition did not complete in time.
    #[error("Timed out acquiring a swapchain image")]
    AcquireTimeout,

    /// A command buffer could not be reset, begun or ended.
    #[error("Command recording failed during {stage}: {source}")]
    Recording {
        stage: &'static str,
        #[source]
        source: GpuError,
    },

    /// Queue submission failed.
    #[error("Queue submission failed: {0}")]
    Submission(#[source] GpuError),

    /// Presentation failed with a hard error.
    #[error("Presentation failed: {0}")]
    Presentation(#[source] GpuError),

    /// A synchronization primitive, swapchain, view or framebuffer could not
    /// be created.
    #[error("Resource creation failed: {0}")]
    ResourceCreation(#[source] GpuError),

    /// The surface cannot back a swapchain right now.
    #[error("Invalid surface: {0}")]
    InvalidSurface(String),

    /// The scene handed to the scheduler does not fit the frame slots.
    #[error("Invalid scene: {0}")]
    InvalidScene(String),

    /// Any other device error.
    #[error(transparent)]
    Gpu(#[from] GpuError),
}

impl RenderError {
    /// Whether this error is one of the wait timeouts.
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::FenceTimeout { .. } | Self::AcquireTimeout)
    }

    pub(crate) fn recording(stage: &'static str) -> impl Fn(GpuError) -> Self {
        move |source| Self::Recording { stage, source }
    }
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, RenderError>;
