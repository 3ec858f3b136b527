//! Platform abstraction for vkframe.
//!
//! Provides the window view the frame loop depends on and its winit
//! implementation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use raw_window_handle::{
    DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, WindowHandle,
};
use thiserror::Error;
use winit::dpi::PhysicalSize;
use winit::event_loop::ActiveEventLoop;
use winit::window::Window;

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Window creation failed: {0}")]
    WindowCreation(String),
}

pub type Result<T> = std::result::Result<T, PlatformError>;

/// Platform configuration.
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            title: "vkframe".to_string(),
            width: 800,
            height: 600,
            resizable: true,
        }
    }
}

/// What the frame loop needs to know about the window it presents to.
pub trait PresentationWindow {
    /// Current drawable size in physical pixels.
    fn drawable_size(&self) -> (u32, u32);

    /// Return whether a resize was observed since the last call, and clear
    /// the flag.
    fn take_resized(&self) -> bool;
}

/// A winit window with a resize flag set by the event loop and consumed by
/// the frame loop.
pub struct TrackedWindow {
    window: Arc<Window>,
    resized: AtomicBool,
}

impl TrackedWindow {
    /// Create a window from `config`.
    pub fn create(event_loop: &ActiveEventLoop, config: &PlatformConfig) -> Result<Self> {
        let attrs = Window::default_attributes()
            .with_title(&config.title)
            .with_inner_size(PhysicalSize::new(config.width, config.height))
            .with_resizable(config.resizable);

        let window = event_loop
            .create_window(attrs)
            .map_err(|e| PlatformError::WindowCreation(e.to_string()))?;

        tracing::debug!(
            "Window created: {}x{} '{}'",
            config.width,
            config.height,
            config.title
        );

        Ok(Self::new(Arc::new(window)))
    }

    /// Track an existing window.
    pub fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            resized: AtomicBool::new(false),
        }
    }

    /// The underlying winit window.
    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    /// Record a resize notification from the event loop.
    pub fn mark_resized(&self) {
        self.resized.store(true, Ordering::Release);
    }

    /// Ask the windowing system for another redraw.
    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }
}

impl PresentationWindow for TrackedWindow {
    fn drawable_size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }

    fn take_resized(&self) -> bool {
        self.resized.swap(false, Ordering::AcqRel)
    }
}

impl HasDisplayHandle for TrackedWindow {
    fn display_handle(&self) -> std::result::Result<DisplayHandle<'_>, HandleError> {
        self.window.display_handle()
    }
}

impl HasWindowHandle for TrackedWindow {
    fn window_handle(&self) -> std::result::Result<WindowHandle<'_>, HandleError> {
        self.window.window_handle()
    }
}
