//! Application runner and event loop.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use ash::vk;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;
use vkframe_gpu::{
    create_color_render_pass, select_surface_format, CommandPool, GpuContext, GpuContextBuilder,
    GpuDevice,
};
use vkframe_platform::TrackedWindow;
use vkframe_render::{FrameScheduler, FrameStatus, RenderError};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::WindowId;

use crate::config::AppConfig;
use crate::scene::SceneResources;

/// How long to back off while the window has no drawable area.
const MINIMIZED_POLL_INTERVAL: Duration = Duration::from_millis(16);

/// Run the renderer with the given configuration.
///
/// Initializes logging, creates the window, GPU context and scene, then
/// draws a frame on every redraw until the window is closed. Errors during
/// startup are returned; errors while drawing terminate the process with
/// exit status 1.
pub fn run_app(config: AppConfig) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    config.scene.validate()?;
    info!("{} starting ({:?})", config.title, config.draw_mode());

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut runner = AppRunner {
        config,
        state: None,
        init_error: None,
    };
    event_loop.run_app(&mut runner)?;

    match runner.init_error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Winit handler owning the application state.
struct AppRunner {
    config: AppConfig,
    state: Option<AppState>,
    init_error: Option<anyhow::Error>,
}

/// Everything alive between startup and close.
struct AppState {
    scheduler: Option<FrameScheduler<GpuContext, TrackedWindow>>,
    scene: SceneResources,
    command_pool: CommandPool,
    render_pass: vk::RenderPass,
    window: Arc<TrackedWindow>,
    gpu: Arc<GpuContext>,
    target_frame_time: Option<Duration>,
    started: Instant,
}

impl ApplicationHandler for AppRunner {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        match create_state(&self.config, event_loop) {
            Ok(state) => {
                self.state = Some(state);
                info!("Renderer ready");
            }
            Err(e) => {
                error!("Failed to initialize: {e:#}");
                self.init_error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested");
                if let Some(mut state) = self.state.take() {
                    state.cleanup();
                }
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(state) = &self.state {
                    debug!("Window resized to {}x{}", size.width, size.height);
                    state.window.mark_resized();
                }
            }
            WindowEvent::RedrawRequested => {
                if let Some(state) = &mut self.state {
                    if let Err(e) = state.render_frame() {
                        state.terminate(&e);
                    }
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(mut state) = self.state.take() {
            state.cleanup();
        }
    }
}

fn create_state(config: &AppConfig, event_loop: &ActiveEventLoop) -> anyhow::Result<AppState> {
    let window = Arc::new(TrackedWindow::create(event_loop, &config.platform())?);

    let gpu = Arc::new(
        GpuContextBuilder::new()
            .app_name(&config.title)
            .validation(config.validation)
            .build(window.as_ref())?,
    );

    let preferences = config.swapchain_preferences();

    unsafe {
        // The render pass must match the format the swapchain will pick
        let support = gpu.surface_support()?;
        let format = select_surface_format(&support.formats, preferences.surface_format)?;
        let render_pass = create_color_render_pass(gpu.device(), format.format)?;

        let command_pool = match CommandPool::new(
            gpu.device(),
            gpu.queue_families().graphics,
            vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
        ) {
            Ok(pool) => pool,
            Err(e) => {
                gpu.device().destroy_render_pass(render_pass, None);
                return Err(e.into());
            }
        };

        let mut scene =
            match SceneResources::create(&gpu, &command_pool, render_pass, &config.scene) {
                Ok(scene) => scene,
                Err(e) => {
                    command_pool.destroy(gpu.device());
                    gpu.device().destroy_render_pass(render_pass, None);
                    return Err(e);
                }
            };

        let scheduler = scene.frame_scene().and_then(|frame_scene| {
            FrameScheduler::new(
                Arc::clone(&gpu),
                Arc::clone(&window),
                command_pool.handle(),
                render_pass,
                preferences,
                frame_scene,
            )
            .map_err(anyhow::Error::from)
        });
        let scheduler = match scheduler {
            Ok(scheduler) => match scene.take_uniforms() {
                Some(uniforms) => scheduler.with_uniforms(Box::new(uniforms)),
                None => scheduler,
            },
            Err(e) => {
                scene.destroy(&gpu);
                command_pool.destroy(gpu.device());
                gpu.device().destroy_render_pass(render_pass, None);
                return Err(e);
            }
        };

        let target_frame_time = config
            .target_fps
            .filter(|&fps| fps > 0)
            .map(|fps| Duration::from_nanos(1_000_000_000 / u64::from(fps)));

        Ok(AppState {
            scheduler: Some(scheduler),
            scene,
            command_pool,
            render_pass,
            window,
            gpu,
            target_frame_time,
            started: Instant::now(),
        })
    }
}

impl AppState {
    fn render_frame(&mut self) -> anyhow::Result<()> {
        let Some(scheduler) = self.scheduler.as_mut() else {
            return Ok(());
        };
        let frame_start = Instant::now();

        if scheduler.draw_frame()? == FrameStatus::Skipped {
            thread::sleep(MINIMIZED_POLL_INTERVAL);
            return Ok(());
        }

        // Frame pacing
        if let Some(target) = self.target_frame_time {
            let elapsed = frame_start.elapsed();
            if elapsed < target {
                thread::sleep(target - elapsed);
            }
        }

        Ok(())
    }

    /// Log a fatal frame error and exit with status 1.
    fn terminate(&self, e: &anyhow::Error) -> ! {
        match e.downcast_ref::<RenderError>() {
            Some(render) if render.is_timeout() => error!("GPU wait timed out: {render}"),
            _ => error!("Fatal render error: {e:#}"),
        }
        if let Err(e) = self.gpu.wait_idle() {
            error!("Failed to wait idle: {e}");
        }
        std::process::exit(1);
    }

    fn cleanup(&mut self) {
        info!("Starting cleanup...");

        if let Some(mut scheduler) = self.scheduler.take() {
            if let Err(e) = scheduler.shutdown() {
                error!("Frame scheduler shutdown failed: {e}");
            }

            let stats = scheduler.stats();
            let secs = self.started.elapsed().as_secs_f64();
            info!("Frame statistics:");
            info!("  Submitted frames: {}", stats.submitted_frames);
            info!("  Swapchain recreations: {}", stats.recreations);
            if secs > 0.0 {
                info!("  Avg FPS: {:.1}", stats.submitted_frames as f64 / secs);
            }
        }

        if let Err(e) = self.gpu.wait_idle() {
            error!("Failed to wait idle: {e}");
        }

        unsafe {
            self.scene.destroy(&self.gpu);
            self.command_pool.destroy(self.gpu.device());
            self.gpu.device().destroy_render_pass(self.render_pass, None);
        }

        info!("Cleanup complete");
    }
}
