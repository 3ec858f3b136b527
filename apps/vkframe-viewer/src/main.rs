//! vkframe Demo Viewer
//!
//! Opens a window and draws either a fixed triangle or an indexed quad whose
//! projection follows the window's aspect ratio. Resize or minimize the
//! window to exercise swapchain recreation.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p vkframe-viewer -- [OPTIONS]
//! ```
//!
//! ## Options
//!
//! - `--triangle`: Draw the fixed triangle (no index buffer, no uniforms)
//! - `--indexed`: Draw the indexed quad with per-frame uniforms (default)
//! - `--vsync`: Present with FIFO (default: MAILBOX when available)
//! - `--no-validation`: Disable Vulkan validation layers
//! - `--size <W>x<H>`: Initial window size (default: 800x600)
//! - `--fps <N>`: Cap the frame rate
//! - `-h, --help`: Print help message
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level (e.g., info, debug, trace)

mod scene;

use anyhow::{bail, Context};
use vkframe_app::{run_app, AppConfig, SceneMode};

const WIDTH: u32 = 800;
const HEIGHT: u32 = 600;

/// Command line options.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Options {
    mode: SceneMode,
    vsync: bool,
    validation: bool,
    width: u32,
    height: u32,
    target_fps: Option<u32>,
    help: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            mode: SceneMode::IndexedQuad,
            vsync: false,
            validation: cfg!(debug_assertions),
            width: WIDTH,
            height: HEIGHT,
            target_fps: None,
            help: false,
        }
    }
}

impl Options {
    /// Parse options from arguments, excluding the program name.
    fn parse<I, S>(args: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut options = Self::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_ref() {
                "--triangle" => options.mode = SceneMode::Triangle,
                "--indexed" => options.mode = SceneMode::IndexedQuad,
                "--vsync" => options.vsync = true,
                "--no-validation" => options.validation = false,
                "--size" => {
                    let value = args.next().context("--size needs a value like 800x600")?;
                    (options.width, options.height) = parse_size(value.as_ref())?;
                }
                "--fps" => {
                    let value = args.next().context("--fps needs a value")?;
                    let fps: u32 = value
                        .as_ref()
                        .parse()
                        .with_context(|| format!("invalid --fps value '{}'", value.as_ref()))?;
                    options.target_fps = (fps > 0).then_some(fps);
                }
                "-h" | "--help" => options.help = true,
                other => bail!("unknown option '{other}' (see --help)"),
            }
        }

        Ok(options)
    }

    fn into_config(self) -> AppConfig {
        let scene = match self.mode {
            SceneMode::Triangle => scene::triangle(),
            SceneMode::IndexedQuad => scene::quad(),
        };
        let mut config = AppConfig::new("vkframe viewer")
            .with_size(self.width, self.height)
            .with_vsync(self.vsync)
            .with_validation(self.validation)
            .with_scene(scene);
        if let Some(fps) = self.target_fps {
            config = config.with_target_fps(fps);
        }
        config
    }
}

/// Parse `<W>x<H>` with both sides nonzero.
fn parse_size(value: &str) -> anyhow::Result<(u32, u32)> {
    let (w, h) = value
        .split_once(['x', 'X'])
        .with_context(|| format!("invalid size '{value}', expected <W>x<H>"))?;
    let width: u32 = w
        .trim()
        .parse()
        .with_context(|| format!("invalid width in '{value}'"))?;
    let height: u32 = h
        .trim()
        .parse()
        .with_context(|| format!("invalid height in '{value}'"))?;
    if width == 0 || height == 0 {
        bail!("size '{value}' must be nonzero in both dimensions");
    }
    Ok((width, height))
}

fn main() -> anyhow::Result<()> {
    let options = Options::parse(std::env::args().skip(1))?;
    if options.help {
        print_help();
        return Ok(());
    }

    run_app(options.into_config())
}

fn print_help() {
    eprintln!(
        "vkframe Demo Viewer

USAGE:
    cargo run -p vkframe-viewer -- [OPTIONS]

SCENE OPTIONS:
    --triangle              Draw the fixed triangle (no index buffer, no uniforms)
    --indexed               Draw the indexed quad with per-frame uniforms (default)

PRESENTATION OPTIONS:
    --vsync                 Present with FIFO (default: MAILBOX when available)
    --size <W>x<H>          Initial window size (default: {WIDTH}x{HEIGHT})
    --fps <N>               Cap the frame rate (0 = unlimited)

OTHER:
    --no-validation         Disable Vulkan validation layers
    -h, --help              Print this help message

ENVIRONMENT VARIABLES:
    RUST_LOG                Set log level (e.g., info, debug, trace)"
    );
}
