//! Application and scene configuration.

use vkframe_core::Vertex;
use vkframe_platform::PlatformConfig;
use vkframe_render::SwapchainPreferences;

/// What the application draws each frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SceneMode {
    /// Three vertices, no index buffer, no uniforms.
    Triangle,
    /// Indexed geometry with per-frame uniforms.
    IndexedQuad,
}

/// Geometry uploaded once at startup.
#[derive(Clone, Debug, Default)]
pub struct SceneData {
    pub vertices: Vec<Vertex>,
    /// Empty for non-indexed drawing.
    pub indices: Vec<u32>,
}

impl SceneData {
    /// A non-indexed vertex list.
    pub fn vertices(vertices: Vec<Vertex>) -> Self {
        Self {
            vertices,
            indices: Vec::new(),
        }
    }

    /// Vertices drawn through `indices`.
    pub fn indexed(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// The mode this data is drawn in.
    pub fn mode(&self) -> SceneMode {
        if self.indices.is_empty() {
            SceneMode::Triangle
        } else {
            SceneMode::IndexedQuad
        }
    }

    /// Check the data can be uploaded and drawn.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.vertices.is_empty(), "scene has no vertices");
        let vertex_count = self.vertices.len() as u32;
        if let Some(&index) = self.indices.iter().find(|&&i| i >= vertex_count) {
            anyhow::bail!("index {index} out of range for {vertex_count} vertices");
        }
        Ok(())
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Window title.
    pub title: String,
    /// Initial window width.
    pub width: u32,
    /// Initial window height.
    pub height: u32,
    /// Present with FIFO instead of MAILBOX.
    pub vsync: bool,
    /// Enable Vulkan validation layers (default: debug builds only).
    pub validation: bool,
    /// Target frames per second (None for unlimited).
    pub target_fps: Option<u32>,
    /// Geometry drawn every frame.
    pub scene: SceneData,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "vkframe".to_string(),
            width: 800,
            height: 600,
            vsync: true,
            validation: cfg!(debug_assertions),
            target_fps: None,
            scene: SceneData::default(),
        }
    }
}

impl AppConfig {
    /// Create a new config with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Set the window dimensions.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the target FPS.
    pub fn with_target_fps(mut self, fps: u32) -> Self {
        self.target_fps = Some(fps);
        self
    }

    /// Enable or disable vsync.
    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    /// Enable or disable validation layers.
    pub fn with_validation(mut self, validation: bool) -> Self {
        self.validation = validation;
        self
    }

    /// Set the geometry to draw.
    pub fn with_scene(mut self, scene: SceneData) -> Self {
        self.scene = scene;
        self
    }

    pub fn draw_mode(&self) -> SceneMode {
        self.scene.mode()
    }

    pub(crate) fn platform(&self) -> PlatformConfig {
        PlatformConfig {
            title: self.title.clone(),
            width: self.width,
            height: self.height,
            resizable: true,
        }
    }

    pub(crate) fn swapchain_preferences(&self) -> SwapchainPreferences {
        SwapchainPreferences::with_vsync(self.vsync)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex() -> Vertex {
        Vertex::new([0.0, 0.0], [1.0, 1.0, 1.0])
    }

    #[test]
    fn mode_follows_index_data() {
        assert_eq!(
            SceneData::vertices(vec![vertex(); 3]).mode(),
            SceneMode::Triangle
        );
        assert_eq!(
            SceneData::indexed(vec![vertex(); 4], vec![0, 1, 2, 2, 3, 0]).mode(),
            SceneMode::IndexedQuad
        );
    }

    #[test]
    fn validate_rejects_bad_scenes() {
        assert!(SceneData::default().validate().is_err());
        assert!(SceneData::indexed(vec![vertex(); 3], vec![0, 1, 3])
            .validate()
            .is_err());
        assert!(SceneData::indexed(vec![vertex(); 3], vec![0, 1, 2])
            .validate()
            .is_ok());
    }

    #[test]
    fn builder_sets_fields() {
        let config = AppConfig::new("test")
            .with_size(1024, 768)
            .with_vsync(false)
            .with_target_fps(30);

        assert_eq!(config.title, "test");
        assert_eq!((config.width, config.height), (1024, 768));
        assert_eq!(config.target_fps, Some(30));
        assert!(!config.swapchain_preferences().vsync);

        let platform = config.platform();
        assert_eq!((platform.width, platform.height), (1024, 768));
        assert!(platform.resizable);
    }
}
