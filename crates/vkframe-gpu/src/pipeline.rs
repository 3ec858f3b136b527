//! The single graphics pipeline used to draw scenes.
//!
//! Fixed-function state: filled, unculled primitives,
//! one opaque color attachment, no depth. Viewport and scissor are dynamic so
//! a pipeline outlives swapchain recreation while the surface format holds.

use crate::error::{GpuError, Result};
use ash::vk;

/// Shaders and vertex layout of a [`GraphicsPipeline`].
#[derive(Clone, Debug)]
pub struct GraphicsPipelineConfig {
    pub vertex_shader: &'static [u32],
    pub fragment_shader: &'static [u32],
    pub vertex_bindings: Vec<vk::VertexInputBindingDescription>,
    pub vertex_attributes: Vec<vk::VertexInputAttributeDescription>,
    pub topology: vk::PrimitiveTopology,
}

impl Default for GraphicsPipelineConfig {
    fn default() -> Self {
        Self {
            vertex_shader: &[],
            fragment_shader: &[],
            vertex_bindings: Vec::new(),
            vertex_attributes: Vec::new(),
            topology: vk::PrimitiveTopology::TRIANGLE_LIST,
        }
    }
}

impl GraphicsPipelineConfig {
    pub fn shaders(mut self, vertex: &'static [u32], fragment: &'static [u32]) -> Self {
        self.vertex_shader = vertex;
        self.fragment_shader = fragment;
        self
    }

    pub fn vertex_input(
        mut self,
        bindings: Vec<vk::VertexInputBindingDescription>,
        attributes: Vec<vk::VertexInputAttributeDescription>,
    ) -> Self {
        self.vertex_bindings = bindings;
        self.vertex_attributes = attributes;
        self
    }

    fn check(&self) -> Result<()> {
        if self.vertex_shader.is_empty() || self.fragment_shader.is_empty() {
            return Err(GpuError::ShaderCompilation(
                "pipeline needs both a vertex and a fragment shader".into(),
            ));
        }
        if self
            .vertex_attributes
            .iter()
            .any(|a| !self.vertex_bindings.iter().any(|b| b.binding == a.binding))
        {
            return Err(GpuError::PipelineCreation(
                "vertex attribute refers to an undeclared binding".into(),
            ));
        }
        Ok(())
    }
}

/// A pipeline and the layout its descriptor sets bind through.
pub struct GraphicsPipeline {
    pub pipeline: vk::Pipeline,
    pub layout: vk::PipelineLayout,
}

impl GraphicsPipeline {
    /// Build a pipeline for subpass 0 of `render_pass`.
    ///
    /// # Safety
    /// The device and render pass must be valid and the shaders must be
    /// SPIR-V.
    pub unsafe fn new(
        device: &ash::Device,
        config: &GraphicsPipelineConfig,
        render_pass: vk::RenderPass,
        set_layouts: &[vk::DescriptorSetLayout],
    ) -> Result<Self> {
        config.check()?;

        let vertex = shader_module(device, config.vertex_shader, "vertex")?;
        let fragment = match shader_module(device, config.fragment_shader, "fragment") {
            Ok(module) => module,
            Err(e) => {
                device.destroy_shader_module(vertex, None);
                return Err(e);
            }
        };

        let layout_info = vk::PipelineLayoutCreateInfo::default().set_layouts(set_layouts);
        let built = device
            .create_pipeline_layout(&layout_info, None)
            .map_err(|e| GpuError::PipelineCreation(e.to_string()))
            .and_then(|layout| {
                match create_pipeline(device, config, render_pass, layout, vertex, fragment) {
                    Ok(pipeline) => Ok(Self { pipeline, layout }),
                    Err(e) => {
                        device.destroy_pipeline_layout(layout, None);
                        Err(e)
                    }
                }
            });

        device.destroy_shader_module(vertex, None);
        device.destroy_shader_module(fragment, None);
        built
    }

    /// # Safety
    /// No command buffer using the pipeline may be pending.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        device.destroy_pipeline(self.pipeline, None);
        device.destroy_pipeline_layout(self.layout, None);
    }
}

unsafe fn shader_module(
    device: &ash::Device,
    code: &[u32],
    stage: &str,
) -> Result<vk::ShaderModule> {
    let info = vk::ShaderModuleCreateInfo::default().code(code);
    device
        .create_shader_module(&info, None)
        .map_err(|e| GpuError::ShaderCompilation(format!("{stage} shader: {e}")))
}

unsafe fn create_pipeline(
    device: &ash::Device,
    config: &GraphicsPipelineConfig,
    render_pass: vk::RenderPass,
    layout: vk::PipelineLayout,
    vertex: vk::ShaderModule,
    fragment: vk::ShaderModule,
) -> Result<vk::Pipeline> {
    let stages = [
        (vk::ShaderStageFlags::VERTEX, vertex),
        (vk::ShaderStageFlags::FRAGMENT, fragment),
    ]
    .map(|(stage, module)| {
        vk::PipelineShaderStageCreateInfo::default()
            .stage(stage)
            .module(module)
            .name(c"main")
    });

    let vertex_input = vk::PipelineVertexInputStateCreateInfo::default()
        .vertex_binding_descriptions(&config.vertex_bindings)
        .vertex_attribute_descriptions(&config.vertex_attributes);
    let input_assembly =
        vk::PipelineInputAssemblyStateCreateInfo::default().topology(config.topology);
    let viewport = vk::PipelineViewportStateCreateInfo::default()
        .viewport_count(1)
        .scissor_count(1);
    let raster = vk::PipelineRasterizationStateCreateInfo::default()
        .polygon_mode(vk::PolygonMode::FILL)
        .cull_mode(vk::CullModeFlags::NONE)
        .front_face(vk::FrontFace::CLOCKWISE)
        .line_width(1.0);
    let multisample = vk::PipelineMultisampleStateCreateInfo::default()
        .rasterization_samples(vk::SampleCountFlags::TYPE_1);
    let blend_attachments = [vk::PipelineColorBlendAttachmentState::default()
        .color_write_mask(vk::ColorComponentFlags::RGBA)];
    let blend = vk::PipelineColorBlendStateCreateInfo::default().attachments(&blend_attachments);
    let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
    let dynamic = vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

    let info = vk::GraphicsPipelineCreateInfo::default()
        .stages(&stages)
        .vertex_input_state(&vertex_input)
        .input_assembly_state(&input_assembly)
        .viewport_state(&viewport)
        .rasterization_state(&raster)
        .multisample_state(&multisample)
        .color_blend_state(&blend)
        .dynamic_state(&dynamic)
        .layout(layout)
        .render_pass(render_pass)
        .subpass(0);

    device
        .create_graphics_pipelines(vk::PipelineCache::null(), &[info], None)
        .map(|pipelines| pipelines[0])
        .map_err(|(_, e)| GpuError::PipelineCreation(e.to_string()))
}
