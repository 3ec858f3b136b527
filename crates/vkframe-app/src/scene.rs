//! GPU resources for the scene the scheduler draws every frame.

use std::sync::Arc;

use ash::vk;
use gpu_allocator::MemoryLocation;
use tracing::{debug, warn};
use vkframe_core::constants::FRAMES_IN_FLIGHT;
use vkframe_core::{FrameUniformBlock, Vertex};
use vkframe_gpu::{
    create_uniform_set_layout, write_uniform_buffer, CommandPool, DescriptorPool, GpuBuffer,
    GpuContext, GpuDevice, GraphicsPipeline, GraphicsPipelineConfig,
};
use vkframe_render::{FrameScene, Geometry, PipelineBinding};

use crate::config::{SceneData, SceneMode};
use crate::uniforms::SlotUniforms;

/// Vertex buffer binding 0 with position at location 0 and color at 1.
fn vertex_layout() -> (
    Vec<vk::VertexInputBindingDescription>,
    Vec<vk::VertexInputAttributeDescription>,
) {
    let bindings = vec![vk::VertexInputBindingDescription {
        binding: 0,
        stride: Vertex::STRIDE,
        input_rate: vk::VertexInputRate::VERTEX,
    }];
    let attributes = vec![
        vk::VertexInputAttributeDescription {
            location: 0,
            binding: 0,
            format: vk::Format::R32G32_SFLOAT,
            offset: 0,
        },
        vk::VertexInputAttributeDescription {
            location: 1,
            binding: 0,
            format: vk::Format::R32G32B32_SFLOAT,
            offset: Vertex::COLOR_OFFSET,
        },
    ];
    (bindings, attributes)
}

fn pipeline_config(mode: SceneMode) -> GraphicsPipelineConfig {
    let vertex_shader = match mode {
        SceneMode::Triangle => vkframe_shaders::triangle_vertex_shader(),
        SceneMode::IndexedQuad => vkframe_shaders::mesh_vertex_shader(),
    };
    let (bindings, attributes) = vertex_layout();
    GraphicsPipelineConfig::default()
        .shaders(vertex_shader, vkframe_shaders::color_fragment_shader())
        .vertex_input(bindings, attributes)
}

/// Pipeline, geometry buffers and descriptor sets for one [`SceneData`].
pub struct SceneResources {
    mode: SceneMode,
    pipeline: Option<GraphicsPipeline>,
    set_layout: vk::DescriptorSetLayout,
    descriptor_pool: Option<DescriptorPool>,
    descriptor_sets: Vec<vk::DescriptorSet>,
    vertex_buffer: Option<GpuBuffer>,
    index_buffer: Option<GpuBuffer>,
    index_count: u32,
    uniforms: Option<SlotUniforms>,
}

impl SceneResources {
    /// Upload `scene` and build everything needed to draw it into
    /// `render_pass`.
    ///
    /// Geometry goes to device-local memory through a staging copy on the
    /// graphics queue. Indexed scenes also get one uniform buffer and one
    /// descriptor set per frame slot.
    ///
    /// # Safety
    /// `pool` must belong to the graphics queue family and `render_pass`
    /// must be valid for `gpu`.
    pub unsafe fn create(
        gpu: &Arc<GpuContext>,
        pool: &CommandPool,
        render_pass: vk::RenderPass,
        scene: &SceneData,
    ) -> anyhow::Result<Self> {
        scene.validate()?;

        let mut resources = Self {
            mode: scene.mode(),
            pipeline: None,
            set_layout: vk::DescriptorSetLayout::null(),
            descriptor_pool: None,
            descriptor_sets: Vec::new(),
            vertex_buffer: None,
            index_buffer: None,
            index_count: 0,
            uniforms: None,
        };

        if let Err(e) = resources.populate(gpu, pool, render_pass, scene) {
            resources.destroy(gpu);
            return Err(e);
        }

        debug!(
            "Scene ready: {:?}, {} vertices, {} indices",
            resources.mode,
            scene.vertices.len(),
            resources.index_count
        );
        Ok(resources)
    }

    unsafe fn populate(
        &mut self,
        gpu: &Arc<GpuContext>,
        pool: &CommandPool,
        render_pass: vk::RenderPass,
        scene: &SceneData,
    ) -> anyhow::Result<()> {
        let device = gpu.device();
        let queue = gpu.graphics_queue();

        {
            let mut allocator = gpu.allocator().lock();
            self.vertex_buffer = Some(allocator.upload_buffer(
                pool,
                queue,
                bytemuck::cast_slice(&scene.vertices),
                vk::BufferUsageFlags::VERTEX_BUFFER,
                "scene_vertices",
            )?);

            if self.mode == SceneMode::IndexedQuad {
                self.index_buffer = Some(allocator.upload_buffer(
                    pool,
                    queue,
                    bytemuck::cast_slice(&scene.indices),
                    vk::BufferUsageFlags::INDEX_BUFFER,
                    "scene_indices",
                )?);
                self.index_count = scene.indices.len() as u32;
            }
        }

        let mut set_layouts = Vec::new();
        if self.mode == SceneMode::IndexedQuad {
            self.set_layout = create_uniform_set_layout(device, 0, vk::ShaderStageFlags::VERTEX)?;
            set_layouts.push(self.set_layout);

            let descriptor_pool =
                DescriptorPool::for_uniform_sets(device, FRAMES_IN_FLIGHT as u32)?;
            self.descriptor_sets =
                descriptor_pool.allocate(device, self.set_layout, FRAMES_IN_FLIGHT)?;
            self.descriptor_pool = Some(descriptor_pool);

            let uniforms = self.uniforms.insert(SlotUniforms::new(Arc::clone(gpu)));
            for (slot, &set) in self.descriptor_sets.iter().enumerate() {
                let buffer = gpu.allocator().lock().create_buffer(
                    FrameUniformBlock::SIZE,
                    vk::BufferUsageFlags::UNIFORM_BUFFER,
                    MemoryLocation::CpuToGpu,
                    &format!("frame_uniforms_{slot}"),
                )?;
                buffer.write(&[FrameUniformBlock::default()])?;
                write_uniform_buffer(device, set, 0, buffer.handle(), FrameUniformBlock::SIZE);
                uniforms.push(buffer);
            }
        }

        self.pipeline = Some(GraphicsPipeline::new(
            device,
            &pipeline_config(self.mode),
            render_pass,
            &set_layouts,
        )?);

        Ok(())
    }

    pub fn mode(&self) -> SceneMode {
        self.mode
    }

    /// Hand the per-slot uniform buffers to the frame scheduler.
    pub fn take_uniforms(&mut self) -> Option<SlotUniforms> {
        self.uniforms.take()
    }

    /// What the scheduler records every frame.
    pub fn frame_scene(&self) -> anyhow::Result<FrameScene> {
        let pipeline = self
            .pipeline
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("scene pipeline not created"))?;
        let vertex_buffer = self
            .vertex_buffer
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("scene vertex buffer not created"))?
            .handle();

        let geometry = match &self.index_buffer {
            Some(indices) => Geometry::indexed(vertex_buffer, indices.handle(), self.index_count),
            None => Geometry::triangle(vertex_buffer),
        };

        Ok(FrameScene {
            pipeline: PipelineBinding {
                pipeline: pipeline.pipeline,
                layout: pipeline.layout,
            },
            descriptor_sets: self.descriptor_sets.clone(),
            geometry,
        })
    }

    /// Release everything this scene created.
    ///
    /// # Safety
    /// The device must be idle with respect to the scene's resources.
    pub unsafe fn destroy(&mut self, gpu: &GpuContext) {
        let device = gpu.device();

        if let Some(pipeline) = self.pipeline.take() {
            pipeline.destroy(device);
        }
        if let Some(pool) = self.descriptor_pool.take() {
            pool.destroy(device);
        }
        self.descriptor_sets.clear();
        if self.set_layout != vk::DescriptorSetLayout::null() {
            device.destroy_descriptor_set_layout(self.set_layout, None);
            self.set_layout = vk::DescriptorSetLayout::null();
        }

        self.uniforms = None;

        let mut allocator = gpu.allocator().lock();
        for mut buffer in [self.vertex_buffer.take(), self.index_buffer.take()]
            .into_iter()
            .flatten()
        {
            if let Err(e) = allocator.free_buffer(&mut buffer) {
                warn!("Failed to free scene buffer: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_layout_matches_vertex_struct() {
        let (bindings, attributes) = vertex_layout();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].stride, 20);
        assert_eq!(attributes[0].offset, 0);
        assert_eq!(attributes[1].offset, Vertex::COLOR_OFFSET);
        assert_eq!(attributes[1].format, vk::Format::R32G32B32_SFLOAT);
    }

    #[test]
    fn each_mode_picks_its_vertex_shader() {
        let triangle = pipeline_config(SceneMode::Triangle);
        let mesh = pipeline_config(SceneMode::IndexedQuad);
        assert_eq!(triangle.vertex_shader, vkframe_shaders::triangle_vertex_shader());
        assert_eq!(mesh.vertex_shader, vkframe_shaders::mesh_vertex_shader());
        assert_eq!(triangle.fragment_shader, mesh.fragment_shader);
        assert_eq!(mesh.vertex_attributes.len(), 2);
    }
}
