//! Command buffer recording for a single render pass.

use ash::vk;
use vkframe_core::constants::CLEAR_COLOR;
use vkframe_gpu::GpuDevice;

use crate::error::{RenderError, Result};

/// Vertices drawn when no index data is supplied.
pub const TRIANGLE_VERTEX_COUNT: u32 = 3;

/// Where a frame is drawn.
#[derive(Clone, Copy, Debug)]
pub struct RenderTarget {
    pub render_pass: vk::RenderPass,
    pub framebuffer: vk::Framebuffer,
    pub extent: vk::Extent2D,
}

/// A pipeline and the layout its descriptor sets are bound against.
#[derive(Clone, Copy, Debug)]
pub struct PipelineBinding {
    pub pipeline: vk::Pipeline,
    pub layout: vk::PipelineLayout,
}

/// How a [`Geometry`] is drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawMode {
    /// One indexed draw of `index_count` 32-bit indices.
    Indexed { index_count: u32 },
    /// One non-indexed draw of [`TRIANGLE_VERTEX_COUNT`] vertices.
    Triangle,
}

/// Vertex data and optional index data.
#[derive(Clone, Copy, Debug)]
pub struct Geometry {
    pub vertex_buffer: vk::Buffer,
    pub index_buffer: Option<vk::Buffer>,
    pub index_count: u32,
}

impl Geometry {
    /// A vertex buffer holding one triangle.
    pub fn triangle(vertex_buffer: vk::Buffer) -> Self {
        Self {
            vertex_buffer,
            index_buffer: None,
            index_count: 0,
        }
    }

    /// Vertices drawn through a buffer of `index_count` `u32` indices.
    pub fn indexed(vertex_buffer: vk::Buffer, index_buffer: vk::Buffer, index_count: u32) -> Self {
        Self {
            vertex_buffer,
            index_buffer: Some(index_buffer),
            index_count,
        }
    }

    /// Indexed only when an index buffer and a nonzero count are present.
    pub fn draw_mode(&self) -> DrawMode {
        match self.index_buffer {
            Some(_) if self.index_count > 0 => DrawMode::Indexed {
                index_count: self.index_count,
            },
            _ => DrawMode::Triangle,
        }
    }
}

/// Record one frame into `cmd`.
///
/// The buffer must already be reset; this only begins, fills and ends it.
/// Viewport and scissor are always set because the pipeline declares them
/// dynamic. A failing begin or end is returned as
/// [`RenderError::Recording`] and the buffer must not be submitted.
///
/// # Safety
/// All handles must be valid and `cmd` must not be pending execution.
pub unsafe fn record<D: GpuDevice + ?Sized>(
    device: &D,
    cmd: vk::CommandBuffer,
    target: &RenderTarget,
    pipeline: &PipelineBinding,
    descriptor_set: Option<vk::DescriptorSet>,
    geometry: &Geometry,
) -> Result<()> {
    device
        .begin_command_buffer(cmd)
        .map_err(RenderError::recording("begin"))?;

    let render_area = vk::Rect2D {
        offset: vk::Offset2D { x: 0, y: 0 },
        extent: target.extent,
    };
    let clear_values = [vk::ClearValue {
        color: vk::ClearColorValue {
            float32: CLEAR_COLOR,
        },
    }];
    let begin_info = vk::RenderPassBeginInfo::default()
        .render_pass(target.render_pass)
        .framebuffer(target.framebuffer)
        .render_area(render_area)
        .clear_values(&clear_values);

    device.cmd_begin_render_pass(cmd, &begin_info);
    device.cmd_bind_pipeline(cmd, pipeline.pipeline);
    device.cmd_bind_vertex_buffer(cmd, 0, geometry.vertex_buffer, 0);

    let mode = geometry.draw_mode();
    if let (DrawMode::Indexed { .. }, Some(index_buffer)) = (mode, geometry.index_buffer) {
        device.cmd_bind_index_buffer(cmd, index_buffer, 0, vk::IndexType::UINT32);
    }

    device.cmd_set_viewport(
        cmd,
        vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: target.extent.width as f32,
            height: target.extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        },
    );
    device.cmd_set_scissor(cmd, render_area);

    if let Some(set) = descriptor_set {
        device.cmd_bind_descriptor_set(cmd, pipeline.layout, set);
    }

    match mode {
        DrawMode::Indexed { index_count } => device.cmd_draw_indexed(cmd, index_count, 1, 0, 0, 0),
        DrawMode::Triangle => device.cmd_draw(cmd, TRIANGLE_VERTEX_COUNT, 1, 0, 0),
    }

    device.cmd_end_render_pass(cmd);
    device
        .end_command_buffer(cmd)
        .map_err(RenderError::recording("end"))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Call, MockGpu};
    use ash::vk::Handle;

    fn target() -> RenderTarget {
        RenderTarget {
            render_pass: vk::RenderPass::from_raw(0x2),
            framebuffer: vk::Framebuffer::from_raw(0x3),
            extent: vk::Extent2D {
                width: 800,
                height: 600,
            },
        }
    }

    fn pipeline() -> PipelineBinding {
        PipelineBinding {
            pipeline: vk::Pipeline::from_raw(0x4),
            layout: vk::PipelineLayout::from_raw(0x5),
        }
    }

    fn cmd() -> vk::CommandBuffer {
        vk::CommandBuffer::from_raw(0x1)
    }

    fn command_stream(gpu: &MockGpu) -> String {
        gpu.calls()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn indexed_geometry_stream() {
        let gpu = MockGpu::new();
        let geometry = Geometry::indexed(
            vk::Buffer::from_raw(0x6),
            vk::Buffer::from_raw(0x7),
            6,
        );

        unsafe {
            record(
                &gpu,
                cmd(),
                &target(),
                &pipeline(),
                Some(vk::DescriptorSet::from_raw(0x8)),
                &geometry,
            )
        }
        .unwrap();

        insta::assert_snapshot!(command_stream(&gpu), @r"
        begin cmd=0x1
        begin_render_pass pass=0x2 fb=0x3 area=(0,0,800x600) clear=[[0.0, 0.0, 0.0, 1.0]]
        bind_pipeline 0x4
        bind_vertex_buffer binding=0 buffer=0x6 offset=0
        bind_index_buffer buffer=0x7 offset=0 u32
        set_viewport (0,0,800x600) depth=0..1
        set_scissor (0,0,800x600)
        bind_descriptor_set layout=0x5 set=0x8
        draw_indexed indices=6 instances=1 first_index=0 vertex_offset=0 first_instance=0
        end_render_pass
        end cmd=0x1
        ");
    }

    #[test]
    fn triangle_stream() {
        let gpu = MockGpu::new();
        let geometry = Geometry::triangle(vk::Buffer::from_raw(0x6));

        unsafe { record(&gpu, cmd(), &target(), &pipeline(), None, &geometry) }.unwrap();

        insta::assert_snapshot!(command_stream(&gpu), @r"
        begin cmd=0x1
        begin_render_pass pass=0x2 fb=0x3 area=(0,0,800x600) clear=[[0.0, 0.0, 0.0, 1.0]]
        bind_pipeline 0x4
        bind_vertex_buffer binding=0 buffer=0x6 offset=0
        set_viewport (0,0,800x600) depth=0..1
        set_scissor (0,0,800x600)
        draw vertices=3 instances=1 first_vertex=0 first_instance=0
        end_render_pass
        end cmd=0x1
        ");
    }

    #[test]
    fn exactly_one_draw_per_mode() {
        let indexed = MockGpu::new();
        let geometry = Geometry::indexed(vk::Buffer::from_raw(0x6), vk::Buffer::from_raw(0x7), 6);
        unsafe { record(&indexed, cmd(), &target(), &pipeline(), None, &geometry) }.unwrap();
        let draws: Vec<_> = indexed
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Draw { .. } | Call::DrawIndexed { .. }))
            .collect();
        assert_eq!(draws.len(), 1);
        assert!(matches!(draws[0], Call::DrawIndexed { index_count: 6, .. }));

        let triangle = MockGpu::new();
        let geometry = Geometry::triangle(vk::Buffer::from_raw(0x6));
        unsafe { record(&triangle, cmd(), &target(), &pipeline(), None, &geometry) }.unwrap();
        let draws: Vec<_> = triangle
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Draw { .. } | Call::DrawIndexed { .. }))
            .collect();
        assert_eq!(draws.len(), 1);
        assert!(matches!(draws[0], Call::Draw { vertex_count: 3, .. }));
    }

    #[test]
    fn zero_index_count_falls_back_to_triangle() {
        let geometry = Geometry::indexed(vk::Buffer::from_raw(0x6), vk::Buffer::from_raw(0x7), 0);
        assert_eq!(geometry.draw_mode(), DrawMode::Triangle);
        assert_eq!(
            Geometry::indexed(vk::Buffer::from_raw(0x6), vk::Buffer::from_raw(0x7), 6).draw_mode(),
            DrawMode::Indexed { index_count: 6 }
        );
    }

    #[test]
    fn begin_failure_stops_recording() {
        let gpu = MockGpu::new();
        gpu.fail_command_buffer_begin();
        let geometry = Geometry::triangle(vk::Buffer::from_raw(0x6));

        let err = unsafe { record(&gpu, cmd(), &target(), &pipeline(), None, &geometry) }
            .unwrap_err();

        assert!(matches!(err, RenderError::Recording { stage: "begin", .. }));
        assert!(gpu.calls().is_empty());
    }
}
