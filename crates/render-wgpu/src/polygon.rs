use bytemuck::{Pod, Zeroable};
use framelab_render::PolygonView;

use crate::gpu::{ColorVertex, DynamicBuffer, clear_color, color_vertices, uniform_buffer, uniform_entry};
use crate::shaders;

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
struct PolygonUniform {
    time: f32,
    _pad: [f32; 3],
}

/// Centered square of side `min(width, height)`, as (x, y, side).
fn square_viewport(width: u32, height: u32) -> (f32, f32, f32) {
    let side = width.min(height) as f32;
    ((width as f32 - side) / 2.0, (height as f32 - side) / 2.0, side)
}

/// Streams a vertex-colored mesh straight into clip space every frame.
pub struct PolygonRenderer {
    pipeline: wgpu::RenderPipeline,
    uniform: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    vertices: DynamicBuffer,
}

impl PolygonRenderer {
    pub fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Self {
        let uniform = uniform_buffer(device, "polygon_uniform", &PolygonUniform::zeroed());
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("polygon_layout"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::FRAGMENT, false)],
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("polygon_bind_group"),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform.as_entire_binding(),
            }],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("polygon_pipeline_layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("polygon_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::POLYGON_SHADER.into()),
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("polygon_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_polygon"),
                compilation_options: Default::default(),
                buffers: &[ColorVertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_polygon"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });
        Self {
            pipeline,
            uniform,
            bind_group,
            vertices: DynamicBuffer::new(device, "polygon_vertices", wgpu::BufferUsages::VERTEX, 4096),
        }
    }

    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        size: (u32, u32),
        view: &PolygonView<'_>,
    ) {
        let vertices = color_vertices(view.mesh);
        self.vertices.write(device, queue, bytemuck::cast_slice(&vertices));
        queue.write_buffer(
            &self.uniform,
            0,
            bytemuck::bytes_of(&PolygonUniform {
                time: view.time,
                _pad: [0.0; 3],
            }),
        );

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("polygon_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear_color(view.clear_color)),
                    store: wgpu::StoreOp::Store,
                },
            })],
            ..Default::default()
        });
        if view.square {
            let (x, y, side) = square_viewport(size.0, size.1);
            pass.set_viewport(x, y, side, side, 0.0, 1.0);
        }
        if !vertices.is_empty() {
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.bind_group, &[]);
            pass.set_vertex_buffer(0, self.vertices.buffer().slice(..));
            pass.draw(0..vertices.len() as u32, 0..1);
        }
    }
}
