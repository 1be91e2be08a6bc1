use bytemuck::{Pod, Zeroable};
use framelab_geometry::Mesh;
use framelab_render::PointLightView;
use glam::Mat4;

use crate::gpu::{GpuMesh, MeshVertex, clear_color, depth_state, uniform_buffer, uniform_entry};
use crate::shaders;
use crate::texture::create_depth_texture;

pub const MAX_LIGHTS: usize = 4;

/// Torus plus one marker per light.
const DRAW_SLOTS: usize = 1 + MAX_LIGHTS;

/// Dynamic uniform offsets must be multiples of this on every backend.
const SLOT_STRIDE: u64 = 256;

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
struct Globals {
    view_proj: [[f32; 4]; 4],
    eye: [f32; 4],
    light_positions: [[f32; 4]; MAX_LIGHTS],
    light_colors: [[f32; 4]; MAX_LIGHTS],
    counts: [u32; 4],
}

impl Globals {
    fn new(view: &PointLightView<'_>) -> Self {
        let mut globals = Self {
            view_proj: view.camera.view_projection().to_cols_array_2d(),
            eye: view.camera.eye.extend(1.0).to_array(),
            ..Self::zeroed()
        };
        let mut count = 0;
        for (i, (position, light)) in view.light_positions().zip(view.lights).take(MAX_LIGHTS).enumerate() {
            globals.light_positions[i] = position.extend(1.0).to_array();
            globals.light_colors[i] = light.color.to_array();
            count += 1;
        }
        globals.counts[0] = count;
        globals
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
struct DrawUniform {
    model: [[f32; 4]; 4],
    color: [f32; 4],
    params: [f32; 4],
}

/// Per-draw uniforms for one frame: the lit torus, then each light marker
/// unlit in its light's color.
fn draw_uniforms(view: &PointLightView<'_>) -> Vec<DrawUniform> {
    let mut draws = vec![DrawUniform {
        model: view.torus_model.to_cols_array_2d(),
        color: [1.0; 4],
        params: [1.0, 0.0, 0.0, 0.0],
    }];
    for (position, light) in view.light_positions().zip(view.lights).take(MAX_LIGHTS) {
        draws.push(DrawUniform {
            model: Mat4::from_translation(position).to_cols_array_2d(),
            color: light.color.to_array(),
            params: [0.0; 4],
        });
    }
    draws
}

/// Torus lit by point lights, each light drawn as a small unlit sphere.
pub struct PointLightRenderer {
    pipeline: wgpu::RenderPipeline,
    globals: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,
    draws: wgpu::Buffer,
    draws_bind_group: wgpu::BindGroup,
    torus: Option<(Mesh, GpuMesh)>,
    sphere: Option<(Mesh, GpuMesh)>,
    depth: wgpu::TextureView,
}

impl PointLightRenderer {
    pub fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat, width: u32, height: u32) -> Self {
        let globals = uniform_buffer(device, "point_light_globals", &Globals::zeroed());
        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("point_light_globals_layout"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX_FRAGMENT, false)],
        });
        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("point_light_globals"),
            layout: &globals_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals.as_entire_binding(),
            }],
        });

        let draws = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("point_light_draws"),
            size: SLOT_STRIDE * DRAW_SLOTS as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let draws_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("point_light_draw_layout"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX_FRAGMENT, true)],
        });
        let draws_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("point_light_draws"),
            layout: &draws_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &draws,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<DrawUniform>() as u64),
                }),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("point_light_pipeline_layout"),
            bind_group_layouts: &[&globals_layout, &draws_layout],
            push_constant_ranges: &[],
        });
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("point_light_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::POINT_LIGHT_SHADER.into()),
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("point_light_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[MeshVertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(depth_state(true)),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            globals,
            globals_bind_group,
            draws,
            draws_bind_group,
            torus: None,
            sphere: None,
            depth: create_depth_texture(device, "point_light_depth", width, height),
        }
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth = create_depth_texture(device, "point_light_depth", width, height);
    }

    pub fn reset(&mut self) {
        self.torus = None;
        self.sphere = None;
    }

    /// Keep `slot` holding an upload of `mesh`, replacing it when the mesh
    /// changed.
    fn sync_mesh(device: &wgpu::Device, slot: &mut Option<(Mesh, GpuMesh)>, label: &str, mesh: &Mesh) {
        if slot.as_ref().is_some_and(|(uploaded, _)| uploaded == mesh) {
            return;
        }
        *slot = Some((mesh.clone(), GpuMesh::new(device, label, mesh)));
    }

    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        view: &PointLightView<'_>,
    ) {
        Self::sync_mesh(device, &mut self.torus, "point_light_torus", view.torus);
        Self::sync_mesh(device, &mut self.sphere, "point_light_sphere", view.sphere);
        queue.write_buffer(&self.globals, 0, bytemuck::bytes_of(&Globals::new(view)));
        let draws = draw_uniforms(view);
        for (slot, draw) in draws.iter().enumerate() {
            queue.write_buffer(&self.draws, slot as u64 * SLOT_STRIDE, bytemuck::bytes_of(draw));
        }

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("point_light_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear_color(view.clear_color)),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            ..Default::default()
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.globals_bind_group, &[]);
        for slot in 0..draws.len() {
            let mesh = if slot == 0 { &self.torus } else { &self.sphere };
            let Some((_, mesh)) = mesh else {
                continue;
            };
            pass.set_bind_group(1, &self.draws_bind_group, &[(slot as u64 * SLOT_STRIDE) as u32]);
            mesh.draw(&mut pass, 0..1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framelab_common::Color;
    use framelab_render::{PerspectiveCamera, PointLight};
    use glam::Vec3;

    fn view<'a>(camera: &'a PerspectiveCamera, mesh: &'a Mesh, lights: &'a [PointLight]) -> PointLightView<'a> {
        PointLightView {
            camera,
            torus: mesh,
            sphere: mesh,
            torus_model: Mat4::IDENTITY,
            light_rotation: Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0)),
            lights,
            clear_color: Color::BLACK,
        }
    }

    #[test]
    fn uniforms_fit_their_slots() {
        assert_eq!(std::mem::size_of::<Globals>(), 224);
        assert!(std::mem::size_of::<DrawUniform>() as u64 <= SLOT_STRIDE);
    }

    #[test]
    fn globals_use_rotated_light_positions() {
        let camera = PerspectiveCamera::default();
        let mesh = Mesh::default();
        let lights = [
            PointLight {
                position: Vec3::ONE,
                color: Color::RED,
            },
            PointLight {
                position: Vec3::NEG_ONE,
                color: Color::GREEN,
            },
        ];
        let g = Globals::new(&view(&camera, &mesh, &lights));
        assert_eq!(g.counts[0], 2);
        assert_eq!(g.light_positions[0], [1.0, 2.0, 1.0, 1.0]);
        assert_eq!(g.light_colors[1], [0.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn markers_are_unlit_in_their_light_color() {
        let camera = PerspectiveCamera::default();
        let mesh = Mesh::default();
        let lights = [PointLight {
            position: Vec3::X,
            color: Color::RED,
        }];
        let draws = draw_uniforms(&view(&camera, &mesh, &lights));
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].params[0], 1.0);
        assert_eq!(draws[1].params[0], 0.0);
        assert_eq!(draws[1].color, Color::RED.to_array());
        assert_eq!(draws[1].model[3], [1.0, 1.0, 0.0, 1.0]);
    }
}
