use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use framelab_common::TextureKey;
use framelab_render::PerspectiveCamera;
use framelab_scene::{DrawBatch, Environment, Material, MaterialHandle, MeshHandle, Scene};
use glam::{Mat4, Vec3};

use crate::gpu::{
    ColorVertex, DynamicBuffer, GpuMesh, MeshVertex, clear_color, depth_state, sampler_entry, texture_entry,
    uniform_buffer, uniform_entry,
};
use crate::shaders;
use crate::texture::{TextureCache, create_depth_texture, create_sampler};

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
struct Globals {
    view_proj: [[f32; 4]; 4],
    eye: [f32; 4],
    light_dir: [f32; 4],
    light_color: [f32; 4],
    ambient: [f32; 4],
    fog_color: [f32; 4],
    fog: [f32; 4],
}

impl Globals {
    fn new(camera: &PerspectiveCamera, env: &Environment) -> Self {
        let (light_dir, light_color) = match env.directional {
            Some(light) => (
                light.direction.extend(1.0).to_array(),
                light.color.to_rgb_array().map(|c| c * light.intensity),
            ),
            None => ([0.0; 4], [0.0; 3]),
        };
        let ambient = env.ambient_rgb();
        let (fog_color, fog) = match env.fog {
            Some(fog) => (fog.color.to_array(), [fog.near, fog.far, 1.0, 0.0]),
            None => ([0.0; 4], [0.0; 4]),
        };
        Self {
            view_proj: camera.view_projection().to_cols_array_2d(),
            eye: camera.eye.extend(1.0).to_array(),
            light_dir,
            light_color: [light_color[0], light_color[1], light_color[2], 1.0],
            ambient: [ambient[0], ambient[1], ambient[2], 1.0],
            fog_color,
            fog,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
struct MaterialUniform {
    color: [f32; 4],
    params: [f32; 4],
}

impl From<&Material> for MaterialUniform {
    fn from(material: &Material) -> Self {
        let flag = |on: bool| if on { 1.0 } else { 0.0 };
        Self {
            color: material.base_color(),
            params: [flag(material.lit), material.alpha_test, flag(material.fog), 0.0],
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
struct InstanceData {
    model: [[f32; 4]; 4],
}

impl InstanceData {
    const ATTRIBUTES: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        4 => Float32x4,
        5 => Float32x4,
        6 => Float32x4,
        7 => Float32x4,
    ];
}

/// Pipeline variant for a material: face culling and blending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Variant {
    double_sided: bool,
    transparent: bool,
}

impl Variant {
    const ALL: [Variant; 4] = [
        Variant { double_sided: false, transparent: false },
        Variant { double_sided: true, transparent: false },
        Variant { double_sided: false, transparent: true },
        Variant { double_sided: true, transparent: true },
    ];

    fn of(material: &Material) -> Self {
        Self {
            double_sided: material.double_sided,
            transparent: material.transparent,
        }
    }

    fn index(self) -> usize {
        self.double_sided as usize + 2 * self.transparent as usize
    }
}

struct GpuMaterial {
    uniform: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    texture: Option<TextureKey>,
}

/// One instanced draw, resolved against the instance buffer.
struct Draw {
    mesh: MeshHandle,
    material: MaterialHandle,
    variant: Variant,
    instances: std::ops::Range<u32>,
}

/// Three-colored axes lines (x red, y green, z blue) of `length` from the
/// origin of `world`.
fn axes_lines(world: Mat4, length: f32) -> [ColorVertex; 6] {
    let origin = world.transform_point3(Vec3::ZERO).to_array();
    let axis = |dir: Vec3, color: [f32; 4]| {
        [
            ColorVertex { position: origin, color },
            ColorVertex {
                position: world.transform_point3(dir * length).to_array(),
                color,
            },
        ]
    };
    let [x0, x1] = axis(Vec3::X, [1.0, 0.0, 0.0, 1.0]);
    let [y0, y1] = axis(Vec3::Y, [0.0, 1.0, 0.0, 1.0]);
    let [z0, z1] = axis(Vec3::Z, [0.0, 0.0, 1.0, 1.0]);
    [x0, x1, y0, y1, z0, z1]
}

/// Opaque batches first, then transparent ones sorted back to front.
fn order_batches(mut batches: Vec<DrawBatch>, scene: &Scene, eye: Vec3) -> Vec<(DrawBatch, Variant)> {
    let mut opaque = Vec::new();
    let mut transparent = Vec::new();
    for batch in batches.drain(..) {
        let Some(material) = scene.material(batch.material) else {
            continue;
        };
        let variant = Variant::of(material);
        if variant.transparent {
            transparent.push((batch, variant));
        } else {
            opaque.push((batch, variant));
        }
    }
    for (batch, _) in &mut transparent {
        batch.sort_back_to_front(eye);
    }
    let farthest = |batch: &DrawBatch| {
        batch
            .instances
            .first()
            .map(|m| m.w_axis.truncate().distance_squared(eye))
            .unwrap_or(0.0)
    };
    transparent.sort_by(|a, b| farthest(&b.0).total_cmp(&farthest(&a.0)));
    opaque.extend(transparent);
    opaque
}

/// Draws a [`Scene`]: visible meshes instanced per (mesh, material) and
/// axes helpers as lines.
///
/// Meshes and materials are uploaded the first time they are drawn and kept
/// until [`reset`](SceneRenderer::reset).
pub struct SceneRenderer {
    pipelines: Vec<wgpu::RenderPipeline>,
    line_pipeline: wgpu::RenderPipeline,
    globals: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,
    material_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    meshes: HashMap<MeshHandle, GpuMesh>,
    materials: HashMap<MaterialHandle, GpuMaterial>,
    instances: DynamicBuffer,
    lines: DynamicBuffer,
    depth: wgpu::TextureView,
}

impl SceneRenderer {
    pub fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat, width: u32, height: u32) -> Self {
        let globals = uniform_buffer(device, "scene_globals", &Globals::zeroed());
        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("scene_globals_layout"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX_FRAGMENT, false)],
        });
        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scene_globals"),
            layout: &globals_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals.as_entire_binding(),
            }],
        });
        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("scene_material_layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::FRAGMENT, false),
                texture_entry(1),
                sampler_entry(2),
            ],
        });

        let mesh_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene_pipeline_layout"),
            bind_group_layouts: &[&globals_layout, &material_layout],
            push_constant_ranges: &[],
        });
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("scene_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::SCENE_SHADER.into()),
        });
        let pipelines = Variant::ALL
            .iter()
            .map(|variant| Self::mesh_pipeline(device, &mesh_layout, &shader, surface_format, *variant))
            .collect();

        let line_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("line_pipeline_layout"),
            bind_group_layouts: &[&globals_layout],
            push_constant_ranges: &[],
        });
        let line_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("line_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::LINE_SHADER.into()),
        });
        let line_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("line_pipeline"),
            layout: Some(&line_layout),
            vertex: wgpu::VertexState {
                module: &line_shader,
                entry_point: Some("vs_line"),
                compilation_options: Default::default(),
                buffers: &[ColorVertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &line_shader,
                entry_point: Some("fs_line"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::LineList,
                ..Default::default()
            },
            depth_stencil: Some(depth_state(true)),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipelines,
            line_pipeline,
            globals,
            globals_bind_group,
            material_layout,
            sampler: create_sampler(device, "scene_sampler", wgpu::AddressMode::Repeat),
            meshes: HashMap::new(),
            materials: HashMap::new(),
            instances: DynamicBuffer::new(
                device,
                "scene_instances",
                wgpu::BufferUsages::VERTEX,
                1024 * std::mem::size_of::<InstanceData>() as u64,
            ),
            lines: DynamicBuffer::new(device, "scene_lines", wgpu::BufferUsages::VERTEX, 4096),
            depth: create_depth_texture(device, "scene_depth", width, height),
        }
    }

    fn mesh_pipeline(
        device: &wgpu::Device,
        layout: &wgpu::PipelineLayout,
        shader: &wgpu::ShaderModule,
        format: wgpu::TextureFormat,
        variant: Variant,
    ) -> wgpu::RenderPipeline {
        let blend = if variant.transparent {
            wgpu::BlendState::ALPHA_BLENDING
        } else {
            wgpu::BlendState::REPLACE
        };
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("scene_pipeline"),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[
                    MeshVertex::layout(),
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<InstanceData>() as u64,
                        step_mode: wgpu::VertexStepMode::Instance,
                        attributes: &InstanceData::ATTRIBUTES,
                    },
                ],
            },
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(blend),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: if variant.double_sided { None } else { Some(wgpu::Face::Back) },
                ..Default::default()
            },
            depth_stencil: Some(depth_state(!variant.transparent)),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        })
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth = create_depth_texture(device, "scene_depth", width, height);
    }

    /// Drop uploaded meshes and materials; handles restart with a new scene.
    pub fn reset(&mut self) {
        self.meshes.clear();
        self.materials.clear();
    }

    fn prepare_material(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        textures: &mut TextureCache,
        handle: MaterialHandle,
        material: &Material,
    ) {
        if let Some(key) = &material.texture {
            textures.ensure(device, queue, key);
        }
        let uniform = MaterialUniform::from(material);
        if let Some(gpu) = self.materials.get(&handle) {
            if gpu.texture == material.texture {
                queue.write_buffer(&gpu.uniform, 0, bytemuck::bytes_of(&uniform));
                return;
            }
        }
        let buffer = uniform_buffer(device, "scene_material", &uniform);
        let texture = match &material.texture {
            Some(key) => textures.get(key),
            None => textures.white(),
        };
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scene_material"),
            layout: &self.material_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });
        self.materials.insert(
            handle,
            GpuMaterial {
                uniform: buffer,
                bind_group,
                texture: material.texture.clone(),
            },
        );
    }

    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        textures: &mut TextureCache,
        scene: &Scene,
        camera: &PerspectiveCamera,
    ) {
        queue.write_buffer(
            &self.globals,
            0,
            bytemuck::bytes_of(&Globals::new(camera, &scene.environment)),
        );

        let batches = order_batches(scene.visible_meshes(), scene, camera.eye);
        let mut instances: Vec<InstanceData> = Vec::new();
        let mut draws = Vec::with_capacity(batches.len());
        for (batch, variant) in &batches {
            let Some(mesh) = scene.mesh(batch.mesh) else {
                continue;
            };
            let Some(material) = scene.material(batch.material) else {
                continue;
            };
            self.meshes
                .entry(batch.mesh)
                .or_insert_with(|| GpuMesh::new(device, "scene_mesh", mesh));
            self.prepare_material(device, queue, textures, batch.material, material);

            let start = instances.len() as u32;
            instances.extend(batch.instances.iter().map(|m| InstanceData {
                model: m.to_cols_array_2d(),
            }));
            draws.push(Draw {
                mesh: batch.mesh,
                material: batch.material,
                variant: *variant,
                instances: start..instances.len() as u32,
            });
        }
        self.instances.write(device, queue, bytemuck::cast_slice(&instances));

        let lines: Vec<ColorVertex> = scene
            .visible_axes()
            .into_iter()
            .flat_map(|(world, length)| axes_lines(world, length))
            .collect();
        self.lines.write(device, queue, bytemuck::cast_slice(&lines));

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("scene_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear_color(scene.environment.clear_color)),
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

        pass.set_bind_group(0, &self.globals_bind_group, &[]);
        if !lines.is_empty() {
            pass.set_pipeline(&self.line_pipeline);
            pass.set_vertex_buffer(0, self.lines.buffer().slice(..));
            pass.draw(0..lines.len() as u32, 0..1);
        }

        if !instances.is_empty() {
            pass.set_vertex_buffer(1, self.instances.buffer().slice(..));
        }
        for draw in &draws {
            let (Some(mesh), Some(material)) = (self.meshes.get(&draw.mesh), self.materials.get(&draw.material)) else {
                continue;
            };
            pass.set_pipeline(&self.pipelines[draw.variant.index()]);
            pass.set_bind_group(1, &material.bind_group, &[]);
            mesh.draw(&mut pass, draw.instances.clone());
        }
    }
}
