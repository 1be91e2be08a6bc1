use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use framelab_render::{
    BLUR_TAPS, FrameGraph, Pass, PassOutput, PassUniforms, Program, TargetSet, TextureSource,
};
use tracing::debug;

use crate::gpu::{clear_color, depth_state, sampler_entry, texture_entry, uniform_buffer, uniform_entry};
use crate::shaders;
use crate::texture::{COLOR_FORMAT, GpuTexture, TextureCache, create_depth_texture, create_sampler};

/// Texture bindings every post-process program sees; unused ones hold white.
pub const TEXTURE_SLOTS: usize = 10;

const FIRST_TEXTURE_BINDING: u32 = 2;

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
struct PassUniformData {
    mvp: [[f32; 4]; 4],
    model: [[f32; 4]; 4],
    weights: [[f32; 4]; 2],
    mouse: [f32; 2],
    resolution: [f32; 2],
    direction: [f32; 2],
    time: f32,
    progress: f32,
    effect: u32,
    primary: u32,
    secondary: u32,
    _pad: u32,
}

impl From<&PassUniforms> for PassUniformData {
    fn from(u: &PassUniforms) -> Self {
        let mut weights = [[0.0; 4]; 2];
        for (i, w) in u.weights.iter().take(BLUR_TAPS).enumerate() {
            weights[i / 4][i % 4] = *w;
        }
        Self {
            mvp: u.mvp.to_cols_array_2d(),
            model: u.model.to_cols_array_2d(),
            weights,
            mouse: u.mouse.to_array(),
            resolution: u.resolution.to_array(),
            direction: u.direction.to_array(),
            time: u.time,
            progress: u.progress,
            effect: u.effect,
            primary: u.primary,
            secondary: u.secondary,
            _pad: 0,
        }
    }
}

/// Pipelines differ by program, output format, and whether the output has
/// a depth buffer (offscreen targets do, the screen does not).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PipelineKey {
    program: Program,
    format: wgpu::TextureFormat,
    depth: bool,
}

impl PipelineKey {
    fn for_pass(pass: &Pass, surface_format: wgpu::TextureFormat) -> Self {
        match pass.output {
            PassOutput::Target(_) => Self {
                program: pass.program,
                format: COLOR_FORMAT,
                depth: true,
            },
            PassOutput::Screen => Self {
                program: pass.program,
                format: surface_format,
                depth: false,
            },
        }
    }
}

struct Offscreen {
    color: GpuTexture,
    depth: wgpu::TextureView,
}

/// Executes a validated [`FrameGraph`] pass by pass.
///
/// Offscreen targets are owned here and follow the viewport: any size
/// change frees every target and allocates new ones.
pub struct PostProcessRenderer {
    surface_format: wgpu::TextureFormat,
    layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    shaders: HashMap<Program, wgpu::ShaderModule>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    sampler: wgpu::Sampler,
    uniforms: Vec<wgpu::Buffer>,
    targets: TargetSet,
    offscreen: Vec<Offscreen>,
    allocated: Option<u64>,
}

impl PostProcessRenderer {
    pub fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat, width: u32, height: u32) -> Self {
        let mut entries = vec![
            uniform_entry(0, wgpu::ShaderStages::VERTEX_FRAGMENT, false),
            sampler_entry(1),
        ];
        entries.extend((0..TEXTURE_SLOTS as u32).map(|slot| texture_entry(FIRST_TEXTURE_BINDING + slot)));
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("post_layout"),
            entries: &entries,
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("post_pipeline_layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });
        Self {
            surface_format,
            layout,
            pipeline_layout,
            shaders: HashMap::new(),
            pipelines: HashMap::new(),
            sampler: create_sampler(device, "post_sampler", wgpu::AddressMode::ClampToEdge),
            uniforms: Vec::new(),
            targets: TargetSet::new(0, width, height),
            offscreen: Vec::new(),
            allocated: None,
        }
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if self.targets.resize(width, height) {
            self.allocate(device);
        }
    }

    /// Offscreen targets currently allocated.
    pub fn target_count(&self) -> usize {
        self.offscreen.len()
    }

    fn allocate(&mut self, device: &wgpu::Device) {
        let (width, height) = self.targets.size();
        self.offscreen = (0..self.targets.count())
            .map(|i| Offscreen {
                color: GpuTexture::render_target(device, &format!("post_target_{i}"), width, height),
                depth: create_depth_texture(device, &format!("post_depth_{i}"), width, height),
            })
            .collect();
        self.allocated = Some(self.targets.generation());
        debug!(
            count = self.offscreen.len(),
            width,
            height,
            generation = self.targets.generation(),
            "offscreen targets allocated"
        );
    }

    /// Make the target set match the graph's target count.
    fn sync_targets(&mut self, device: &wgpu::Device, graph: &FrameGraph) {
        if self.targets.count() != graph.target_count {
            let (width, height) = self.targets.size();
            self.targets = TargetSet::new(graph.target_count, width, height);
            self.allocated = None;
        }
        if self.allocated != Some(self.targets.generation()) {
            self.allocate(device);
        }
    }

    fn ensure_pipeline(&mut self, device: &wgpu::Device, key: PipelineKey) {
        if self.pipelines.contains_key(&key) {
            return;
        }
        let shader: &wgpu::ShaderModule = self.shaders.entry(key.program).or_insert_with(|| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(key.program.label()),
                source: wgpu::ShaderSource::Wgsl(shaders::post_shader(key.program).into()),
            })
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(key.program.label()),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some(shaders::post_vertex_entry(key.program)),
                compilation_options: Default::default(),
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: key.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: key.depth.then(|| depth_state(true)),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });
        debug!(program = key.program.label(), format = ?key.format, "post pipeline created");
        self.pipelines.insert(key, pipeline);
    }

    fn bind_group_for(
        &self,
        device: &wgpu::Device,
        textures: &TextureCache,
        pass: &Pass,
        uniform: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        let views: Vec<&wgpu::TextureView> = (0..TEXTURE_SLOTS)
            .map(|slot| match pass.inputs.get(slot) {
                Some(TextureSource::Image(key)) => &textures.get(key).view,
                Some(TextureSource::Target(id)) => self
                    .offscreen
                    .get(id.0 as usize)
                    .map(|t| &t.color.view)
                    .unwrap_or(&textures.white().view),
                None => &textures.white().view,
            })
            .collect();
        let mut entries = vec![
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&self.sampler),
            },
        ];
        entries.extend(views.iter().enumerate().map(|(slot, view)| wgpu::BindGroupEntry {
            binding: FIRST_TEXTURE_BINDING + slot as u32,
            resource: wgpu::BindingResource::TextureView(view),
        }));
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&pass.label),
            layout: &self.layout,
            entries: &entries,
        })
    }

    /// Record every pass of `graph` in order. The graph must already have
    /// passed validation.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        screen: &wgpu::TextureView,
        textures: &mut TextureCache,
        graph: &FrameGraph,
    ) {
        self.sync_targets(device, graph);
        textures.preload(device, queue, &graph.images());
        while self.uniforms.len() < graph.passes.len() {
            let label = format!("post_uniform_{}", self.uniforms.len());
            self.uniforms
                .push(uniform_buffer(device, &label, &PassUniformData::zeroed()));
        }

        let mut recorded = Vec::with_capacity(graph.passes.len());
        for (index, pass) in graph.passes.iter().enumerate() {
            let key = PipelineKey::for_pass(pass, self.surface_format);
            self.ensure_pipeline(device, key);
            let uniform = &self.uniforms[index];
            queue.write_buffer(uniform, 0, bytemuck::bytes_of(&PassUniformData::from(&pass.uniforms)));
            recorded.push((key, self.bind_group_for(device, textures, pass, uniform)));
        }

        for (pass, (key, bind_group)) in graph.passes.iter().zip(&recorded) {
            let load = match pass.clear {
                Some(color) => wgpu::LoadOp::Clear(clear_color(color)),
                None => wgpu::LoadOp::Load,
            };
            let (view, depth) = match pass.output {
                PassOutput::Target(id) => match self.offscreen.get(id.0 as usize) {
                    Some(target) => (&target.color.view, Some(&target.depth)),
                    None => continue,
                },
                PassOutput::Screen => (screen, None),
            };
            let Some(pipeline) = self.pipelines.get(key) else {
                continue;
            };
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(&pass.label),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: depth.map(|view| wgpu::RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });
            render_pass.set_pipeline(pipeline);
            render_pass.set_bind_group(0, bind_group, &[]);
            render_pass.draw(0..6, 0..1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framelab_common::TextureKey;
    use framelab_render::{TargetId, gauss_weights};
    use glam::Vec2;

    #[test]
    fn uniform_layout_matches_the_shader() {
        assert_eq!(std::mem::size_of::<PassUniformData>(), 208);
    }

    #[test]
    fn blur_weights_pack_four_per_row() {
        let mut uniforms = PassUniforms::default();
        uniforms.weights.copy_from_slice(&gauss_weights(100.0, BLUR_TAPS));
        uniforms.direction = Vec2::new(1.0 / 800.0, 0.0);
        let data = PassUniformData::from(&uniforms);
        assert_eq!(data.weights[0][0], uniforms.weights[0]);
        assert_eq!(data.weights[1][3], uniforms.weights[7]);
        assert_eq!(data.direction, [1.0 / 800.0, 0.0]);
    }

    #[test]
    fn only_offscreen_passes_use_depth() {
        let surface = wgpu::TextureFormat::Bgra8Unorm;
        let offscreen = Pass::new("scene", Program::Crossfade, PassOutput::Target(TargetId(0)))
            .image(TextureKey::new("a.png"))
            .image(TextureKey::new("b.png"));
        let screen = Pass::new("present", Program::Displace, PassOutput::Screen).target(TargetId(0));

        let a = PipelineKey::for_pass(&offscreen, surface);
        assert!(a.depth);
        assert_eq!(a.format, COLOR_FORMAT);
        let b = PipelineKey::for_pass(&screen, surface);
        assert!(!b.depth);
        assert_eq!(b.format, surface);
    }

    #[test]
    fn slots_cover_every_program() {
        assert!(Program::ALL.iter().all(|p| p.input_count() <= TEXTURE_SLOTS));
    }
}
