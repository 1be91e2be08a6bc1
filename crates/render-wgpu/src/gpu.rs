use bytemuck::{Pod, Zeroable};
use framelab_assets::AssetStore;
use framelab_common::{Color, TextureKey};
use framelab_geometry::Mesh;
use framelab_render::{FrameView, GraphError};
use tracing::debug;
use wgpu::util::DeviceExt;

use crate::lights::PointLightRenderer;
use crate::polygon::PolygonRenderer;
use crate::post::PostProcessRenderer;
use crate::scene::SceneRenderer;
use crate::texture::TextureCache;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("invalid pass graph: {0}")]
    Graph(#[from] GraphError),
}

/// Interleaved mesh vertex shared by the scene and point-light pipelines.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub(crate) struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

impl MeshVertex {
    pub const ATTRIBUTES: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
        2 => Float32x2,
        3 => Float32x4,
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MeshVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Position plus color, for line lists and raw polygons.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub(crate) struct ColorVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

impl ColorVertex {
    pub const ATTRIBUTES: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x4,
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ColorVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

pub(crate) fn mesh_vertices(mesh: &Mesh) -> Vec<MeshVertex> {
    (0..mesh.vertex_count())
        .map(|i| MeshVertex {
            position: mesh.positions[i],
            normal: mesh.normals[i],
            uv: mesh.uvs[i],
            color: mesh.colors[i],
        })
        .collect()
}

/// Triangles of `mesh` expanded into a flat colored vertex list.
pub(crate) fn color_vertices(mesh: &Mesh) -> Vec<ColorVertex> {
    mesh.indices
        .iter()
        .map(|&i| ColorVertex {
            position: mesh.positions[i as usize],
            color: mesh.colors[i as usize],
        })
        .collect()
}

/// Indexed mesh uploaded once.
pub(crate) struct GpuMesh {
    pub vertices: wgpu::Buffer,
    pub indices: wgpu::Buffer,
    pub index_count: u32,
}

impl GpuMesh {
    pub fn new(device: &wgpu::Device, label: &str, mesh: &Mesh) -> Self {
        let vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&mesh_vertices(mesh)),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertices,
            indices,
            index_count: mesh.indices.len() as u32,
        }
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, instances: std::ops::Range<u32>) {
        pass.set_vertex_buffer(0, self.vertices.slice(..));
        pass.set_index_buffer(self.indices.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, instances);
    }
}

/// Vertex buffer rewritten every frame, reallocated when it runs out of room.
pub(crate) struct DynamicBuffer {
    label: &'static str,
    usage: wgpu::BufferUsages,
    buffer: wgpu::Buffer,
    capacity: u64,
}

impl DynamicBuffer {
    pub fn new(device: &wgpu::Device, label: &'static str, usage: wgpu::BufferUsages, capacity: u64) -> Self {
        let usage = usage | wgpu::BufferUsages::COPY_DST;
        let capacity = capacity.max(wgpu::COPY_BUFFER_ALIGNMENT);
        Self {
            label,
            usage,
            buffer: Self::allocate(device, label, usage, capacity),
            capacity,
        }
    }

    fn allocate(device: &wgpu::Device, label: &str, usage: wgpu::BufferUsages, size: u64) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage,
            mapped_at_creation: false,
        })
    }

    pub fn write(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, bytes: &[u8]) {
        let needed = bytes.len() as u64;
        if needed > self.capacity {
            self.capacity = grown_capacity(self.capacity, needed);
            debug!(buffer = self.label, capacity = self.capacity, "growing buffer");
            self.buffer = Self::allocate(device, self.label, self.usage, self.capacity);
        }
        if !bytes.is_empty() {
            queue.write_buffer(&self.buffer, 0, bytes);
        }
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}

/// Next power of two at or above `needed`, never shrinking.
pub(crate) fn grown_capacity(current: u64, needed: u64) -> u64 {
    current.max(needed.next_power_of_two())
}

pub(crate) fn uniform_buffer<T: Pod>(device: &wgpu::Device, label: &str, value: &T) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::bytes_of(value),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

pub(crate) fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages, dynamic: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: dynamic,
            min_binding_size: None,
        },
        count: None,
    }
}

pub(crate) fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

pub(crate) fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

pub(crate) fn depth_state(write: bool) -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: crate::texture::DEPTH_FORMAT,
        depth_write_enabled: write,
        depth_compare: wgpu::CompareFunction::Less,
        stencil: Default::default(),
        bias: Default::default(),
    }
}

pub(crate) fn clear_color(color: Color) -> wgpu::Color {
    let (r, g, b, a) = color.to_wgpu_tuple();
    wgpu::Color { r, g, b, a }
}

/// wgpu backend for every [`FrameView`] kind.
///
/// Owns one renderer per view kind plus the texture cache they share. Each
/// [`render`](WgpuRenderer::render) records into the caller's encoder, so the
/// window layer can draw its UI on top before submitting.
pub struct WgpuRenderer {
    scene: SceneRenderer,
    polygon: PolygonRenderer,
    lights: PointLightRenderer,
    post: PostProcessRenderer,
    textures: TextureCache,
    surface_format: wgpu::TextureFormat,
    size: (u32, u32),
}

impl WgpuRenderer {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        assets: AssetStore,
    ) -> Self {
        Self {
            scene: SceneRenderer::new(device, surface_format, width, height),
            polygon: PolygonRenderer::new(device, surface_format),
            lights: PointLightRenderer::new(device, surface_format, width, height),
            post: PostProcessRenderer::new(device, surface_format, width, height),
            textures: TextureCache::new(device, queue, assets),
            surface_format,
            size: (width.max(1), height.max(1)),
        }
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.size = (width.max(1), height.max(1));
        self.scene.resize(device, width, height);
        self.lights.resize(device, width, height);
        self.post.resize(device, width, height);
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn textures(&self) -> &TextureCache {
        &self.textures
    }

    /// Forget per-demo GPU state after switching demos. Textures stay cached.
    pub fn reset(&mut self) {
        self.scene.reset();
        self.lights.reset();
    }

    /// Upload textures ahead of the first frame that needs them.
    pub fn preload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, keys: &[TextureKey]) {
        self.textures.preload(device, queue, keys);
    }

    /// Record one frame into `encoder`, ending on `target`.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        view: &FrameView<'_>,
    ) -> Result<(), RenderError> {
        match view {
            FrameView::Scene { scene, camera } => {
                self.scene
                    .render(device, queue, encoder, target, &mut self.textures, scene, camera);
            }
            FrameView::Polygon(polygon) => {
                self.polygon.render(device, queue, encoder, target, self.size, polygon);
            }
            FrameView::PointLights(lights) => {
                self.lights.render(device, queue, encoder, target, lights);
            }
            FrameView::PostProcess { graph } => {
                graph.validate()?;
                self.post
                    .render(device, queue, encoder, target, &mut self.textures, graph);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framelab_geometry::{cuboid, star_polygon};

    #[test]
    fn mesh_vertices_interleave_every_attribute() {
        let mesh = cuboid(1.0, 2.0, 3.0);
        let vertices = mesh_vertices(&mesh);
        assert_eq!(vertices.len(), mesh.vertex_count());
        assert_eq!(vertices[3].position, mesh.positions[3]);
        assert_eq!(vertices[3].uv, mesh.uvs[3]);
        assert_eq!(std::mem::size_of::<MeshVertex>(), 48);
    }

    #[test]
    fn color_vertices_follow_the_index_list() {
        let mesh = star_polygon(5, 0.5);
        let vertices = color_vertices(&mesh);
        assert_eq!(vertices.len(), mesh.indices.len());
        let last = *mesh.indices.last().unwrap() as usize;
        assert_eq!(vertices.last().unwrap().color, mesh.colors[last]);
    }

    #[test]
    fn capacity_grows_to_powers_of_two() {
        assert_eq!(grown_capacity(256, 100), 256);
        assert_eq!(grown_capacity(256, 300), 512);
        assert_eq!(grown_capacity(1024, 1025), 2048);
    }

    #[test]
    fn clear_color_keeps_components() {
        let c = clear_color(Color::rgb(0.3, 0.3, 0.3));
        assert!((c.r - 0.3).abs() < 1e-6);
        assert_eq!(c.a, 1.0);
    }
}
