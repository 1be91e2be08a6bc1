use std::collections::HashMap;

use framelab_assets::{AssetStore, TextureData};
use framelab_common::TextureKey;
use tracing::debug;

/// Color format of uploaded images and offscreen targets. Values go to the
/// GPU as stored, matching the non-sRGB surface.
pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// A sampled 2D texture living on the GPU.
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
}

impl GpuTexture {
    /// Upload RGBA8 pixels.
    pub fn from_data(device: &wgpu::Device, queue: &wgpu::Queue, label: &str, data: &TextureData) -> Self {
        let (width, height) = (data.width.max(1), data.height.max(1));
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: COLOR_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        if data.rgba.len() == (width * height * 4) as usize {
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                &data.rgba,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * width),
                    rows_per_image: Some(height),
                },
                size,
            );
        }
        let view = texture.create_view(&Default::default());
        Self {
            texture,
            view,
            width,
            height,
        }
    }

    /// Color target that later passes can sample.
    pub fn render_target(device: &wgpu::Device, label: &str, width: u32, height: u32) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: COLOR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&Default::default());
        Self {
            texture,
            view,
            width,
            height,
        }
    }
}

pub fn create_depth_texture(device: &wgpu::Device, label: &str, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&Default::default())
}

pub fn create_sampler(device: &wgpu::Device, label: &str, address_mode: wgpu::AddressMode) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        address_mode_w: address_mode,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

/// GPU copies of resolved textures, keyed by name.
///
/// Keys go through the [`AssetStore`], so a missing file is uploaded as its
/// procedural stand-in rather than failing the frame.
pub struct TextureCache {
    assets: AssetStore,
    uploaded: HashMap<TextureKey, GpuTexture>,
    white: GpuTexture,
}

impl TextureCache {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, assets: AssetStore) -> Self {
        let white = GpuTexture::from_data(device, queue, "white_texture", &TextureData::solid(1, 1, [255; 4]));
        Self {
            assets,
            uploaded: HashMap::new(),
            white,
        }
    }

    /// 1×1 white texture bound where a material has none.
    pub fn white(&self) -> &GpuTexture {
        &self.white
    }

    pub fn assets(&self) -> &AssetStore {
        &self.assets
    }

    pub fn is_uploaded(&self, key: &TextureKey) -> bool {
        self.uploaded.contains_key(key)
    }

    /// Resolve and upload `key` if this cache has not seen it yet.
    pub fn ensure(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, key: &TextureKey) {
        if self.uploaded.contains_key(key) {
            return;
        }
        let id = self.assets.resolve(key);
        let texture = match self.assets.get(id) {
            Some(data) => GpuTexture::from_data(device, queue, key.as_str(), data),
            None => GpuTexture::from_data(device, queue, key.as_str(), &TextureData::solid(1, 1, [255; 4])),
        };
        debug!(key = %key, width = texture.width, height = texture.height, "texture uploaded");
        self.uploaded.insert(key.clone(), texture);
    }

    pub fn preload<'a>(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        keys: impl IntoIterator<Item = &'a TextureKey>,
    ) {
        for key in keys {
            self.ensure(device, queue, key);
        }
    }

    /// Uploaded texture for `key`, or white when it was never ensured.
    pub fn get(&self, key: &TextureKey) -> &GpuTexture {
        self.uploaded.get(key).unwrap_or(&self.white)
    }
}
