//! wgpu backend for framelab frame views.
//!
//! One renderer per view kind: lit scenes with instancing and fog, a
//! clip-space polygon, a point-light torus, and multi-pass post-processing
//! through offscreen targets.
//!
//! # Invariants
//! - Rendering never mutates demo state.
//! - Post-process graphs are validated before any pass is recorded.
//! - Offscreen targets match the viewport; a resize reallocates them all.
//! - A texture that failed to load renders as its procedural fallback.

mod gpu;
mod lights;
mod polygon;
mod post;
mod scene;
mod shaders;
mod texture;

pub use gpu::{RenderError, WgpuRenderer};
pub use lights::PointLightRenderer;
pub use polygon::PolygonRenderer;
pub use post::PostProcessRenderer;
pub use scene::SceneRenderer;
pub use texture::{COLOR_FORMAT, GpuTexture, TextureCache};

pub fn crate_info() -> &'static str {
    "framelab-render-wgpu v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("render-wgpu"));
    }
}
