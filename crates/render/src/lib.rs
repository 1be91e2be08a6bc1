//! Rendering adapter: everything a backend needs to draw a demo frame,
//! without any GPU types.
//!
//! # Invariants
//! - Renderers read [`FrameView`]s; they never mutate demo state.
//! - A [`FrameGraph`] handed to a backend has passed [`FrameGraph::validate`]:
//!   every sampled target was written earlier in the same frame and no pass
//!   samples its own output.
//! - Offscreen targets always match the current viewport size; a resize
//!   frees and reallocates all of them.

mod blur;
mod camera;
mod graph;
mod renderer;
mod targets;
mod view;

pub use blur::{BLUR_TAPS, gauss_weights};
pub use camera::{OrbitCamera, PerspectiveCamera};
pub use graph::{FrameGraph, GraphError, Pass, PassOutput, PassUniforms, Program, TargetId, TextureSource};
pub use renderer::{DebugTextRenderer, Renderer};
pub use targets::TargetSet;
pub use view::{FrameView, PointLight, PointLightView, PolygonView};

pub fn crate_info() -> &'static str {
    "framelab-render v0.1.0"
}
