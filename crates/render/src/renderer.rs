use std::fmt::Write;

use framelab_scene::Scene;

use crate::{FrameView, PerspectiveCamera, PointLightView, PolygonView};

/// Renderer-agnostic interface. All renderers implement this trait.
///
/// The renderer reads a frame view and produces output. It never mutates
/// demo state; demos own their scenes and hand out borrowed views.
pub trait Renderer {
    /// The output type produced by this renderer.
    type Output;

    /// Render one frame from the given view.
    fn render(&self, view: &FrameView<'_>) -> Self::Output;
}

/// Text renderer for the CLI, logs and tests.
///
/// Produces a human-readable dump of what a GPU backend would draw.
#[derive(Debug, Default)]
pub struct DebugTextRenderer;

impl DebugTextRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Renderer for DebugTextRenderer {
    type Output = String;

    fn render(&self, view: &FrameView<'_>) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "=== Frame ({}) ===", view.kind());
        match view {
            FrameView::Scene { scene, camera } => write_scene(&mut out, scene, camera),
            FrameView::Polygon(p) => write_polygon(&mut out, p),
            FrameView::PointLights(p) => write_point_lights(&mut out, p),
            FrameView::PostProcess { graph } => {
                let _ = write!(out, "{graph}");
            }
        }
        out
    }
}

fn write_camera(out: &mut String, camera: &PerspectiveCamera) {
    let _ = writeln!(
        out,
        "Camera: eye=({:.1}, {:.1}, {:.1}) target=({:.1}, {:.1}, {:.1}) fov={:.0}",
        camera.eye.x,
        camera.eye.y,
        camera.eye.z,
        camera.target.x,
        camera.target.y,
        camera.target.z,
        camera.fov_y_deg
    );
}

fn write_scene(out: &mut String, scene: &Scene, camera: &PerspectiveCamera) {
    let batches = scene.visible_meshes();
    let instances: usize = batches.iter().map(|b| b.instances.len()).sum();
    let _ = writeln!(out, "Nodes: {}", scene.node_count());
    let _ = writeln!(out, "Batches: {} ({} instances)", batches.len(), instances);
    write_camera(out, camera);

    for (id, matrix) in scene.visible_nodes() {
        let Some(node) = scene.get(id) else { continue };
        let p = matrix.w_axis;
        let _ = writeln!(
            out,
            "  [{}] {:<12} pos=({:.2}, {:.2}, {:.2})",
            id.short(),
            node.name,
            p.x,
            p.y,
            p.z
        );
    }
}

fn write_polygon(out: &mut String, view: &PolygonView<'_>) {
    let _ = writeln!(
        out,
        "Vertices: {} time={:.2}s square={}",
        view.mesh.vertex_count(),
        view.time,
        view.square
    );
}

fn write_point_lights(out: &mut String, view: &PointLightView<'_>) {
    let _ = writeln!(out, "Torus triangles: {}", view.torus.triangle_count());
    write_camera(out, view.camera);
    for (light, p) in view.lights.iter().zip(view.light_positions()) {
        let c = light.color;
        let _ = writeln!(
            out,
            "  light pos=({:.2}, {:.2}, {:.2}) color=({:.2}, {:.2}, {:.2})",
            p.x, p.y, p.z, c.r, c.g, c.b
        );
    }
}
