use framelab_common::Color;
use framelab_geometry::Mesh;
use framelab_scene::Scene;
use glam::{Mat4, Vec3};

use crate::{FrameGraph, PerspectiveCamera};

/// Read-only snapshot of what a demo wants drawn this frame.
#[derive(Debug, Clone, Copy)]
pub enum FrameView<'a> {
    /// Lit scene graph seen through a perspective camera.
    Scene {
        scene: &'a Scene,
        camera: &'a PerspectiveCamera,
    },
    Polygon(PolygonView<'a>),
    PointLights(PointLightView<'a>),
    /// Offscreen passes ending on the screen.
    PostProcess { graph: &'a FrameGraph },
}

impl FrameView<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            FrameView::Scene { .. } => "scene",
            FrameView::Polygon(_) => "polygon",
            FrameView::PointLights(_) => "point-lights",
            FrameView::PostProcess { .. } => "post-process",
        }
    }
}

/// Vertex-colored 2D shape drawn in clip space.
#[derive(Debug, Clone, Copy)]
pub struct PolygonView<'a> {
    pub mesh: &'a Mesh,
    /// Seconds since start; drives the hue shift in the shader.
    pub time: f32,
    pub clear_color: Color,
    /// Draw into a centered square viewport of side `min(width, height)`.
    pub square: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Color,
}

/// Torus lit by point lights, each marked by a small sphere.
#[derive(Debug, Clone, Copy)]
pub struct PointLightView<'a> {
    pub camera: &'a PerspectiveCamera,
    pub torus: &'a Mesh,
    pub sphere: &'a Mesh,
    pub torus_model: Mat4,
    /// Applied to every light position before shading.
    pub light_rotation: Mat4,
    pub lights: &'a [PointLight],
    pub clear_color: Color,
}

impl PointLightView<'_> {
    /// Light positions after `light_rotation`.
    pub fn light_positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.lights
            .iter()
            .map(|l| self.light_rotation.transform_point3(l.position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn light_positions_follow_rotation() {
        let camera = PerspectiveCamera::new(45.0, 1.0, 0.1, 10.0);
        let torus = Mesh::default();
        let sphere = Mesh::default();
        let lights = [PointLight {
            position: Vec3::new(1.0, 0.0, 0.0),
            color: Color::RED,
        }];
        let view = PointLightView {
            camera: &camera,
            torus: &torus,
            sphere: &sphere,
            torus_model: Mat4::IDENTITY,
            light_rotation: Mat4::from_rotation_y(PI / 2.0),
            lights: &lights,
            clear_color: Color::BLACK,
        };
        let p: Vec<Vec3> = view.light_positions().collect();
        assert!((p[0] - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-5);
        assert_eq!(FrameView::PointLights(view).kind(), "point-lights");
    }
}
