//! A torus lit by two coloured point lights, with either the torus or the
//! lights turning around Y.

use framelab_common::Color;
use framelab_geometry::{Mesh, sphere, torus};
use framelab_input::{Action, Control, InputState};
use framelab_render::{FrameView, OrbitCamera, PerspectiveCamera, PointLight, PointLightView};
use framelab_tween::FrameTime;
use glam::{Mat4, Vec3};

use crate::config::LightsConfig;
use crate::{Demo, DemoId};

pub const ROTATION: &str = "rotation";

pub struct Lights {
    camera: PerspectiveCamera,
    orbit: OrbitCamera,
    torus: Mesh,
    sphere: Mesh,
    lights: [PointLight; 2],
    rotate_torus: bool,
    time: f32,
    clear_color: Color,
}

impl Lights {
    pub fn new(config: &LightsConfig, width: u32, height: u32) -> Self {
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        let grey = config.clear_grey;
        Self {
            camera: config.orbit.camera(aspect),
            orbit: config.orbit.orbit(),
            torus: torus(
                config.rows,
                config.columns,
                config.inner_radius,
                config.outer_radius,
                Color::WHITE,
            ),
            sphere: sphere(config.light_radius, 10, 10),
            lights: [
                PointLight {
                    position: Vec3::ONE,
                    color: Color::RED,
                },
                PointLight {
                    position: Vec3::NEG_ONE,
                    color: Color::GREEN,
                },
            ],
            rotate_torus: false,
            time: 0.0,
            clear_color: Color::rgb(grey, grey, grey),
        }
    }

    /// Spin about Y for the current time; whichever of torus or lights is
    /// selected gets it, the other stays put.
    fn spin(&self) -> Mat4 {
        Mat4::from_rotation_y(self.time)
    }

    pub fn torus_model(&self) -> Mat4 {
        if self.rotate_torus { self.spin() } else { Mat4::IDENTITY }
    }

    pub fn light_rotation(&self) -> Mat4 {
        if self.rotate_torus { Mat4::IDENTITY } else { self.spin() }
    }
}

impl Demo for Lights {
    fn id(&self) -> DemoId {
        DemoId::Lights
    }

    fn update(&mut self, time: &FrameTime, _input: &InputState) {
        self.time = time.elapsed;
        self.orbit.apply(&mut self.camera);
    }

    fn handle(&mut self, action: &Action) {
        match *action {
            Action::Toggle { control: ROTATION, on } => self.rotate_torus = on,
            Action::Resize { width, height } => self.camera.set_aspect(width, height),
            _ => {}
        }
    }

    fn controls(&self) -> Vec<Control> {
        vec![Control::Toggle {
            id: ROTATION,
            label: "Rotation",
            on: self.rotate_torus,
        }]
    }

    fn view(&self) -> FrameView<'_> {
        FrameView::PointLights(PointLightView {
            camera: &self.camera,
            torus: &self.torus,
            sphere: &self.sphere,
            torus_model: self.torus_model(),
            light_rotation: self.light_rotation(),
            lights: &self.lights,
            clear_color: self.clear_color,
        })
    }

    fn orbit(&mut self) -> Option<&mut OrbitCamera> {
        Some(&mut self.orbit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn at(lights: &mut Lights, seconds: f32) {
        let mut time = FrameTime::first(seconds);
        time.elapsed = seconds;
        lights.update(&time, &InputState::default());
    }

    #[test]
    fn lights_orbit_by_default() {
        let mut l = Lights::new(&LightsConfig::default(), 800, 600);
        at(&mut l, FRAC_PI_2);
        assert_eq!(l.torus_model(), Mat4::IDENTITY);
        let FrameView::PointLights(view) = l.view() else {
            panic!("point-light view expected");
        };
        let red: Vec<Vec3> = view.light_positions().collect();
        assert!((red[0] - Vec3::new(1.0, 1.0, -1.0)).length() < 1e-5);
        assert_eq!(view.lights[1].color, Color::GREEN);
    }

    #[test]
    fn rotation_toggle_turns_the_torus_instead() {
        let mut l = Lights::new(&LightsConfig::default(), 800, 600);
        l.handle(&Action::Toggle { control: ROTATION, on: true });
        at(&mut l, 1.0);
        assert_eq!(l.light_rotation(), Mat4::IDENTITY);
        assert_eq!(l.torus_model(), Mat4::from_rotation_y(1.0));
    }

    #[test]
    fn camera_starts_on_the_orbit() {
        let mut l = Lights::new(&LightsConfig::default(), 800, 600);
        at(&mut l, 0.0);
        let FrameView::PointLights(view) = l.view() else {
            panic!("point-light view expected");
        };
        assert!((view.camera.eye.length() - 5.0).abs() < 1e-4);
        assert_eq!(view.camera.fov_y_deg, 45.0);
        assert_eq!(view.torus.triangle_count(), 256 * 4 * 2);
    }
}
