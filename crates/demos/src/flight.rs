//! Earth, moon and a paper plane flying over the surface, steered with the
//! arrow keys.

use std::f32::consts::{FRAC_PI_2, TAU};

use framelab_common::{Color, NodeId, TextureKey, Transform};
use framelab_geometry::{cylinder, sphere};
use framelab_input::{Action, Control, InputState, Steer};
use framelab_render::{FrameView, OrbitCamera, PerspectiveCamera};
use framelab_scene::{Fog, Material, Node, Scene, SceneError};
use framelab_tween::FrameTime;
use glam::{Quat, Vec3};
use tracing::debug;

use crate::config::{FlightConfig, hex};
use crate::{Demo, DemoId, lit_environment};

pub const VIEW: &str = "view";

const EARTH_SPIN: f32 = 0.00375;
const GROUND_SPIN: f32 = 0.005;
/// Seconds of elapsed time per radian of lunar orbit.
const MOON_PERIOD_SCALE: f32 = 5.0;
const TURN_RATE: f32 = 0.01;
const CLIMB_RATE: f32 = 0.0005;

pub struct Flight {
    scene: Scene,
    camera: PerspectiveCamera,
    cockpit: PerspectiveCamera,
    orbit: OrbitCamera,
    earth: NodeId,
    ground: NodeId,
    moon: NodeId,
    plane: NodeId,
    nose: NodeId,
    textures: Vec<TextureKey>,
    direction: Vec3,
    distance: f32,
    steer: Option<Steer>,
    stopped: bool,
    first_person: bool,
    config: FlightConfig,
}

impl Flight {
    pub fn new(config: &FlightConfig, width: u32, height: u32) -> Result<Self, SceneError> {
        let mut env = lit_environment(hex(config.clear_color), config.ambient);
        env.fog = Some(Fog {
            color: Color::BLACK,
            near: config.fog_near,
            far: config.fog_far,
        });
        let mut scene = Scene::with_environment(env);
        let earth_texture = TextureKey::new(config.earth_texture.as_str());
        let moon_texture = TextureKey::new(config.moon_texture.as_str());

        let globe = scene.add_mesh(sphere(5.0, 18, 18));
        let earth_material = scene.add_material(Material::phong(hex(config.earth_color)));
        let ground_material = scene.add_material(
            Material::phong(Color::WHITE)
                .with_texture(earth_texture.clone())
                .with_transparency(1.0)
                .with_alpha_test(0.2),
        );
        let moon_material =
            scene.add_material(Material::phong(hex(config.moon_color)).with_texture(moon_texture.clone()));

        let earth = scene.add(None, Node::mesh("earth", globe, earth_material))?;
        let ground = scene.add(
            None,
            Node::mesh("ground", globe, ground_material)
                .with_transform(Transform::default().with_uniform_scale(1.015)),
        )?;
        let moon = scene.add(
            None,
            Node::mesh("moon", globe, moon_material).with_transform(
                Transform::from_position(Vec3::new(config.moon_distance, 0.0, 0.0)).with_uniform_scale(0.4),
            ),
        )?;

        // The outer node carries position and heading; the inner one only
        // scales the model down.
        let plane = scene.add(
            None,
            Node::group("plane").with_position(Vec3::new(0.0, config.plane_distance, 0.0)),
        )?;
        let airframe = scene.add(
            Some(plane),
            Node::group("airframe").with_transform(Transform::default().with_uniform_scale(0.1)),
        )?;
        let hull = scene.add_material(Material::phong(hex(config.plane_color)));
        let fin = scene.add_mesh(cylinder(5.0, 5.0, 0.1, 3));
        scene.add(
            Some(airframe),
            Node::mesh("wing", fin, hull).with_transform(
                Transform::default()
                    .with_euler(FRAC_PI_2 * -0.02, 0.0, 0.0)
                    .with_scale(Vec3::new(0.6, 1.0, 1.0)),
            ),
        )?;
        scene.add(
            Some(airframe),
            Node::mesh("tail", fin, hull).with_transform(
                Transform::from_position(Vec3::new(0.0, 0.7, -2.25))
                    .with_euler(0.0, 0.0, FRAC_PI_2)
                    .with_scale(Vec3::new(0.2, 1.0, 0.1)),
            ),
        )?;
        let body = scene.add_mesh(cylinder(0.4, 0.5, 7.0, 15));
        scene.add(
            Some(airframe),
            Node::mesh("body", body, hull)
                .with_transform(Transform::from_position(Vec3::new(0.0, 0.25, 1.0)).with_euler(FRAC_PI_2 * 0.99, 0.0, 0.0)),
        )?;
        let cone = scene.add_mesh(cylinder(0.0, 0.4, 1.5, 15));
        let nose = scene.add(
            Some(airframe),
            Node::mesh("nose", cone, hull)
                .with_transform(Transform::from_position(Vec3::new(0.0, 0.075, 5.12)).with_euler(FRAC_PI_2 * 1.2, 0.0, 0.0)),
        )?;

        let aspect = width.max(1) as f32 / height.max(1) as f32;
        let camera = config.camera.camera(aspect);
        Ok(Self {
            cockpit: camera,
            camera,
            orbit: config.camera.orbit(),
            scene,
            earth,
            ground,
            moon,
            plane,
            nose,
            textures: vec![earth_texture, moon_texture],
            direction: Vec3::Z,
            distance: config.plane_distance,
            steer: None,
            stopped: false,
            first_person: false,
            config: config.clone(),
        })
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn plane_position(&self) -> Vec3 {
        self.scene
            .transform(self.plane)
            .map(|t| t.position)
            .unwrap_or_default()
    }

    /// Unit heading, tangent to the flight sphere.
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Flight altitude measured from the earth's center.
    pub fn distance(&self) -> f32 {
        self.distance
    }

    /// Landed: the plane sits at minimum altitude and the world holds still.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn is_first_person(&self) -> bool {
        self.first_person
    }

    pub fn moon_position(&self) -> Vec3 {
        self.scene
            .transform(self.moon)
            .map(|t| t.position)
            .unwrap_or_default()
    }

    fn spin(&mut self, id: NodeId, amount: f32) {
        if let Some(t) = self.scene.transform_mut(id) {
            t.rotation = Quat::from_rotation_y(amount) * t.rotation;
        }
    }

    fn update_planets(&mut self, elapsed: f32) {
        self.spin(self.earth, EARTH_SPIN);
        self.spin(self.ground, GROUND_SPIN);

        let phase = elapsed / MOON_PERIOD_SCALE;
        let distance = self.config.moon_distance;
        if let Some(t) = self.scene.transform_mut(self.moon) {
            t.position = Vec3::new(phase.sin() * distance, 0.0, phase.cos() * distance);
            t.rotation = Quat::from_rotation_y(phase % TAU + FRAC_PI_2);
        }
    }

    fn apply_steering(&mut self, position: Vec3) {
        let Some(steer) = self.steer else {
            return;
        };
        if steer.is_horizontal() {
            if self.distance > self.config.min_plane_distance {
                let axis = self.direction.cross(position).normalize_or_zero();
                self.direction += axis * TURN_RATE * steer.sign();
            }
        } else {
            let cruise = self.config.plane_distance;
            let floor = self.config.min_plane_distance;
            self.distance = (self.distance + cruise * CLIMB_RATE * steer.sign()).clamp(floor, cruise);
            let landed = self.distance == floor;
            if landed != self.stopped {
                debug!(landed, distance = self.distance, "plane altitude limit");
            }
            self.stopped = landed;
        }
    }

    fn fly(&mut self) {
        let position = self.plane_position();
        let heading = self.direction;
        self.apply_steering(position);
        if self.stopped {
            return;
        }

        let next = (position + self.direction * self.config.plane_speed).normalize_or_zero() * self.distance;
        let direction = (next - position).normalize_or_zero();
        if direction == Vec3::ZERO {
            return;
        }
        self.direction = direction;
        if let Some(t) = self.scene.transform_mut(self.plane) {
            t.position = next;
            t.rotation = (Quat::from_rotation_arc(heading, direction) * t.rotation).normalize();
        }
    }

    fn sync_cockpit(&mut self) {
        let position = self.plane_position();
        self.cockpit.eye = position;
        self.cockpit.up = position.normalize_or_zero();
        self.cockpit.target = position + self.direction;
    }
}

impl Demo for Flight {
    fn id(&self) -> DemoId {
        DemoId::Flight
    }

    fn update(&mut self, time: &FrameTime, _input: &InputState) {
        self.orbit.apply(&mut self.camera);
        if !self.stopped {
            self.update_planets(time.elapsed);
        }
        if let Err(e) = self.scene.set_visible(self.nose, !self.first_person) {
            tracing::warn!(error = %e, "nose cone missing");
        }
        self.fly();
        self.sync_cockpit();
    }

    fn handle(&mut self, action: &Action) {
        match *action {
            Action::Steer(steer) => self.steer = Some(steer),
            Action::ReleaseSteer => self.steer = None,
            Action::Toggle { control: VIEW, on } => {
                debug!(first_person = on, "flight view");
                self.first_person = on;
            }
            Action::Resize { width, height } => {
                self.camera.set_aspect(width, height);
                self.cockpit.set_aspect(width, height);
            }
            _ => {}
        }
    }

    fn controls(&self) -> Vec<Control> {
        vec![Control::Toggle {
            id: VIEW,
            label: "Cockpit view",
            on: self.first_person,
        }]
    }

    fn view(&self) -> FrameView<'_> {
        let camera = if self.first_person {
            &self.cockpit
        } else {
            &self.camera
        };
        FrameView::Scene {
            scene: &self.scene,
            camera,
        }
    }

    fn textures(&self) -> Vec<TextureKey> {
        self.textures.clone()
    }

    fn orbit(&mut self) -> Option<&mut OrbitCamera> {
        (!self.first_person).then_some(&mut self.orbit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn heading_change(a: Vec3, b: Vec3) -> f32 {
        a.dot(b).clamp(-1.0, 1.0).acos()
    }

    fn flight() -> Flight {
        Flight::new(&FlightConfig::default(), 800, 600).unwrap()
    }

    fn run(f: &mut Flight, frames: usize) {
        let input = InputState::new(800, 600);
        let mut time = FrameTime::first(DT);
        for _ in 0..frames {
            f.update(&time, &input);
            time = time.next(DT);
        }
    }

    #[test]
    fn plane_keeps_altitude_and_a_tangent_heading() {
        let mut f = flight();
        run(&mut f, 300);
        let p = f.plane_position();
        assert!((p.length() - 5.3).abs() < 1e-3);
        assert!(f.direction().dot(p.normalize()).abs() < 0.01);
        assert!((f.direction().length() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn plane_nose_follows_heading() {
        let mut f = flight();
        run(&mut f, 120);
        let rotation = f.scene().transform(f.plane).unwrap().rotation;
        let nose = rotation * Vec3::Z;
        assert!(heading_change(nose, f.direction()) < 0.02);
    }

    #[test]
    fn horizontal_steering_bends_the_path() {
        let mut straight = flight();
        let mut turning = flight();
        turning.handle(&Action::Steer(Steer::Left));
        run(&mut straight, 60);
        run(&mut turning, 60);
        assert!(straight.plane_position().distance(turning.plane_position()) > 0.01);
        // Straight flight stays on the great circle through the start point.
        assert!(straight.plane_position().x.abs() < 1e-3);
    }

    #[test]
    fn descending_to_the_floor_lands_and_climbing_takes_off() {
        let mut f = flight();
        f.handle(&Action::Steer(Steer::Down));
        run(&mut f, 200);
        assert_eq!(f.distance(), 5.08);
        assert!(f.is_stopped());

        let moon = f.moon_position();
        let plane = f.plane_position();
        run(&mut f, 10);
        assert_eq!(f.moon_position(), moon);
        assert_eq!(f.plane_position(), plane);

        f.handle(&Action::Steer(Steer::Up));
        run(&mut f, 1);
        assert!(!f.is_stopped());
        f.handle(&Action::ReleaseSteer);
        run(&mut f, 1);
        assert!(f.distance() > 5.08);
    }

    #[test]
    fn horizontal_steering_is_locked_at_the_floor() {
        let mut f = flight();
        f.handle(&Action::Steer(Steer::Down));
        run(&mut f, 200);
        let heading = f.direction();
        f.handle(&Action::Steer(Steer::Right));
        run(&mut f, 5);
        assert_eq!(f.direction(), heading);
    }

    #[test]
    fn moon_orbits_with_elapsed_time() {
        let mut f = flight();
        run(&mut f, 2);
        let phase = DT / MOON_PERIOD_SCALE;
        let expected = Vec3::new(phase.sin() * 10.0, 0.0, phase.cos() * 10.0);
        assert!(f.moon_position().distance(expected) < 1e-4);
    }

    #[test]
    fn cockpit_view_hides_the_nose_and_rides_the_plane() {
        let mut f = flight();
        f.handle(&Action::Toggle { control: VIEW, on: true });
        run(&mut f, 3);
        assert!(!f.scene().is_visible(f.nose));
        assert!(f.orbit().is_none());
        match f.view() {
            FrameView::Scene { camera, .. } => {
                assert_eq!(camera.eye, f.plane_position());
                assert!((camera.target - camera.eye - f.direction()).length() < 1e-5);
            }
            _ => panic!("flight renders a scene"),
        }
    }

    #[test]
    fn textures_are_declared() {
        let f = flight();
        let keys: Vec<String> = f.textures().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, ["flight/earth.png", "flight/moon.jpg"]);
    }
}
