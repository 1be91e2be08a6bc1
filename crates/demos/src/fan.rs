//! Electric fan rig: nested groups for neck, blades and crank handle, driven
//! by radio controls and a click wheel.

use framelab_common::{NodeId, Transform};
use framelab_geometry::{capsule, circle, cylinder, lathe};
use framelab_input::{Action, Control, InputState, WheelTurn, wheel_turn};
use framelab_render::{FrameView, OrbitCamera, PerspectiveCamera};
use framelab_scene::{Material, Node, Scene, SceneError};
use framelab_tween::{Ease, FrameTime, Tween, TweenStatus};
use glam::{EulerRot, Quat, Vec2, Vec3};
use std::f32::consts::FRAC_PI_2;
use tracing::debug;

use crate::config::{FanConfig, hex};
use crate::{Demo, DemoId, lit_environment};

pub const MODE: &str = "mode";
pub const TURN: &str = "turn";
pub const SWING: &str = "swing";
pub const WHEEL: &str = "wheel";
pub const GAUGE: &str = "gauge";
pub const UNLEASH: &str = "unleash";

const WHEEL_SEGMENTS: u8 = 8;
const MAX_CHARGE: i32 = 100;
/// Blade angle per crank step, degrees.
const CRANK_DEG: f32 = -30.0;
/// Blade angle per charge point on release, degrees.
const UNLEASH_DEG: f32 = -14.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Auto,
    Handle,
    Charge,
}

impl Mode {
    const OPTIONS: &'static [&'static str] = &["auto", "handle", "charge"];

    fn as_str(self) -> &'static str {
        match self {
            Mode::Auto => "auto",
            Mode::Handle => "handle",
            Mode::Charge => "charge",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "auto" => Some(Mode::Auto),
            "handle" => Some(Mode::Handle),
            "charge" => Some(Mode::Charge),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Swing {
    Stop,
    Narrow,
    Wide,
}

impl Swing {
    const OPTIONS: &'static [&'static str] = &["stop", "narrow", "wide"];

    fn as_str(self) -> &'static str {
        match self {
            Swing::Stop => "stop",
            Swing::Narrow => "narrow",
            Swing::Wide => "wide",
        }
    }
}

const TURN_OPTIONS: &[&str] = &["up", "normal", "down"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BladeMotion {
    Crank,
    Unleash,
}

pub struct Fan {
    scene: Scene,
    camera: PerspectiveCamera,
    orbit: OrbitCamera,
    neck: NodeId,
    blades: NodeId,
    handle: NodeId,
    mode: Mode,
    swing: Swing,
    turn: &'static str,
    tilt: f32,
    swing_angle: f32,
    swing_count: u64,
    blade_angle: f32,
    value: i32,
    gauge: f32,
    last_segment: Option<u8>,
    unleash_visible: bool,
    tilt_tween: Option<Tween<f32>>,
    blade_tween: Option<(Tween<f32>, BladeMotion)>,
    gauge_tween: Option<Tween<f32>>,
    config: FanConfig,
}

/// Pedestal neck profile: a shallow dome, a narrowing stem, then a flared
/// foot.
fn pedestal_profile() -> Vec<Vec2> {
    (0..20)
        .map(|i| {
            let f = i as f32;
            if i < 10 {
                Vec2::new(f * 0.2, (f * 0.2).cos() / 2.0)
            } else if i < 15 {
                Vec2::new(f * 0.25, (f * 0.2).cos() / 2.5 - (f - 9.0))
            } else {
                Vec2::new(
                    f * 0.25 + (f - 14.0).sqrt() / 2.0,
                    (f * 0.2).cos() / 2.0 - 6.0 - 0.2 * (f - 15.0),
                )
            }
        })
        .collect()
}

impl Fan {
    pub fn new(config: &FanConfig, width: u32, height: u32) -> Result<Self, SceneError> {
        let mut scene = Scene::with_environment(lit_environment(hex(config.clear_color), config.ambient));
        let material = scene.add_material(Material::phong(hex(config.color)).with_double_side());
        let upright = |position: Vec3| Transform::from_position(position).with_euler(FRAC_PI_2, 0.0, 0.0);

        // Neck: motor housing, blades and the crank.
        let neck = scene.add(None, Node::group("neck").with_position(Vec3::new(0.0, 8.5, -2.0)))?;
        let body = scene.add_mesh(capsule(2.5, 8.0, 5, 10));
        scene.add(Some(neck), Node::mesh("motor", body, material).with_transform(upright(Vec3::ZERO)))?;

        let blades = scene.add(Some(neck), Node::group("blades").with_position(Vec3::new(0.0, 0.0, 6.5)))?;
        let blade = scene.add_mesh(circle(2.5, 32));
        for i in 0..4 {
            let a = FRAC_PI_2 * i as f32;
            let transform = Transform::from_position(Vec3::new(a.sin() * 4.0, a.cos() * 4.0, 0.0)).with_euler(
                FRAC_PI_2 * a.sin() * 0.1,
                FRAC_PI_2 * a.cos() * 0.1,
                0.0,
            );
            scene.add(Some(blades), Node::mesh("blade", blade, material).with_transform(transform))?;
        }
        let hub = scene.add_mesh(cylinder(2.0, 2.0, 0.5, 20));
        scene.add(Some(blades), Node::mesh("hub", hub, material).with_transform(upright(Vec3::ZERO)))?;

        let handle = scene.add(
            Some(neck),
            Node::group("handle").with_position(Vec3::new(0.0, 0.0, -8.0)).hidden(),
        )?;
        let bar = scene.add_mesh(cylinder(0.5, 0.5, 3.0, 10));
        let rod = scene.add_mesh(cylinder(0.5, 0.5, 4.0, 10));
        scene.add(Some(handle), Node::mesh("bar", bar, material).with_transform(upright(Vec3::ZERO)))?;
        scene.add(
            Some(handle),
            Node::mesh("arm", rod, material).with_position(Vec3::new(0.0, -1.5, -1.5)),
        )?;
        scene.add(
            Some(handle),
            Node::mesh("grip", rod, material).with_transform(upright(Vec3::new(0.0, -3.0, -3.5))),
        )?;

        // Pedestal.
        let pedestal = scene.add(None, Node::group("pedestal"))?;
        let stem = scene.add_mesh(lathe(&pedestal_profile(), 12));
        scene.add(
            Some(pedestal),
            Node::mesh("stem", stem, material).with_position(Vec3::new(0.0, 7.7, -2.5)),
        )?;
        let base = scene.add_mesh(cylinder(8.5, 8.5, 1.0, 32));
        scene.add(Some(pedestal), Node::mesh("base", base, material))?;

        scene.add(None, Node::axes("axes", config.axes_length))?;

        let aspect = width.max(1) as f32 / height.max(1) as f32;
        Ok(Self {
            scene,
            camera: config.camera.camera(aspect),
            orbit: config.camera.orbit(),
            neck,
            blades,
            handle,
            mode: Mode::Auto,
            swing: Swing::Stop,
            turn: "normal",
            tilt: 0.0,
            swing_angle: 0.0,
            swing_count: 0,
            blade_angle: 0.0,
            value: 0,
            gauge: 0.0,
            last_segment: None,
            unleash_visible: false,
            tilt_tween: None,
            blade_tween: None,
            gauge_tween: None,
            config: config.clone(),
        })
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Crank or charge level.
    pub fn value(&self) -> i32 {
        self.value
    }

    pub fn gauge(&self) -> f32 {
        self.gauge
    }

    pub fn blade_angle(&self) -> f32 {
        self.blade_angle
    }

    pub fn tilt(&self) -> f32 {
        self.tilt
    }

    pub fn swing_angle(&self) -> f32 {
        self.swing_angle
    }

    pub fn unleash_visible(&self) -> bool {
        self.unleash_visible
    }

    fn set_mode(&mut self, mode: Mode) {
        debug!(mode = mode.as_str(), "fan mode");
        self.mode = mode;
        if mode != Mode::Auto {
            self.value = 0;
            self.gauge = 0.0;
            self.gauge_tween = None;
            self.blade_tween = None;
            self.blade_angle = 0.0;
        }
    }

    fn set_turn(&mut self, option: &'static str) {
        let degrees = match option {
            "up" => -self.config.tilt_deg,
            "down" => self.config.tilt_deg,
            _ => 0.0,
        };
        self.turn = option;
        self.tilt_tween = Some(Tween::to(degrees.to_radians(), self.config.tilt_seconds));
    }

    fn wheel(&mut self, segment: u8) {
        if self.mode == Mode::Auto {
            return;
        }
        let accepts = self.mode == Mode::Handle || self.value < MAX_CHARGE;
        if accepts && self.last_segment != Some(segment) {
            match wheel_turn(self.last_segment, segment, WHEEL_SEGMENTS) {
                WheelTurn::Clockwise => self.value += 1,
                WheelTurn::CounterClockwise if self.mode == Mode::Handle || self.value > 0 => {
                    self.value -= 1
                }
                _ => {}
            }
            self.last_segment = Some(segment);
            if self.mode == Mode::Handle {
                let target = (CRANK_DEG * self.value as f32).to_radians();
                self.blade_tween = Some((Tween::to(target, 0.5), BladeMotion::Crank));
            }
            self.gauge = self.value as f32;
        }
        if self.mode == Mode::Charge && self.value >= MAX_CHARGE {
            self.unleash_visible = true;
        }
    }

    fn unleash(&mut self) {
        if !self.unleash_visible {
            return;
        }
        debug!(charge = self.value, "unleash");
        self.gauge_tween = Some(Tween::to(0.0, 1.0));
        let target = (UNLEASH_DEG * self.value as f32).to_radians();
        self.blade_tween = Some((
            Tween::to(target, 5.0).ease(Ease::Power3Out),
            BladeMotion::Unleash,
        ));
    }

    fn advance_tweens(&mut self, dt: f32) {
        if let Some(tw) = &mut self.tilt_tween {
            if tw.advance(dt, &mut self.tilt) == TweenStatus::Completed {
                self.tilt_tween = None;
            }
        }
        if let Some((tw, motion)) = &mut self.blade_tween {
            if tw.advance(dt, &mut self.blade_angle) == TweenStatus::Completed {
                if *motion == BladeMotion::Unleash {
                    self.blade_angle = 0.0;
                }
                self.blade_tween = None;
            }
        }
        if let Some(tw) = &mut self.gauge_tween {
            if tw.advance(dt, &mut self.gauge) == TweenStatus::Completed {
                self.value = 0;
                self.unleash_visible = false;
                self.gauge_tween = None;
            }
        }
    }

    fn sync_scene(&mut self) -> Result<(), SceneError> {
        if let Some(t) = self.scene.transform_mut(self.neck) {
            t.rotation = Quat::from_euler(EulerRot::XYZ, self.tilt, self.swing_angle, 0.0);
        }
        if let Some(t) = self.scene.transform_mut(self.blades) {
            t.rotation = Quat::from_rotation_z(self.blade_angle);
        }
        if let Some(t) = self.scene.transform_mut(self.handle) {
            t.rotation = Quat::from_rotation_z(self.value as f32 * -0.1);
        }
        self.scene.set_visible(self.handle, self.mode == Mode::Handle)
    }
}

impl Demo for Fan {
    fn id(&self) -> DemoId {
        DemoId::Fan
    }

    fn update(&mut self, time: &FrameTime, _input: &InputState) {
        self.orbit.apply(&mut self.camera);

        if self.mode == Mode::Auto {
            self.blade_angle -= self.config.auto_speed;
        }
        let amplitude = match self.swing {
            Swing::Stop => None,
            Swing::Narrow => Some(self.config.narrow_deg),
            Swing::Wide => Some(self.config.wide_deg),
        };
        if let Some(degrees) = amplitude {
            let phase = self.swing_count as f32 * self.config.swing_rate;
            self.swing_angle = (degrees * phase.sin()).to_radians();
            self.swing_count += 1;
        }
        self.advance_tweens(time.dt);

        if let Err(e) = self.sync_scene() {
            tracing::warn!(error = %e, "fan rig out of sync");
        }
    }

    fn handle(&mut self, action: &Action) {
        match *action {
            Action::Select { control: MODE, option } => {
                if let Some(mode) = Mode::parse(option) {
                    self.set_mode(mode);
                }
            }
            Action::Select { control: TURN, option } => self.set_turn(option),
            Action::Select { control: SWING, option } => {
                self.swing = match option {
                    "narrow" => Swing::Narrow,
                    "wide" => Swing::Wide,
                    _ => Swing::Stop,
                };
            }
            Action::Segment { control: WHEEL, index } => self.wheel(index),
            Action::Press(UNLEASH) => self.unleash(),
            Action::Resize { width, height } => self.camera.set_aspect(width, height),
            _ => {}
        }
    }

    fn controls(&self) -> Vec<Control> {
        vec![
            Control::Radio {
                id: MODE,
                label: "Mode",
                options: Mode::OPTIONS,
                selected: self.mode.as_str(),
            },
            Control::Radio {
                id: TURN,
                label: "Neck",
                options: TURN_OPTIONS,
                selected: self.turn,
            },
            Control::Radio {
                id: SWING,
                label: "Swing",
                options: Swing::OPTIONS,
                selected: self.swing.as_str(),
            },
            Control::Wheel {
                id: WHEEL,
                segments: WHEEL_SEGMENTS,
                active: self.mode != Mode::Auto,
            },
            Control::Gauge {
                id: GAUGE,
                value: self.gauge,
                visible: self.mode == Mode::Charge,
            },
            Control::Button {
                id: UNLEASH,
                label: "Unleash",
                visible: self.unleash_visible,
            },
        ]
    }

    fn view(&self) -> FrameView<'_> {
        FrameView::Scene {
            scene: &self.scene,
            camera: &self.camera,
        }
    }

    fn orbit(&mut self) -> Option<&mut OrbitCamera> {
        Some(&mut self.orbit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn fan() -> Fan {
        Fan::new(&FanConfig::default(), 800, 600).unwrap()
    }

    fn run(fan: &mut Fan, seconds: f32) {
        let input = InputState::new(800, 600);
        let frames = (seconds / DT).round() as usize;
        let mut time = FrameTime::first(DT);
        for _ in 0..frames {
            fan.update(&time, &input);
            time = time.next(DT);
        }
    }

    fn select(fan: &mut Fan, control: &'static str, option: &'static str) {
        fan.handle(&Action::Select { control, option });
    }

    fn turn_wheel(fan: &mut Fan, segments: &[u8]) {
        for &index in segments {
            fan.handle(&Action::Segment { control: WHEEL, index });
        }
    }

    #[test]
    fn rig_hides_the_handle_by_default() {
        let mut f = fan();
        run(&mut f, DT);
        let instances: usize = f.scene().visible_meshes().iter().map(|b| b.instances.len()).sum();
        // motor, 4 blades, hub, stem, base
        assert_eq!(instances, 8);
        assert_eq!(f.scene().mesh_nodes().len(), 11);
    }

    #[test]
    fn pedestal_profile_shape() {
        let p = pedestal_profile();
        assert_eq!(p.len(), 20);
        assert_eq!(p[0], Vec2::new(0.0, 0.5));
        assert!((p[19].x - (19.0 * 0.25 + 1.0)).abs() < 1e-5);
        assert!(p[19].y < -6.0);
    }

    #[test]
    fn auto_mode_spins_blades() {
        let mut f = fan();
        run(&mut f, 10.0 * DT);
        assert!((f.blade_angle() + 0.5).abs() < 1e-4);
    }

    #[test]
    fn handle_mode_cranks_the_blades() {
        let mut f = fan();
        select(&mut f, MODE, "handle");
        turn_wheel(&mut f, &[1, 2, 3]);
        assert_eq!(f.value(), 3);
        run(&mut f, 0.6);
        assert!((f.blade_angle() - (-90f32).to_radians()).abs() < 1e-4);

        turn_wheel(&mut f, &[2]);
        assert_eq!(f.value(), 2);
        // Handle mode may go negative.
        turn_wheel(&mut f, &[1, 8, 7]);
        assert_eq!(f.value(), -1);
        run(&mut f, DT);
        let handle_visible = f.scene().is_visible(f.handle);
        assert!(handle_visible);
    }

    #[test]
    fn far_jumps_and_repeats_are_ignored() {
        let mut f = fan();
        select(&mut f, MODE, "handle");
        turn_wheel(&mut f, &[1, 1, 5]);
        assert_eq!(f.value(), 1);
    }

    #[test]
    fn auto_mode_ignores_the_wheel() {
        let mut f = fan();
        turn_wheel(&mut f, &[1, 2, 3]);
        assert_eq!(f.value(), 0);
    }

    #[test]
    fn charge_caps_at_full_and_unleashes() {
        let mut f = fan();
        select(&mut f, MODE, "charge");
        // Charge mode never goes below zero.
        turn_wheel(&mut f, &[8]);
        assert_eq!(f.value(), 0);
        let mut segment = 8u8;
        for _ in 0..120 {
            segment = segment % 8 + 1;
            turn_wheel(&mut f, &[segment]);
        }
        assert_eq!(f.value(), 100);
        assert!(f.unleash_visible());

        f.handle(&Action::Press(UNLEASH));
        run(&mut f, 1.1);
        assert_eq!(f.gauge(), 0.0);
        assert_eq!(f.value(), 0);
        assert!(!f.unleash_visible());
        assert!(f.blade_angle() < -10.0);

        run(&mut f, 4.0);
        assert_eq!(f.blade_angle(), 0.0);
    }

    #[test]
    fn gauge_control_only_in_charge_mode() {
        let mut f = fan();
        let gauge_visible = |f: &Fan| {
            f.controls()
                .into_iter()
                .any(|c| matches!(c, Control::Gauge { visible: true, .. }))
        };
        assert!(!gauge_visible(&f));
        select(&mut f, MODE, "charge");
        assert!(gauge_visible(&f));
    }

    #[test]
    fn switching_mode_resets_the_charge() {
        let mut f = fan();
        select(&mut f, MODE, "handle");
        turn_wheel(&mut f, &[1, 2]);
        run(&mut f, 0.1);
        select(&mut f, MODE, "charge");
        assert_eq!(f.value(), 0);
        assert_eq!(f.blade_angle(), 0.0);
    }

    #[test]
    fn neck_tilts_and_swings() {
        let mut f = fan();
        select(&mut f, TURN, "down");
        run(&mut f, 0.6);
        assert!((f.tilt() - 15f32.to_radians()).abs() < 1e-5);

        select(&mut f, SWING, "wide");
        run(&mut f, 101.0 * DT);
        let expected = (45.0 * (100.0f32 * 0.015).sin()).to_radians();
        assert!((f.swing_angle() - expected).abs() < 1e-4);

        select(&mut f, SWING, "stop");
        let held = f.swing_angle();
        run(&mut f, 0.5);
        assert_eq!(f.swing_angle(), held);
    }
}
