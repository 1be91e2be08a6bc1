//! A cloud of picture cards in a slowly turning group. Clicking a card lifts
//! it out of the group and brings it up to the camera.

use framelab_common::{Color, NodeId, Rng, TextureKey};
use framelab_geometry::plane;
use framelab_input::{Action, Control, InputState, to_ndc};
use framelab_render::{FrameView, OrbitCamera, PerspectiveCamera};
use framelab_scene::{Material, Node, Scene, SceneError};
use framelab_tween::{FrameTime, Tween, TweenStatus};
use glam::{Quat, Vec2, Vec3};
use tracing::{debug, warn};

use crate::config::{GalleryConfig, hex};
use crate::{Demo, DemoId, lit_environment};

pub const DIMENSION: &str = "dimension";
pub const ALIGNMENT: &str = "alignment";
pub const CLOSE: &str = "close";

const COLUMNS: usize = 13;
/// Cards per row once aligned.
const ALIGN_WIDTH: usize = 12;
const DRIFT_PERIOD: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PickStage {
    Lifting,
    Shown,
    Returning,
}

#[derive(Debug, Clone)]
struct Pick {
    card: usize,
    /// Group-local position to restore.
    home: Vec3,
    /// Scene position the card was lifted from.
    lifted_from: Vec3,
    rest: Vec3,
    stage: PickStage,
    tween: Tween<Vec3>,
}

#[derive(Debug, Clone)]
struct Card {
    node: NodeId,
    /// Slow idle drift; at most one at a time, paused while picked.
    drift: Option<Tween<Vec3>>,
    /// Scatter or alignment move.
    layout: Option<Tween<Vec3>>,
}

pub struct Gallery {
    scene: Scene,
    camera: PerspectiveCamera,
    orbit: OrbitCamera,
    viewport: (u32, u32),
    group: NodeId,
    backdrop: NodeId,
    cards: Vec<Card>,
    textures: Vec<TextureKey>,
    rng: Rng,
    rotating: bool,
    aligned: bool,
    drift_timer: Option<f32>,
    pick: Option<Pick>,
    config: GalleryConfig,
}

/// Card scale and backdrop scale for a camera at distance `d` from the
/// origin.
fn pick_scales(d: f32) -> (f32, f32) {
    if d < 1.0 {
        (d * 0.8, d * 1.6)
    } else if d < 6.0 {
        (d / 6.0 * 0.8, d / 6.0 * 1.25)
    } else {
        (1.0, 2.0)
    }
}

/// Where a lifted card comes to rest: just in front of the camera, or
/// mirrored through the origin when the camera sits inside the cloud.
fn rest_position(eye: Vec3) -> Vec3 {
    if eye.length() > 1.0 { eye * 0.9 } else { -eye }
}

fn aligned_position(index: usize) -> Vec3 {
    Vec3::new(
        (index % ALIGN_WIDTH) as f32 - 5.5,
        5.5 - (index / ALIGN_WIDTH) as f32,
        0.0,
    )
}

impl Gallery {
    pub fn new(config: &GalleryConfig, seed: u64, width: u32, height: u32) -> Result<Self, SceneError> {
        let mut rng = Rng::new(seed);
        let mut scene = Scene::with_environment(lit_environment(hex(config.clear_color), config.ambient));
        let group = scene.add(None, Node::group("cards"))?;

        let backdrop_mesh = scene.add_mesh(plane(1.4, 1.5));
        let backdrop_material = scene.add_material(Material::basic(hex(config.backdrop_color)));
        let backdrop = scene.add(None, Node::mesh("backdrop", backdrop_mesh, backdrop_material).hidden())?;

        let card_mesh = scene.add_mesh(plane(1.0, 1.0));
        let count = config.cards.min(COLUMNS * COLUMNS);
        let mut cards = Vec::with_capacity(count);
        let mut textures = Vec::with_capacity(count);
        'columns: for i in 0..COLUMNS {
            let depths = rng.permutation(COLUMNS);
            for (j, depth) in depths.iter().enumerate() {
                let index = j + i * COLUMNS;
                if index >= count {
                    break 'columns;
                }
                let key = TextureKey::new(config.texture_pattern.replace("{id}", &(index + 1).to_string()));
                let material = scene.add_material(
                    Material::basic(Color::WHITE)
                        .with_texture(key.clone())
                        .with_transparency(1.0),
                );
                let position = Vec3::new(i as f32 - 6.0, j as f32 - 6.0, *depth as f32 - 6.0);
                let node = scene.add(
                    Some(group),
                    Node::mesh(format!("card-{}", index + 1), card_mesh, material).with_position(position),
                )?;
                cards.push(Card {
                    node,
                    drift: None,
                    layout: None,
                });
                textures.push(key);
            }
        }
        scene.add(None, Node::axes("axes", config.axes_length))?;
        debug!(cards = cards.len(), "gallery built");

        let aspect = width.max(1) as f32 / height.max(1) as f32;
        Ok(Self {
            scene,
            camera: config.camera.camera(aspect),
            orbit: config.camera.orbit(),
            viewport: (width.max(1), height.max(1)),
            group,
            backdrop,
            cards,
            textures,
            rng,
            rotating: true,
            aligned: false,
            drift_timer: None,
            pick: None,
            config: config.clone(),
        })
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn card_count(&self) -> usize {
        self.cards.len()
    }

    pub fn card_node(&self, index: usize) -> Option<NodeId> {
        self.cards.get(index).map(|c| c.node)
    }

    /// Index of the card currently lifted out of the group.
    pub fn picked(&self) -> Option<usize> {
        self.pick.as_ref().map(|p| p.card)
    }

    /// The overlay that blocks further picks while a card is shown.
    pub fn overlay_visible(&self) -> bool {
        self.pick.is_some()
    }

    pub fn is_rotating(&self) -> bool {
        self.rotating
    }

    pub fn is_aligned(&self) -> bool {
        self.aligned
    }

    pub fn drifting_count(&self) -> usize {
        self.cards.iter().filter(|c| c.drift.is_some()).count()
    }

    pub fn group_angle(&self) -> f32 {
        self.scene
            .transform(self.group)
            .map(|t| t.rotation.to_euler(glam::EulerRot::YXZ).0)
            .unwrap_or_default()
    }

    fn position(&self, node: NodeId) -> Vec3 {
        self.scene.transform(node).map(|t| t.position).unwrap_or_default()
    }

    /// `n` random values in `1..=12`, twelve at a time.
    fn scatter_values(&mut self, n: usize) -> Vec<u32> {
        let mut out = Vec::with_capacity(n + ALIGN_WIDTH);
        while out.len() < n {
            out.extend(self.rng.permutation(ALIGN_WIDTH));
        }
        out
    }

    fn try_pick(&mut self, pixel: Vec2) -> Result<(), SceneError> {
        let ray = self.camera.ray_from_ndc(to_ndc(pixel, self.viewport));
        let nodes: Vec<NodeId> = self.cards.iter().map(|c| c.node).collect();
        let Some(hit) = self.scene.raycast(&ray, &nodes).into_iter().next() else {
            return Ok(());
        };
        let Some(card) = self.cards.iter().position(|c| c.node == hit.node) else {
            return Ok(());
        };
        debug!(card = card + 1, distance = hit.distance, "card picked");

        self.rotating = false;
        if let Some(drift) = &mut self.cards[card].drift {
            drift.pause();
        }
        let home = self.position(hit.node);
        self.scene.attach_keep_world(hit.node, None)?;
        let lifted_from = self.position(hit.node);

        let eye = self.camera.eye;
        let rest = rest_position(eye);
        let (card_scale, _) = pick_scales(eye.length());
        if let Some(t) = self.scene.transform_mut(hit.node) {
            t.scale = Vec3::splat(card_scale);
        }
        self.pick = Some(Pick {
            card,
            home,
            lifted_from,
            rest,
            stage: PickStage::Lifting,
            tween: Tween::to(rest, self.config.pick_seconds),
        });
        Ok(())
    }

    fn begin_return(&mut self) -> Result<(), SceneError> {
        let seconds = self.config.pick_seconds;
        let Some(pick) = &mut self.pick else {
            return Ok(());
        };
        if pick.stage == PickStage::Returning {
            return Ok(());
        }
        pick.stage = PickStage::Returning;
        pick.tween = Tween::to(pick.lifted_from, seconds);
        self.scene.set_visible(self.backdrop, false)
    }

    fn advance_pick(&mut self, dt: f32) -> Result<(), SceneError> {
        let Some(pick) = &mut self.pick else {
            return Ok(());
        };
        let node = self.cards[pick.card].node;
        let Some(transform) = self.scene.transform_mut(node) else {
            return Err(SceneError::UnknownNode(node));
        };
        if pick.tween.advance(dt, &mut transform.position) != TweenStatus::Completed {
            return Ok(());
        }

        match pick.stage {
            PickStage::Lifting => {
                pick.stage = PickStage::Shown;
                let (_, backdrop_scale) = pick_scales(self.camera.eye.length());
                let position = pick.rest * 0.9;
                if let Some(t) = self.scene.transform_mut(self.backdrop) {
                    t.position = position;
                    t.scale = Vec3::splat(backdrop_scale);
                }
                self.scene.set_visible(self.backdrop, true)?;
            }
            PickStage::Shown => {}
            PickStage::Returning => {
                let home = pick.home;
                let card = pick.card;
                self.pick = None;
                self.scene.attach(node, Some(self.group))?;
                if let Some(t) = self.scene.transform_mut(node) {
                    t.position = home;
                    t.scale = Vec3::ONE;
                }
                if let Some(drift) = &mut self.cards[card].drift {
                    drift.resume();
                }
                self.rotating = true;
                debug!(card = card + 1, "card returned");
            }
        }
        Ok(())
    }

    fn scatter(&mut self) {
        let n = self.cards.len();
        let (xs, ys, zs) = (self.scatter_values(n), self.scatter_values(n), self.scatter_values(n));
        for (i, card) in self.cards.iter_mut().enumerate() {
            let target = Vec3::new(xs[i] as f32, ys[i] as f32, zs[i] as f32) - Vec3::splat(6.0);
            card.layout = Some(Tween::to(target, self.config.pick_seconds).delay(self.rng.next_f32()));
        }
        self.aligned = false;
        self.rotating = true;
    }

    fn align(&mut self) {
        if let Some(t) = self.scene.transform_mut(self.group) {
            t.rotation = Quat::IDENTITY;
        }
        self.rotating = false;
        self.drift_timer = None;
        for (i, card) in self.cards.iter_mut().enumerate() {
            if let Some(drift) = &mut card.drift {
                drift.kill();
            }
            card.drift = None;
            card.layout = Some(Tween::to(aligned_position(i), self.config.pick_seconds).delay(self.rng.next_f32()));
        }
        self.aligned = true;
    }

    /// Start a long drift on the cards picked out by this round's draw.
    fn start_drift(&mut self) {
        if self.cards.is_empty() {
            return;
        }
        let n = self.cards.len();
        let (xs, ys, zs) = (self.scatter_values(n), self.scatter_values(n), self.scatter_values(n));
        let (modulus, remainder) = (xs[0] as usize, ys[0] as usize);
        let mut started = 0;
        for (i, card) in self.cards.iter_mut().enumerate() {
            if i % modulus != remainder || card.drift.is_some() {
                continue;
            }
            let target = Vec3::new(xs[i] as f32, ys[i] as f32, zs[i] as f32);
            let delay = (target.x + target.y + target.z) / 3.0;
            card.drift = Some(Tween::to(target - Vec3::splat(6.0), self.config.drift_seconds).delay(delay));
            started += 1;
        }
        debug!(started, modulus, remainder, "drift round");
    }

    fn advance_cards(&mut self, dt: f32) {
        let picked = self.picked();
        for (i, card) in self.cards.iter_mut().enumerate() {
            if picked == Some(i) {
                continue;
            }
            let Some(transform) = self.scene.transform_mut(card.node) else {
                continue;
            };
            if let Some(drift) = &mut card.drift {
                if drift.advance(dt, &mut transform.position) == TweenStatus::Completed {
                    card.drift = None;
                }
            }
            if let Some(layout) = &mut card.layout {
                if layout.advance(dt, &mut transform.position) == TweenStatus::Completed {
                    card.layout = None;
                }
            }
        }
    }

    fn billboard(&mut self) -> Result<(), SceneError> {
        let eye = self.camera.eye;
        self.scene.look_at(self.backdrop, eye, Vec3::Y)?;
        for card in &self.cards {
            self.scene.look_at(card.node, eye, Vec3::Y)?;
        }
        Ok(())
    }

    fn step(&mut self, dt: f32) -> Result<(), SceneError> {
        self.advance_cards(dt);
        self.advance_pick(dt)?;

        if self.rotating {
            if let Some(t) = self.scene.transform_mut(self.group) {
                t.rotation = Quat::from_rotation_y(self.config.spin) * t.rotation;
            }
            if self.drift_timer.is_none() {
                self.drift_timer = Some(DRIFT_PERIOD);
            }
        }
        if let Some(remaining) = self.drift_timer {
            let remaining = remaining - dt;
            if remaining <= 0.0 {
                self.drift_timer = None;
                self.start_drift();
            } else {
                self.drift_timer = Some(remaining);
            }
        }
        self.billboard()
    }
}

impl Demo for Gallery {
    fn id(&self) -> DemoId {
        DemoId::Gallery
    }

    fn update(&mut self, time: &FrameTime, _input: &InputState) {
        self.orbit.apply(&mut self.camera);
        if let Err(e) = self.step(time.dt) {
            warn!(error = %e, "gallery frame skipped");
        }
    }

    fn handle(&mut self, action: &Action) {
        let result = match *action {
            Action::PointerDown(_) if self.overlay_visible() => self.begin_return(),
            Action::PointerDown(pixel) => self.try_pick(pixel),
            Action::Press(CLOSE) => self.begin_return(),
            Action::Press(DIMENSION) if !self.overlay_visible() => {
                self.scatter();
                Ok(())
            }
            Action::Press(ALIGNMENT) if !self.overlay_visible() => {
                self.align();
                Ok(())
            }
            Action::Resize { width, height } => {
                self.viewport = (width.max(1), height.max(1));
                self.camera.set_aspect(width, height);
                Ok(())
            }
            _ => Ok(()),
        };
        if let Err(e) = result {
            warn!(error = %e, "gallery action failed");
        }
    }

    fn controls(&self) -> Vec<Control> {
        vec![
            Control::Button {
                id: DIMENSION,
                label: "Dimension",
                visible: self.aligned,
            },
            Control::Button {
                id: ALIGNMENT,
                label: "Alignment",
                visible: !self.aligned,
            },
            Control::Button {
                id: CLOSE,
                label: "Back",
                visible: self.overlay_visible(),
            },
        ]
    }

    fn view(&self) -> FrameView<'_> {
        FrameView::Scene {
            scene: &self.scene,
            camera: &self.camera,
        }
    }

    fn textures(&self) -> Vec<TextureKey> {
        self.textures.clone()
    }

    fn orbit(&mut self) -> Option<&mut OrbitCamera> {
        Some(&mut self.orbit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framelab_common::Transform;

    const DT: f32 = 1.0 / 60.0;
    const CENTER: Vec2 = Vec2::new(400.0, 300.0);
    /// Column 6, row 6: the card on the view axis.
    const CENTER_CARD: usize = 6 * COLUMNS + 6;

    fn gallery() -> Gallery {
        Gallery::new(&GalleryConfig::default(), 11, 800, 600).unwrap()
    }

    impl Gallery {
        fn card_transform(&self, index: usize) -> Transform {
            self.scene.transform(self.cards[index].node).copied().unwrap_or_default()
        }
    }

    fn run(g: &mut Gallery, seconds: f32) {
        let input = InputState::new(800, 600);
        let mut time = FrameTime::first(DT);
        for _ in 0..(seconds / DT).round() as usize {
            g.update(&time, &input);
            time = time.next(DT);
        }
    }

    #[test]
    fn empty_gallery_keeps_running() {
        let config = GalleryConfig {
            cards: 0,
            ..GalleryConfig::default()
        };
        let mut g = Gallery::new(&config, 3, 800, 600).unwrap();
        assert!(g.cards.is_empty());
        // Two seconds spans the first drift round.
        run(&mut g, 2.0);
        g.handle(&Action::PointerDown(CENTER));
        run(&mut g, 0.5);
        assert_eq!(g.picked(), None);
    }

    #[test]
    fn builds_one_card_per_texture() {
        let g = gallery();
        assert_eq!(g.card_count(), 151);
        assert_eq!(g.textures().len(), 151);
        assert_eq!(g.textures()[0].as_str(), "gallery/1.png");
        assert_eq!(g.textures()[150].as_str(), "gallery/151.png");
        // Cards plus the backdrop.
        assert_eq!(g.scene().mesh_nodes().len(), 152);
    }

    #[test]
    fn cards_sit_on_grid_columns_with_distinct_depths() {
        let g = gallery();
        let mut depths: Vec<i32> = (0..COLUMNS)
            .map(|j| g.card_transform(3 * COLUMNS + j).position.z as i32)
            .collect();
        assert_eq!(g.card_transform(3 * COLUMNS + 4).position.x, -3.0);
        assert_eq!(g.card_transform(3 * COLUMNS + 4).position.y, -2.0);
        depths.sort();
        assert_eq!(depths, (-5..=7).collect::<Vec<i32>>());
    }

    #[test]
    fn cards_face_the_camera() {
        let mut g = gallery();
        run(&mut g, 0.5);
        let node = g.card_node(0).unwrap();
        let world = g.scene().world_matrix(node).unwrap();
        let (_, rotation, position) = world.to_scale_rotation_translation();
        let facing = rotation * Vec3::Z;
        let to_eye = (Vec3::new(0.0, 0.0, 20.0) - position).normalize();
        assert!(facing.dot(to_eye) > 0.999);
    }

    #[test]
    fn group_spins_while_idle() {
        let mut g = gallery();
        run(&mut g, 1.0);
        assert!((g.group_angle() - 60.0 * 0.0005).abs() < 1e-4);
    }

    #[test]
    fn pick_lifts_the_card_and_return_restores_it() {
        let mut g = gallery();
        run(&mut g, DT);
        let home = g.card_transform(CENTER_CARD).position;

        g.handle(&Action::PointerDown(CENTER));
        assert_eq!(g.picked(), Some(CENTER_CARD));
        assert!(g.overlay_visible());
        assert!(!g.is_rotating());
        let node = g.card_node(CENTER_CARD).unwrap();
        assert_eq!(g.scene().get(node).unwrap().parent(), None);

        let angle = g.group_angle();
        run(&mut g, 1.0);
        assert_eq!(g.group_angle(), angle);
        let lifted = g.card_transform(CENTER_CARD);
        assert!(lifted.position.distance(Vec3::new(0.0, 0.0, 18.0)) < 1e-4);
        assert!(g.scene().is_visible(g.backdrop));
        let backdrop = g.scene().transform(g.backdrop).unwrap();
        assert!(backdrop.position.distance(Vec3::new(0.0, 0.0, 16.2)) < 1e-4);
        assert_eq!(backdrop.scale, Vec3::splat(2.0));

        // The overlay swallows clicks.
        g.handle(&Action::PointerDown(Vec2::ZERO));
        assert!(!g.scene().is_visible(g.backdrop));
        run(&mut g, 0.8);
        assert_eq!(g.picked(), None);
        assert!(g.is_rotating());
        let restored = g.card_transform(CENTER_CARD);
        assert_eq!(restored.position, home);
        assert_eq!(restored.scale, Vec3::ONE);
        assert_eq!(g.scene().get(node).unwrap().parent(), Some(g.group));
    }

    #[test]
    fn clicking_empty_space_picks_nothing() {
        let mut g = gallery();
        run(&mut g, DT);
        g.handle(&Action::PointerDown(Vec2::ZERO));
        assert_eq!(g.picked(), None);
        assert!(g.is_rotating());
    }

    #[test]
    fn alignment_lays_cards_on_a_grid() {
        let mut g = gallery();
        run(&mut g, 1.5);
        g.handle(&Action::Press(ALIGNMENT));
        assert!(g.is_aligned());
        assert_eq!(g.drifting_count(), 0);
        run(&mut g, 2.0);
        assert_eq!(g.group_angle(), 0.0);
        assert!(!g.is_rotating());
        for index in [0, 13, 150] {
            let p = g.card_transform(index).position;
            assert!(p.distance(aligned_position(index)) < 1e-4, "card {index} at {p}");
        }
        assert_eq!(aligned_position(150), Vec3::new(0.5, -6.5, 0.0));
        // No drift rounds once aligned.
        run(&mut g, 2.0);
        assert_eq!(g.drifting_count(), 0);
    }

    #[test]
    fn dimension_scatters_and_resumes_rotation() {
        let mut g = gallery();
        g.handle(&Action::Press(ALIGNMENT));
        g.handle(&Action::Press(DIMENSION));
        assert!(!g.is_aligned());
        assert!(g.is_rotating());
        run(&mut g, 0.5);
        for index in 0..g.card_count() {
            let p = g.card_transform(index).position;
            for c in p.to_array() {
                assert!((-6.0..=7.0).contains(&c), "card {index} at {p}");
            }
        }
    }

    #[test]
    fn scales_follow_camera_distance() {
        assert_eq!(pick_scales(20.0), (1.0, 2.0));
        let (card, backdrop) = pick_scales(3.0);
        assert!((card - 0.4).abs() < 1e-6);
        assert!((backdrop - 0.625).abs() < 1e-6);
        assert_eq!(rest_position(Vec3::new(0.0, 0.0, 0.5)), Vec3::new(0.0, 0.0, -0.5));
    }
}
