//! A 10×10 wall of boxes sharing one mesh, with boxes sliding along grid
//! lines in waves.

use std::collections::BTreeSet;

use framelab_common::{NodeId, Rng};
use framelab_geometry::cuboid;
use framelab_input::{Action, InputState, Key};
use framelab_render::{FrameView, OrbitCamera, PerspectiveCamera};
use framelab_scene::{Material, MaterialHandle, MeshHandle, Node, NodeKind, Scene, SceneError};
use framelab_tween::FrameTime;
use glam::{IVec3, Quat, Vec3};
use tracing::debug;

use crate::config::{CubeShiftConfig, hex};
use crate::{Demo, DemoId, lit_environment};

const GRID: i32 = 10;
/// Lowest and highest grid cell along any axis; boxes never leave this range.
const CELL_MIN: i32 = 0;
const CELL_MAX: i32 = GRID;

/// World coordinate of a grid cell: cells `0..=10` map to `-4.5..=5.5`.
fn cell_to_world(cell: i32) -> f32 {
    cell as f32 - 4.5
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Slide {
    index: usize,
    axis: usize,
    dir: i32,
    target: i32,
}

impl Slide {
    /// True when a box leaving `start` on this slide passes through or stops
    /// on `cell`.
    fn sweeps(&self, start: IVec3, cell: IVec3) -> bool {
        let (lo, hi) = (start[self.axis].min(self.target), start[self.axis].max(self.target));
        (0..3).all(|a| a == self.axis || start[a] == cell[a]) && (lo..=hi).contains(&cell[self.axis])
    }
}

pub struct CubeShift {
    scene: Scene,
    camera: PerspectiveCamera,
    orbit: OrbitCamera,
    group: NodeId,
    boxes: Vec<NodeId>,
    cells: Vec<IVec3>,
    mesh: MeshHandle,
    resting: MaterialHandle,
    moving: MaterialHandle,
    rng: Rng,
    slide_speed: f32,
    spin: f32,
    hold_spin: f32,
    wave_size: usize,
    angle: f32,
    held: bool,
    sliding: Vec<Slide>,
    stopped: Vec<usize>,
}

impl CubeShift {
    pub fn new(config: &CubeShiftConfig, seed: u64, width: u32, height: u32) -> Result<Self, SceneError> {
        let mut rng = Rng::new(seed);
        let mut scene = Scene::with_environment(lit_environment(hex(config.clear_color), config.ambient));
        let mesh = scene.add_mesh(cuboid(1.0, 1.0, 1.0));
        let resting = scene.add_material(Material::phong(hex(config.box_color)));
        let moving = scene.add_material(Material::phong(hex(config.moving_color)));

        let mut boxes = Vec::new();
        let mut cells = Vec::new();
        let group = scene.add(None, Node::group("boxes"))?;
        for x in 0..GRID {
            // One depth permutation per column keeps every cell distinct.
            let depths = rng.permutation(GRID as usize);
            for (y, depth) in depths.iter().enumerate() {
                let cell = IVec3::new(x, y as i32, *depth as i32);
                let node = Node::mesh("box", mesh, resting).with_position(cell.as_vec3() - Vec3::splat(4.5));
                boxes.push(scene.add(Some(group), node)?);
                cells.push(cell);
            }
        }
        scene.add(None, Node::axes("axes", config.axes_length))?;

        let aspect = width.max(1) as f32 / height.max(1) as f32;
        Ok(Self {
            scene,
            camera: config.camera.camera(aspect),
            orbit: config.camera.orbit(),
            group,
            boxes,
            cells,
            mesh,
            resting,
            moving,
            rng,
            slide_speed: config.slide_speed,
            spin: config.spin,
            hold_spin: config.hold_spin,
            wave_size: config.wave_size.max(1),
            angle: 0.0,
            held: false,
            sliding: Vec::new(),
            stopped: Vec::new(),
        })
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Grid cell of every box, in creation order.
    pub fn cells(&self) -> &[IVec3] {
        &self.cells
    }

    pub fn sliding_count(&self) -> usize {
        self.sliding.len()
    }

    pub fn group_angle(&self) -> f32 {
        self.angle
    }

    fn set_material(&mut self, index: usize, material: MaterialHandle) {
        if let Some(node) = self.scene.get_mut(self.boxes[index]) {
            node.kind = NodeKind::Mesh {
                mesh: self.mesh,
                material,
            };
        }
    }

    /// Boxes for the next wave: up to `wave_size` boxes lined up with a box
    /// that just stopped, or a single random box.
    fn next_wave(&mut self) -> Vec<usize> {
        let stopped: BTreeSet<usize> = self.stopped.drain(..).collect();
        let mut candidates: Vec<usize> = (0..self.cells.len())
            .filter(|i| !stopped.contains(i))
            .filter(|&i| {
                let c = self.cells[i];
                stopped.iter().any(|&s| {
                    let o = self.cells[s];
                    c.x == o.x || c.y == o.y || c.z == o.z
                })
            })
            .collect();
        if candidates.is_empty() {
            return vec![self.rng.below(self.cells.len())];
        }
        self.rng.shuffle(&mut candidates);
        candidates.truncate(self.wave_size);
        candidates
    }

    /// Choose an axis and direction for box `index` and find where it stops:
    /// next to the nearest box in its path, before any cell another box of
    /// the same wave sweeps through, or at the wall.
    fn plan(&mut self, index: usize, planned: &[Slide]) -> Slide {
        let axis = self.rng.below(3);
        let cell = self.cells[index];
        let dir = match cell[axis] {
            CELL_MIN => 1,
            CELL_MAX => -1,
            _ => self.rng.sign() as i32,
        };

        let occupied = |probe: IVec3| {
            self.cells
                .iter()
                .enumerate()
                .any(|(i, c)| i != index && *c == probe)
                || planned.iter().any(|s| s.sweeps(self.cells[s.index], probe))
        };

        let mut target = cell[axis];
        let mut probe = cell;
        loop {
            probe[axis] += dir;
            if !(CELL_MIN..=CELL_MAX).contains(&probe[axis]) || occupied(probe) {
                break;
            }
            target = probe[axis];
        }
        Slide {
            index,
            axis,
            dir,
            target,
        }
    }

    fn start_wave(&mut self) {
        let wave = self.next_wave();
        let mut planned: Vec<Slide> = Vec::with_capacity(wave.len());
        for index in wave {
            let slide = self.plan(index, &planned);
            planned.push(slide);
        }
        debug!(boxes = planned.len(), "starting slide wave");
        for slide in &planned {
            self.set_material(slide.index, self.moving);
        }
        self.sliding = planned;
    }

    fn advance_slides(&mut self) {
        let mut finished = Vec::new();
        for (k, slide) in self.sliding.iter().enumerate() {
            let id = self.boxes[slide.index];
            let Some(t) = self.scene.transform_mut(id) else {
                finished.push(k);
                continue;
            };
            let goal = cell_to_world(slide.target);
            let next = t.position[slide.axis] + self.slide_speed * slide.dir as f32;
            if (goal - next) * slide.dir as f32 <= 0.0 {
                t.position[slide.axis] = goal;
                finished.push(k);
            } else {
                t.position[slide.axis] = next;
            }
        }
        for k in finished.into_iter().rev() {
            let slide = self.sliding.remove(k);
            self.cells[slide.index][slide.axis] = slide.target;
            self.set_material(slide.index, self.resting);
            self.stopped.push(slide.index);
        }
    }
}

impl Demo for CubeShift {
    fn id(&self) -> DemoId {
        DemoId::CubeShift
    }

    fn update(&mut self, _time: &FrameTime, input: &InputState) {
        self.orbit.apply(&mut self.camera);

        let held = self.held || input.is_held(Key::Space);
        self.angle += if held { self.hold_spin } else { self.spin };
        if let Some(t) = self.scene.transform_mut(self.group) {
            t.rotation = Quat::from_rotation_y(self.angle);
        }

        if self.sliding.is_empty() {
            self.start_wave();
        } else {
            self.advance_slides();
        }
    }

    fn handle(&mut self, action: &Action) {
        match *action {
            Action::Hold(down) => self.held = down,
            Action::Resize { width, height } => self.camera.set_aspect(width, height),
            _ => {}
        }
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

    fn demo(seed: u64) -> CubeShift {
        CubeShift::new(&CubeShiftConfig::default(), seed, 800, 600).unwrap()
    }

    fn run(d: &mut CubeShift, frames: usize) {
        let input = InputState::new(800, 600);
        let mut time = FrameTime::first(1.0 / 60.0);
        for _ in 0..frames {
            d.update(&time, &input);
            time = time.next(1.0 / 60.0);
        }
    }

    fn assert_cells_distinct(d: &CubeShift) {
        let unique: BTreeSet<(i32, i32, i32)> = d.cells().iter().map(|c| (c.x, c.y, c.z)).collect();
        assert_eq!(unique.len(), d.cells().len());
        for c in d.cells() {
            for axis in 0..3 {
                assert!((CELL_MIN..=CELL_MAX).contains(&c[axis]));
            }
        }
    }

    #[test]
    fn grid_shares_one_mesh() {
        let d = demo(1);
        assert_eq!(d.cells().len(), 100);
        assert_cells_distinct(&d);
        let batches = d.scene().visible_meshes();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].instances.len(), 100);
        assert_eq!(d.scene().meshes().count(), 1);
    }

    #[test]
    fn initial_positions_follow_the_grid() {
        let d = demo(2);
        for (i, c) in d.cells().iter().enumerate() {
            assert_eq!(c.x, (i / 10) as i32);
            assert_eq!(c.y, (i % 10) as i32);
            assert!((1..=10).contains(&c.z));
        }
    }

    #[test]
    fn group_spins_and_reverses_while_held() {
        let mut d = demo(3);
        run(&mut d, 10);
        assert!((d.group_angle() - 0.01).abs() < 1e-5);
        d.handle(&Action::Hold(true));
        run(&mut d, 2);
        assert!((d.group_angle() - 0.0).abs() < 1e-5);
        d.handle(&Action::Hold(false));
        run(&mut d, 1);
        assert!((d.group_angle() - 0.001).abs() < 1e-5);
    }

    #[test]
    fn first_frame_starts_one_box() {
        let mut d = demo(4);
        run(&mut d, 1);
        assert_eq!(d.sliding_count(), 1);
        // The moving box switches to the highlight material.
        assert_eq!(d.scene().visible_meshes().len(), 2);
    }

    #[test]
    fn boxes_never_overlap_or_leave_the_walls() {
        let mut d = demo(5);
        for _ in 0..20 {
            run(&mut d, 100);
            if d.sliding_count() == 0 {
                assert_cells_distinct(&d);
            }
        }
        run(&mut d, 1000);
        assert_cells_distinct(&d);
    }

    #[test]
    fn resting_positions_match_cells() {
        let mut d = demo(6);
        run(&mut d, 2000);
        // Finish whatever is in flight.
        while d.sliding_count() > 0 {
            run(&mut d, 1);
        }
        for (i, id) in d.boxes.iter().enumerate() {
            let p = d.scene().transform(*id).unwrap().position;
            let c = d.cells()[i];
            assert!((p - (c.as_vec3() - Vec3::splat(4.5))).length() < 1e-4);
        }
    }

    #[test]
    fn slide_sweeps_its_whole_path() {
        let s = Slide { index: 0, axis: 0, dir: 1, target: 5 };
        let start = IVec3::new(2, 3, 4);
        for x in 2..=5 {
            assert!(s.sweeps(start, IVec3::new(x, 3, 4)));
        }
        assert!(!s.sweeps(start, IVec3::new(6, 3, 4)));
        assert!(!s.sweeps(start, IVec3::new(1, 3, 4)));
        assert!(!s.sweeps(start, IVec3::new(3, 4, 4)));
        let back = Slide { index: 0, axis: 2, dir: -1, target: 1 };
        assert!(back.sweeps(start, IVec3::new(2, 3, 2)));
        assert!(!back.sweeps(start, IVec3::new(2, 3, 0)));
    }

    #[test]
    fn paths_in_one_wave_never_cross() {
        for seed in 10..20 {
            let mut d = demo(seed);
            for _ in 0..1500 {
                run(&mut d, 1);
                // Cells only change when a slide finishes, so every slide
                // still in flight starts from its recorded cell.
                for (i, a) in d.sliding.iter().enumerate() {
                    for b in &d.sliding[i + 1..] {
                        let (from_a, from_b) = (d.cells[a.index], d.cells[b.index]);
                        let crossed = (0..=(b.target - from_b[b.axis]).abs()).any(|step| {
                            let mut cell = from_b;
                            cell[b.axis] += step * b.dir;
                            a.sweeps(from_a, cell)
                        });
                        assert!(!crossed, "seed {seed}: {a:?} and {b:?} cross");
                    }
                }
            }
        }
    }

    #[test]
    fn waves_stay_within_size() {
        let mut d = demo(7);
        for _ in 0..3000 {
            run(&mut d, 1);
            assert!(d.sliding_count() <= 3);
        }
    }
}
