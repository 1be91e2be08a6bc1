//! Two-pass offscreen demo: a tilted plane crossfading two pictures is drawn
//! into a target, optionally blurred, then shown through a displacing
//! full-screen panel.

use framelab_common::{Color, TextureKey};
use framelab_input::{Action, Control, InputState};
use framelab_render::{
    BLUR_TAPS, FrameGraph, FrameView, OrbitCamera, Pass, PassOutput, PassUniforms, PerspectiveCamera, Program,
    TargetId, TargetSet, gauss_weights,
};
use framelab_tween::FrameTime;
use glam::Vec2;
use tracing::debug;

use crate::config::CrossfadeConfig;
use crate::tilt::PointerTilt;
use crate::{Demo, DemoId};

pub const BLUR: &str = "blur";

const SCENE: TargetId = TargetId(0);
const SCRATCH: TargetId = TargetId(1);
const TARGETS: u8 = 2;

pub struct Crossfade {
    camera: PerspectiveCamera,
    orbit: OrbitCamera,
    targets: TargetSet,
    tilt: PointerTilt,
    /// Pointer in `[-1, 1]` from the viewport center, y up.
    mouse: Vec2,
    first: TextureKey,
    second: TextureKey,
    blur: bool,
    weights: [f32; BLUR_TAPS],
    time: f32,
    graph: FrameGraph,
    config: CrossfadeConfig,
}

/// `0..1` and back once every `2π` seconds.
pub fn crossfade_progress(seconds: f32) -> f32 {
    (seconds.sin() + 1.0) / 2.0
}

impl Crossfade {
    pub fn new(config: &CrossfadeConfig, width: u32, height: u32) -> Self {
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        let mut weights = [0.0; BLUR_TAPS];
        weights.copy_from_slice(&gauss_weights(config.gauss_strength, BLUR_TAPS));
        let mut demo = Self {
            camera: config.orbit.camera(aspect),
            orbit: config.orbit.orbit(),
            targets: TargetSet::new(TARGETS, width, height),
            tilt: PointerTilt::new((width, height), 3.0, 1.0, 2.0),
            mouse: Vec2::ZERO,
            first: TextureKey::new(config.first_texture.as_str()),
            second: TextureKey::new(config.second_texture.as_str()),
            blur: config.blur,
            weights,
            time: 0.0,
            graph: FrameGraph::new(TARGETS),
            config: config.clone(),
        };
        demo.orbit.apply(&mut demo.camera);
        demo.graph = demo.build_graph();
        demo
    }

    pub fn targets(&self) -> &TargetSet {
        &self.targets
    }

    pub fn graph(&self) -> &FrameGraph {
        &self.graph
    }

    pub fn blur_enabled(&self) -> bool {
        self.blur
    }

    fn build_graph(&self) -> FrameGraph {
        let (w, h) = self.targets.size();
        let resolution = Vec2::new(w as f32, h as f32);
        let model = self.tilt.model();
        let grey = self.config.offscreen_grey;

        let mut graph = FrameGraph::new(TARGETS);
        graph.push(
            Pass::new("crossfade", Program::Crossfade, PassOutput::Target(SCENE))
                .image(self.first.clone())
                .image(self.second.clone())
                .clear(Color::rgb(grey, grey, grey))
                .uniforms(PassUniforms {
                    mvp: self.camera.view_projection() * model,
                    model,
                    time: self.time,
                    progress: crossfade_progress(self.time),
                    resolution,
                    ..PassUniforms::default()
                }),
        );
        if self.blur {
            let blur = |label: &str, source: TargetId, output: TargetId, direction: Vec2| {
                Pass::new(label, Program::Blur, PassOutput::Target(output))
                    .target(source)
                    .uniforms(PassUniforms {
                        direction,
                        weights: self.weights,
                        resolution,
                        ..PassUniforms::default()
                    })
            };
            graph.push(blur("blur-horizontal", SCENE, SCRATCH, Vec2::new(1.0 / resolution.x, 0.0)));
            graph.push(blur("blur-vertical", SCRATCH, SCENE, Vec2::new(0.0, 1.0 / resolution.y)));
        }
        graph.push(
            Pass::new("panel", Program::Displace, PassOutput::Screen)
                .target(SCENE)
                .clear(Color::RED)
                .uniforms(PassUniforms {
                    mouse: self.mouse,
                    resolution,
                    time: self.time,
                    ..PassUniforms::default()
                }),
        );
        graph
    }
}

impl Demo for Crossfade {
    fn id(&self) -> DemoId {
        DemoId::Crossfade
    }

    fn update(&mut self, time: &FrameTime, _input: &InputState) {
        self.time = time.elapsed;
        self.orbit.apply(&mut self.camera);
        self.tilt.advance(time.dt);
        self.graph = self.build_graph();
    }

    fn handle(&mut self, action: &Action) {
        match *action {
            Action::PointerMove(pixel) => {
                self.tilt.pointer_moved(pixel);
                let (w, h) = self.targets.size();
                let half = Vec2::new(w as f32, h as f32) / 2.0;
                self.mouse = Vec2::new((pixel.x - half.x) / half.x, (half.y - pixel.y) / half.y);
            }
            Action::Toggle { control: BLUR, on } => {
                debug!(blur = on, "crossfade blur");
                self.blur = on;
            }
            Action::Resize { width, height } => {
                self.targets.resize(width, height);
                self.tilt.set_viewport(width, height);
                self.camera.set_aspect(width, height);
            }
            _ => {}
        }
    }

    fn controls(&self) -> Vec<Control> {
        vec![Control::Toggle {
            id: BLUR,
            label: "Blur",
            on: self.blur,
        }]
    }

    fn view(&self) -> FrameView<'_> {
        FrameView::PostProcess { graph: &self.graph }
    }

    fn textures(&self) -> Vec<TextureKey> {
        vec![self.first.clone(), self.second.clone()]
    }

    fn orbit(&mut self) -> Option<&mut OrbitCamera> {
        Some(&mut self.orbit)
    }
}
